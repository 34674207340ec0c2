use crate::context::BuildContext;
use crate::plan_cache::BuildPlan;
use crate::strategy::BuilderStrategy;
use infrastructure_common::{DependencyError, DependencyResult};

/// 构造前：选定成员计划
///
/// 没有计划时，若注册键在任何层级都没有策略则报告未注册，否则报告没有构造计划。
/// build-up 没有计划时不做注入。
#[derive(Debug, Default)]
pub struct PlanSelectionStrategy;

impl BuilderStrategy for PlanSelectionStrategy {
    fn name(&self) -> &str {
        "PlanSelection"
    }

    fn is_applicable(&self, plan: &BuildPlan) -> bool {
        plan.mapping().is_none() && !plan.is_enumerable()
    }

    fn pre_build_up(&self, context: &mut BuildContext<'_>) -> DependencyResult<()> {
        if context.value().is_some() && !context.is_build_up() {
            return Ok(());
        }

        match context.plan().member_plan().cloned() {
            Some(plan) => {
                if plan.construction().is_none() && !context.is_build_up() {
                    return Err(DependencyError::NoConstructionPlan {
                        type_name: context.key().to_string(),
                    });
                }
                context.select_member_plan(plan);
                Ok(())
            }
            None if context.is_build_up() => Ok(()),
            None if context.policies().contains_key(context.key()) => Err(DependencyError::NoConstructionPlan {
                type_name: context.key().to_string(),
            }),
            None => Err(DependencyError::ComponentNotRegistered {
                type_name: context.key().to_string(),
            }),
        }
    }
}
