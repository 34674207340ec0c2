use crate::context::BuildContext;
use crate::plan_cache::BuildPlan;
use crate::strategy::{BuildStage, BuilderStrategy};
use infrastructure_common::{DependencyError, DependencyResult};

/// 属性和方法注入，按计划顺序执行
///
/// build-up 总是重新注入，已有的成员值会被新解析的值覆盖。
#[derive(Debug, Default)]
pub struct InitializationStrategy;

impl BuilderStrategy for InitializationStrategy {
    fn name(&self) -> &str {
        "Initialization"
    }

    fn is_applicable(&self, plan: &BuildPlan) -> bool {
        plan.mapping().is_none()
            && !plan.is_enumerable()
            && plan.member_plan().is_some_and(|plan| !plan.injection().is_empty())
    }

    fn pre_build_up(&self, context: &mut BuildContext<'_>) -> DependencyResult<()> {
        let (plan, target) = match (context.member_plan(), context.value()) {
            (Some(plan), Some(target)) => (plan.clone(), target.clone()),
            _ => return Ok(()),
        };

        for member in plan.injection() {
            let parameters = context.resolve_parameters(member.parameters())?;
            member.apply(&target, &parameters).map_err(|error| {
                DependencyError::creation_failed(
                    context.key().to_string(),
                    format!("{}:{}", BuildStage::Initialization, member.member()),
                    error,
                )
            })?;
        }
        Ok(())
    }
}
