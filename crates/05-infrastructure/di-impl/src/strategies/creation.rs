use crate::context::BuildContext;
use crate::plan_cache::BuildPlan;
use crate::strategy::{BuildStage, BuilderStrategy};
use infrastructure_common::{DependencyError, DependencyResult};
use tracing::debug;

/// 创建实例：解析构造参数并调用工厂
#[derive(Debug, Default)]
pub struct CreationStrategy;

impl BuilderStrategy for CreationStrategy {
    fn name(&self) -> &str {
        "Creation"
    }

    fn is_applicable(&self, plan: &BuildPlan) -> bool {
        plan.mapping().is_none() && !plan.is_enumerable()
    }

    fn pre_build_up(&self, context: &mut BuildContext<'_>) -> DependencyResult<()> {
        if context.value().is_some() {
            return Ok(());
        }
        let plan = context.member_plan().cloned().ok_or_else(|| DependencyError::NoConstructionPlan {
            type_name: context.key().to_string(),
        })?;
        let construction = plan.construction().ok_or_else(|| DependencyError::NoConstructionPlan {
            type_name: context.key().to_string(),
        })?;

        let parameters = context.resolve_parameters(construction.parameters())?;
        let instance = construction.invoke(&parameters).map_err(|error| {
            DependencyError::creation_failed(context.key().to_string(), BuildStage::Creation.to_string(), error)
        })?;

        debug!("创建实例: {} ({})", context.key(), instance.type_name());
        context.record_construction();
        context.set_value(instance);
        Ok(())
    }
}
