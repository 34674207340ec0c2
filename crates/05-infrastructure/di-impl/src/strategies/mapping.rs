use crate::context::BuildContext;
use crate::plan_cache::BuildPlan;
use crate::strategy::BuilderStrategy;
use infrastructure_common::DependencyResult;
use tracing::debug;

/// 类型映射：在同一次解析中构建映射目标，并附加接口视图
///
/// 目标键会重新经过完整的管线，包括它自己的生命周期检查。
#[derive(Debug, Default)]
pub struct TypeMappingStrategy;

impl BuilderStrategy for TypeMappingStrategy {
    fn name(&self) -> &str {
        "TypeMapping"
    }

    fn is_applicable(&self, plan: &BuildPlan) -> bool {
        plan.mapping().is_some()
    }

    fn pre_build_up(&self, context: &mut BuildContext<'_>) -> DependencyResult<()> {
        let (target, view) = match context.plan().mapping() {
            Some(mapping) => (mapping.target().clone(), mapping.view().cloned()),
            None => return Ok(()),
        };
        debug!("类型映射: {} -> {}", context.key(), target);

        let instance = context.build(&target, context.existing().cloned())?;
        context.set_value(match view {
            Some(view) => instance.with_view(view),
            None => instance,
        });
        Ok(())
    }
}
