use crate::context::BuildContext;
use crate::plan_cache::BuildPlan;
use crate::strategy::BuilderStrategy;
use di_abstractions::{Instance, InstanceCollection, Registration};
use infrastructure_common::DependencyResult;
use tracing::debug;

/// 枚举请求：解析元素类型的全部可见注册
#[derive(Debug, Default)]
pub struct EnumerableStrategy;

impl BuilderStrategy for EnumerableStrategy {
    fn name(&self) -> &str {
        "Enumerable"
    }

    fn is_applicable(&self, plan: &BuildPlan) -> bool {
        plan.is_enumerable()
    }

    fn pre_build_up(&self, context: &mut BuildContext<'_>) -> DependencyResult<()> {
        let element = match context.key().type_info().element() {
            Some(element) => element.clone(),
            None => return Ok(()),
        };
        let keys = context.policies().keys_with::<Registration>(&element);
        debug!("枚举解析: {} 共 {} 个注册", element, keys.len());

        let items = keys
            .iter()
            .map(|key| context.resolve(key))
            .collect::<DependencyResult<Vec<_>>>()?;
        context.set_value(Instance::new(InstanceCollection(items)));
        Ok(())
    }
}
