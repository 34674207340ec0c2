use crate::context::BuildContext;
use crate::plan_cache::BuildPlan;
use crate::strategy::BuilderStrategy;
use infrastructure_common::DependencyResult;
use tracing::debug;

/// 生命周期检查
///
/// 前置动作查询缓存，命中时结束前置阶段；未命中时持有构造权，
/// 后置动作把新构建的值写回生命周期管理器。build-up 不查询缓存。
#[derive(Debug, Default)]
pub struct LifetimeStrategy;

impl BuilderStrategy for LifetimeStrategy {
    fn name(&self) -> &str {
        "Lifetime"
    }

    fn is_applicable(&self, plan: &BuildPlan) -> bool {
        plan.lifetime().is_some()
    }

    fn pre_build_up(&self, context: &mut BuildContext<'_>) -> DependencyResult<()> {
        if context.is_build_up() {
            return Ok(());
        }
        let manager = match context.plan().lifetime() {
            Some(manager) => manager.clone(),
            None => return Ok(()),
        };

        let cached = manager.try_get(&context.lifetime_scope())?;
        match cached {
            Some(value) => {
                debug!("生命周期缓存命中: {} ({})", context.key(), manager.kind());
                context.set_value(value);
                context.complete();
            }
            None => context.hold_guard(manager),
        }
        Ok(())
    }

    fn post_build_up(&self, context: &mut BuildContext<'_>) -> DependencyResult<()> {
        let manager = match context.release_guard() {
            Some(manager) => manager,
            None => return Ok(()),
        };
        match context.value().cloned() {
            Some(value) => manager.set(value, &context.lifetime_scope()),
            // 没有产出值，交还构造权由管线的失败路径释放
            None => context.hold_guard(manager),
        }
        Ok(())
    }
}
