use di_abstractions::{BindingFlag, Instance, LifetimeManager, LifetimeScope};
use infrastructure_common::{DependencyResult, LifetimeKind};
use std::sync::Arc;
use uuid::Uuid;

/// 单次解析生命周期
///
/// 值存放在本次顶层解析的共享存储里，同一张对象图内复用，调用返回后丢弃。
#[derive(Debug)]
pub struct PerResolveLifetimeManager {
    id: Uuid,
    binding: BindingFlag,
}

impl PerResolveLifetimeManager {
    /// 创建新的管理器
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            binding: BindingFlag::new(),
        }
    }
}

impl Default for PerResolveLifetimeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifetimeManager for PerResolveLifetimeManager {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> LifetimeKind {
        LifetimeKind::PerResolve
    }

    fn try_get(&self, scope: &LifetimeScope<'_>) -> DependencyResult<Option<Instance>> {
        Ok(scope.per_resolve().get(self.id))
    }

    fn set(&self, value: Instance, scope: &LifetimeScope<'_>) {
        scope.per_resolve().insert(self.id, value);
    }

    fn dispose(&self) {}

    fn create_lifetime_manager(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(Self::new())
    }

    fn bind(&self) -> bool {
        self.binding.try_bind()
    }

    fn is_bound(&self) -> bool {
        self.binding.is_bound()
    }
}
