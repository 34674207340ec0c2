use di_abstractions::{BindingFlag, Instance, LifetimeManager, LifetimeScope};
use infrastructure_common::{DependencyResult, LifetimeKind};
use std::sync::Arc;
use uuid::Uuid;

/// 瞬时生命周期：从不缓存
#[derive(Debug)]
pub struct TransientLifetimeManager {
    id: Uuid,
    binding: BindingFlag,
}

impl TransientLifetimeManager {
    /// 创建新的管理器
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            binding: BindingFlag::new(),
        }
    }
}

impl Default for TransientLifetimeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifetimeManager for TransientLifetimeManager {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> LifetimeKind {
        LifetimeKind::Transient
    }

    fn try_get(&self, _scope: &LifetimeScope<'_>) -> DependencyResult<Option<Instance>> {
        Ok(None)
    }

    fn set(&self, _value: Instance, _scope: &LifetimeScope<'_>) {}

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
