use di_abstractions::{BindingFlag, Instance, LifetimeManager, LifetimeScope, WeakInstance};
use infrastructure_common::{DependencyResult, LifetimeKind};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// 外部控制的生命周期
///
/// 只持有弱引用，外部不再持有值后下一次解析重新构造。
#[derive(Debug)]
pub struct ExternallyControlledLifetimeManager {
    id: Uuid,
    binding: BindingFlag,
    value: Mutex<Option<WeakInstance>>,
}

impl ExternallyControlledLifetimeManager {
    /// 创建新的管理器
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            binding: BindingFlag::new(),
            value: Mutex::new(None),
        }
    }

    /// 丢弃弱引用
    pub fn forget(&self) {
        *self.value.lock() = None;
    }
}

impl Default for ExternallyControlledLifetimeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifetimeManager for ExternallyControlledLifetimeManager {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> LifetimeKind {
        LifetimeKind::ExternallyControlled
    }

    fn try_get(&self, _scope: &LifetimeScope<'_>) -> DependencyResult<Option<Instance>> {
        let mut value = self.value.lock();
        let alive = value.as_ref().and_then(WeakInstance::upgrade);
        if alive.is_none() {
            *value = None;
        }
        Ok(alive)
    }

    fn set(&self, value: Instance, _scope: &LifetimeScope<'_>) {
        *self.value.lock() = Some(value.downgrade());
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
