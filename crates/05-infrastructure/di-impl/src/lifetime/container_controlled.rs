use super::slot::SynchronizedSlot;
use di_abstractions::{BindingFlag, Instance, LifetimeManager, LifetimeScope};
use infrastructure_common::{DependencyError, DependencyResult, LifetimeKind};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 容器控制的生命周期（单例）
///
/// 首次成功构造的值被缓存，并发的首次解析只构造一次。
#[derive(Debug)]
pub struct ContainerControlledLifetimeManager {
    id: Uuid,
    binding: BindingFlag,
    slot: SynchronizedSlot,
}

impl ContainerControlledLifetimeManager {
    /// 创建新的管理器
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            binding: BindingFlag::new(),
            slot: SynchronizedSlot::new(),
        }
    }

    /// 当前缓存的值
    pub fn value(&self) -> Option<Instance> {
        self.slot.peek()
    }
}

impl Default for ContainerControlledLifetimeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifetimeManager for ContainerControlledLifetimeManager {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> LifetimeKind {
        LifetimeKind::ContainerControlled
    }

    fn try_get(&self, _scope: &LifetimeScope<'_>) -> DependencyResult<Option<Instance>> {
        self.slot.acquire()
    }

    fn set(&self, value: Instance, _scope: &LifetimeScope<'_>) {
        self.slot.fill(value);
    }

    fn recover(&self, _scope: &LifetimeScope<'_>, error: &DependencyError) {
        self.slot.abandon(error);
    }

    fn dispose(&self) {
        debug!("释放单例值: {}", self.id);
        self.slot.clear();
    }

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
