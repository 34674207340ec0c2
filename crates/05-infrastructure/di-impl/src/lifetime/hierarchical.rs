use super::slot::SynchronizedSlot;
use di_abstractions::{BindingFlag, ContainerId, Instance, LifetimeManager, LifetimeScope};
use infrastructure_common::{DependencyError, DependencyResult, LifetimeKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// 层级生命周期
///
/// 每个发起解析的容器各有一个值。解析时从发起解析的容器开始沿祖先链
/// 查找已缓存的值，整条链上都没有时在发起解析的容器里构造并缓存。
#[derive(Debug)]
pub struct HierarchicalLifetimeManager {
    id: Uuid,
    binding: BindingFlag,
    slots: Mutex<HashMap<ContainerId, Arc<SynchronizedSlot>>>,
}

impl HierarchicalLifetimeManager {
    /// 创建新的管理器
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            binding: BindingFlag::new(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, container: ContainerId) -> Arc<SynchronizedSlot> {
        self.slots
            .lock()
            .entry(container)
            .or_insert_with(|| Arc::new(SynchronizedSlot::new()))
            .clone()
    }

    fn existing_slot(&self, container: ContainerId) -> Option<Arc<SynchronizedSlot>> {
        self.slots.lock().get(&container).cloned()
    }

    /// 缓存了值的容器数量
    pub fn scope_count(&self) -> usize {
        self.slots.lock().values().filter(|slot| slot.peek().is_some()).count()
    }
}

impl Default for HierarchicalLifetimeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifetimeManager for HierarchicalLifetimeManager {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> LifetimeKind {
        LifetimeKind::Hierarchical
    }

    fn try_get(&self, scope: &LifetimeScope<'_>) -> DependencyResult<Option<Instance>> {
        for container in scope.lineage() {
            if let Some(value) = self.existing_slot(*container).and_then(|slot| slot.peek()) {
                return Ok(Some(value));
            }
        }
        self.slot(scope.container()).acquire()
    }

    fn set(&self, value: Instance, scope: &LifetimeScope<'_>) {
        self.slot(scope.container()).fill(value);
    }

    fn recover(&self, scope: &LifetimeScope<'_>, error: &DependencyError) {
        if let Some(slot) = self.existing_slot(scope.container()) {
            slot.abandon(error);
        }
    }

    fn release_scope(&self, container: ContainerId) {
        if let Some(slot) = self.slots.lock().remove(&container) {
            slot.clear();
        }
    }

    fn dispose(&self) {
        let slots: Vec<_> = self.slots.lock().drain().map(|(_, slot)| slot).collect();
        for slot in slots {
            slot.clear();
        }
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
