//! 生命周期管理器实现

mod container_controlled;
mod externally_controlled;
mod hierarchical;
mod per_resolve;
mod pooled;
mod slot;
mod transient;

pub use container_controlled::ContainerControlledLifetimeManager;
pub use externally_controlled::ExternallyControlledLifetimeManager;
pub use hierarchical::HierarchicalLifetimeManager;
pub use per_resolve::PerResolveLifetimeManager;
pub use pooled::PooledLifetimeManager;
pub use transient::TransientLifetimeManager;

use di_abstractions::LifetimeManager;
use infrastructure_common::LifetimeKind;
use std::sync::Arc;

/// 按种类创建新的未绑定管理器
pub fn from_kind(kind: LifetimeKind, pool_capacity: usize) -> Arc<dyn LifetimeManager> {
    match kind {
        LifetimeKind::Transient => Arc::new(TransientLifetimeManager::new()),
        LifetimeKind::PerResolve => Arc::new(PerResolveLifetimeManager::new()),
        LifetimeKind::ContainerControlled => Arc::new(ContainerControlledLifetimeManager::new()),
        LifetimeKind::Hierarchical => Arc::new(HierarchicalLifetimeManager::new()),
        LifetimeKind::Pooled => Arc::new(PooledLifetimeManager::new(pool_capacity)),
        LifetimeKind::ExternallyControlled => Arc::new(ExternallyControlledLifetimeManager::new()),
    }
}
