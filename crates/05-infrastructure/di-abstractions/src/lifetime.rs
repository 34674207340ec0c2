//! 生命周期管理器抽象接口
//!
//! 生命周期管理器决定一次构建的结果是否被缓存、在什么范围内共享、
//! 是强引用还是弱引用持有。

use crate::instance::Instance;
use infrastructure_common::{DependencyResult, LifetimeKind, DependencyError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// 容器标识
pub type ContainerId = Uuid;

/// 单次解析调用内共享的值
///
/// 由一次顶层 `resolve`/`build_up` 创建，调用返回时丢弃。
#[derive(Debug, Default)]
pub struct PerResolveStore {
    values: Mutex<HashMap<Uuid, Instance>>,
}

impl PerResolveStore {
    /// 创建空的存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取某个管理器在本次解析中存储的值
    pub fn get(&self, manager: Uuid) -> Option<Instance> {
        self.values.lock().get(&manager).cloned()
    }

    /// 存储值
    pub fn insert(&self, manager: Uuid, value: Instance) {
        self.values.lock().insert(manager, value);
    }

    /// 已存储的值数量
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 生命周期管理器看到的解析范围
///
/// `lineage` 以发起解析的容器开头，依次是它的祖先容器。
#[derive(Debug, Clone, Copy)]
pub struct LifetimeScope<'a> {
    lineage: &'a [ContainerId],
    per_resolve: &'a PerResolveStore,
}

impl<'a> LifetimeScope<'a> {
    /// 创建解析范围
    ///
    /// `lineage` 不能为空。
    pub fn new(lineage: &'a [ContainerId], per_resolve: &'a PerResolveStore) -> Self {
        debug_assert!(!lineage.is_empty());
        Self {
            lineage,
            per_resolve,
        }
    }

    /// 发起解析的容器
    pub fn container(&self) -> ContainerId {
        self.lineage[0]
    }

    /// 发起解析的容器及其祖先
    pub fn lineage(&self) -> &'a [ContainerId] {
        self.lineage
    }

    /// 本次解析的共享存储
    pub fn per_resolve(&self) -> &'a PerResolveStore {
        self.per_resolve
    }
}

/// 生命周期管理器 trait
///
/// 同一个管理器实例只能绑定到一个注册键，需要复用配置时通过
/// [`LifetimeManager::create_lifetime_manager`] 复制出新的未绑定实例。
pub trait LifetimeManager: Send + Sync + Debug {
    /// 管理器唯一标识
    fn id(&self) -> Uuid;

    /// 管理器种类
    fn kind(&self) -> LifetimeKind;

    /// 读取已缓存的值
    ///
    /// 对需要同步的管理器，返回 `Ok(None)` 表示调用方获得了构造权，
    /// 之后必须调用 [`set`](Self::set) 或 [`recover`](Self::recover)。
    /// 其他调用方会阻塞到值写入；若这次构造失败，它们收到同一个错误。
    fn try_get(&self, scope: &LifetimeScope<'_>) -> DependencyResult<Option<Instance>>;

    /// 存储新构建的值
    fn set(&self, value: Instance, scope: &LifetimeScope<'_>);

    /// 构造失败后释放构造权
    fn recover(&self, _scope: &LifetimeScope<'_>, _error: &DependencyError) {}

    /// 丢弃为某个已释放容器存储的值
    fn release_scope(&self, _container: ContainerId) {}

    /// 随所属容器一起释放
    fn dispose(&self);

    /// 复制出同种类的未绑定管理器
    fn create_lifetime_manager(&self) -> Arc<dyn LifetimeManager>;

    /// 绑定到一个注册；已经绑定过时返回 `false`
    fn bind(&self) -> bool;

    /// 是否已经绑定
    fn is_bound(&self) -> bool;
}

/// 绑定标记，供各管理器实现 `bind`/`is_bound`
#[derive(Debug, Default)]
pub struct BindingFlag(AtomicBool);

impl BindingFlag {
    /// 创建未绑定的标记
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试绑定
    pub fn try_bind(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// 是否已绑定
    pub fn is_bound(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_flag_binds_once() {
        let flag = BindingFlag::new();
        assert!(!flag.is_bound());
        assert!(flag.try_bind());
        assert!(!flag.try_bind());
        assert!(flag.is_bound());
    }

    #[test]
    fn scope_exposes_resolving_container_first() {
        let store = PerResolveStore::new();
        let ids = [Uuid::new_v4(), Uuid::new_v4()];
        let scope = LifetimeScope::new(&ids, &store);
        assert_eq!(scope.container(), ids[0]);
        assert_eq!(scope.lineage().len(), 2);
    }
}
