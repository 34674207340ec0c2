//! 分层策略注册表
//!
//! 每个容器持有自己的注册表，读取时沿父链回退，写入只落在自己的存储里。

use di_abstractions::Policy;
use infrastructure_common::{BuildKey, TypeInfo};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type PolicyObject = Arc<dyn Any + Send + Sync>;

/// 策略的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOrigin {
    /// 当前容器自己的条目
    Local,
    /// 从祖先容器继承，`depth` 为向上的层数
    Inherited { depth: usize },
}

impl PolicyOrigin {
    /// 距离当前容器的层数，本地条目为 0
    pub fn depth(self) -> usize {
        match self {
            Self::Local => 0,
            Self::Inherited { depth } => depth,
        }
    }
}

/// 策略注册表
#[derive(Debug)]
pub struct PolicyRegistry {
    parent: Option<Arc<PolicyRegistry>>,
    policies: RwLock<HashMap<BuildKey, HashMap<TypeId, PolicyObject>>>,
    epoch: Arc<AtomicU64>,
}

impl PolicyRegistry {
    /// 创建根注册表
    pub fn new() -> Self {
        Self {
            parent: None,
            policies: RwLock::new(HashMap::new()),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 创建子注册表，与父注册表共享修改计数
    pub fn create_child(self: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(self.clone()),
            policies: RwLock::new(HashMap::new()),
            epoch: self.epoch.clone(),
        })
    }

    /// 父注册表
    pub fn parent(&self) -> Option<&Arc<PolicyRegistry>> {
        self.parent.as_ref()
    }

    /// 整棵容器树的修改计数
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub(crate) fn epoch_handle(&self) -> Arc<AtomicU64> {
        self.epoch.clone()
    }

    fn touch(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// 写入策略，返回本容器中被替换的旧值
    pub fn set<P: Policy>(&self, key: BuildKey, policy: P) -> Option<Arc<P>> {
        let previous = self
            .policies
            .write()
            .entry(key)
            .or_default()
            .insert(TypeId::of::<P>(), Arc::new(policy));
        self.touch();
        previous.and_then(|old| old.downcast::<P>().ok())
    }

    /// 读取策略，本容器没有时回退到祖先
    pub fn get<P: Policy>(&self, key: &BuildKey) -> Option<Arc<P>> {
        self.get_with_origin::<P>(key).map(|(policy, _)| policy)
    }

    /// 只读取本容器的策略
    pub fn get_local<P: Policy>(&self, key: &BuildKey) -> Option<Arc<P>> {
        let policies = self.policies.read();
        policies
            .get(key)
            .and_then(|entries| entries.get(&TypeId::of::<P>()))
            .and_then(|policy| policy.clone().downcast::<P>().ok())
    }

    /// 读取策略并给出来源
    pub fn get_with_origin<P: Policy>(&self, key: &BuildKey) -> Option<(Arc<P>, PolicyOrigin)> {
        let mut depth = 0;
        let mut current = Some(self);
        while let Some(registry) = current {
            // 每次只持有一个注册表的读锁
            if let Some(policy) = registry.get_local::<P>(key) {
                let origin = if depth == 0 {
                    PolicyOrigin::Local
                } else {
                    PolicyOrigin::Inherited { depth }
                };
                return Some((policy, origin));
            }
            depth += 1;
            current = registry.parent.as_deref();
        }
        None
    }

    /// 是否存在某种策略（包括祖先）
    pub fn contains<P: Policy>(&self, key: &BuildKey) -> bool {
        self.get::<P>(key).is_some()
    }

    /// 注册键在整条链上是否有任何策略
    pub fn contains_key(&self, key: &BuildKey) -> bool {
        let mut current = Some(self);
        while let Some(registry) = current {
            if registry.policies.read().get(key).is_some_and(|entries| !entries.is_empty()) {
                return true;
            }
            current = registry.parent.as_deref();
        }
        false
    }

    /// 删除本容器的某种策略，祖先的条目不受影响
    pub fn clear<P: Policy>(&self, key: &BuildKey) -> bool {
        let removed = {
            let mut policies = self.policies.write();
            let removed = policies
                .get_mut(key)
                .and_then(|entries| entries.remove(&TypeId::of::<P>()))
                .is_some();
            if policies.get(key).is_some_and(HashMap::is_empty) {
                policies.remove(key);
            }
            removed
        };
        if removed {
            self.touch();
        }
        removed
    }

    /// 删除本容器中该注册键的全部策略
    pub fn clear_all(&self, key: &BuildKey) -> bool {
        let removed = self.policies.write().remove(key).is_some();
        if removed {
            self.touch();
        }
        removed
    }

    /// 整条链上可见的某种策略，近处的条目遮蔽祖先的同键条目
    pub fn visible<P: Policy>(&self) -> Vec<(BuildKey, Arc<P>)> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut current = Some(self);
        while let Some(registry) = current {
            for (key, policy) in registry.local::<P>() {
                if seen.insert(key.clone()) {
                    result.push((key, policy));
                }
            }
            current = registry.parent.as_deref();
        }
        result
    }

    /// 整条链上的某种策略，包括被遮蔽的条目
    pub fn all<P: Policy>(&self) -> Vec<Arc<P>> {
        let mut result = Vec::new();
        let mut current = Some(self);
        while let Some(registry) = current {
            result.extend(registry.local::<P>().into_iter().map(|(_, policy)| policy));
            current = registry.parent.as_deref();
        }
        result
    }

    /// 本容器中的某种策略
    pub fn local<P: Policy>(&self) -> Vec<(BuildKey, Arc<P>)> {
        let capability = TypeId::of::<P>();
        self.policies
            .read()
            .iter()
            .filter_map(|(key, entries)| {
                entries
                    .get(&capability)
                    .and_then(|policy| policy.clone().downcast::<P>().ok())
                    .map(|policy| (key.clone(), policy))
            })
            .collect()
    }

    /// 某个类型下带有指定策略的全部可见注册键
    ///
    /// 默认注册排在最前，命名注册按名称排序。
    pub fn keys_with<P: Policy>(&self, type_info: &TypeInfo) -> Vec<BuildKey> {
        let mut keys: Vec<BuildKey> = self
            .visible::<P>()
            .into_iter()
            .map(|(key, _)| key)
            .filter(|key| key.type_info() == type_info)
            .collect();
        keys.sort_by(|a, b| a.name().cmp(&b.name()));
        keys
    }

    /// 本容器中有策略的注册键数量
    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    /// 本容器是否没有任何策略
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 清空本容器的全部策略
    pub fn clear_local(&self) {
        self.policies.write().clear();
        self.touch();
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
