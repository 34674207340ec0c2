//! 构建计划缓存
//!
//! 按注册键缓存"哪些策略参与构建、绑定哪个生命周期管理器"。
//! 同一个键的并发首次访问只编译一次，其余调用方阻塞并复用结果。

use crate::strategy::BuilderStrategy;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use di_abstractions::{LifetimeManager, MemberPlan, TypeMapping};
use infrastructure_common::BuildKey;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 某个注册键的构建计划
pub struct BuildPlan {
    key: BuildKey,
    lifetime: Option<Arc<dyn LifetimeManager>>,
    mapping: Option<Arc<TypeMapping>>,
    member_plan: Option<Arc<MemberPlan>>,
    strategies: Vec<Arc<dyn BuilderStrategy>>,
}

impl BuildPlan {
    pub(crate) fn new(
        key: BuildKey,
        lifetime: Option<Arc<dyn LifetimeManager>>,
        mapping: Option<Arc<TypeMapping>>,
        member_plan: Option<Arc<MemberPlan>>,
    ) -> Self {
        Self {
            key,
            lifetime,
            mapping,
            member_plan,
            strategies: Vec::new(),
        }
    }

    pub(crate) fn with_strategies(mut self, strategies: Vec<Arc<dyn BuilderStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// 注册键
    pub fn key(&self) -> &BuildKey {
        &self.key
    }

    /// 绑定的生命周期管理器
    pub fn lifetime(&self) -> Option<&Arc<dyn LifetimeManager>> {
        self.lifetime.as_ref()
    }

    /// 类型映射
    pub fn mapping(&self) -> Option<&TypeMapping> {
        self.mapping.as_deref()
    }

    /// 成员计划（命名注册没有自己的计划时取类型默认计划）
    pub fn member_plan(&self) -> Option<&Arc<MemberPlan>> {
        self.member_plan.as_ref()
    }

    /// 参与构建的策略，按执行顺序排列
    pub fn strategies(&self) -> &[Arc<dyn BuilderStrategy>] {
        &self.strategies
    }

    /// 是否为枚举请求
    pub fn is_enumerable(&self) -> bool {
        self.key.type_info().is_enumerable()
    }
}

impl fmt::Debug for BuildPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildPlan")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime.as_ref().map(|m| m.kind()))
            .field("mapping", &self.mapping)
            .field("has_member_plan", &self.member_plan.is_some())
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

struct PlanSlot {
    epoch: u64,
    plan: OnceCell<Arc<BuildPlan>>,
}

/// 构建计划缓存
pub struct BuildPlanCache {
    slots: DashMap<BuildKey, Arc<PlanSlot>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BuildPlanCache {
    /// 创建空缓存
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// 获取计划，缺失或早于 `epoch` 时编译
    ///
    /// 编译在分片锁之外进行。
    pub fn get_or_compile<F>(&self, key: &BuildKey, epoch: u64, compile: F) -> Arc<BuildPlan>
    where
        F: FnOnce() -> BuildPlan,
    {
        let slot = match self.slots.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().epoch < epoch {
                    entry.insert(Arc::new(PlanSlot {
                        epoch,
                        plan: OnceCell::new(),
                    }));
                }
                entry.get().clone()
            }
            Entry::Vacant(entry) => entry
                .insert(Arc::new(PlanSlot {
                    epoch,
                    plan: OnceCell::new(),
                }))
                .value()
                .clone(),
        };

        let mut compiled = false;
        let plan = slot
            .plan
            .get_or_init(|| {
                compiled = true;
                Arc::new(compile())
            })
            .clone();
        if compiled {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        plan
    }

    /// 删除某个注册键的计划
    pub fn invalidate(&self, key: &BuildKey) {
        self.slots.remove(key);
    }

    /// 清空缓存
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// 缓存的计划数量
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// 缓存是否为空
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 命中次数
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// 未命中（编译）次数
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for BuildPlanCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BuildPlanCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildPlanCache")
            .field("plans", &self.slots.len())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}
