//! 依赖注入容器实现

use crate::context::ResolveSession;
use crate::lifetime;
use crate::plan_cache::{BuildPlan, BuildPlanCache};
use crate::policy::PolicyRegistry;
use crate::strategies;
use crate::strategy::{BuildStage, BuilderStrategy, StagedStrategyChain};
use di_abstractions::{
    CircularDependencyDetector, ContainerConfig, ContainerId, ContainerStats, DefaultCircularDependencyDetector,
    DependencyGraphNode, DiContainer, Injectable, Instance, LifetimeManager, LifetimePolicy, LifetimeScope,
    MemberPlan, PerResolveStore, Policy, Registration, TypeMapping,
};
use infrastructure_common::{BuildKey, ContainerState, DependencyError, DependencyResult, LifetimeKind, TypeInfo};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 运行时计数器
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    resolutions: AtomicU64,
    constructions: AtomicU64,
    errors: AtomicU64,
    total_time_us: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_construction(&self) {
        self.constructions.fetch_add(1, Ordering::Relaxed);
    }

    fn record_resolution(&self, elapsed: Option<Duration>, succeeded: bool) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(elapsed) = elapsed {
            let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
            self.total_time_us.fetch_add(micros, Ordering::Relaxed);
        }
    }
}

/// 容器内部状态，由容器句柄和子容器共享
pub(crate) struct ContainerCore {
    id: ContainerId,
    lineage: Vec<ContainerId>,
    parent: Option<Arc<ContainerCore>>,
    config: ContainerConfig,
    policies: Arc<PolicyRegistry>,
    strategies: Arc<StagedStrategyChain>,
    plans: BuildPlanCache,
    stats: StatsCounters,
    state: AtomicU8,
    gate: RwLock<()>,
    children: Mutex<Vec<Weak<ContainerCore>>>,
    owned: Mutex<Vec<Arc<dyn LifetimeManager>>>,
}

impl ContainerCore {
    fn root(config: ContainerConfig) -> Self {
        let id = Uuid::new_v4();
        let policies = Arc::new(PolicyRegistry::new());
        let strategies = Arc::new(StagedStrategyChain::new(policies.epoch_handle()));
        strategies::install_defaults(&strategies);
        Self {
            id,
            lineage: vec![id],
            parent: None,
            config,
            policies,
            strategies,
            plans: BuildPlanCache::new(),
            stats: StatsCounters::default(),
            state: AtomicU8::new(ContainerState::Active.as_u8()),
            gate: RwLock::new(()),
            children: Mutex::new(Vec::new()),
            owned: Mutex::new(Vec::new()),
        }
    }

    fn child(parent: &Arc<ContainerCore>) -> Self {
        let id = Uuid::new_v4();
        let mut lineage = Vec::with_capacity(parent.lineage.len() + 1);
        lineage.push(id);
        lineage.extend_from_slice(&parent.lineage);
        Self {
            id,
            lineage,
            parent: Some(parent.clone()),
            config: parent.config.clone(),
            policies: parent.policies.create_child(),
            strategies: parent.strategies.create_child(),
            plans: BuildPlanCache::new(),
            stats: StatsCounters::default(),
            state: AtomicU8::new(ContainerState::Active.as_u8()),
            gate: RwLock::new(()),
            children: Mutex::new(Vec::new()),
            owned: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn lineage(&self) -> &[ContainerId] {
        &self.lineage
    }

    pub(crate) fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub(crate) fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    pub(crate) fn stats(&self) -> &StatsCounters {
        &self.stats
    }

    fn state(&self) -> ContainerState {
        ContainerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn disposed_error(&self) -> DependencyError {
        DependencyError::ContainerDisposed {
            container_id: self.id.to_string(),
        }
    }

    fn ensure_active(&self) -> DependencyResult<()> {
        if self.state().is_active() {
            Ok(())
        } else {
            Err(self.disposed_error())
        }
    }

    /// 进入解析；释放开始后拒绝新的解析
    fn enter(&self) -> DependencyResult<RwLockReadGuard<'_, ()>> {
        self.ensure_active()?;
        // 解析中的工厂可能再次进入容器，使用可重入读锁
        let gate = self.gate.read_recursive();
        self.ensure_active()?;
        Ok(gate)
    }

    pub(crate) fn plan_for(&self, key: &BuildKey) -> Arc<BuildPlan> {
        if !self.config.enable_plan_cache {
            return Arc::new(self.compile_plan(key));
        }
        let epoch = self.policies.epoch();
        self.plans.get_or_compile(key, epoch, || self.compile_plan(key))
    }

    fn compile_plan(&self, key: &BuildKey) -> BuildPlan {
        let lifetime = self
            .policies
            .get::<LifetimePolicy>(key)
            .map(|policy| policy.manager().clone());
        let mapping = self.mapping_for(key);
        let member_plan = self.member_plan_for(key);

        let plan = BuildPlan::new(key.clone(), lifetime, mapping, member_plan);
        let applicable: Vec<Arc<dyn BuilderStrategy>> = self
            .strategies
            .strategies()
            .into_iter()
            .filter(|strategy| strategy.is_applicable(&plan))
            .collect();
        debug!("编译构建计划: {} ({} 个策略)", key, applicable.len());
        plan.with_strategies(applicable)
    }

    /// 注册键的类型映射
    ///
    /// 未映射的注册记录遮蔽更远祖先上的映射。
    fn mapping_for(&self, key: &BuildKey) -> Option<Arc<TypeMapping>> {
        let (mapping, mapped_at) = self.policies.get_with_origin::<TypeMapping>(key)?;
        match self.policies.get_with_origin::<Registration>(key) {
            Some((registration, registered_at))
                if registration.mapped_to.is_none() && registered_at.depth() < mapped_at.depth() =>
            {
                None
            }
            _ => Some(mapping),
        }
    }

    /// 命名注册没有自己的成员计划时使用类型默认计划
    fn member_plan_for(&self, key: &BuildKey) -> Option<Arc<MemberPlan>> {
        self.policies.get::<MemberPlan>(key).or_else(|| {
            if key.is_default() {
                None
            } else {
                self.policies.get::<MemberPlan>(&key.type_default())
            }
        })
    }

    fn execute(&self, key: &BuildKey, existing: Option<Instance>) -> DependencyResult<Instance> {
        let _gate = self.enter()?;
        let started = self.config.enable_performance_monitoring.then(Instant::now);

        let session = ResolveSession::new(self);
        let result = session.build(key, existing);

        self.stats
            .record_resolution(started.map(|started| started.elapsed()), result.is_ok());
        if let Err(error) = &result {
            warn!("解析失败: {}: {}", key, error);
        }
        result
    }

    fn attach_manager(&self, key: &BuildKey, manager: Arc<dyn LifetimeManager>) -> DependencyResult<()> {
        if !manager.bind() {
            return Err(DependencyError::LifetimeManagerInUse {
                type_name: key.to_string(),
                manager: manager.kind().to_string(),
            });
        }
        let previous = self.policies.set(key.clone(), LifetimePolicy::new(manager.clone()));
        {
            let mut owned = self.owned.lock();
            if let Some(previous) = &previous {
                owned.retain(|owned| owned.id() != previous.manager().id());
            }
            owned.push(manager);
        }
        // 被替换的管理器不再可达，随即释放它缓存的值
        if let Some(previous) = previous {
            debug!("替换生命周期管理器: {} ({})", key, previous.manager().kind());
            previous.manager().dispose();
        }
        Ok(())
    }

    /// 瞬时注册同样绑定管理器，以遮蔽祖先的生命周期策略
    fn apply_lifetime(&self, key: &BuildKey, kind: LifetimeKind) -> DependencyResult<()> {
        self.attach_manager(key, lifetime::from_kind(kind, self.config.default_pool_capacity))
    }

    fn record(&self, key: &BuildKey, kind: LifetimeKind, mapped_to: Option<BuildKey>) {
        self.policies
            .set(key.clone(), Registration::new(key.clone(), kind, mapped_to));
    }

    fn is_buildable(&self, key: &BuildKey) -> bool {
        key.type_info().is_enumerable()
            || self.mapping_for(key).is_some()
            || self.policies.contains::<LifetimePolicy>(key)
            || self
                .member_plan_for(key)
                .is_some_and(|plan| plan.construction().is_some())
    }

    fn live_children(&self) -> Vec<Arc<ContainerCore>> {
        let mut children = self.children.lock();
        children.retain(|child| child.strong_count() > 0);
        children.iter().filter_map(Weak::upgrade).collect()
    }

    fn dispose(&self) {
        if self
            .state
            .compare_exchange(
                ContainerState::Active.as_u8(),
                ContainerState::Disposing.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }
        info!("释放容器: {}", self.id);

        let children: Vec<_> = self
            .children
            .lock()
            .drain(..)
            .filter_map(|child| child.upgrade())
            .collect();
        for child in children {
            child.dispose();
        }

        // 等待进行中的解析结束
        let _gate = self.gate.write();
        let owned: Vec<_> = self.owned.lock().drain(..).collect();
        for manager in &owned {
            manager.dispose();
        }
        for policy in self.policies.all::<LifetimePolicy>() {
            policy.manager().release_scope(self.id);
        }
        self.plans.clear();
        self.state.store(ContainerState::Disposed.as_u8(), Ordering::Release);
        info!("容器已释放: {} (释放 {} 个生命周期管理器)", self.id, owned.len());
    }
}

/// 依赖注入容器
///
/// 句柄可以廉价克隆，克隆出的句柄指向同一个容器。
#[derive(Clone)]
pub struct DiContainerImpl {
    core: Arc<ContainerCore>,
}

impl DiContainerImpl {
    /// 使用默认配置创建根容器
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// 使用指定配置创建根容器
    pub fn with_config(config: ContainerConfig) -> Self {
        let core = ContainerCore::root(config);
        info!("创建容器: {}", core.id);
        Self { core: Arc::new(core) }
    }

    /// 容器标识
    pub fn id(&self) -> ContainerId {
        self.core.id
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.core.config
    }

    /// 容器状态
    pub fn state(&self) -> ContainerState {
        self.core.state()
    }

    /// 策略注册表
    pub fn policies(&self) -> &Arc<PolicyRegistry> {
        &self.core.policies
    }

    /// 读取策略（包括祖先容器）
    pub fn get_policy<P: Policy>(&self, key: &BuildKey) -> Option<Arc<P>> {
        self.core.policies.get::<P>(key)
    }

    /// 在本容器写入策略
    pub fn set_policy<P: Policy>(&self, key: BuildKey, policy: P) -> DependencyResult<()> {
        self.core.ensure_active()?;
        self.core.policies.set(key, policy);
        Ok(())
    }

    /// 删除本容器的策略
    pub fn clear_policy<P: Policy>(&self, key: &BuildKey) -> bool {
        self.core.policies.clear::<P>(key)
    }

    /// 在本容器的策略链上添加策略
    pub fn add_strategy(&self, stage: BuildStage, strategy: Arc<dyn BuilderStrategy>) -> DependencyResult<()> {
        self.core.ensure_active()?;
        self.core.strategies.add(stage, strategy);
        Ok(())
    }

    /// 设置成员计划，注册键取计划的目标类型
    pub fn set_member_plan(&self, name: Option<&str>, plan: MemberPlan) -> DependencyResult<()> {
        self.core.ensure_active()?;
        let key = BuildKey::new(plan.target().clone(), name);
        self.core.policies.set(key, plan);
        Ok(())
    }

    /// 注册自带成员计划的类型
    pub fn register_type<T: Injectable>(&self, name: Option<&str>, lifetime: LifetimeKind) -> DependencyResult<()> {
        self.register_plan(name, T::member_plan(), lifetime)
    }

    /// 使用成员计划注册类型
    pub fn register_plan(&self, name: Option<&str>, plan: MemberPlan, lifetime: LifetimeKind) -> DependencyResult<()> {
        self.core.ensure_active()?;
        let key = BuildKey::new(plan.target().clone(), name);
        info!("注册组件: {} ({})", key, lifetime);

        self.core.policies.clear::<TypeMapping>(&key);
        self.core.policies.set(key.clone(), plan);
        self.core.apply_lifetime(&key, lifetime)?;
        self.core.record(&key, lifetime, None);
        Ok(())
    }

    /// 注册接口到实现的映射
    ///
    /// 实现类型在整条链上都没有成员计划时，把它的计划登记为类型默认计划。
    pub fn register_mapping<I, C, F>(&self, name: Option<&str>, lifetime: LifetimeKind, upcast: F) -> DependencyResult<()>
    where
        I: ?Sized + Send + Sync + 'static,
        C: Injectable,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        self.core.ensure_active()?;
        let key = BuildKey::new(TypeInfo::of::<I>(), name);
        let mapping = TypeMapping::new::<I, C, F>(name, upcast);
        let target = mapping.target().clone();
        info!("注册映射: {} -> {} ({})", key, target, lifetime);

        if self.core.member_plan_for(&target).is_none() {
            self.core.policies.set(BuildKey::of::<C>(), C::member_plan());
        }
        self.core.policies.clear::<MemberPlan>(&key);
        self.core.policies.set(key.clone(), mapping);
        self.core.apply_lifetime(&key, lifetime)?;
        self.core.record(&key, lifetime, Some(target));
        Ok(())
    }

    /// 把一个注册键重定向到另一个注册键
    pub fn register_redirect(&self, key: BuildKey, target: BuildKey, lifetime: LifetimeKind) -> DependencyResult<()> {
        self.core.ensure_active()?;
        info!("注册重定向: {} -> {} ({})", key, target, lifetime);
        self.core.policies.clear::<MemberPlan>(&key);
        self.core.policies.set(key.clone(), TypeMapping::redirect(target.clone()));
        self.core.apply_lifetime(&key, lifetime)?;
        self.core.record(&key, lifetime, Some(target));
        Ok(())
    }

    /// 注册已有实例
    ///
    /// 只接受 `ContainerControlled`、`Hierarchical` 和 `ExternallyControlled`。
    pub fn register_instance<T>(&self, name: Option<&str>, instance: Arc<T>, lifetime: LifetimeKind) -> DependencyResult<()>
    where
        T: Send + Sync + 'static,
    {
        let key = BuildKey::new(TypeInfo::of::<T>(), name);
        self.store_instance(key, Instance::from_arc(instance), lifetime)
    }

    /// 注册已有的 trait 对象
    ///
    /// trait 对象外面包了一层容器自己的 `Arc`，弱引用无法跟踪调用方持有的对象，
    /// 因此不接受 `ExternallyControlled`。
    pub fn register_dyn_instance<I>(&self, name: Option<&str>, instance: Arc<I>, lifetime: LifetimeKind) -> DependencyResult<()>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let key = BuildKey::new(TypeInfo::of::<I>(), name);
        if lifetime == LifetimeKind::ExternallyControlled {
            return Err(DependencyError::registration_error(
                key.to_string(),
                "trait 对象实例不支持外部控制的生命周期",
            ));
        }
        self.store_instance(key, Instance::from_dyn(instance), lifetime)
    }

    fn store_instance(&self, key: BuildKey, instance: Instance, lifetime: LifetimeKind) -> DependencyResult<()> {
        self.core.ensure_active()?;
        if !matches!(
            lifetime,
            LifetimeKind::ContainerControlled | LifetimeKind::Hierarchical | LifetimeKind::ExternallyControlled
        ) {
            return Err(DependencyError::registration_error(
                key.to_string(),
                format!("实例注册不支持 {lifetime}"),
            ));
        }
        info!("注册实例: {} ({})", key, lifetime);

        let manager = lifetime::from_kind(lifetime, self.core.config.default_pool_capacity);
        let per_resolve = PerResolveStore::new();
        manager.set(instance, &LifetimeScope::new(&self.core.lineage, &per_resolve));

        self.core.policies.clear::<TypeMapping>(&key);
        self.core.attach_manager(&key, manager)?;
        self.core.record(&key, lifetime, None);
        Ok(())
    }

    /// 创建子容器
    pub fn create_child_container(&self) -> DependencyResult<DiContainerImpl> {
        self.core.ensure_active()?;
        let child = Arc::new(ContainerCore::child(&self.core));
        self.core.children.lock().push(Arc::downgrade(&child));
        info!("创建子容器: {} (父容器 {})", child.id, self.core.id);
        Ok(Self { core: child })
    }

    /// 父容器
    pub fn parent(&self) -> Option<DiContainerImpl> {
        self.core.parent.clone().map(|core| Self { core })
    }

    /// 缓存的构建计划数量
    pub fn cached_plans(&self) -> usize {
        self.core.plans.len()
    }

    fn validation_keys(&self) -> Vec<BuildKey> {
        let policies = &self.core.policies;
        let mut seen = HashSet::new();
        policies
            .visible::<Registration>()
            .into_iter()
            .map(|(key, _)| key)
            .chain(policies.visible::<MemberPlan>().into_iter().map(|(key, _)| key))
            .chain(policies.visible::<TypeMapping>().into_iter().map(|(key, _)| key))
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }

    /// 依赖指向的实际注册：命名键没有任何策略时回退到类型默认注册
    fn canonical(&self, key: &BuildKey) -> BuildKey {
        if self.core.policies.contains_key(key) {
            key.clone()
        } else {
            key.type_default()
        }
    }
}

impl Default for DiContainerImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DiContainerImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiContainerImpl")
            .field("id", &self.core.id)
            .field("depth", &(self.core.lineage.len() - 1))
            .field("state", &self.core.state())
            .field("registrations", &self.core.policies.len())
            .finish()
    }
}

impl DiContainer for DiContainerImpl {
    fn resolve_key(&self, key: &BuildKey) -> DependencyResult<Instance> {
        self.core.execute(key, None)
    }

    fn build_up_key(&self, key: &BuildKey, existing: Instance) -> DependencyResult<Instance> {
        self.core.execute(key, Some(existing))
    }

    fn register_lifetime_manager(&self, key: &BuildKey, manager: Arc<dyn LifetimeManager>) -> DependencyResult<()> {
        self.core.ensure_active()?;
        let kind = manager.kind();
        info!("注册生命周期管理器: {} ({})", key, kind);
        self.core.attach_manager(key, manager)?;

        let mapped_to = self
            .core
            .policies
            .get::<Registration>(key)
            .and_then(|registration| registration.mapped_to.clone());
        self.core.record(key, kind, mapped_to);
        Ok(())
    }

    fn is_registered_key(&self, key: &BuildKey) -> bool {
        self.core.policies.contains_key(key)
    }

    fn registrations(&self) -> Vec<Registration> {
        let mut registrations: Vec<Registration> = self
            .core
            .policies
            .visible::<Registration>()
            .into_iter()
            .map(|(_, registration)| registration.as_ref().clone())
            .collect();
        registrations.sort_by_key(|registration| registration.registered_at);
        registrations
    }

    fn validate(&self) -> Result<(), Vec<DependencyError>> {
        info!("验证容器注册: {}", self.core.id);
        let mut errors = Vec::new();
        let mut graph = Vec::new();

        for key in self.validation_keys() {
            let dependencies = if let Some(mapping) = self.core.mapping_for(&key) {
                let target = mapping.target().clone();
                if !self.core.is_buildable(&target) {
                    errors.push(DependencyError::registration_error(
                        key.to_string(),
                        format!("映射目标无法构造: {target}"),
                    ));
                }
                vec![target]
            } else if let Some(plan) = self.core.member_plan_for(&key) {
                let dependencies = plan.dependencies();
                for dependency in &dependencies {
                    if !self.core.is_buildable(dependency) {
                        errors.push(DependencyError::registration_error(
                            key.to_string(),
                            format!("依赖未注册: {dependency}"),
                        ));
                    }
                }
                dependencies
            } else {
                Vec::new()
            };

            graph.push(DependencyGraphNode {
                key,
                dependencies: dependencies.iter().map(|dependency| self.canonical(dependency)).collect(),
            });
        }

        errors.extend(DefaultCircularDependencyDetector.detect_circular_dependencies(&graph));
        if errors.is_empty() {
            Ok(())
        } else {
            warn!("容器验证失败: {} 个问题", errors.len());
            Err(errors)
        }
    }

    fn dispose(&self) {
        self.core.dispose();
    }

    fn stats(&self) -> ContainerStats {
        let counters = &self.core.stats;
        let resolutions = counters.resolutions.load(Ordering::Relaxed);
        let total_time_us = counters.total_time_us.load(Ordering::Relaxed);
        ContainerStats {
            registered_components: self.core.policies.local::<Registration>().len(),
            resolutions,
            constructions: counters.constructions.load(Ordering::Relaxed),
            resolution_errors: counters.errors.load(Ordering::Relaxed),
            plan_cache_hits: self.core.plans.hits(),
            plan_cache_misses: self.core.plans.misses(),
            total_resolution_time_ms: total_time_us / 1000,
            average_resolution_time_ms: if resolutions == 0 {
                0.0
            } else {
                total_time_us as f64 / 1000.0 / resolutions as f64
            },
            child_containers: self.core.live_children().len(),
        }
    }
}
