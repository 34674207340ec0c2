//! 构建上下文
//!
//! 一次顶层 `resolve`/`build_up` 创建一个 [`ResolveSession`]，
//! 其中的构造栈用于检测循环依赖，单次解析存储供 PerResolve 生命周期使用。
//! 每个注册键的构建各有一个 [`BuildContext`]，在管线的各个策略之间传递。

use crate::container::ContainerCore;
use crate::pipeline;
use crate::plan_cache::BuildPlan;
use crate::policy::PolicyRegistry;
use di_abstractions::{
    ContainerConfig, Instance, LifetimeManager, LifetimeScope, MemberPlan, ParameterSource, Parameters,
    PerResolveStore,
};
use infrastructure_common::{BuildKey, DependencyError, DependencyResult};
use std::cell::RefCell;
use std::sync::Arc;

/// 一次顶层解析调用的共享状态
pub(crate) struct ResolveSession<'a> {
    core: &'a ContainerCore,
    stack: RefCell<Vec<BuildKey>>,
    per_resolve: PerResolveStore,
}

impl<'a> ResolveSession<'a> {
    pub(crate) fn new(core: &'a ContainerCore) -> Self {
        Self {
            core,
            stack: RefCell::new(Vec::new()),
            per_resolve: PerResolveStore::new(),
        }
    }

    pub(crate) fn core(&self) -> &'a ContainerCore {
        self.core
    }

    /// 构建注册键
    pub(crate) fn build(&self, key: &BuildKey, existing: Option<Instance>) -> DependencyResult<Instance> {
        pipeline::execute(self, key, existing)
    }

    /// 检查深度和循环后把注册键压入构造栈
    pub(crate) fn enter(&self, key: &BuildKey) -> DependencyResult<()> {
        let mut stack = self.stack.borrow_mut();
        let max_depth = self.core.config().max_resolution_depth;
        if stack.len() >= max_depth {
            return Err(DependencyError::ResolutionDepthExceeded {
                type_name: key.to_string(),
                max_depth,
            });
        }
        if stack.contains(key) {
            return Err(DependencyError::CircularDependency {
                dependency_chain: Self::format_chain(stack.iter().chain(std::iter::once(key))),
            });
        }
        stack.push(key.clone());
        Ok(())
    }

    pub(crate) fn leave(&self) {
        self.stack.borrow_mut().pop();
    }

    /// 当前构造栈深度
    pub(crate) fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    /// 给错误附加解析链
    ///
    /// 已经带有解析链的错误原样返回，最内层失败的帧负责包装。
    pub(crate) fn locate(&self, key: &BuildKey, error: DependencyError, pushed: bool) -> DependencyError {
        if error.is_located() {
            return error;
        }
        let stack = self.stack.borrow();
        let chain = if pushed {
            Self::format_chain(stack.iter())
        } else {
            Self::format_chain(stack.iter().chain(std::iter::once(key)))
        };
        DependencyError::ResolutionFailed {
            type_name: key.to_string(),
            chain,
            source: Box::new(error),
        }
    }

    fn format_chain<'k>(keys: impl Iterator<Item = &'k BuildKey>) -> String {
        keys.map(ToString::to_string).collect::<Vec<_>>().join(" -> ")
    }

    pub(crate) fn plan_for(&self, key: &BuildKey) -> Arc<BuildPlan> {
        self.core.plan_for(key)
    }

    fn scope(&self) -> LifetimeScope<'_> {
        LifetimeScope::new(self.core.lineage(), &self.per_resolve)
    }
}

/// 单个注册键的构建上下文
pub struct BuildContext<'a> {
    session: &'a ResolveSession<'a>,
    key: BuildKey,
    plan: Arc<BuildPlan>,
    existing: Option<Instance>,
    value: Option<Instance>,
    selected: Option<Arc<MemberPlan>>,
    complete: bool,
    guard: Option<Arc<dyn LifetimeManager>>,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(
        session: &'a ResolveSession<'a>,
        key: BuildKey,
        plan: Arc<BuildPlan>,
        existing: Option<Instance>,
    ) -> Self {
        Self {
            session,
            key,
            plan,
            value: existing.clone(),
            existing,
            selected: None,
            complete: false,
            guard: None,
        }
    }

    /// 正在构建的注册键
    pub fn key(&self) -> &BuildKey {
        &self.key
    }

    /// 构建计划
    pub fn plan(&self) -> &BuildPlan {
        &self.plan
    }

    pub(crate) fn plan_handle(&self) -> Arc<BuildPlan> {
        self.plan.clone()
    }

    /// build-up 时调用方提供的实例
    pub fn existing(&self) -> Option<&Instance> {
        self.existing.as_ref()
    }

    /// 是否为 build-up
    pub fn is_build_up(&self) -> bool {
        self.existing.is_some()
    }

    /// 当前的构建结果
    pub fn value(&self) -> Option<&Instance> {
        self.value.as_ref()
    }

    /// 设置构建结果
    pub fn set_value(&mut self, value: Instance) {
        self.value = Some(value);
    }

    /// 标记构建完成，结束前置阶段
    pub fn complete(&mut self) {
        self.complete = true;
    }

    /// 是否已完成
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// 选中的成员计划
    pub fn member_plan(&self) -> Option<&Arc<MemberPlan>> {
        self.selected.as_ref()
    }

    /// 选定成员计划
    pub fn select_member_plan(&mut self, plan: Arc<MemberPlan>) {
        self.selected = Some(plan);
    }

    /// 发起解析的容器的策略注册表
    pub fn policies(&self) -> &PolicyRegistry {
        self.session.core().policies()
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        self.session.core().config()
    }

    /// 生命周期管理器看到的解析范围
    pub fn lifetime_scope(&self) -> LifetimeScope<'_> {
        self.session.scope()
    }

    /// 构造栈深度（包括当前注册键）
    pub fn depth(&self) -> usize {
        self.session.depth()
    }

    /// 在同一次解析中构建另一个注册键
    pub fn build(&self, key: &BuildKey, existing: Option<Instance>) -> DependencyResult<Instance> {
        self.session.build(key, existing)
    }

    /// 解析依赖
    pub fn resolve(&self, key: &BuildKey) -> DependencyResult<Instance> {
        self.build(key, None)
    }

    /// 解析可选依赖，根本原因为未注册时返回 `None`
    pub fn resolve_optional(&self, key: &BuildKey) -> DependencyResult<Option<Instance>> {
        match self.resolve(key) {
            Ok(instance) => Ok(Some(instance)),
            Err(error) if error.is_missing_registration() => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// 按参数来源依次解析参数
    pub fn resolve_parameters(&self, sources: &[ParameterSource]) -> DependencyResult<Parameters> {
        let values = sources
            .iter()
            .map(|source| match source {
                ParameterSource::Dependency(key) => self.resolve(key).map(Some),
                ParameterSource::Optional(key) => self.resolve_optional(key),
                ParameterSource::Value(instance) => Ok(Some(instance.clone())),
            })
            .collect::<DependencyResult<Vec<_>>>()?;
        Ok(Parameters::new(values))
    }

    /// 记录一次实际构造
    pub(crate) fn record_construction(&self) {
        self.session.core().stats().record_construction();
    }

    /// 持有生命周期管理器的构造权
    pub(crate) fn hold_guard(&mut self, manager: Arc<dyn LifetimeManager>) {
        self.guard = Some(manager);
    }

    /// 取回构造权，写入值之后调用
    pub(crate) fn release_guard(&mut self) -> Option<Arc<dyn LifetimeManager>> {
        self.guard.take()
    }

    /// 构建失败时释放构造权，等待者收到同一个错误
    pub(crate) fn abandon_guard(&mut self, error: &DependencyError) {
        if let Some(manager) = self.guard.take() {
            manager.recover(&self.session.scope(), error);
        }
    }

    /// 取出最终结果
    pub(crate) fn take_value(&mut self) -> DependencyResult<Instance> {
        self.value.take().ok_or_else(|| DependencyError::NoConstructionPlan {
            type_name: self.key.to_string(),
        })
    }
}
