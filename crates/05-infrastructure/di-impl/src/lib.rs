//! # 依赖注入具体实现
//!
//! 提供解析引擎：生命周期管理器、分层策略注册表、分阶段的策略管线、
//! 构建计划缓存，以及组合它们的 [`DiContainerImpl`]。
//!
//! ## 解析流程
//!
//! 每次顶层 `resolve`/`build_up` 创建一次解析会话。每个注册键先取得
//! （或编译）构建计划，然后按阶段顺序执行策略的前置动作，再按相反顺序
//! 执行后置动作。生命周期命中缓存时直接进入后置阶段。

pub mod container;
pub mod context;
pub mod lifetime;
mod pipeline;
pub mod plan_cache;
pub mod policy;
pub mod strategies;
pub mod strategy;

pub use container::DiContainerImpl;
pub use context::BuildContext;
pub use lifetime::{
    ContainerControlledLifetimeManager, ExternallyControlledLifetimeManager, HierarchicalLifetimeManager,
    PerResolveLifetimeManager, PooledLifetimeManager, TransientLifetimeManager,
};
pub use plan_cache::{BuildPlan, BuildPlanCache};
pub use policy::{PolicyOrigin, PolicyRegistry};
pub use strategy::{BuildStage, BuilderStrategy, StagedStrategyChain};
