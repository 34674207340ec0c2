//! 内置构建策略

mod creation;
mod enumerable;
mod initialization;
mod lifetime;
mod mapping;
mod plan_selection;

pub use creation::CreationStrategy;
pub use enumerable::EnumerableStrategy;
pub use initialization::InitializationStrategy;
pub use lifetime::LifetimeStrategy;
pub use mapping::TypeMappingStrategy;
pub use plan_selection::PlanSelectionStrategy;

use crate::strategy::{BuildStage, StagedStrategyChain};
use std::sync::Arc;

/// 安装内置策略
pub fn install_defaults(chain: &StagedStrategyChain) {
    chain.add(BuildStage::Enumerable, Arc::new(EnumerableStrategy));
    chain.add(BuildStage::Lifetime, Arc::new(LifetimeStrategy));
    chain.add(BuildStage::TypeMapping, Arc::new(TypeMappingStrategy));
    chain.add(BuildStage::PreCreation, Arc::new(PlanSelectionStrategy));
    chain.add(BuildStage::Creation, Arc::new(CreationStrategy));
    chain.add(BuildStage::Initialization, Arc::new(InitializationStrategy));
}
