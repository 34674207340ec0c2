//! # Infrastructure Common
//!
//! 这个 crate 提供了 Lorn IoC 容器各层共用的基础类型。
//!
//! ## 核心类型
//!
//! - [`DependencyError`] - 解析、注册、生命周期相关的统一错误
//! - [`TypeInfo`] / [`BuildKey`] - 注册键（类型 + 可选名称）
//! - [`LifetimeKind`] - 生命周期管理器种类
//! - [`ContainerState`] - 容器生命周期状态

pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
