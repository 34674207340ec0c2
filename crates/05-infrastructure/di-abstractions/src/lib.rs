//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义解析引擎与外部协作方之间的契约。
//!
//! ## 核心接口
//!
//! - [`DiContainer`] - 容器接口
//! - [`LifetimeManager`] - 生命周期管理器接口
//! - [`Policy`] - 策略标记，以及内置的 [`LifetimePolicy`]、[`TypeMapping`]、[`Registration`]
//! - [`MemberPlan`] - 成员选择层产出的构造/注入计划
//! - [`Instance`] - 类型擦除的实例

pub mod container;
pub mod instance;
pub mod lifetime;
pub mod plan;
pub mod policy;
pub mod registry;

pub use container::*;
pub use instance::*;
pub use lifetime::*;
pub use plan::*;
pub use policy::*;
pub use registry::*;
