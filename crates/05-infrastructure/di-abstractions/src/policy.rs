//! 策略类型
//!
//! 策略是按注册键存放的、带能力类型的对象。容器按"能力类型 + 注册键"
//! 读写策略，子容器读取时回退到祖先容器。

use crate::instance::{AnyArc, InterfaceView};
use crate::lifetime::LifetimeManager;
use crate::plan::MemberPlan;
use chrono::{DateTime, Utc};
use infrastructure_common::{BuildKey, LifetimeKind, TypeInfo};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 策略标记 trait
///
/// 能力类型即策略的具体类型，自定义策略实现此 trait 即可存入策略注册表。
pub trait Policy: Any + Send + Sync {}

impl Policy for MemberPlan {}

/// 绑定到注册键的生命周期管理器
#[derive(Debug, Clone)]
pub struct LifetimePolicy {
    manager: Arc<dyn LifetimeManager>,
}

impl LifetimePolicy {
    /// 包装生命周期管理器
    pub fn new(manager: Arc<dyn LifetimeManager>) -> Self {
        Self { manager }
    }

    /// 生命周期管理器
    pub fn manager(&self) -> &Arc<dyn LifetimeManager> {
        &self.manager
    }
}

impl Policy for LifetimePolicy {}

/// 类型映射：把请求的键重定向到另一个注册
#[derive(Clone)]
pub struct TypeMapping {
    target: BuildKey,
    view: Option<InterfaceView>,
}

impl TypeMapping {
    /// 创建映射
    ///
    /// `upcast` 把目标类型的实例转换为请求的接口类型。
    pub fn new<I, C, F>(target_name: Option<&str>, upcast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        C: Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        let view: InterfaceView = Arc::new(move |value: &AnyArc| {
            value
                .clone()
                .downcast::<C>()
                .ok()
                .map(|concrete| Box::new(upcast(concrete)) as Box<dyn Any + Send + Sync>)
        });
        Self {
            target: BuildKey::new(TypeInfo::of::<C>(), target_name),
            view: Some(view),
        }
    }

    /// 创建不改变表现形式的映射（具体类型之间的重定向）
    pub fn redirect(target: BuildKey) -> Self {
        Self {
            target,
            view: None,
        }
    }

    /// 映射目标
    pub fn target(&self) -> &BuildKey {
        &self.target
    }

    /// 接口视图
    pub fn view(&self) -> Option<&InterfaceView> {
        self.view.as_ref()
    }
}

impl fmt::Debug for TypeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMapping").field("target", &self.target).finish()
    }
}

impl Policy for TypeMapping {}

/// 注册记录
#[derive(Debug, Clone)]
pub struct Registration {
    /// 注册键
    pub key: BuildKey,
    /// 生命周期种类
    pub lifetime: LifetimeKind,
    /// 映射目标
    pub mapped_to: Option<BuildKey>,
    /// 注册时间
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    /// 创建注册记录
    pub fn new(key: BuildKey, lifetime: LifetimeKind, mapped_to: Option<BuildKey>) -> Self {
        Self {
            key,
            lifetime,
            mapped_to,
            registered_at: Utc::now(),
        }
    }
}

impl Policy for Registration {}
