//! 类型擦除的实例
//!
//! 容器内部统一使用 [`Instance`] 传递构建结果，类型化接口在边界上完成向下转型。

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// 擦除后的实例引用
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// 接口视图：把具体对象呈现为映射的 trait 对象
///
/// 返回值是装箱的 `Arc<dyn Trait>`，转换失败时返回 `None`。
pub type InterfaceView = Arc<dyn Fn(&AnyArc) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// 容器构建的实例
///
/// `value` 始终指向具体对象的分配，弱引用和对象同一性都以它为准。
#[derive(Clone)]
pub struct Instance {
    value: AnyArc,
    view: Option<InterfaceView>,
    type_name: &'static str,
}

impl Instance {
    /// 包装一个新值
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// 包装已有的 `Arc`
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value,
            view: None,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// 包装已有的 trait 对象
    ///
    /// trait 对象无法直接擦除为 `dyn Any`，因此再包一层 `Arc<I>`。
    pub fn from_dyn<I: ?Sized + Send + Sync + 'static>(value: Arc<I>) -> Self {
        Self {
            value: Arc::new(value),
            view: None,
            type_name: std::any::type_name::<I>(),
        }
    }

    /// 附加接口视图
    pub fn with_view(mut self, view: InterfaceView) -> Self {
        self.view = Some(view);
        self
    }

    /// 具体类型名称
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 底层擦除引用
    pub fn as_any(&self) -> &AnyArc {
        &self.value
    }

    /// 具体类型是否为 `T`
    pub fn is<T: Send + Sync + 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    /// 向下转型为具体类型
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast::<T>().ok()
    }

    /// 以 trait 对象形式取出
    pub fn downcast_dyn<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        if let Some(view) = &self.view {
            if let Some(boxed) = view(&self.value) {
                return boxed.downcast::<Arc<I>>().ok().map(|arc| *arc);
            }
        }
        self.value.downcast_ref::<Arc<I>>().cloned()
    }

    /// 两个实例是否指向同一对象
    pub fn ptr_eq(a: &Instance, b: &Instance) -> bool {
        Arc::ptr_eq(&a.value, &b.value)
    }

    /// 降级为弱引用
    pub fn downgrade(&self) -> WeakInstance {
        WeakInstance {
            value: Arc::downgrade(&self.value),
            view: self.view.clone(),
            type_name: self.type_name,
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .field("has_view", &self.view.is_some())
            .field("strong_count", &Arc::strong_count(&self.value))
            .finish()
    }
}

/// 不阻止回收的实例引用
#[derive(Clone)]
pub struct WeakInstance {
    value: Weak<dyn Any + Send + Sync>,
    view: Option<InterfaceView>,
    type_name: &'static str,
}

impl WeakInstance {
    /// 尝试恢复强引用；对象已被回收时返回 `None`
    pub fn upgrade(&self) -> Option<Instance> {
        self.value.upgrade().map(|value| Instance {
            value,
            view: self.view.clone(),
            type_name: self.type_name,
        })
    }

    /// 对象是否仍然存活
    pub fn is_alive(&self) -> bool {
        self.value.strong_count() > 0
    }
}

impl fmt::Debug for WeakInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakInstance")
            .field("type_name", &self.type_name)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// 枚举解析的结果集合
#[derive(Debug, Clone, Default)]
pub struct InstanceCollection(pub Vec<Instance>);
