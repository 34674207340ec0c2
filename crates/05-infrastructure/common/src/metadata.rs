//! 元数据定义
//!
//! 提供类型信息和注册键

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// 枚举解析请求的类型标记
///
/// `TypeInfo::enumerable_of::<T>()` 使用它生成独立的类型标识，
/// 解析结果是 `T` 的全部注册实例。
pub struct Enumerable<T: ?Sized>(PhantomData<T>);

/// 类型信息
///
/// 相等性和哈希只取决于 `TypeId`。
#[derive(Clone)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    element: Option<Arc<TypeInfo>>,
}

impl TypeInfo {
    /// 从类型获取类型信息，支持 `dyn Trait`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            element: None,
        }
    }

    /// 获取"`T` 的全部注册"请求的类型信息
    pub fn enumerable_of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<Enumerable<T>>(),
            name: std::any::type_name::<Enumerable<T>>(),
            element: Some(Arc::new(Self::of::<T>())),
        }
    }

    /// 类型ID
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// 完整类型名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }

    /// 枚举请求的元素类型
    pub fn element(&self) -> Option<&TypeInfo> {
        self.element.as_deref()
    }

    /// 是否为枚举请求
    pub fn is_enumerable(&self) -> bool {
        self.element.is_some()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 注册键：请求类型 + 可选名称
///
/// 没有名称的键是独立的"默认"注册，空字符串名称等同于默认。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildKey {
    type_info: TypeInfo,
    name: Option<String>,
}

impl BuildKey {
    /// 创建新的注册键
    pub fn new(type_info: TypeInfo, name: Option<&str>) -> Self {
        Self {
            type_info,
            name: name.filter(|n| !n.is_empty()).map(str::to_string),
        }
    }

    /// 类型 `T` 的默认注册键
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeInfo::of::<T>(), None)
    }

    /// 类型 `T` 的命名注册键
    pub fn named<T: ?Sized + 'static>(name: &str) -> Self {
        Self::new(TypeInfo::of::<T>(), Some(name))
    }

    /// 类型信息
    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// 注册名称
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// 是否为默认注册
    pub fn is_default(&self) -> bool {
        self.name.is_none()
    }

    /// 同一类型的默认注册键
    pub fn type_default(&self) -> Self {
        Self {
            type_info: self.type_info.clone(),
            name: None,
        }
    }
}

impl fmt::Display for BuildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}[\"{}\"]", self.type_info, name),
            None => write!(f, "{}", self.type_info),
        }
    }
}
