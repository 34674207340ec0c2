//! 成员计划
//!
//! 外部的成员选择层把"用哪个构造函数、注入哪些属性和方法、参数从哪里来"
//! 整理成 [`MemberPlan`]。解析管线只按顺序执行计划，不关心计划是怎么选出来的。

use crate::instance::Instance;
use infrastructure_common::{BuildKey, DependencyError, DependencyResult, TypeInfo};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 参数来源
#[derive(Clone)]
pub enum ParameterSource {
    /// 从容器解析依赖
    Dependency(BuildKey),
    /// 可选依赖：没有注册时为 `None`
    Optional(BuildKey),
    /// 直接注入的值
    Value(Instance),
}

impl ParameterSource {
    /// 依赖类型 `T` 的默认注册
    pub fn dependency<T: ?Sized + 'static>() -> Self {
        Self::Dependency(BuildKey::of::<T>())
    }

    /// 依赖类型 `T` 的命名注册
    pub fn named<T: ?Sized + 'static>(name: &str) -> Self {
        Self::Dependency(BuildKey::named::<T>(name))
    }

    /// 可选依赖
    pub fn optional<T: ?Sized + 'static>() -> Self {
        Self::Optional(BuildKey::of::<T>())
    }

    /// 固定值
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Value(Instance::new(value))
    }

    /// 需要解析的注册键
    pub fn key(&self) -> Option<&BuildKey> {
        match self {
            Self::Dependency(key) | Self::Optional(key) => Some(key),
            Self::Value(_) => None,
        }
    }
}

impl fmt::Debug for ParameterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dependency(key) => write!(f, "Dependency({key})"),
            Self::Optional(key) => write!(f, "Optional({key})"),
            Self::Value(instance) => write!(f, "Value({})", instance.type_name()),
        }
    }
}

/// 已解析的参数值，顺序与参数来源一致
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    values: Vec<Option<Instance>>,
}

impl Parameters {
    /// 创建参数列表
    pub fn new(values: Vec<Option<Instance>>) -> Self {
        Self { values }
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有参数
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 原始实例
    pub fn instance(&self, index: usize) -> DependencyResult<Option<&Instance>> {
        self.values
            .get(index)
            .map(Option::as_ref)
            .ok_or_else(|| DependencyError::InvalidParameter {
                index,
                message: format!("只有 {} 个参数", self.values.len()),
            })
    }

    /// 取出具体类型的参数
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> DependencyResult<Arc<T>> {
        let instance = self.required(index)?;
        instance
            .downcast::<T>()
            .ok_or_else(|| DependencyError::type_mismatch(std::any::type_name::<T>(), instance.type_name()))
    }

    /// 取出 trait 对象参数
    pub fn get_dyn<I: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DependencyResult<Arc<I>> {
        let instance = self.required(index)?;
        instance
            .downcast_dyn::<I>()
            .ok_or_else(|| DependencyError::type_mismatch(std::any::type_name::<I>(), instance.type_name()))
    }

    /// 取出可选参数
    pub fn get_optional<T: Send + Sync + 'static>(&self, index: usize) -> DependencyResult<Option<Arc<T>>> {
        match self.instance(index)? {
            Some(_) => self.get(index).map(Some),
            None => Ok(None),
        }
    }

    fn required(&self, index: usize) -> DependencyResult<&Instance> {
        self.instance(index)?.ok_or_else(|| DependencyError::InvalidParameter {
            index,
            message: "可选依赖未提供值".to_string(),
        })
    }
}

/// 擦除后的工厂函数
pub type FactoryFn = Arc<dyn Fn(&Parameters) -> anyhow::Result<Instance> + Send + Sync>;

/// 擦除后的注入函数
pub type InjectFn = Arc<dyn Fn(&Instance, &Parameters) -> anyhow::Result<()> + Send + Sync>;

/// 构造计划：有序的参数来源 + 工厂
#[derive(Clone)]
pub struct ConstructionPlan {
    parameters: Vec<ParameterSource>,
    factory: FactoryFn,
}

impl ConstructionPlan {
    /// 创建构造计划
    pub fn new(parameters: Vec<ParameterSource>, factory: FactoryFn) -> Self {
        Self { parameters, factory }
    }

    /// 参数来源
    pub fn parameters(&self) -> &[ParameterSource] {
        &self.parameters
    }

    /// 用已解析的参数调用工厂
    pub fn invoke(&self, parameters: &Parameters) -> anyhow::Result<Instance> {
        (self.factory)(parameters)
    }
}

impl fmt::Debug for ConstructionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructionPlan")
            .field("parameters", &self.parameters)
            .field("factory", &"<function>")
            .finish()
    }
}

/// 注入成员种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// 属性注入
    Property,
    /// 方法注入
    Method,
}

/// 注入计划中的一个成员
#[derive(Clone)]
pub struct InjectionMember {
    member: String,
    kind: MemberKind,
    parameters: Vec<ParameterSource>,
    apply: InjectFn,
}

impl InjectionMember {
    /// 创建注入成员
    pub fn new(member: impl Into<String>, kind: MemberKind, parameters: Vec<ParameterSource>, apply: InjectFn) -> Self {
        Self {
            member: member.into(),
            kind,
            parameters,
            apply,
        }
    }

    /// 成员名称
    pub fn member(&self) -> &str {
        &self.member
    }

    /// 成员种类
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// 参数来源
    pub fn parameters(&self) -> &[ParameterSource] {
        &self.parameters
    }

    /// 对目标实例执行注入
    pub fn apply(&self, target: &Instance, parameters: &Parameters) -> anyhow::Result<()> {
        (self.apply)(target, parameters)
    }
}

impl fmt::Debug for InjectionMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionMember")
            .field("member", &self.member)
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// 某个类型的完整成员计划
#[derive(Debug, Clone)]
pub struct MemberPlan {
    target: TypeInfo,
    construction: Option<ConstructionPlan>,
    injection: Vec<InjectionMember>,
}

impl MemberPlan {
    /// 为类型 `T` 开始构建计划
    pub fn builder<T: Send + Sync + 'static>() -> MemberPlanBuilder<T> {
        MemberPlanBuilder {
            construction: None,
            injection: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// 计划针对的类型
    pub fn target(&self) -> &TypeInfo {
        &self.target
    }

    /// 构造计划；只支持 build-up 的类型没有构造计划
    pub fn construction(&self) -> Option<&ConstructionPlan> {
        self.construction.as_ref()
    }

    /// 注入计划，按执行顺序排列
    pub fn injection(&self) -> &[InjectionMember] {
        &self.injection
    }

    /// 计划引用的全部依赖键
    pub fn dependencies(&self) -> Vec<BuildKey> {
        self.construction
            .iter()
            .flat_map(|plan| plan.parameters.iter())
            .chain(self.injection.iter().flat_map(|member| member.parameters.iter()))
            .filter_map(|source| match source {
                ParameterSource::Dependency(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }
}

/// 类型化的成员计划构建器
pub struct MemberPlanBuilder<T> {
    construction: Option<ConstructionPlan>,
    injection: Vec<InjectionMember>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> MemberPlanBuilder<T> {
    /// 设置构造函数
    pub fn constructor<F>(mut self, parameters: Vec<ParameterSource>, factory: F) -> Self
    where
        F: Fn(&Parameters) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let factory: FactoryFn = Arc::new(move |parameters: &Parameters| factory(parameters).map(Instance::new));
        self.construction = Some(ConstructionPlan::new(parameters, factory));
        self
    }

    /// 添加属性注入
    pub fn property<F>(self, member: &str, source: ParameterSource, setter: F) -> Self
    where
        F: Fn(&T, &Parameters) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.member(member, MemberKind::Property, vec![source], setter)
    }

    /// 添加方法注入
    pub fn method<F>(self, member: &str, parameters: Vec<ParameterSource>, call: F) -> Self
    where
        F: Fn(&T, &Parameters) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.member(member, MemberKind::Method, parameters, call)
    }

    fn member<F>(mut self, member: &str, kind: MemberKind, parameters: Vec<ParameterSource>, apply: F) -> Self
    where
        F: Fn(&T, &Parameters) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let apply: InjectFn = Arc::new(move |target: &Instance, parameters: &Parameters| {
            let typed = target
                .downcast::<T>()
                .ok_or_else(|| DependencyError::type_mismatch(std::any::type_name::<T>(), target.type_name()))?;
            apply(&typed, parameters)
        });
        self.injection.push(InjectionMember::new(member, kind, parameters, apply));
        self
    }

    /// 完成构建
    pub fn build(self) -> MemberPlan {
        MemberPlan {
            target: TypeInfo::of::<T>(),
            construction: self.construction,
            injection: self.injection,
        }
    }
}

/// 自带成员计划的类型
///
/// 计划是关于类型本身的纯函数，不依赖运行时反射。
pub trait Injectable: Send + Sync + Sized + 'static {
    /// 生成成员计划
    fn member_plan() -> MemberPlan;
}
