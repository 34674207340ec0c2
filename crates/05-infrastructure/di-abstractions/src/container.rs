//! 依赖注入容器抽象接口
//!
//! 提供依赖注入容器的核心抽象

use crate::instance::{Instance, InstanceCollection};
use crate::lifetime::LifetimeManager;
use crate::policy::Registration;
use infrastructure_common::{BuildKey, ConfigError, ConfigResult, DependencyError, DependencyResult, TypeInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 依赖注入容器 trait
///
/// 必须实现的方法都以注册键为单位，类型化的便捷方法由默认实现提供。
pub trait DiContainer: Send + Sync {
    /// 解析注册键对应的实例
    fn resolve_key(&self, key: &BuildKey) -> DependencyResult<Instance>;

    /// 对已有实例执行注入
    fn build_up_key(&self, key: &BuildKey, existing: Instance) -> DependencyResult<Instance>;

    /// 为注册键绑定生命周期管理器
    fn register_lifetime_manager(&self, key: &BuildKey, manager: Arc<dyn LifetimeManager>) -> DependencyResult<()>;

    /// 检查注册键是否已注册（包括祖先容器）
    fn is_registered_key(&self, key: &BuildKey) -> bool;

    /// 获取所有可见的注册记录
    fn registrations(&self) -> Vec<Registration>;

    /// 静态验证注册图
    fn validate(&self) -> Result<(), Vec<DependencyError>>;

    /// 释放容器
    fn dispose(&self);

    /// 获取统计信息
    fn stats(&self) -> ContainerStats;

    /// 解析组件
    fn resolve<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        Self: Sized,
    {
        expect_type(&self.resolve_key(&BuildKey::of::<T>())?)
    }

    /// 解析命名组件
    fn resolve_named<T>(&self, name: &str) -> DependencyResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        Self: Sized,
    {
        expect_type(&self.resolve_key(&BuildKey::named::<T>(name))?)
    }

    /// 解析 trait 对象
    fn resolve_dyn<I>(&self) -> DependencyResult<Arc<I>>
    where
        I: ?Sized + Send + Sync + 'static,
        Self: Sized,
    {
        expect_dyn(&self.resolve_key(&BuildKey::of::<I>())?)
    }

    /// 解析命名 trait 对象
    fn resolve_dyn_named<I>(&self, name: &str) -> DependencyResult<Arc<I>>
    where
        I: ?Sized + Send + Sync + 'static,
        Self: Sized,
    {
        expect_dyn(&self.resolve_key(&BuildKey::named::<I>(name))?)
    }

    /// 解析类型 `T` 的全部注册
    fn resolve_all<T>(&self) -> DependencyResult<Vec<Arc<T>>>
    where
        T: Send + Sync + 'static,
        Self: Sized,
    {
        let collection = self.resolve_key(&BuildKey::new(TypeInfo::enumerable_of::<T>(), None))?;
        expect_collection(&collection)?.iter().map(expect_type).collect()
    }

    /// 解析 trait 对象的全部注册
    fn resolve_all_dyn<I>(&self) -> DependencyResult<Vec<Arc<I>>>
    where
        I: ?Sized + Send + Sync + 'static,
        Self: Sized,
    {
        let collection = self.resolve_key(&BuildKey::new(TypeInfo::enumerable_of::<I>(), None))?;
        expect_collection(&collection)?.iter().map(expect_dyn).collect()
    }

    /// 对已有对象执行注入
    fn build_up<T>(&self, existing: Arc<T>) -> DependencyResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        Self: Sized,
    {
        expect_type(&self.build_up_key(&BuildKey::of::<T>(), Instance::from_arc(existing))?)
    }

    /// 按命名注册对已有对象执行注入
    fn build_up_named<T>(&self, existing: Arc<T>, name: &str) -> DependencyResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        Self: Sized,
    {
        expect_type(&self.build_up_key(&BuildKey::named::<T>(name), Instance::from_arc(existing))?)
    }

    /// 检查组件是否已注册
    fn is_registered<T>(&self) -> bool
    where
        T: ?Sized + 'static,
        Self: Sized,
    {
        self.is_registered_key(&BuildKey::of::<T>())
    }
}

fn expect_type<T: Send + Sync + 'static>(instance: &Instance) -> DependencyResult<Arc<T>> {
    instance
        .downcast::<T>()
        .ok_or_else(|| DependencyError::type_mismatch(std::any::type_name::<T>(), instance.type_name()))
}

fn expect_dyn<I: ?Sized + Send + Sync + 'static>(instance: &Instance) -> DependencyResult<Arc<I>> {
    instance
        .downcast_dyn::<I>()
        .ok_or_else(|| DependencyError::type_mismatch(std::any::type_name::<I>(), instance.type_name()))
}

fn expect_collection(instance: &Instance) -> DependencyResult<Vec<Instance>> {
    instance
        .downcast::<InstanceCollection>()
        .map(|collection| collection.0.clone())
        .ok_or_else(|| DependencyError::type_mismatch(std::any::type_name::<InstanceCollection>(), instance.type_name()))
}

/// 容器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 池化生命周期的默认容量
    pub default_pool_capacity: usize,
    /// 是否缓存构建计划
    pub enable_plan_cache: bool,
    /// 是否启用性能监控
    pub enable_performance_monitoring: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: 100,
            default_pool_capacity: 4,
            enable_plan_cache: true,
            enable_performance_monitoring: false,
        }
    }
}

impl ContainerConfig {
    /// 从 TOML 文本加载
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text).map_err(ConfigError::parse_error)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文本加载
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::parse_error)?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::validation_error("max_resolution_depth 必须大于 0"));
        }
        if self.default_pool_capacity == 0 {
            return Err(ConfigError::validation_error("default_pool_capacity 必须大于 0"));
        }
        Ok(())
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerStats {
    /// 本容器的注册数量
    pub registered_components: usize,
    /// 顶层解析次数
    pub resolutions: u64,
    /// 实际构造次数
    pub constructions: u64,
    /// 解析错误数量
    pub resolution_errors: u64,
    /// 构建计划缓存命中
    pub plan_cache_hits: u64,
    /// 构建计划缓存未命中
    pub plan_cache_misses: u64,
    /// 解析总时间（毫秒），仅在启用性能监控时统计
    pub total_resolution_time_ms: u64,
    /// 平均解析时间（毫秒）
    pub average_resolution_time_ms: f64,
    /// 存活的子容器数量
    pub child_containers: usize,
}
