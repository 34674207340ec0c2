//! 错误类型定义

use std::sync::Arc;
use thiserror::Error;

/// 可在多个调用方之间共享的底层错误
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

impl ConfigError {
    /// 创建解析错误
    pub fn parse_error(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::ParseError {
            source: source.into(),
        }
    }

    /// 创建验证错误
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

/// 依赖注入错误类型
///
/// 实现了 `Clone`，同一次共享构造的失败可以原样交给所有等待者。
#[derive(Error, Debug, Clone)]
pub enum DependencyError {
    #[error("组件解析失败: {type_name}, 解析链: [{chain}], 原因: {source}")]
    ResolutionFailed {
        type_name: String,
        chain: String,
        source: Box<DependencyError>,
    },

    #[error("组件未注册: {type_name}")]
    ComponentNotRegistered { type_name: String },

    #[error("没有可用的构造计划: {type_name}")]
    NoConstructionPlan { type_name: String },

    #[error("组件创建失败: {type_name}, 阶段: {stage}, 原因: {source}")]
    ComponentCreationFailed {
        type_name: String,
        stage: String,
        source: SharedError,
    },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("解析深度超过上限 {max_depth}: {type_name}")]
    ResolutionDepthExceeded { type_name: String, max_depth: usize },

    #[error("生命周期管理器已绑定到其他注册: {type_name}, 管理器: {manager}")]
    LifetimeManagerInUse { type_name: String, manager: String },

    #[error("类型不匹配: 期望 {expected}, 实际 {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("参数无效: 位置 {index}, 原因: {message}")]
    InvalidParameter { index: usize, message: String },

    #[error("组件注册失败: {type_name}, 原因: {message}")]
    RegistrationError { type_name: String, message: String },

    #[error("容器已释放: {container_id}")]
    ContainerDisposed { container_id: String },
}

impl DependencyError {
    /// 创建组件创建失败错误
    pub fn creation_failed(
        type_name: impl Into<String>,
        stage: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let source: Box<dyn std::error::Error + Send + Sync> = source.into();
        Self::ComponentCreationFailed {
            type_name: type_name.into(),
            stage: stage.into(),
            source: Arc::from(source),
        }
    }

    /// 创建类型不匹配错误
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// 创建注册错误
    pub fn registration_error(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RegistrationError {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// 去掉 `ResolutionFailed` 包装后的根本原因
    pub fn root_cause(&self) -> &DependencyError {
        let mut current = self;
        while let Self::ResolutionFailed { source, .. } = current {
            current = source;
        }
        current
    }

    /// 是否已经携带解析链信息
    pub fn is_located(&self) -> bool {
        matches!(self, Self::ResolutionFailed { .. })
    }

    /// 根本原因是否为"没有注册/无法构造"
    pub fn is_missing_registration(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::ComponentNotRegistered { .. } | Self::NoConstructionPlan { .. }
        )
    }

    /// 根本原因是否为循环依赖
    pub fn is_circular(&self) -> bool {
        matches!(self.root_cause(), Self::CircularDependency { .. })
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
