//! 生命周期种类与容器状态

use serde::{Deserialize, Serialize};
use std::fmt;

/// 生命周期管理器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifetimeKind {
    /// 瞬时模式 - 每次解析都创建新实例
    #[default]
    Transient,
    /// 单次解析内共享
    PerResolve,
    /// 单例模式 - 由所属容器持有
    ContainerControlled,
    /// 层级模式 - 子容器复用祖先已缓存的实例
    Hierarchical,
    /// 池化模式 - 有界实例池，轮转分配
    Pooled,
    /// 外部控制 - 只持有弱引用
    ExternallyControlled,
}

impl LifetimeKind {
    /// 首次构造是否需要同步（只构造一次）
    pub fn is_synchronized(&self) -> bool {
        matches!(self, Self::ContainerControlled | Self::Hierarchical)
    }

    /// 所属容器释放时是否需要释放存储的值
    pub fn is_container_owned(&self) -> bool {
        !matches!(self, Self::ExternallyControlled | Self::Transient)
    }
}

impl fmt::Display for LifetimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transient => "Lifetime:Transient",
            Self::PerResolve => "Lifetime:PerResolve",
            Self::ContainerControlled => "Lifetime:Singleton",
            Self::Hierarchical => "Lifetime:Hierarchical",
            Self::Pooled => "Lifetime:Pooled",
            Self::ExternallyControlled => "Lifetime:External",
        };
        f.write_str(name)
    }
}

/// 容器生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerState {
    /// 正常服务
    #[default]
    Active,
    /// 释放中，拒绝新的解析
    Disposing,
    /// 已释放
    Disposed,
}

impl ContainerState {
    /// 转换为原子存储用的数值
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Active => 0,
            Self::Disposing => 1,
            Self::Disposed => 2,
        }
    }

    /// 从原子存储的数值恢复
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Active,
            1 => Self::Disposing,
            _ => Self::Disposed,
        }
    }

    /// 是否还能接受解析和注册
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}
