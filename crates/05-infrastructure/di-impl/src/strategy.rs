//! 分阶段的构建策略链

use crate::context::BuildContext;
use crate::plan_cache::BuildPlan;
use infrastructure_common::DependencyResult;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// 构建阶段，按声明顺序执行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuildStage {
    /// 准备阶段，默认没有策略
    Setup,
    /// 枚举请求
    Enumerable,
    /// 生命周期检查，命中缓存时结束前置阶段
    Lifetime,
    /// 类型映射
    TypeMapping,
    /// 构造前：选择成员计划
    PreCreation,
    /// 创建实例
    Creation,
    /// 属性和方法注入
    Initialization,
    /// 收尾阶段，默认没有策略
    PostInitialization,
}

impl BuildStage {
    /// 全部阶段，按执行顺序排列
    pub const ALL: [BuildStage; 8] = [
        Self::Setup,
        Self::Enumerable,
        Self::Lifetime,
        Self::TypeMapping,
        Self::PreCreation,
        Self::Creation,
        Self::Initialization,
        Self::PostInitialization,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 构建策略 trait
///
/// 前置动作按阶段顺序执行，后置动作按相反顺序只对执行过前置动作的策略执行。
pub trait BuilderStrategy: Send + Sync + fmt::Debug {
    /// 策略名称
    fn name(&self) -> &str;

    /// 编译构建计划时判断策略是否参与该注册键的构建
    fn is_applicable(&self, _plan: &BuildPlan) -> bool {
        true
    }

    /// 前置动作
    fn pre_build_up(&self, _context: &mut BuildContext<'_>) -> DependencyResult<()> {
        Ok(())
    }

    /// 后置动作
    fn post_build_up(&self, _context: &mut BuildContext<'_>) -> DependencyResult<()> {
        Ok(())
    }
}

type StageLists = [Vec<Arc<dyn BuilderStrategy>>; 8];

/// 分阶段的策略链
///
/// 子容器的策略链继承父链，在每个阶段里父链的策略排在前面。
#[derive(Debug)]
pub struct StagedStrategyChain {
    parent: Option<Arc<StagedStrategyChain>>,
    stages: RwLock<StageLists>,
    epoch: Arc<AtomicU64>,
}

impl StagedStrategyChain {
    /// 创建空的策略链
    ///
    /// `epoch` 与策略注册表共享，策略变化时使构建计划失效。
    pub fn new(epoch: Arc<AtomicU64>) -> Self {
        Self {
            parent: None,
            stages: RwLock::new(std::array::from_fn(|_| Vec::new())),
            epoch,
        }
    }

    /// 创建继承当前链的子链
    pub fn create_child(self: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(self.clone()),
            stages: RwLock::new(std::array::from_fn(|_| Vec::new())),
            epoch: self.epoch.clone(),
        })
    }

    /// 在阶段末尾添加策略
    pub fn add(&self, stage: BuildStage, strategy: Arc<dyn BuilderStrategy>) {
        debug!("添加构建策略: {} -> {}", strategy.name(), stage);
        self.stages.write()[stage.index()].push(strategy);
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// 某个阶段的全部策略（包括继承的）
    pub fn stage(&self, stage: BuildStage) -> Vec<Arc<dyn BuilderStrategy>> {
        let mut strategies = self
            .parent
            .as_ref()
            .map(|parent| parent.stage(stage))
            .unwrap_or_default();
        strategies.extend(self.stages.read()[stage.index()].iter().cloned());
        strategies
    }

    /// 按阶段顺序展开的全部策略
    pub fn strategies(&self) -> Vec<Arc<dyn BuilderStrategy>> {
        BuildStage::ALL.iter().flat_map(|stage| self.stage(*stage)).collect()
    }

    /// 本链自己添加的策略数量
    pub fn len(&self) -> usize {
        self.stages.read().iter().map(Vec::len).sum()
    }

    /// 本链是否没有自己的策略
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
