//! 注册图的静态检查
//!
//! 在不构建任何实例的情况下，从映射和成员计划推导依赖图并检测循环。

use infrastructure_common::{BuildKey, DependencyError};
use std::collections::{HashMap, HashSet};

/// 依赖图节点
#[derive(Debug, Clone)]
pub struct DependencyGraphNode {
    /// 注册键
    pub key: BuildKey,
    /// 直接依赖：映射目标或成员计划引用的键
    pub dependencies: Vec<BuildKey>,
}

/// 循环依赖检测器
pub trait CircularDependencyDetector: Send + Sync {
    /// 检测循环依赖，返回发现的每一个循环
    fn detect_circular_dependencies(&self, graph: &[DependencyGraphNode]) -> Vec<DependencyError>;
}

/// 默认循环依赖检测器
#[derive(Debug, Default)]
pub struct DefaultCircularDependencyDetector;

impl CircularDependencyDetector for DefaultCircularDependencyDetector {
    fn detect_circular_dependencies(&self, graph: &[DependencyGraphNode]) -> Vec<DependencyError> {
        // 使用深度优先搜索检测循环依赖
        let edges: HashMap<&BuildKey, &[BuildKey]> = graph
            .iter()
            .map(|node| (&node.key, node.dependencies.as_slice()))
            .collect();
        let mut visited = HashSet::new();
        let mut path = Vec::new();
        let mut cycles = Vec::new();

        for node in graph {
            if !visited.contains(&node.key) {
                Self::dfs_check(&node.key, &edges, &mut visited, &mut path, &mut cycles);
            }
        }

        cycles
    }
}

impl DefaultCircularDependencyDetector {
    fn dfs_check<'a>(
        current: &'a BuildKey,
        edges: &HashMap<&'a BuildKey, &'a [BuildKey]>,
        visited: &mut HashSet<&'a BuildKey>,
        path: &mut Vec<&'a BuildKey>,
        cycles: &mut Vec<DependencyError>,
    ) {
        if let Some(start) = path.iter().position(|key| *key == current) {
            let chain = path[start..]
                .iter()
                .map(ToString::to_string)
                .chain(std::iter::once(current.to_string()))
                .collect::<Vec<_>>()
                .join(" -> ");
            cycles.push(DependencyError::CircularDependency {
                dependency_chain: chain,
            });
            return;
        }

        if !visited.insert(current) {
            return;
        }

        path.push(current);
        if let Some(&dependencies) = edges.get(current) {
            for dependency in dependencies {
                Self::dfs_check(dependency, edges, visited, path, cycles);
            }
        }
        path.pop();
    }
}
