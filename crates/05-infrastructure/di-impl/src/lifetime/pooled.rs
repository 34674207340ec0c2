use di_abstractions::{BindingFlag, Instance, LifetimeManager, LifetimeScope};
use infrastructure_common::{DependencyResult, LifetimeKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// 池化生命周期
///
/// 池未满时每次解析构造新值并放入池中，池满后轮转分配已有的值。
#[derive(Debug)]
pub struct PooledLifetimeManager {
    id: Uuid,
    binding: BindingFlag,
    capacity: usize,
    pool: Mutex<Vec<Instance>>,
    cursor: AtomicUsize,
}

impl PooledLifetimeManager {
    /// 创建指定容量的管理器，容量至少为 1
    pub fn new(capacity: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            binding: BindingFlag::new(),
            capacity: capacity.max(1),
            pool: Mutex::new(Vec::new()),
            cursor: AtomicUsize::new(0),
        }
    }

    /// 池容量
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 池中已有的值数量
    pub fn pooled(&self) -> usize {
        self.pool.lock().len()
    }
}

impl LifetimeManager for PooledLifetimeManager {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> LifetimeKind {
        LifetimeKind::Pooled
    }

    fn try_get(&self, _scope: &LifetimeScope<'_>) -> DependencyResult<Option<Instance>> {
        let pool = self.pool.lock();
        if pool.len() < self.capacity {
            return Ok(None);
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % pool.len();
        Ok(Some(pool[index].clone()))
    }

    fn set(&self, value: Instance, _scope: &LifetimeScope<'_>) {
        let mut pool = self.pool.lock();
        // 并发构造可能超出容量，多余的值只交给调用方
        if pool.len() < self.capacity {
            pool.push(value);
        }
    }

    fn dispose(&self) {
        self.pool.lock().clear();
        self.cursor.store(0, Ordering::Relaxed);
    }

    fn create_lifetime_manager(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(Self::new(self.capacity))
    }

    fn bind(&self) -> bool {
        self.binding.try_bind()
    }

    fn is_bound(&self) -> bool {
        self.binding.is_bound()
    }
}
