//! 只构造一次的同步槽位
//!
//! 双重检查：先查值，没有值时获取构造权，构造完成后写入并唤醒等待者。

use di_abstractions::Instance;
use infrastructure_common::{DependencyError, DependencyResult};
use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
enum SlotState {
    Empty,
    Building { attempt: u64 },
    Ready(Instance),
}

#[derive(Debug)]
struct SlotInner {
    state: SlotState,
    next_attempt: u64,
    last_failure: Option<(u64, DependencyError)>,
}

/// 同步槽位
#[derive(Debug)]
pub(crate) struct SynchronizedSlot {
    inner: Mutex<SlotInner>,
    ready: Condvar,
}

impl SynchronizedSlot {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                state: SlotState::Empty,
                next_attempt: 0,
                last_failure: None,
            }),
            ready: Condvar::new(),
        }
    }

    /// 读取值或获得构造权
    ///
    /// 返回 `Ok(None)` 时调用方负责构造，之后必须调用 `fill` 或 `abandon`。
    pub(crate) fn acquire(&self) -> DependencyResult<Option<Instance>> {
        let mut inner = self.inner.lock();
        let mut waiting_on = None;
        loop {
            match &inner.state {
                SlotState::Ready(value) => return Ok(Some(value.clone())),
                SlotState::Building { attempt } => {
                    let attempt = *attempt;
                    waiting_on.get_or_insert(attempt);
                    self.ready.wait(&mut inner);
                }
                SlotState::Empty => {
                    // 等待的那次构造已经失败，把同一个错误交给等待者
                    if let (Some(expected), Some((failed, error))) = (waiting_on, &inner.last_failure) {
                        if *failed >= expected {
                            return Err(error.clone());
                        }
                    }
                    let attempt = inner.next_attempt;
                    inner.next_attempt += 1;
                    inner.state = SlotState::Building { attempt };
                    return Ok(None);
                }
            }
        }
    }

    /// 不阻塞地查看已写入的值
    pub(crate) fn peek(&self) -> Option<Instance> {
        match &self.inner.lock().state {
            SlotState::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// 写入构造结果
    pub(crate) fn fill(&self, value: Instance) {
        let mut inner = self.inner.lock();
        inner.state = SlotState::Ready(value);
        self.ready.notify_all();
    }

    /// 放弃构造权并记录失败
    pub(crate) fn abandon(&self, error: &DependencyError) {
        let mut inner = self.inner.lock();
        if let SlotState::Building { attempt } = inner.state {
            inner.last_failure = Some((attempt, error.clone()));
            inner.state = SlotState::Empty;
            self.ready.notify_all();
        }
    }

    /// 清空槽位
    pub(crate) fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.state = SlotState::Empty;
        inner.last_failure = None;
        self.ready.notify_all();
    }
}
