use core::sync::atomic::{AtomicU64, Ordering};

/// 池统计快照。
///
/// # 契约说明（What）
/// - 计数类字段（`created`、`rents` 等）自池创建起单调递增；
/// - `idle` 与 `outstanding` 为读取瞬间的近似值，并发场景下两者之和不保证等于 `created`，
///   仅用于监控与测试断言，不应作为同步条件；
/// - `outstanding` 与计数字段取自同一次快照，`rents - returns - rejected` 在单线程下与之相等。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PoolStats {
    /// 工厂新建的对象数量（自由链表未命中）。
    pub created: u64,
    /// `rent` 调用次数。
    pub rents: u64,
    /// 命中自由链表、直接复用的次数。
    pub hits: u64,
    /// 成功归还的次数。
    pub returns: u64,
    /// 重置钩子拒绝的归还次数（如已失效的对象）。
    pub rejected: u64,
    /// 因“并非由本池租出”而拒绝的归还次数；这些对象从未计入 `rents`。
    pub foreign: u64,
    /// 当前空闲对象数量。
    pub idle: usize,
    /// 当前已租出、尚未归还的对象数量。
    pub outstanding: usize,
}

/// 原子计数器集合，所有更新使用 `Relaxed`：统计值不参与任何同步决策。
#[derive(Default)]
pub(crate) struct PoolMetrics {
    created: AtomicU64,
    rents: AtomicU64,
    hits: AtomicU64,
    returns: AtomicU64,
    rejected: AtomicU64,
}

impl PoolMetrics {
    pub(crate) fn record_rent(&self, reused: bool) {
        self.rents.fetch_add(1, Ordering::Relaxed);
        if reused {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.created.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_prefill(&self, count: usize) {
        self.created.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_return(&self) {
        self.returns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, idle: usize, outstanding: usize) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            rents: self.rents.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            foreign: 0,
            idle,
            outstanding,
        }
    }
}
