use spin::Mutex;
use tracing::debug;

use crate::{
    error::Result,
    stats::{PoolMetrics, PoolStats},
};

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type ResetHook<T> = Box<dyn Fn(&mut T) -> Result<()> + Send + Sync>;

/// `ObjectPool` 是按类型参数化的通用对象池，复用构造代价较高的实例。
///
/// # 模块角色（Why）
/// - 以组合代替继承：具体池只需提供“如何新建”（工厂闭包）与“如何重置”（重置钩子），
///   即可获得线程安全的租借/归还语义；
/// - [`MemoryStreamPool`](crate::MemoryStreamPool) 即在此之上叠加租约校验的特化版本。
///
/// # 核心机制（How）
/// - 内部维护 `spin::Mutex<Vec<T>>` 作为自由链表，后进先出：最近归还的实例最先被复用；
/// - 锁只覆盖 `push`/`pop` 本身，工厂与重置钩子均在锁外执行，临界区保持常数时间；
/// - 同一实例只可能位于自由链表或某个租借者手中，`pop` 在锁内完成，两个租借者不会拿到同一实例。
///
/// # 契约说明（What）
/// - [`rent`](Self::rent) 不阻塞、不失败：链表为空时调用工厂新建；
/// - [`give_back`](Self::give_back) 先执行重置钩子，成功后才把实例放回链表，
///   因此任何租借者都观察不到上一次使用留下的数据；
/// - 重置钩子失败时实例被丢弃，错误原样返回给调用方。
///
/// # 设计权衡（Trade-offs）
/// - 不设容量上限、不做淘汰：池大小随峰值需求增长，以换取实现简单；
///   需要收回内存时显式调用 [`clear`](Self::clear)。
pub struct ObjectPool<T> {
    free_list: Mutex<Vec<T>>,
    factory: Factory<T>,
    reset: ResetHook<T>,
    metrics: PoolMetrics,
}

impl<T: Send + 'static> ObjectPool<T> {
    /// 使用工厂闭包创建池，归还时不做任何重置。
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_reset(factory, |_| Ok(()))
    }

    /// 使用工厂闭包与重置钩子创建池。
    ///
    /// 钩子在实例重新进入自由链表前执行；返回错误表示实例已失效，池将拒绝并丢弃它。
    pub fn with_reset<F, R>(factory: F, reset: R) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        R: Fn(&mut T) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            free_list: Mutex::new(Vec::new()),
            factory: Box::new(factory),
            reset: Box::new(reset),
            metrics: PoolMetrics::default(),
        }
    }

    /// 取出一个空闲实例，或在没有空闲实例时新建。
    pub fn rent(&self) -> T {
        let reused = self.free_list.lock().pop();
        self.metrics.record_rent(reused.is_some());
        match reused {
            Some(item) => item,
            None => {
                debug!("object pool miss, constructing new instance");
                (self.factory)()
            }
        }
    }

    /// 重置实例并放回池中。
    pub fn give_back(&self, mut item: T) -> Result<()> {
        if let Err(err) = (self.reset)(&mut item) {
            self.metrics.record_rejection();
            return Err(err);
        }
        self.free_list.lock().push(item);
        self.metrics.record_return();
        Ok(())
    }

    /// 预先构造 `count` 个空闲实例。
    pub fn prefill(&self, count: usize) {
        if count == 0 {
            return;
        }
        let fresh: Vec<T> = (0..count).map(|_| (self.factory)()).collect();
        self.free_list.lock().extend(fresh);
        self.metrics.record_prefill(count);
    }

    /// 丢弃全部空闲实例，返回丢弃数量；已租出的实例不受影响。
    pub fn clear(&self) -> usize {
        let drained = core::mem::take(&mut *self.free_list.lock());
        drained.len()
    }

    /// 当前空闲实例数量。
    pub fn idle_len(&self) -> usize {
        self.free_list.lock().len()
    }

    /// 读取统计快照；`outstanding` 由同一快照中的计数推算。
    pub fn stats(&self) -> PoolStats {
        let snapshot = self.metrics.snapshot(self.idle_len(), 0);
        let settled = snapshot.returns + snapshot.rejected;
        PoolStats {
            outstanding: snapshot.rents.saturating_sub(settled) as usize,
            ..snapshot
        }
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::PoolError;

    #[test]
    fn returned_instance_is_reused_first() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let pool = ObjectPool::new(move || counter.fetch_add(1, Ordering::Relaxed));

        let first = pool.rent();
        let second = pool.rent();
        assert_eq!((first, second), (0, 1));
        pool.give_back(first).expect("归还应成功");
        assert_eq!(pool.rent(), 0, "最近归还的实例应被优先复用");
        assert_eq!(built.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn reset_runs_before_instance_becomes_idle() {
        let pool = ObjectPool::with_reset(Vec::<u8>::new, |buf: &mut Vec<u8>| {
            buf.clear();
            Ok(())
        });
        let mut buf = pool.rent();
        buf.extend_from_slice(b"abc");
        pool.give_back(buf).expect("归还应成功");
        assert!(pool.rent().is_empty());
    }

    #[test]
    fn failing_reset_rejects_and_drops_instance() {
        let pool = ObjectPool::with_reset(|| 0u32, |_| Err(PoolError::WriterReleased));
        let item = pool.rent();
        assert_eq!(pool.give_back(item), Err(PoolError::WriterReleased));
        assert_eq!(pool.idle_len(), 0);
        let stats = pool.stats();
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.returns, 0);
        assert_eq!(stats.outstanding, 0);
    }

    #[test]
    fn outstanding_is_derived_from_the_returned_counters() {
        let pool = ObjectPool::with_reset(|| 0u32, |item: &mut u32| {
            if *item == 0 {
                Ok(())
            } else {
                Err(PoolError::WriterReleased)
            }
        });
        let _kept = pool.rent();
        let returned = pool.rent();
        let mut broken = pool.rent();
        broken += 1;
        pool.give_back(returned).expect("归还应成功");
        assert!(pool.give_back(broken).is_err());

        let stats = pool.stats();
        assert_eq!((stats.rents, stats.returns, stats.rejected), (3, 1, 1));
        assert_eq!(
            stats.outstanding as u64,
            stats.rents - stats.returns - stats.rejected
        );
        assert_eq!(stats.outstanding, 1);
        assert_eq!(stats.foreign, 0);
    }

    #[test]
    fn prefill_and_clear_manage_idle_set() {
        let pool = ObjectPool::new(|| [0u8; 4]);
        pool.prefill(3);
        assert_eq!(pool.idle_len(), 3);
        let _held = pool.rent();
        let stats = pool.stats();
        assert_eq!(stats.created, 3);
        assert_eq!(stats.hits, 1);
        assert_eq!(pool.clear(), 2);
        assert_eq!(pool.idle_len(), 0);
    }
}
