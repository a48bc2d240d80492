use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use crate::{
    config::PoolConfig,
    encoding::TextEncoding,
    error::{PoolError, Result},
    memory_stream::{Lease, LeaseLedger, MemoryStream},
    object_pool::ObjectPool,
    stats::PoolStats,
    writer::PooledStreamWriter,
};

/// 进程级共享实例，首次访问时创建，生命周期与进程一致。
static SHARED: OnceLock<MemoryStreamPool> = OnceLock::new();

/// `MemoryStreamPool` 是 [`MemoryStream`] 专用的对象池。
///
/// # 模块角色（Why）
/// - 在通用 [`ObjectPool`] 之上补充两项约束：归还前把流截断为空，
///   以及通过租约拒绝“未从本池租出”的流；
/// - 提供 [`create_writer`](Self::create_writer) 便捷入口，把“租借 + 包装为文本写入器”合并为一次调用。
///
/// # 核心机制（How）
/// - `rent` 为流签发一份指向本池 `LeaseLedger` 的租约，租约随流移动；
///   `give_back` 取出租约并比对台账身份，缺失或属于其它池即判定为误用；
/// - 租约在 `Drop` 时注销，流被直接丢弃时计数同样回落，池不保留任何逐流记录；
/// - 重置钩子调用 [`MemoryStream::set_len`]，失效流会在此处报错，
///   因此同时具备“询问对象是否已失效”和“池核对自己签发的租约”两道检查。
///
/// # 契约说明（What）
/// - [`give_back`](Self::give_back) 的检查顺序：租约 → 失效状态 → 截断 → 放回自由链表；
///   截断完成之前流不会对其它租借者可见；
/// - 归还失败时流连同租约一起被丢弃，错误原样返回；
///   误交给其它池的流因此也会从原池的 [`outstanding`](Self::outstanding) 中注销。
///
/// # 设计权衡（Trade-offs）
/// - 不设容量上限、不按尺寸分桶：峰值过后空闲流全部保留，直到显式调用 [`clear`](Self::clear)。
pub struct MemoryStreamPool {
    streams: ObjectPool<MemoryStream>,
    ledger: Arc<LeaseLedger>,
    foreign_returns: AtomicU64,
    config: PoolConfig,
}

impl MemoryStreamPool {
    /// 使用默认配置创建独立池。
    pub fn new() -> Self {
        Self::build(PoolConfig::default())
    }

    /// 使用给定配置创建独立池；配置非法时返回错误。
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// 返回进程级共享池。
    pub fn shared() -> &'static MemoryStreamPool {
        SHARED.get_or_init(MemoryStreamPool::new)
    }

    fn build(config: PoolConfig) -> Self {
        let capacity = config.stream_capacity;
        let streams = ObjectPool::with_reset(
            move || MemoryStream::with_capacity(capacity),
            |stream: &mut MemoryStream| stream.set_len(0),
        );
        streams.prefill(config.prefill);
        Self {
            streams,
            ledger: Arc::new(LeaseLedger::default()),
            foreign_returns: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// 租借一个空流，调用方在归还前独占该流。
    pub fn rent(&self) -> MemoryStream {
        let mut stream = self.streams.rent();
        stream.attach_lease(Lease::issue(&self.ledger));
        debug!(stream_id = stream.id().get(), "memory stream rented");
        stream
    }

    /// 截断并归还流。
    ///
    /// # 错误
    /// - [`PoolError::NotRented`]：流没有本池签发的租约（来自其它池或从未租借）；
    /// - [`PoolError::Disposed`]：流已被持有者释放。
    pub fn give_back(&self, mut stream: MemoryStream) -> Result<()> {
        let id = stream.id();
        match stream.take_lease() {
            Some(lease) if lease.is_from(&self.ledger) => drop(lease),
            _ => {
                self.foreign_returns.fetch_add(1, Ordering::Relaxed);
                warn!(stream_id = id.get(), "rejected return of a stream not rented from this pool");
                return Err(PoolError::NotRented { stream: id });
            }
        }
        match self.streams.give_back(stream) {
            Ok(()) => {
                debug!(stream_id = id.get(), "memory stream returned");
                Ok(())
            }
            Err(err) => {
                warn!(stream_id = id.get(), code = err.code(), "rejected return: {err}");
                Err(err)
            }
        }
    }

    /// 租借一个流并包装为 UTF-8（无 BOM）写入器。
    pub fn create_writer(&self) -> PooledStreamWriter<'_> {
        self.create_writer_with(TextEncoding::default())
    }

    /// 租借一个流并包装为指定编码的写入器；写入器结束时自动归还流。
    pub fn create_writer_with(&self, encoding: TextEncoding) -> PooledStreamWriter<'_> {
        let stream = self.rent();
        PooledStreamWriter::new(self, stream, encoding)
    }

    /// 丢弃所有空闲流，返回丢弃数量。
    pub fn clear(&self) -> usize {
        self.streams.clear()
    }

    pub fn idle_len(&self) -> usize {
        self.streams.idle_len()
    }

    /// 当前已租出、尚未归还且仍存活的流数量。
    pub fn outstanding(&self) -> usize {
        self.ledger.outstanding()
    }

    /// 统计快照；`outstanding` 以租约台账为准，`foreign` 单独计数，不影响内部池的计数。
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            outstanding: self.outstanding(),
            foreign: self.foreign_returns.load(Ordering::Relaxed),
            ..self.streams.stats()
        }
    }
}

impl Default for MemoryStreamPool {
    fn default() -> Self {
        Self::new()
    }
}
