use core::{
    fmt,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};
use std::{io, sync::Arc};

use bytes::{BufMut, BytesMut};

use crate::error::{PoolError, Result};

/// 进程内单调递增的流编号来源；从 1 开始，0 保留不用。
static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// `StreamId` 唯一标识一个 [`MemoryStream`] 实例。
///
/// 编号在实例构造时分配，并在其整个生命周期（含多次租借/归还）内保持不变，
/// 可用于判断“是否复用了同一实例”，并出现在错误与日志中。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StreamId(u64);

impl StreamId {
    fn next() -> Self {
        Self(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// 返回原始编号。
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 池侧的租约台账：只保存“当前租出数量”，归属通过 `Arc` 指针身份判定。
#[derive(Debug, Default)]
pub(crate) struct LeaseLedger {
    outstanding: AtomicUsize,
}

impl LeaseLedger {
    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}

/// `Lease` 是随租出的流一起移动的租约凭证。
///
/// # 核心机制（How）
/// - 签发时台账计数加一，`Drop` 时减一；凭证寄存在流内部，
///   因此“归还”“直接丢弃流”“被其它池拒收后丢弃”三条路径都会注销租约；
/// - 归还时以 `Arc::ptr_eq` 比对台账，判断流是否由本池租出。
///
/// # 设计权衡（Trade-offs）
/// - 对流调用 `mem::forget` 会同时泄漏凭证，计数保持不变：流本身仍未回到池中。
#[derive(Debug)]
pub(crate) struct Lease {
    ledger: Arc<LeaseLedger>,
}

impl Lease {
    pub(crate) fn issue(ledger: &Arc<LeaseLedger>) -> Self {
        ledger.outstanding.fetch_add(1, Ordering::AcqRel);
        Self {
            ledger: Arc::clone(ledger),
        }
    }

    pub(crate) fn is_from(&self, ledger: &Arc<LeaseLedger>) -> bool {
        Arc::ptr_eq(&self.ledger, ledger)
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.ledger.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

/// `MemoryStream` 是池化的可变长内存字节序列。
///
/// # 设计动机（Why）
/// - 构建期的大量中间产物（生成的源文件、清单等）需要先写入内存再比较/落盘，
///   频繁创建大块 `Vec` 会放大分配压力；池化 `BytesMut` 可复用已增长的容量。
///
/// # 契约说明（What）
/// - 实例不可 `Clone`：身份唯一，同一实例在任一时刻只能被一个持有者独占；
/// - [`dispose`](Self::dispose) 之后所有写入、截断都返回 [`PoolError::Disposed`]，
///   池在归还时据此拒绝失效对象；
/// - 只读访问（`len`、`as_bytes`）在释放后返回空视图，不会失败；
/// - 从池中租出的流携带租约，丢弃流即注销租约，空闲或自行构造的流不携带租约。
#[derive(Debug)]
pub struct MemoryStream {
    id: StreamId,
    data: BytesMut,
    disposed: bool,
    lease: Option<Lease>,
}

impl MemoryStream {
    /// 创建空流，容量按需增长。
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// 创建预留 `capacity` 字节的空流。
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id: StreamId::next(),
            data: BytesMut::with_capacity(capacity),
            disposed: false,
            lease: None,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// 当前已写入内容的只读视图。
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// 复制当前内容。
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// 当前是否持有某个池签发的租约。
    pub fn is_leased(&self) -> bool {
        self.lease.is_some()
    }

    pub(crate) fn attach_lease(&mut self, lease: Lease) {
        self.lease = Some(lease);
    }

    pub(crate) fn take_lease(&mut self) -> Option<Lease> {
        self.lease.take()
    }

    /// 在末尾追加字节。
    pub fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        self.ensure_live()?;
        self.data.put_slice(src);
        Ok(())
    }

    /// 调整内容长度：缩短时截断，加长时以 0 填充。
    ///
    /// 截断会真正丢弃尾部字节，后续写入从新的末尾开始，而不是仅仅移动读写位置。
    pub fn set_len(&mut self, len: usize) -> Result<()> {
        self.ensure_live()?;
        if len <= self.data.len() {
            self.data.truncate(len);
        } else {
            self.data.resize(len, 0);
        }
        Ok(())
    }

    /// 释放底层存储并将实例标记为失效；重复调用无副作用。
    pub fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.data = BytesMut::new();
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(PoolError::Disposed { stream: self.id })
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStream {
    fn default() -> Self {
        Self::new()
    }
}

impl io::Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ensure_live()?;
        Ok(())
    }
}
