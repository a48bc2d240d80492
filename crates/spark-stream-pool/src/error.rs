//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义流池与写入器对外暴露的失败语义，让“重复归还”“释放后使用”等调用方缺陷立即可见；
//! - 为每个变体提供稳定错误码，便于日志检索与告警聚合。
//!
//! ## 设计要求（What）
//! - 所有错误类型实现 `thiserror::Error`，可直接交给 `anyhow` 等上层框架处理；
//! - 池内部绝不吞掉这些错误：`give_back`/`close` 必须原样返回给调用方。

use std::io;

use thiserror::Error;

use crate::memory_stream::StreamId;

/// 稳定错误码，格式为 `pool.<阶段>.<原因>`。
pub mod codes {
    /// 归还或操作了已被释放（dispose）的内存流。
    pub const STREAM_DISPOSED: &str = "pool.stream.disposed";
    /// 归还的内存流并非由该池租出，或已被归还过。
    pub const RETURN_NOT_RENTED: &str = "pool.return.not_rented";
    /// 写入器已完成归还，拒绝继续写入。
    pub const WRITER_RELEASED: &str = "pool.writer.released";
    /// 配置字段不合法。
    pub const INVALID_CONFIG: &str = "pool.config.invalid";
}

/// 流池核心错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：区分“对象自身已失效”与“池不认识该对象的租约”两类误用，
///   前者来自对象自检，后者来自池签发的租约；两者都意味着调用方存在缺陷。
/// - **契约 (What)**：所有变体均为 `Send + Sync + 'static`，可安全跨线程传播；
///   通过 [`From<PoolError>`](From) 转换为 [`io::Error`]，以便在 `io::Write` 实现中使用 `?`。
/// - **设计权衡 (Trade-offs)**：失败的归还不会把对象交还给调用方，失效对象直接丢弃，
///   避免调用方“修好后再试”把脏数据带回池中。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum PoolError {
    /// 内存流已被其持有者释放，无法再写入或归还。
    #[error("memory stream {stream} has already been disposed")]
    Disposed { stream: StreamId },

    /// 内存流没有当前池签发的租约：从未租借，或来自其它池。
    #[error("memory stream {stream} is not currently rented from this pool")]
    NotRented { stream: StreamId },

    /// 写入器已经把内存流归还给池。
    #[error("writer has already returned its stream to the pool")]
    WriterReleased,

    /// 配置校验失败。
    #[error("invalid pool configuration `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
}

impl PoolError {
    /// 返回该错误对应的稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            PoolError::Disposed { .. } => codes::STREAM_DISPOSED,
            PoolError::NotRented { .. } => codes::RETURN_NOT_RENTED,
            PoolError::WriterReleased => codes::WRITER_RELEASED,
            PoolError::InvalidConfig { .. } => codes::INVALID_CONFIG,
        }
    }
}

impl From<PoolError> for io::Error {
    fn from(value: PoolError) -> Self {
        let kind = match value {
            PoolError::InvalidConfig { .. } => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, value)
    }
}

/// 流池操作的统一结果类型。
pub type Result<T, E = PoolError> = core::result::Result<T, E>;
