use core::fmt;

use tracing::{debug, error, warn};

use crate::{
    encoding::TextEncoding,
    error::{PoolError, Result},
    memory_stream::{MemoryStream, StreamId},
    stream_pool::MemoryStreamPool,
};

/// `PooledStreamWriter` 是绑定一个租借流的文本写入器，结束时自动把流归还给池。
///
/// # 设计动机（Why）
/// - 调用方只关心“写文本”，不应手动记住归还流；把归还挂在写入器的结束阶段，
///   正常返回、提前 `return`、`?` 传播以及 panic 展开都会走同一条路径；
/// - 写入器从不自行释放底层流：流的生死由池负责，写入器只负责把它交回去。
///
/// # 结构设计（How）
/// - `stream: Option<MemoryStream>` 即一次性释放标志：`take()` 成功的那一次才会调用
///   [`MemoryStreamPool::give_back`]，之后恒为 `None`；
/// - `pending` 累积已编码字节，超过阈值或 `flush` 时才写入流；
/// - 字节序标记仅在流为空时、于首次刷新写出一次。
///
/// # 契约说明（What）
/// - [`close`](Self::close) 可重复调用：每次都会执行刷新（释放后为空操作），
///   只有第一次会与池交互，后续调用直接返回 `Ok(())`；
/// - `Drop` 执行同样的结束逻辑；此时错误无法向上传播，只记录 `error` 日志，绝不 panic；
/// - 释放后写入返回 [`PoolError::WriterReleased`]。
///
/// # 风险提示（Trade-offs）
/// - 通过 `Drop` 归还时归还错误只能落入日志；需要感知误用的调用方应显式调用 `close`。
pub struct PooledStreamWriter<'p> {
    pool: &'p MemoryStreamPool,
    stream: Option<MemoryStream>,
    encoding: TextEncoding,
    pending: Vec<u8>,
    buffer_size: usize,
    preamble_pending: bool,
}

impl<'p> PooledStreamWriter<'p> {
    /// 将 `stream` 包装为写入器；`stream` 应当刚从 `pool` 租出。
    pub fn new(pool: &'p MemoryStreamPool, stream: MemoryStream, encoding: TextEncoding) -> Self {
        let buffer_size = pool.config().writer_buffer_size.max(1);
        let preamble_pending = !encoding.preamble().is_empty() && stream.is_empty();
        Self {
            pool,
            stream: Some(stream),
            encoding,
            pending: Vec::with_capacity(buffer_size),
            buffer_size,
            preamble_pending,
        }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// 是否已把流归还给池。
    pub fn is_released(&self) -> bool {
        self.stream.is_none()
    }

    /// 当前持有的流编号；释放后为 `None`。
    pub fn stream_id(&self) -> Option<StreamId> {
        self.stream.as_ref().map(MemoryStream::id)
    }

    /// 追加文本。
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        if self.stream.is_none() {
            return Err(PoolError::WriterReleased);
        }
        self.encoding.encode_into(text, &mut self.pending);
        if self.pending.len() >= self.buffer_size {
            self.flush()?;
        }
        Ok(())
    }

    /// 追加文本与换行符。
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        self.write_text(text)?;
        self.write_text("\n")
    }

    /// 把缓冲的字节写入流；释放后为空操作。
    pub fn flush(&mut self) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };
        if self.preamble_pending {
            stream.write_bytes(self.encoding.preamble())?;
            self.preamble_pending = false;
        }
        if !self.pending.is_empty() {
            stream.write_bytes(&self.pending)?;
            self.pending.clear();
        }
        Ok(())
    }

    /// 刷新后借出流内容；借用在 `close` 之前结束，调用方无法在归还后继续读取。
    pub fn contents(&mut self) -> Result<&[u8]> {
        self.flush()?;
        self.stream
            .as_ref()
            .map(MemoryStream::as_bytes)
            .ok_or(PoolError::WriterReleased)
    }

    /// 刷新并把流归还给池；可重复调用。
    ///
    /// 刷新失败时仍会尝试归还，返回首个错误。
    pub fn close(&mut self) -> Result<()> {
        let flushed = self.flush();
        let returned = match self.stream.take() {
            Some(stream) => {
                self.pending.clear();
                debug!(stream_id = stream.id().get(), "writer returning stream to pool");
                self.pool.give_back(stream)
            }
            None => Ok(()),
        };
        flushed.and(returned)
    }
}

/// 供 `write!`/`writeln!` 使用。
///
/// `fmt::Error` 不携带原因：失败时先以 `warn!` 记录错误码再转换，
/// 需要拿到 [`PoolError`] 的调用方应改用 [`write_text`](PooledStreamWriter::write_text)。
impl fmt::Write for PooledStreamWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_text(s).map_err(|err| {
            warn!(
                stream_id = self.stream_id().map(|id| id.get()),
                code = err.code(),
                "formatted write rejected: {err}"
            );
            fmt::Error
        })
    }
}

impl fmt::Debug for PooledStreamWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledStreamWriter")
            .field("stream", &self.stream_id())
            .field("encoding", &self.encoding)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Drop for PooledStreamWriter<'_> {
    fn drop(&mut self) {
        if self.stream.is_none() {
            return;
        }
        if std::thread::panicking() {
            warn!("writer dropped during unwinding, returning stream to pool");
        }
        if let Err(err) = self.close() {
            error!(code = err.code(), "failed to return pooled stream on drop: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use core::fmt::Write as _;

    use tracing_test::traced_test;

    use super::*;
    use crate::{config::PoolConfig, error::codes};

    #[test]
    fn pending_bytes_spill_at_threshold() {
        let pool = MemoryStreamPool::with_config(PoolConfig::new().with_writer_buffer_size(4))
            .expect("配置合法");
        let mut writer = pool.create_writer();
        writer.write_text("abc").expect("写入");
        assert_eq!(writer.pending.len(), 3);
        writer.write_text("de").expect("写入");
        assert!(writer.pending.is_empty(), "达到阈值后应写入流");
        assert_eq!(writer.contents().expect("读取内容"), b"abcde");
    }

    #[test]
    fn preamble_is_written_once() {
        let pool = MemoryStreamPool::new();
        let mut writer = pool.create_writer_with(TextEncoding::Utf8WithBom);
        writer.write_text("a").expect("写入");
        writer.flush().expect("刷新");
        writer.write_text("b").expect("写入");
        assert_eq!(writer.contents().expect("读取内容"), b"\xEF\xBB\xBFab");
    }

    #[test]
    fn fmt_macros_write_through() {
        let pool = MemoryStreamPool::new();
        let mut writer = pool.create_writer();
        write!(writer, "{}-{}", 1, "two").expect("格式化写入");
        assert_eq!(writer.contents().expect("读取内容"), b"1-two");
    }

    #[test]
    fn released_writer_rejects_writes() {
        let pool = MemoryStreamPool::new();
        let mut writer = pool.create_writer();
        writer.close().expect("关闭");
        assert_eq!(writer.write_text("x"), Err(PoolError::WriterReleased));
        assert!(write!(writer, "x").is_err());
        assert_eq!(writer.contents(), Err(PoolError::WriterReleased));
        assert!(writer.flush().is_ok());
    }

    #[test]
    #[traced_test]
    fn formatted_write_after_close_logs_error_code() {
        let pool = MemoryStreamPool::new();
        let mut writer = pool.create_writer();
        writer.close().expect("关闭");
        assert_eq!(write!(writer, "{}", 42), Err(fmt::Error));
        assert!(logs_contain("formatted write rejected"));
        assert!(logs_contain(codes::WRITER_RELEASED));
    }

    #[test]
    #[traced_test]
    fn drop_logs_rejected_return_instead_of_panicking() {
        let pool = MemoryStreamPool::new();
        let writer = PooledStreamWriter::new(&pool, MemoryStream::new(), TextEncoding::Utf8);
        drop(writer);
        assert!(logs_contain("failed to return pooled stream on drop"));
        assert!(logs_contain(codes::RETURN_NOT_RENTED));
        assert_eq!(pool.idle_len(), 0);
    }
}
