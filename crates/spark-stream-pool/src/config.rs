use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};

/// 写入器内部字符缓冲的默认阈值（8 KiB），超过后编码结果才落入内存流。
pub const DEFAULT_WRITER_BUFFER_SIZE: usize = 8 * 1024;

/// `PoolConfig` 描述 [`MemoryStreamPool`](crate::MemoryStreamPool) 的构造参数。
///
/// # 契约说明（What）
/// - `stream_capacity`：工厂新建内存流时预留的字节数，0 表示按需增长；
/// - `writer_buffer_size`：写入器在编码前累积的字节阈值，必须大于 0；
/// - `prefill`：池创建时预先构造的空闲流数量。
///
/// 支持从 TOML 等格式反序列化，缺省字段取默认值：
///
/// ```toml
/// stream_capacity = 4096
/// prefill = 2
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    pub stream_capacity: usize,
    pub writer_buffer_size: usize,
    pub prefill: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            stream_capacity: 0,
            writer_buffer_size: DEFAULT_WRITER_BUFFER_SIZE,
            prefill: 0,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity;
        self
    }

    pub fn with_writer_buffer_size(mut self, size: usize) -> Self {
        self.writer_buffer_size = size;
        self
    }

    pub fn with_prefill(mut self, count: usize) -> Self {
        self.prefill = count;
        self
    }

    /// 校验字段取值。
    pub fn validate(&self) -> Result<()> {
        if self.writer_buffer_size == 0 {
            return Err(PoolError::InvalidConfig {
                field: "writer_buffer_size",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}
