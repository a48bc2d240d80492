//! `spark-stream-pool` 提供可复用的内存字节流池，以及结束时自动归还流的文本写入器。
//!
//! # 模块定位（Why）
//! - 构建与代码生成流程会反复在内存中拼装文本再落盘，每次新建缓冲都要从零增长容量；
//!   池化 [`MemoryStream`] 让已增长的容量在多次使用之间复用；
//! - 归还时机交给 [`PooledStreamWriter`] 的结束阶段，调用方无需在每条退出路径上手动归还。
//!
//! # 设计概要（How）
//! - `object_pool` 模块实现通用 [`ObjectPool`]：工厂闭包 + 重置钩子 + 自旋锁保护的自由链表；
//! - `stream_pool` 模块在其上特化出 [`MemoryStreamPool`]，增加随流移动的租约与进程级共享实例；
//! - `writer` 模块实现 [`PooledStreamWriter`]，以 `Option` 的一次性 `take` 保证流至多归还一次。
//!
//! # 使用示例
//!
//! ```
//! use spark_stream_pool::MemoryStreamPool;
//!
//! let pool = MemoryStreamPool::new();
//! let mut writer = pool.create_writer();
//! writer.write_text("hello").unwrap();
//! assert_eq!(writer.contents().unwrap(), b"hello");
//! writer.close().unwrap();
//! assert_eq!(pool.idle_len(), 1);
//! ```
//!
//! # 命名约定（Consistency）
//! - `return` 是 Rust 关键字，归还操作统一命名为 `give_back`。

mod config;
mod encoding;
mod error;
mod memory_stream;
mod object_pool;
mod stats;
mod stream_pool;
mod writer;

pub use config::{DEFAULT_WRITER_BUFFER_SIZE, PoolConfig};
pub use encoding::TextEncoding;
pub use error::{PoolError, Result, codes};
pub use memory_stream::{MemoryStream, StreamId};
pub use object_pool::ObjectPool;
pub use stats::PoolStats;
pub use stream_pool::MemoryStreamPool;
pub use writer::PooledStreamWriter;
