use criterion::{Criterion, black_box};
use spark_stream_pool::{MemoryStream, MemoryStreamPool};
use std::{env, time::Duration};

/// 租借/归还基准：对比池化流与每次新建流的开销。
///
/// # 逻辑解析（How）
/// - `pooled_writer`：通过写入器写入 1 KiB 文本并归还，容量在迭代间复用；
/// - `fresh_stream`：每次新建 `MemoryStream` 写入同样数据后丢弃，作为对照组。
fn bench_rent_return(c: &mut Criterion) {
    let pool = MemoryStreamPool::new();
    let line = "x".repeat(1024);

    c.bench_function("pooled_writer", |b| {
        b.iter(|| {
            let mut writer = pool.create_writer();
            writer.write_text(&line).unwrap();
            black_box(writer.contents().unwrap().len());
            writer.close().unwrap();
        });
    });

    c.bench_function("fresh_stream", |b| {
        b.iter(|| {
            let mut stream = MemoryStream::new();
            stream.write_bytes(line.as_bytes()).unwrap();
            black_box(stream.len())
        });
    });
}

fn main() {
    let mut quick_mode = false;
    for arg in env::args().skip(1) {
        if arg == "--quick" {
            quick_mode = true;
        }
    }

    let mut criterion = Criterion::default();
    if quick_mode {
        criterion = criterion
            .sample_size(10)
            .warm_up_time(Duration::from_millis(100))
            .measurement_time(Duration::from_millis(250));
    }

    bench_rent_return(&mut criterion);
    criterion.final_summary();
}
