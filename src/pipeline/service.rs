//! # 文件级入口
//!
//! 串起“读取源文件 → 内存中跑完整条流水线 → 原子写出”，并记录各阶段耗时。
//! 编码结果先留在内存里，只有全部成功才会落盘。

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use super::codec::{PngRowDecoder, PngRowEncoder};
use super::config::PipelineConfig;
use super::error::{Stage, StageError};
use super::handler::{ImagePipeline, RunSummary};
use super::loader::{load_source, store_output};
use super::transform::ChannelTransform;

/// 处理单个文件：`input` 读入，变换后写到 `output`。
pub fn process_file<T>(
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
    transform: &T,
) -> Result<RunSummary, StageError>
where
    T: ChannelTransform + ?Sized,
{
    config.validate().map_err(|e| e.at(Stage::Load))?;
    let total_start = Instant::now();

    let load_start = Instant::now();
    let source = load_source(input, config)?;
    let load_elapsed = load_start.elapsed();

    let mut encoded = Vec::new();
    let summary = {
        let mut decoder = PngRowDecoder::with_limits(Cursor::new(source), decoder_limits(config));
        let mut encoder = PngRowEncoder::new(&mut encoded, config.compression);
        ImagePipeline::new(config.clone()).run(&mut decoder, &mut encoder, transform)?
    };

    let store_start = Instant::now();
    store_output(output, &encoded)?;
    let store_elapsed = store_start.elapsed();

    log::info!(
        "✅ 图片处理完成 - {} -> {} load={}ms decode={}ms transform={}ms encode={}ms store={}ms total={}ms",
        input.display(),
        output.display(),
        load_elapsed.as_millis(),
        summary.timings.decode.as_millis(),
        summary.timings.transform.as_millis(),
        summary.timings.encode.as_millis(),
        store_elapsed.as_millis(),
        total_start.elapsed().as_millis()
    );

    Ok(summary)
}

fn decoder_limits(config: &PipelineConfig) -> usize {
    usize::try_from(config.max_decoded_bytes).unwrap_or(usize::MAX)
}
