//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImagePipeline` 是一次处理过程的显式上下文：配置、状态、元数据、行缓冲与规范像素
//! 都是它的字段，按引用在各阶段之间传递，没有任何全局可变状态。
//! 处理链路固定为：
//! 1. 读取元数据
//! 2. 分配行缓冲 → 解码 → 编组进规范像素 → 释放行缓冲
//! 3. 通道变换
//! 4. 写元数据 → 分配行缓冲 → 编组回行缓冲 → 编码 → 释放行缓冲
//! 5. 关闭并输出摘要
//!
//! ## 实现思路
//!
//! - 状态机严格单向推进，乱序调用返回用法错误。
//! - 任一阶段失败：进入终态 `Failed`，释放已获取的全部资源，错误附带失败阶段返回。
//! - 记录 `decode/transform/encode/total` 阶段耗时，便于性能诊断。

use std::fmt;
use std::time::{Duration, Instant};

use super::codec::{RowDecoder, RowEncoder};
use super::config::PipelineConfig;
use super::error::{PipelineError, Stage, StageError, UsageError};
use super::marshal::PixelMarshaler;
use super::metadata::{ColorMode, ImageMetadata};
use super::pixel::CanonicalPixelBuffer;
use super::rows::RowBufferManager;
use super::transform::{ChannelTransform, apply_transform};

/// 行缓冲服务于哪一趟处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Decode,
    Encode,
}

/// 流水线状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Unopened,
    MetadataRead,
    RowsAllocated(Pass),
    Decoded,
    Transformed,
    Encoded,
    Closed,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unopened => f.write_str("unopened"),
            Self::MetadataRead => f.write_str("metadata-read"),
            Self::RowsAllocated(Pass::Decode) => f.write_str("rows-allocated(decode)"),
            Self::RowsAllocated(Pass::Encode) => f.write_str("rows-allocated(encode)"),
            Self::Decoded => f.write_str("decoded"),
            Self::Transformed => f.write_str("transformed"),
            Self::Encoded => f.write_str("encoded"),
            Self::Closed => f.write_str("closed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// 各阶段耗时。
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    pub decode: Duration,
    pub transform: Duration,
    pub encode: Duration,
}

/// 一次成功运行的摘要。
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub width: u32,
    pub height: u32,
    pub pixel_count: u64,
    pub color_mode: ColorMode,
    pub timings: StageTimings,
}

/// 单次图像处理流水线。
pub struct ImagePipeline {
    config: PipelineConfig,
    marshaler: PixelMarshaler,
    state: PipelineState,
    metadata: Option<ImageMetadata>,
    rows: RowBufferManager,
    pixels: Option<CanonicalPixelBuffer>,
    timings: StageTimings,
}

impl ImagePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            marshaler: PixelMarshaler::new(config.trace_pixels),
            config,
            state: PipelineState::Unopened,
            metadata: None,
            rows: RowBufferManager::new(),
            pixels: None,
            timings: StageTimings::default(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn metadata(&self) -> Option<&ImageMetadata> {
        self.metadata.as_ref()
    }

    pub fn pixels(&self) -> Option<&CanonicalPixelBuffer> {
        self.pixels.as_ref()
    }

    /// 是否仍持有行缓冲。
    pub fn holds_rows(&self) -> bool {
        self.rows.is_allocated()
    }

    /// 一次性跑完整条流水线。
    ///
    /// # 示例
    /// ```rust
    /// use std::io::Cursor;
    /// use png_swizzle::pipeline::{
    ///     ImagePipeline, PipelineConfig, PngRowDecoder, PngRowEncoder, SwapRedBlue,
    /// };
    ///
    /// # fn demo(png: Vec<u8>) -> Result<(), png_swizzle::pipeline::StageError> {
    /// let config = PipelineConfig::default();
    /// let mut out = Vec::new();
    /// let mut decoder = PngRowDecoder::new(Cursor::new(png));
    /// let mut encoder = PngRowEncoder::new(&mut out, config.compression);
    ///
    /// let summary = ImagePipeline::new(config).run(&mut decoder, &mut encoder, &SwapRedBlue)?;
    /// println!("{} 像素", summary.pixel_count);
    /// # Ok(())
    /// # }
    /// ```
    pub fn run<D, E, T>(
        &mut self,
        decoder: &mut D,
        encoder: &mut E,
        transform: &T,
    ) -> Result<RunSummary, StageError>
    where
        D: RowDecoder + ?Sized,
        E: RowEncoder + ?Sized,
        T: ChannelTransform + ?Sized,
    {
        let total_start = Instant::now();

        self.read_metadata(decoder)?;
        self.decode(decoder)?;
        self.transform(transform)?;
        self.encode(encoder)?;
        let summary = self.close()?;

        log::info!(
            "✅ 流水线完成 - {}x{} {} decode={}ms transform={}ms encode={}ms total={}ms",
            summary.width,
            summary.height,
            summary.color_mode,
            summary.timings.decode.as_millis(),
            summary.timings.transform.as_millis(),
            summary.timings.encode.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(summary)
    }

    /// `Unopened → MetadataRead`
    pub fn read_metadata<D>(&mut self, decoder: &mut D) -> Result<ImageMetadata, StageError>
    where
        D: RowDecoder + ?Sized,
    {
        self.expect_state(PipelineState::Unopened, Stage::ReadMetadata)?;

        let metadata = self.guard(Stage::ReadMetadata, |_| decoder.read_metadata())?;

        log::info!(
            "🔎 读取元数据：{}x{} {} {} 位",
            metadata.width,
            metadata.height,
            metadata.color_mode,
            metadata.bit_depth
        );

        self.metadata = Some(metadata);
        self.state = PipelineState::MetadataRead;
        Ok(metadata)
    }

    /// `MetadataRead → RowsAllocated(Decode) → Decoded`
    pub fn decode<D>(&mut self, decoder: &mut D) -> Result<(), StageError>
    where
        D: RowDecoder + ?Sized,
    {
        self.expect_state(PipelineState::MetadataRead, Stage::AllocateRows)?;
        let metadata = self.current_metadata(Stage::AllocateRows)?;
        let start = Instant::now();

        self.guard(Stage::AllocateRows, |pipeline| {
            pipeline
                .config
                .check_decoded_limits(metadata.width, metadata.height)?;
            let stride = decoder.row_stride()?;
            pipeline.rows.allocate(stride, metadata.height as usize)?;
            Ok(())
        })?;
        self.state = PipelineState::RowsAllocated(Pass::Decode);

        self.guard(Stage::DecodeRows, |pipeline| {
            decoder.decode_into(pipeline.rows.rows_mut()?)
        })?;

        let pixels = self.guard(Stage::MarshalIn, |pipeline| {
            pipeline
                .marshaler
                .decode_rows(&metadata, pipeline.rows.rows()?)
        })?;

        self.rows.release();
        self.pixels = Some(pixels);
        self.timings.decode = start.elapsed();
        self.state = PipelineState::Decoded;
        Ok(())
    }

    /// `Decoded → Transformed`
    pub fn transform<T>(&mut self, transform: &T) -> Result<(), StageError>
    where
        T: ChannelTransform + ?Sized,
    {
        self.expect_state(PipelineState::Decoded, Stage::Transform)?;
        let start = Instant::now();

        self.guard(Stage::Transform, |pipeline| {
            let pixels = pipeline
                .pixels
                .as_mut()
                .ok_or(UsageError::OutOfOrder {
                    expected: PipelineState::Decoded,
                    actual: pipeline.state,
                })?;
            apply_transform(pixels.as_mut_slice(), transform, &pipeline.config);
            Ok(())
        })?;

        self.timings.transform = start.elapsed();
        log::debug!(
            "🎨 变换 {} 完成：{}ms",
            transform.name(),
            self.timings.transform.as_millis()
        );
        self.state = PipelineState::Transformed;
        Ok(())
    }

    /// `Transformed → RowsAllocated(Encode) → Encoded`
    pub fn encode<E>(&mut self, encoder: &mut E) -> Result<(), StageError>
    where
        E: RowEncoder + ?Sized,
    {
        self.expect_state(PipelineState::Transformed, Stage::WriteMetadata)?;
        let metadata = self.current_metadata(Stage::WriteMetadata)?;
        let start = Instant::now();

        self.guard(Stage::WriteMetadata, |_| encoder.write_metadata(&metadata))?;

        self.guard(Stage::AllocateRows, |pipeline| {
            let stride = encoder.row_stride()?;
            pipeline.rows.allocate(stride, metadata.height as usize)?;
            Ok(())
        })?;
        self.state = PipelineState::RowsAllocated(Pass::Encode);

        self.guard(Stage::MarshalOut, |pipeline| {
            let pixels = pipeline.pixels.as_ref().ok_or(UsageError::OutOfOrder {
                expected: PipelineState::Transformed,
                actual: pipeline.state,
            })?;
            let rows = pipeline.rows.rows_mut()?;
            pipeline.marshaler.encode_rows(&metadata, pixels, rows)
        })?;

        self.guard(Stage::EncodeRows, |pipeline| {
            encoder.encode_from(pipeline.rows.rows()?)
        })?;

        self.rows.release();
        self.timings.encode = start.elapsed();
        self.state = PipelineState::Encoded;
        Ok(())
    }

    /// `Encoded → Closed`，释放规范像素缓冲并返回摘要。
    pub fn close(&mut self) -> Result<RunSummary, StageError> {
        self.expect_state(PipelineState::Encoded, Stage::Close)?;
        let metadata = self.current_metadata(Stage::Close)?;

        self.rows.release();
        self.pixels = None;
        self.state = PipelineState::Closed;

        Ok(RunSummary {
            width: metadata.width,
            height: metadata.height,
            pixel_count: metadata.pixel_count(),
            color_mode: metadata.color_mode,
            timings: self.timings,
        })
    }

    /// 执行一个阶段；失败时转入 `Failed` 并释放资源。
    fn guard<R>(
        &mut self,
        stage: Stage,
        step: impl FnOnce(&mut Self) -> Result<R, PipelineError>,
    ) -> Result<R, StageError> {
        match step(self) {
            Ok(value) => Ok(value),
            Err(error) => {
                self.fail(stage, &error);
                Err(error.at(stage))
            }
        }
    }

    fn fail(&mut self, stage: Stage, error: &PipelineError) {
        log::error!("❌ 阶段 {} 失败（状态 {}）：{}", stage, self.state, error);
        self.rows.release();
        self.pixels = None;
        self.state = PipelineState::Failed;
    }

    fn expect_state(&mut self, expected: PipelineState, stage: Stage) -> Result<(), StageError> {
        if self.state == expected {
            return Ok(());
        }

        let error = PipelineError::from(UsageError::OutOfOrder {
            expected,
            actual: self.state,
        });
        // 已失败的流水线保持失败；其余情况同样按失败处理并释放资源
        self.fail(stage, &error);
        Err(error.at(stage))
    }

    fn current_metadata(&mut self, stage: Stage) -> Result<ImageMetadata, StageError> {
        match self.metadata {
            Some(metadata) => Ok(metadata),
            None => {
                let error = PipelineError::from(UsageError::OutOfOrder {
                    expected: PipelineState::MetadataRead,
                    actual: self.state,
                });
                self.fail(stage, &error);
                Err(error.at(stage))
            }
        }
    }
}

impl Drop for ImagePipeline {
    fn drop(&mut self) {
        if self.rows.is_allocated() {
            log::warn!("⚠️ 流水线在状态 {} 被丢弃，回收残留行缓冲", self.state);
            self.rows.release();
        }
    }
}
