//! # 编解码器边界
//!
//! ## 设计思路
//!
//! 压缩流编解码器被视为黑盒，只通过四个动作与流水线交互：
//! 读元数据、解码进行缓冲、写元数据、从行缓冲编码。
//! `RowDecoder` / `RowEncoder` 两个 trait 描述这条边界：
//! 解码基于 `png`，编码基于 `image::codecs::png`。
//!
//! ## 实现思路
//!
//! - 解码不做任何样本变换（`Transformations::IDENTITY`），行缓冲就是 IHDR 描述的原生布局。
//!   颜色模式与位深都取自 IHDR，tRNS 不会把灰度或 RGB 展开成带 alpha 的布局。
//! - 隔行（Adam7）由 `png` 在解码时还原为逐行图像，输出一律不隔行。
//! - 非 8 位在读元数据时直接拒绝；调色板与灰度+alpha 照常上报，由编组阶段拒绝。
//! - 编解码器错误统一映射到 `PipelineError`：资源上限 → 资源错误，
//!   头部解析失败 → 格式错误，其余 → 编解码错误。

use std::io::{BufRead, Seek, Write};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::config::CompressionProfile;
use super::error::{FormatError, PipelineError, UsageError};
use super::metadata::{ColorMode, ImageMetadata, SUPPORTED_BIT_DEPTH};
use super::rows::RowBuffers;

/// 解码侧边界。
pub trait RowDecoder {
    /// 读取并校验头部信息。只能调用一次。
    fn read_metadata(&mut self) -> Result<ImageMetadata, PipelineError>;

    /// 编解码器报告的每行字节数。
    fn row_stride(&self) -> Result<usize, PipelineError>;

    /// 把全部扫描行解码进 `rows`。
    fn decode_into(&mut self, rows: &mut RowBuffers) -> Result<(), PipelineError>;
}

/// 编码侧边界。
pub trait RowEncoder {
    fn write_metadata(&mut self, metadata: &ImageMetadata) -> Result<(), PipelineError>;

    fn row_stride(&self) -> Result<usize, PipelineError>;

    /// 从 `rows` 编码全部扫描行并写出。
    fn encode_from(&mut self, rows: &RowBuffers) -> Result<(), PipelineError>;
}

/// 基于 `png` 的行解码器。
pub struct PngRowDecoder<R: BufRead + Seek> {
    source: Option<R>,
    reader: Option<png::Reader<R>>,
    max_bytes: usize,
    metadata: Option<ImageMetadata>,
    stride: usize,
}

impl<R: BufRead + Seek> PngRowDecoder<R> {
    pub fn new(source: R) -> Self {
        Self::with_limits(source, png::Limits::default().bytes)
    }

    /// `max_bytes`：解码过程中 `png` 允许分配的内存上限。
    pub fn with_limits(source: R, max_bytes: usize) -> Self {
        Self {
            source: Some(source),
            reader: None,
            max_bytes,
            metadata: None,
            stride: 0,
        }
    }
}

impl<R: BufRead + Seek> RowDecoder for PngRowDecoder<R> {
    fn read_metadata(&mut self) -> Result<ImageMetadata, PipelineError> {
        let source = self
            .source
            .take()
            .ok_or(UsageError::CodecMisuse("元数据已读取"))?;

        let mut limits = png::Limits::default();
        limits.bytes = self.max_bytes;
        let mut decoder = png::Decoder::new_with_limits(source, limits);
        decoder.set_transformations(png::Transformations::IDENTITY);
        let reader = decoder.read_info().map_err(map_header_error)?;

        let info = reader.info();
        let (width, height) = (info.width, info.height);
        let bit_depth = bit_depth_of(info.bit_depth)?;
        let color_mode = color_mode_of(info.color_type);

        let mut metadata = ImageMetadata::new(width, height, color_mode)?;
        metadata.bit_depth = bit_depth;

        let stride = (width as usize)
            .checked_mul(info.color_type.samples())
            .ok_or_else(|| {
                PipelineError::ResourceLimit(format!("行字节数超出地址空间：{}x{}", width, height))
            })?;

        log::debug!(
            "🔎 PNG 头部：{}x{} {:?} 隔行={} tRNS={} stride={}",
            width,
            height,
            info.color_type,
            info.interlaced,
            info.trns.is_some(),
            stride
        );

        self.stride = stride;
        self.metadata = Some(metadata);
        self.reader = Some(reader);
        Ok(metadata)
    }

    fn row_stride(&self) -> Result<usize, PipelineError> {
        if self.metadata.is_none() {
            return Err(UsageError::CodecMisuse("尚未读取元数据").into());
        }
        Ok(self.stride)
    }

    fn decode_into(&mut self, rows: &mut RowBuffers) -> Result<(), PipelineError> {
        let metadata = self
            .metadata
            .ok_or(UsageError::CodecMisuse("尚未读取元数据"))?;
        let mut reader = self
            .reader
            .take()
            .ok_or(UsageError::CodecMisuse("图像数据已解码"))?;

        check_row_shape(&metadata, self.stride, rows)?;
        reader
            .next_frame(rows.as_bytes_mut())
            .map_err(map_decode_error)?;
        Ok(())
    }
}

/// 基于 `image` 的 PNG 行编码器。
pub struct PngRowEncoder<W: Write> {
    sink: Option<W>,
    compression: CompressionProfile,
    metadata: Option<ImageMetadata>,
}

impl<W: Write> PngRowEncoder<W> {
    pub fn new(sink: W, compression: CompressionProfile) -> Self {
        Self {
            sink: Some(sink),
            compression,
            metadata: None,
        }
    }
}

impl<W: Write> RowEncoder for PngRowEncoder<W> {
    fn write_metadata(&mut self, metadata: &ImageMetadata) -> Result<(), PipelineError> {
        if self.metadata.is_some() {
            return Err(UsageError::CodecMisuse("元数据已写入").into());
        }

        metadata.supported_layout()?;
        self.metadata = Some(*metadata);
        Ok(())
    }

    fn row_stride(&self) -> Result<usize, PipelineError> {
        let metadata = self
            .metadata
            .ok_or(UsageError::CodecMisuse("尚未写入元数据"))?;
        let layout = metadata.supported_layout()?;

        layout.row_bytes(metadata.width).ok_or_else(|| {
            PipelineError::ResourceLimit(format!("行字节数溢出：width={}", metadata.width))
        })
    }

    fn encode_from(&mut self, rows: &RowBuffers) -> Result<(), PipelineError> {
        let metadata = self
            .metadata
            .ok_or(UsageError::CodecMisuse("尚未写入元数据"))?;
        let stride = self.row_stride()?;
        check_row_shape(&metadata, stride, rows)?;

        let sink = self
            .sink
            .take()
            .ok_or(UsageError::CodecMisuse("图像数据已编码"))?;
        let color = extended_color_of(metadata.color_mode)
            .ok_or(FormatError::UnsupportedColorMode(metadata.color_mode))?;
        let (compression, filter) = self.compression.encoder_params();

        PngEncoder::new_with_quality(sink, compression, filter)
            .write_image(rows.as_bytes(), metadata.width, metadata.height, color)
            .map_err(map_codec_error)
    }
}


/// 源文件的每通道位深。
fn bit_depth_of(depth: png::BitDepth) -> Result<u8, FormatError> {
    let depth = depth as u8;
    if depth != SUPPORTED_BIT_DEPTH {
        return Err(FormatError::UnsupportedBitDepth(depth));
    }
    Ok(depth)
}

fn color_mode_of(color: png::ColorType) -> ColorMode {
    match color {
        png::ColorType::Grayscale => ColorMode::Grayscale,
        png::ColorType::Rgb => ColorMode::Truecolor,
        png::ColorType::Rgba => ColorMode::TruecolorAlpha,
        png::ColorType::GrayscaleAlpha => ColorMode::GrayscaleAlpha,
        png::ColorType::Indexed => ColorMode::Indexed,
    }
}

fn extended_color_of(mode: ColorMode) -> Option<ExtendedColorType> {
    match mode {
        ColorMode::Grayscale => Some(ExtendedColorType::L8),
        ColorMode::Truecolor => Some(ExtendedColorType::Rgb8),
        ColorMode::TruecolorAlpha => Some(ExtendedColorType::Rgba8),
        ColorMode::GrayscaleAlpha | ColorMode::Indexed => None,
    }
}

fn check_row_shape(
    metadata: &ImageMetadata,
    stride: usize,
    rows: &RowBuffers,
) -> Result<(), UsageError> {
    if rows.len() != metadata.height as usize {
        return Err(UsageError::RowCountMismatch {
            expected: metadata.height as usize,
            actual: rows.len(),
        });
    }
    if rows.stride() != stride {
        return Err(UsageError::RowTooShort {
            row: 0,
            expected: stride,
            actual: rows.stride(),
        });
    }
    Ok(())
}

fn map_header_error(err: png::DecodingError) -> PipelineError {
    match err {
        png::DecodingError::LimitsExceeded => {
            PipelineError::ResourceLimit("PNG 头部超出解码内存上限".to_string())
        }
        other => FormatError::NotRecognized(other.to_string()).into(),
    }
}

fn map_decode_error(err: png::DecodingError) -> PipelineError {
    match err {
        png::DecodingError::LimitsExceeded => {
            PipelineError::ResourceLimit("解码超出内存上限".to_string())
        }
        other => PipelineError::Codec(other.to_string()),
    }
}

fn map_codec_error(err: image::ImageError) -> PipelineError {
    match err {
        image::ImageError::Limits(e) => PipelineError::ResourceLimit(e.to_string()),
        image::ImageError::Unsupported(e) => FormatError::NotRecognized(e.to_string()).into(),
        other => PipelineError::Codec(other.to_string()),
    }
}
