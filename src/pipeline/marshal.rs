//! # 像素编组模块
//!
//! ## 设计思路
//!
//! 在“编解码器原生行布局”与“规范像素数组”之间双向搬运，是整条流水线唯一有实质语义的部分：
//! 识别颜色模式、按模式计算字节偏移、保留 alpha，并且严格可逆
//! （不做变换时，解码再编码必须逐字节还原行缓冲）。
//!
//! ## 实现思路
//!
//! 1. 先校验位深、颜色模式与缓冲尺寸，任何前置条件不满足都在分配规范缓冲之前失败。
//! 2. 两个方向各只有一个通用例程，按 `ChannelLayout` 表逐通道读写。
//! 3. 灰度编码只取蓝色通道作为灰度样本：解码把灰度广播到三个通道，编码只回读一个。
//!    因此只改红/绿通道的变换对灰度图不可见，改蓝色通道的变换才会生效。

use super::error::{PipelineError, UsageError};
use super::metadata::{Channel, ChannelLayout, ImageMetadata};
use super::pixel::{CanonicalPixel, CanonicalPixelBuffer};
use super::rows::RowBuffers;

/// 行缓冲 ↔ 规范像素的双向编组器，不持有任何跨调用状态。
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelMarshaler {
    /// 逐像素输出 trace 日志（仅在 trace 级别开启时生效）。
    pub trace_pixels: bool,
}

impl PixelMarshaler {
    pub fn new(trace_pixels: bool) -> Self {
        Self { trace_pixels }
    }

    /// 行缓冲 → 规范像素缓冲。
    pub fn decode_rows(
        &self,
        metadata: &ImageMetadata,
        rows: &RowBuffers,
    ) -> Result<CanonicalPixelBuffer, PipelineError> {
        let layout = metadata.supported_layout()?;
        let row_bytes = check_rows(metadata, layout, rows)?;

        let mut buffer =
            CanonicalPixelBuffer::try_filled(metadata.width, metadata.height, CanonicalPixel(0))?;
        let width = metadata.width as usize;
        let bpp = layout.bytes_per_pixel();
        let trace = self.tracing();

        for (y, (row, out)) in rows
            .iter()
            .zip(buffer.as_mut_slice().chunks_exact_mut(width))
            .enumerate()
        {
            for (x, (bytes, pixel)) in row[..row_bytes]
                .chunks_exact(bpp)
                .zip(out.iter_mut())
                .enumerate()
            {
                *pixel = read_pixel(layout, bytes);
                if trace {
                    log::trace!("读取像素 {:?} 位于 ({}, {})", pixel, x, y);
                }
            }
        }

        Ok(buffer)
    }

    /// 规范像素缓冲 → 行缓冲，按与解码相同的偏移写回。
    pub fn encode_rows(
        &self,
        metadata: &ImageMetadata,
        pixels: &CanonicalPixelBuffer,
        rows: &mut RowBuffers,
    ) -> Result<(), PipelineError> {
        let layout = metadata.supported_layout()?;
        let row_bytes = check_rows(metadata, layout, rows)?;

        if pixels.width() != metadata.width || pixels.height() != metadata.height {
            return Err(UsageError::DimensionMismatch {
                expected: (metadata.width, metadata.height),
                actual: (pixels.width(), pixels.height()),
            }
            .into());
        }

        let width = metadata.width as usize;
        let bpp = layout.bytes_per_pixel();
        let trace = self.tracing();

        for (y, src) in pixels.as_slice().chunks_exact(width).enumerate() {
            let row = rows
                .row_mut(y)
                .ok_or(UsageError::RowCountMismatch {
                    expected: metadata.height as usize,
                    actual: y,
                })?;

            for (x, (bytes, pixel)) in row[..row_bytes]
                .chunks_exact_mut(bpp)
                .zip(src.iter())
                .enumerate()
            {
                write_pixel(layout, *pixel, bytes);
                if trace {
                    log::trace!("写入像素 {:?} 位于 ({}, {})", pixel, x, y);
                }
            }
        }

        Ok(())
    }

    fn tracing(&self) -> bool {
        self.trace_pixels && log::log_enabled!(log::Level::Trace)
    }
}

/// 校验行数与每行长度，返回一行有效像素占用的字节数。
fn check_rows(
    metadata: &ImageMetadata,
    layout: &ChannelLayout,
    rows: &RowBuffers,
) -> Result<usize, PipelineError> {
    if metadata.width == 0 || metadata.height == 0 {
        return Err(UsageError::InvalidDimensions {
            width: metadata.width,
            height: metadata.height,
        }
        .into());
    }

    let expected_rows = metadata.height as usize;
    if rows.len() != expected_rows {
        return Err(UsageError::RowCountMismatch {
            expected: expected_rows,
            actual: rows.len(),
        }
        .into());
    }

    let row_bytes = layout.row_bytes(metadata.width).ok_or_else(|| {
        PipelineError::ResourceLimit(format!("行字节数溢出：width={}", metadata.width))
    })?;

    // 所有行等长，检查步长即可覆盖每一行
    if rows.stride() < row_bytes {
        return Err(UsageError::RowTooShort {
            row: 0,
            expected: row_bytes,
            actual: rows.stride(),
        }
        .into());
    }

    Ok(row_bytes)
}

fn read_pixel(layout: &ChannelLayout, bytes: &[u8]) -> CanonicalPixel {
    let (mut a, mut r, mut g, mut b) = (0xFF, 0, 0, 0);

    for (channel, &byte) in layout.channels.iter().zip(bytes) {
        match channel {
            Channel::Gray => {
                r = byte;
                g = byte;
                b = byte;
            }
            Channel::Red => r = byte,
            Channel::Green => g = byte,
            Channel::Blue => b = byte,
            Channel::Alpha => a = byte,
        }
    }

    CanonicalPixel::from_argb(a, r, g, b)
}

fn write_pixel(layout: &ChannelLayout, pixel: CanonicalPixel, bytes: &mut [u8]) {
    for (channel, slot) in layout.channels.iter().zip(bytes.iter_mut()) {
        *slot = match channel {
            // 蓝色通道即灰度样本
            Channel::Gray => pixel.blue(),
            Channel::Red => pixel.red(),
            Channel::Green => pixel.green(),
            Channel::Blue => pixel.blue(),
            Channel::Alpha => pixel.alpha(),
        };
    }
}
