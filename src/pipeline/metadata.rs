//! # 图像元数据与通道布局表
//!
//! ## 设计思路
//!
//! 颜色模式到“每像素字节数 + 通道顺序”的映射集中在一张静态表里，
//! 解码与编码都查同一张表，避免三套并行的偏移计算彼此走样。
//!
//! 枚举同时列出了核心不支持的 PNG 模式（灰度+透明、调色板），
//! 让“不支持”可以被表达并被明确拒绝，而不是被猜测成某种已知布局。

use std::fmt;

use super::error::{FormatError, UsageError};

/// 核心唯一支持的每通道位深。
pub const SUPPORTED_BIT_DEPTH: u8 = 8;

/// 每个扫描行的像素通道布局。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorMode {
    Grayscale,
    Truecolor,
    TruecolorAlpha,
    /// 灰度 + 透明，核心不支持。
    GrayscaleAlpha,
    /// 调色板索引，核心不支持。
    Indexed,
}

impl ColorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Truecolor => "truecolor",
            Self::TruecolorAlpha => "truecolor-alpha",
            Self::GrayscaleAlpha => "grayscale-alpha",
            Self::Indexed => "indexed",
        }
    }

    /// 查询通道布局；不支持的模式返回 `None`。
    pub fn layout(self) -> Option<&'static ChannelLayout> {
        match self {
            Self::Grayscale => Some(&GRAYSCALE),
            Self::Truecolor => Some(&TRUECOLOR),
            Self::TruecolorAlpha => Some(&TRUECOLOR_ALPHA),
            Self::GrayscaleAlpha | Self::Indexed => None,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 行缓冲中的单个字节通道。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// 灰度样本：解码时广播到 R/G/B，编码时只取蓝色通道。
    Gray,
    Red,
    Green,
    Blue,
    Alpha,
}

/// 颜色模式的字节布局：每像素字节数与字节顺序。
#[derive(Debug, PartialEq, Eq)]
pub struct ChannelLayout {
    pub channels: &'static [Channel],
}

impl ChannelLayout {
    pub fn bytes_per_pixel(&self) -> usize {
        self.channels.len()
    }

    /// 一行有效像素占用的字节数（不含编解码器可能附加的填充）。
    pub fn row_bytes(&self, width: u32) -> Option<usize> {
        (width as usize).checked_mul(self.bytes_per_pixel())
    }

    pub fn has_alpha(&self) -> bool {
        self.channels.contains(&Channel::Alpha)
    }
}

static GRAYSCALE: ChannelLayout = ChannelLayout {
    channels: &[Channel::Gray],
};

static TRUECOLOR: ChannelLayout = ChannelLayout {
    channels: &[Channel::Red, Channel::Green, Channel::Blue],
};

static TRUECOLOR_ALPHA: ChannelLayout = ChannelLayout {
    channels: &[Channel::Red, Channel::Green, Channel::Blue, Channel::Alpha],
};

/// 图像元数据。从源图读取后不可变，输出沿用同一份。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub color_mode: ColorMode,
    pub bit_depth: u8,
}

impl ImageMetadata {
    /// 构建 8 位元数据，宽高必须为正。
    pub fn new(width: u32, height: u32, color_mode: ColorMode) -> Result<Self, UsageError> {
        if width == 0 || height == 0 {
            return Err(UsageError::InvalidDimensions { width, height });
        }

        Ok(Self {
            width,
            height,
            color_mode,
            bit_depth: SUPPORTED_BIT_DEPTH,
        })
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// 校验位深与颜色模式，返回可用的通道布局。
    pub fn supported_layout(&self) -> Result<&'static ChannelLayout, FormatError> {
        if self.bit_depth != SUPPORTED_BIT_DEPTH {
            return Err(FormatError::UnsupportedBitDepth(self.bit_depth));
        }

        self.color_mode
            .layout()
            .ok_or(FormatError::UnsupportedColorMode(self.color_mode))
    }
}
