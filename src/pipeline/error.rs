//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 流水线中的所有失败都归入四类：I/O、格式、资源、用法（外加编解码器内部的不透明错误）。
//! 底层函数只返回 `PipelineError`，由编排层在离开流水线时包上 `StageError`，
//! 这样诊断信息总能指出“哪一阶段、哪个值”出了问题。
//!
//! ## 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息，调用侧仍可按分支匹配。
//! - 格式错误与用法错误拆成独立枚举，测试可以精确断言具体原因。
//! - 所有错误一律致命：不重试、不局部恢复。

use std::fmt;
use std::path::PathBuf;

use super::handler::PipelineState;
use super::metadata::ColorMode;

/// 流水线统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 源文件不可读或目标文件不可写。
    #[error("文件错误：{}：{source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("格式错误：{0}")]
    Format(#[from] FormatError),

    /// 分配失败、尺寸溢出或超过配置上限。
    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("用法错误：{0}")]
    Usage(#[from] UsageError),

    /// 配置项超出允许范围或无法解析。
    #[error("配置错误：{0}")]
    Config(String),

    /// 编解码器在解码/编码过程中报告的结构性损坏。
    #[error("编解码错误：{0}")]
    Codec(String),
}

/// 格式类错误：签名不符、颜色模式或位深不受支持。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("不是可识别的 PNG 图片：{0}")]
    NotRecognized(String),

    #[error("不支持的颜色模式：{0}")]
    UnsupportedColorMode(ColorMode),

    #[error("不支持的位深：{0}（仅支持 8 位）")]
    UnsupportedBitDepth(u8),
}

/// 用法类错误：属于程序员错误，而不是输入数据的问题。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("行缓冲已分配，重复分配被拒绝（stride={stride}, rows={rows}）")]
    DoubleAllocation { stride: usize, rows: usize },

    #[error("行缓冲尚未分配或已释放")]
    RowsNotAllocated,

    #[error("行数不匹配：期望 {expected} 行，实际 {actual} 行")]
    RowCountMismatch { expected: usize, actual: usize },

    #[error("第 {row} 行长度不足：至少需要 {expected} 字节，实际 {actual} 字节")]
    RowTooShort {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("像素数量不匹配：期望 {expected}，实际 {actual}")]
    PixelCountMismatch { expected: usize, actual: usize },

    #[error("像素缓冲尺寸不匹配：期望 {}x{}，实际 {}x{}", .expected.0, .expected.1, .actual.0, .actual.1)]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("图像尺寸无效：{width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// 编解码器边界的调用顺序不对，例如重复读取元数据。
    #[error("编解码器调用顺序错误：{0}")]
    CodecMisuse(&'static str),

    #[error("阶段调用顺序错误：当前状态 {actual}，需要 {expected}")]
    OutOfOrder {
        expected: PipelineState,
        actual: PipelineState,
    },
}

/// 流水线阶段标识，用于诊断输出与耗时日志。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    ReadMetadata,
    AllocateRows,
    DecodeRows,
    MarshalIn,
    Transform,
    WriteMetadata,
    MarshalOut,
    EncodeRows,
    Close,
    Store,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::ReadMetadata => "read-metadata",
            Self::AllocateRows => "allocate-rows",
            Self::DecodeRows => "decode-rows",
            Self::MarshalIn => "marshal-in",
            Self::Transform => "transform",
            Self::WriteMetadata => "write-metadata",
            Self::MarshalOut => "marshal-out",
            Self::EncodeRows => "encode-rows",
            Self::Close => "close",
            Self::Store => "store",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 离开流水线的错误：附带失败阶段。
#[derive(Debug, thiserror::Error)]
#[error("[{stage}] {error}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}

impl PipelineError {
    /// 附加失败阶段。
    pub fn at(self, stage: Stage) -> StageError {
        StageError { stage, error: self }
    }
}

