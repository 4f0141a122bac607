//! # 图像处理流水线（pipeline）
//!
//! ## 设计思路
//!
//! 该模块将“读元数据 → 分配行缓冲 → 解码 → 编组 → 变换 → 反编组 → 编码 → 释放”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `metadata`：颜色模式、元数据与通道布局表
//! - `rows`：行缓冲与其唯一持有者 `RowBufferManager`
//! - `pixel`：规范像素与规范像素缓冲
//! - `marshal`：行缓冲 ↔ 规范像素的双向编组（核心）
//! - `transform`：逐像素通道变换
//! - `codec`：编解码器边界与 PNG 实现
//! - `handler`：状态机编排
//! - `loader` / `service`：文件读写与文件级入口
//! - `config/error`：配置、错误
//!
//! ## 新同事快速上手
//!
//! ```text
//! main.rs（参数解析 + 日志初始化）
//!    ↓
//! service.rs（文件级入口 + 阶段耗时日志）
//!    ├─ loader.rs（读取 + 体积/签名校验）
//!    ├─ handler.rs（状态机）
//!    │    ├─ codec.rs（PNG 解码/编码）
//!    │    ├─ rows.rs（行缓冲）
//!    │    ├─ marshal.rs（编组）
//!    │    └─ transform.rs（变换）
//!    └─ loader.rs（原子写出）
//!    ↓
//! 返回 StageError（带失败阶段）给调用方
//! ```

mod codec;
mod config;
mod error;
mod handler;
mod loader;
mod marshal;
mod metadata;
mod pixel;
mod rows;
mod service;
mod transform;

pub use codec::{PngRowDecoder, PngRowEncoder, RowDecoder, RowEncoder};
pub use config::{CompressionProfile, PipelineConfig};
pub use error::{FormatError, PipelineError, Stage, StageError, UsageError};
pub use handler::{ImagePipeline, Pass, PipelineState, RunSummary, StageTimings};
pub use loader::{load_source, store_output};
pub use marshal::PixelMarshaler;
pub use metadata::{Channel, ChannelLayout, ColorMode, ImageMetadata, SUPPORTED_BIT_DEPTH};
pub use pixel::{CanonicalPixel, CanonicalPixelBuffer};
pub use rows::{RowBufferManager, RowBuffers};
pub use service::process_file;
pub use transform::{ChannelTransform, Identity, SwapRedBlue, apply_transform};
