//! # PNG 通道重排工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  main.rs   参数解析 · 日志初始化 · 退出码                 │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ Result<RunSummary, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↓            库 (Rust)                             │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  ├─ settings ─── JSON 设置文件 → PipelineConfig          │
//! │  └─ pipeline ─── 解码 · 编组 · 变换 · 编码               │
//! │      ├─ codec      PNG 行编解码器 (png · image)         │
//! │      ├─ rows       行缓冲 (RAII 释放)                    │
//! │      ├─ marshal    行布局 ↔ 规范像素 0xAARRGGBB          │
//! │      ├─ transform  逐像素变换 (rayon 可选并行)           │
//! │      └─ handler    状态机编排                             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，`main` 的唯一错误出口 |
//! | [`settings`] | 读取可选 JSON 设置文件并叠加到默认配置 |
//! | [`pipeline`] | 行缓冲管理、像素编组、通道变换、流水线状态机与文件级入口 |

pub mod error;
pub mod pipeline;
pub mod settings;
