//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义进程级统一的 `AppError` 枚举：命令行用法、设置文件、流水线错误都汇聚到这里，
//! `main` 只需要一个出口决定退出码与诊断输出。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `StageError` 提供 `From` 转换，无需手动 map。

use crate::pipeline::StageError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 命令行参数不正确
    #[error("用法：{0}")]
    Usage(String),

    /// 图片处理流水线错误（已附带失败阶段）
    #[error("{0}")]
    Pipeline(#[from] StageError),

    /// 设置文件不可读、不可解析或取值越界
    #[error("设置错误: {0}")]
    Settings(String),
}
