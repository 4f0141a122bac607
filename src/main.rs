//! # PNG 通道重排工具 — 命令行入口
//!
//! 用法：`png-swizzle <输入.png> <输出.png>`
//!
//! 成功时输出一行摘要（像素数与尺寸）并以 0 退出；
//! 任何错误都以非零状态退出，并输出带失败阶段的诊断信息。

use std::path::PathBuf;
use std::process::ExitCode;

use png_swizzle::error::AppError;
use png_swizzle::pipeline::{RunSummary, SwapRedBlue, process_file};
use png_swizzle::settings;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(summary) => {
            println!(
                "处理成功：共 {} 个像素，图像尺寸 {} x {}",
                summary.pixel_count, summary.width, summary.height
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("处理失败: {err}");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<RunSummary, AppError> {
    let (input, output) = parse_args(std::env::args_os().skip(1))?;
    let config = settings::resolve_config()?;

    Ok(process_file(&input, &output, &config, &SwapRedBlue)?)
}

fn parse_args(
    mut args: impl Iterator<Item = std::ffi::OsString>,
) -> Result<(PathBuf, PathBuf), AppError> {
    match (args.next(), args.next(), args.next()) {
        (Some(input), Some(output), None) => Ok((PathBuf::from(input), PathBuf::from(output))),
        _ => Err(AppError::Usage(format!(
            "{} <输入.png> <输出.png>",
            env!("CARGO_BIN_NAME")
        ))),
    }
}
