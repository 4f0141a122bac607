//! # 加载与落盘模块
//!
//! ## 设计思路
//!
//! 在“尽可能早”的阶段执行输入校验（存在性、体积、PNG 签名），尽快失败。
//! 输出先写入同目录的临时文件，成功后再原子重命名，失败的运行不会留下半成品。

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::config::PipelineConfig;
use super::error::{FormatError, PipelineError, Stage, StageError};

const PARTIAL_SUFFIX: &str = "partial";

/// 读取源文件字节。
pub fn load_source(path: &Path, config: &PipelineConfig) -> Result<Vec<u8>, StageError> {
    log::info!("📁 开始读取源图片 - 路径: {}", path.display());

    let metadata = fs::metadata(path).map_err(|source| io_error(path, source).at(Stage::Load))?;

    if !metadata.is_file() {
        return Err(io_error(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "不是普通文件"),
        )
        .at(Stage::Load));
    }

    if metadata.len() > config.max_file_size {
        return Err(PipelineError::ResourceLimit(format!(
            "文件过大：{} 为 {:.2} MB（限制：{:.2} MB）",
            path.display(),
            metadata.len() as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        ))
        .at(Stage::Load));
    }

    let bytes = fs::read(path).map_err(|source| io_error(path, source).at(Stage::Load))?;
    validate_png_signature(&bytes).map_err(|e| PipelineError::from(e).at(Stage::Load))?;

    Ok(bytes)
}

/// 原子写出结果：临时文件 + 重命名。
pub fn store_output(path: &Path, bytes: &[u8]) -> Result<(), StageError> {
    let partial = partial_path(path);

    let result = write_all(&partial, bytes).and_then(|()| {
        fs::rename(&partial, path).map_err(|source| io_error(path, source))
    });

    if let Err(error) = result {
        // 尽力清理；清理失败不覆盖原始错误
        if partial.exists() {
            if let Err(cleanup) = fs::remove_file(&partial) {
                log::warn!("⚠️ 清理临时文件失败 {}：{}", partial.display(), cleanup);
            }
        }
        return Err(error.at(Stage::Store));
    }

    log::info!("💾 已写出 {} 字节 - 路径: {}", bytes.len(), path.display());
    Ok(())
}

/// 只接受 PNG 签名。
fn validate_png_signature(bytes: &[u8]) -> Result<(), FormatError> {
    if bytes.is_empty() {
        return Err(FormatError::NotRecognized("文件内容为空".to_string()));
    }

    if infer::image::is_png(bytes) {
        return Ok(());
    }

    Err(FormatError::NotRecognized(match infer::get(bytes) {
        Some(kind) => format!("文件签名为 {}，不是 PNG", kind.mime_type()),
        None => "文件签名无法识别".to_string(),
    }))
}

fn write_all(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let mut file = fs::File::create(path).map_err(|source| io_error(path, source))?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|source| io_error(path, source))
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

fn io_error(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn signature_accepts_png_magic() {
        assert!(validate_png_signature(&PNG_SIGNATURE).is_ok());
    }

    #[test]
    fn signature_rejects_other_images_and_text() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];
        assert!(matches!(
            validate_png_signature(&jpeg),
            Err(FormatError::NotRecognized(_))
        ));
        assert!(validate_png_signature(b"hello").is_err());
        assert!(validate_png_signature(&[]).is_err());
    }

    #[test]
    fn partial_path_is_a_sibling() {
        let partial = partial_path(Path::new("/tmp/out/result.png"));
        assert_eq!(partial, PathBuf::from("/tmp/out/result.png.partial"));
    }

    #[test]
    fn missing_source_is_io_error_at_load() {
        let path = std::env::temp_dir().join("png-swizzle-definitely-missing.png");
        let err = load_source(&path, &PipelineConfig::default()).expect_err("missing file");

        assert_eq!(err.stage, Stage::Load);
        assert!(matches!(err.error, PipelineError::Io { .. }));
    }
}
