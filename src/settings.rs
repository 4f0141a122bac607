//! # 设置文件
//!
//! 可选的 JSON 设置文件，覆盖 `PipelineConfig` 的默认值。
//! 文件路径由环境变量 `PNG_SWIZZLE_CONFIG` 指定；未设置时使用默认配置。
//!
//! ```json
//! {
//!   "compression": "smallest",
//!   "max_decoded_pixels": 40000000,
//!   "parallel_transform": false
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::pipeline::{CompressionProfile, PipelineConfig};

/// 指定设置文件路径的环境变量。
pub const CONFIG_ENV: &str = "PNG_SWIZZLE_CONFIG";

/// 设置文件内容；缺省字段沿用默认配置。
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    pub max_file_size: Option<u64>,
    pub max_decoded_pixels: Option<u64>,
    pub max_decoded_bytes: Option<u64>,
    pub compression: Option<String>,
    pub parallel_transform: Option<bool>,
    pub parallel_min_pixels: Option<usize>,
    pub parallel_chunk_pixels: Option<usize>,
    pub trace_pixels: Option<bool>,
}

impl PipelineSettings {
    pub fn from_json(content: &str) -> Result<Self, AppError> {
        serde_json::from_str(content)
            .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::Settings(format!("读取设置文件失败 {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// 叠加到 `config` 上并做范围校验。
    pub fn apply(&self, config: &mut PipelineConfig) -> Result<(), AppError> {
        if let Some(value) = self.max_file_size {
            config.max_file_size = value;
        }
        if let Some(value) = self.max_decoded_pixels {
            config.max_decoded_pixels = value;
        }
        if let Some(value) = self.max_decoded_bytes {
            config.max_decoded_bytes = value;
        }
        if let Some(profile) = &self.compression {
            config.compression = CompressionProfile::from_str(profile)
                .map_err(|e| AppError::Settings(e.to_string()))?;
        }
        if let Some(value) = self.parallel_transform {
            config.parallel_transform = value;
        }
        if let Some(value) = self.parallel_min_pixels {
            config.parallel_min_pixels = value;
        }
        if let Some(value) = self.parallel_chunk_pixels {
            config.parallel_chunk_pixels = value;
        }
        if let Some(value) = self.trace_pixels {
            config.trace_pixels = value;
        }

        config
            .validate()
            .map_err(|e| AppError::Settings(e.to_string()))
    }
}

/// 默认配置 + 环境变量指定的设置文件。
pub fn resolve_config() -> Result<PipelineConfig, AppError> {
    let mut config = PipelineConfig::default();

    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => {
            let path = Path::new(&path);
            log::info!("⚙️ 加载设置文件: {}", path.display());
            PipelineSettings::load(path)?.apply(&mut config)?;
        }
        _ => log::debug!("未设置 {}，使用默认配置", CONFIG_ENV),
    }

    log::debug!(
        "⚙️ 生效配置：compression={} parallel={} max_pixels={} max_bytes={}",
        config.compression.as_str(),
        config.parallel_transform,
        config.max_decoded_pixels,
        config.max_decoded_bytes
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_keeps_defaults() {
        let mut config = PipelineConfig::default();
        PipelineSettings::from_json("{}")
            .expect("parse")
            .apply(&mut config)
            .expect("apply");

        assert_eq!(config.compression, CompressionProfile::Balanced);
        assert!(config.parallel_transform);
    }

    #[test]
    fn overrides_are_applied() {
        let mut config = PipelineConfig::default();
        PipelineSettings::from_json(
            r#"{"compression":"fast","parallel_transform":false,"max_decoded_pixels":1024}"#,
        )
        .expect("parse")
        .apply(&mut config)
        .expect("apply");

        assert_eq!(config.compression, CompressionProfile::Fast);
        assert!(!config.parallel_transform);
        assert_eq!(config.max_decoded_pixels, 1024);
    }

    #[test]
    fn unknown_fields_and_bad_values_are_rejected() {
        assert!(matches!(
            PipelineSettings::from_json(r#"{"colour":"red"}"#),
            Err(AppError::Settings(_))
        ));

        let mut config = PipelineConfig::default();
        let result = PipelineSettings::from_json(r#"{"parallel_chunk_pixels":0}"#)
            .expect("parse")
            .apply(&mut config);
        assert!(matches!(result, Err(AppError::Settings(_))));

        let result = PipelineSettings::from_json(r#"{"compression":"ultra"}"#)
            .expect("parse")
            .apply(&mut config);
        assert!(matches!(result, Err(AppError::Settings(_))));
    }
}
