//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `PipelineConfig`：资源上限、压缩档位、并行变换阈值。
//! 压缩档位（fast / balanced / smallest）作为高层语义，映射到编码器的具体参数组合。
//!
//! ## 实现思路
//!
//! - `Default` 提供可直接使用的平衡配置。
//! - `CompressionProfile` 负责档位字符串解析与反向输出。
//! - `validate` 做范围校验，配置文件与代码构造走同一套规则。

use image::codecs::png::{CompressionType, FilterType};

use super::PipelineError;

/// 流水线配置。
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 读取源文件时允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按规范像素 4 字节估算）。
    pub max_decoded_bytes: u64,
    /// 输出 PNG 的压缩档位。
    pub compression: CompressionProfile,
    /// 是否允许并行执行通道变换。
    pub parallel_transform: bool,
    /// 像素数达到该值才走并行路径。
    pub parallel_min_pixels: usize,
    /// 并行时每个任务处理的像素数。
    pub parallel_chunk_pixels: usize,
    /// 逐像素 trace 日志。
    pub trace_pixels: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_size: 256 * 1024 * 1024,
            max_decoded_pixels: 100_000_000,
            max_decoded_bytes: 512 * 1024 * 1024,
            compression: CompressionProfile::Balanced,
            parallel_transform: true,
            parallel_min_pixels: 1 << 20,
            parallel_chunk_pixels: 64 * 1024,
            trace_pixels: false,
        }
    }
}

impl PipelineConfig {
    /// 范围校验。
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_file_size == 0 {
            return Err(PipelineError::Config("max_file_size 必须大于 0".to_string()));
        }
        if self.max_decoded_pixels == 0 {
            return Err(PipelineError::Config(
                "max_decoded_pixels 必须大于 0".to_string(),
            ));
        }
        if self.max_decoded_bytes < 4 {
            return Err(PipelineError::Config(
                "max_decoded_bytes 至少要容纳一个像素（4 字节）".to_string(),
            ));
        }
        if self.parallel_chunk_pixels == 0 {
            return Err(PipelineError::Config(
                "parallel_chunk_pixels 必须大于 0".to_string(),
            ));
        }
        Ok(())
    }

    /// 校验像素数量与预计内存是否超过上限。
    pub fn check_decoded_limits(&self, width: u32, height: u32) -> Result<(), PipelineError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| PipelineError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > self.max_decoded_pixels {
            return Err(PipelineError::ResourceLimit(format!(
                "图片像素过大：{}x{} = {} 像素（限制：{} 像素）",
                width, height, pixels, self.max_decoded_pixels
            )));
        }

        let estimated = pixels
            .checked_mul(4)
            .ok_or_else(|| PipelineError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

        if estimated > self.max_decoded_bytes {
            return Err(PipelineError::ResourceLimit(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                self.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }
}

/// 输出压缩档位。
///
/// - `Fast`：优先编码速度
/// - `Balanced`：速度与体积平衡
/// - `Smallest`：尽量减小体积
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionProfile {
    Fast,
    Balanced,
    Smallest,
}

impl CompressionProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use png_swizzle::pipeline::CompressionProfile;
    ///
    /// let p = CompressionProfile::from_str("Smallest")?;
    /// assert_eq!(p.as_str(), "smallest");
    /// # Ok::<(), png_swizzle::pipeline::PipelineError>(())
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(profile: &str) -> Result<Self, PipelineError> {
        match profile.trim().to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "smallest" => Ok(Self::Smallest),
            other => Err(PipelineError::Config(format!(
                "未知压缩档位：{}（可选：fast / balanced / smallest）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Smallest => "smallest",
        }
    }

    /// 映射为 PNG 编码器参数。
    pub(crate) fn encoder_params(self) -> (CompressionType, FilterType) {
        match self {
            Self::Fast => (CompressionType::Fast, FilterType::NoFilter),
            Self::Balanced => (CompressionType::Default, FilterType::Adaptive),
            Self::Smallest => (CompressionType::Best, FilterType::Adaptive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_strings_round_trip() {
        for profile in [
            CompressionProfile::Fast,
            CompressionProfile::Balanced,
            CompressionProfile::Smallest,
        ] {
            assert_eq!(
                CompressionProfile::from_str(profile.as_str()).expect("parse"),
                profile
            );
        }
        assert!(CompressionProfile::from_str(" FAST ").is_ok());
        assert!(CompressionProfile::from_str("ultra").is_err());
    }

    #[test]
    fn default_config_is_valid() {
        PipelineConfig::default().validate().expect("default config");
    }

    #[test]
    fn rejects_too_many_pixels() {
        let config = PipelineConfig {
            max_decoded_pixels: 1_000_000,
            ..PipelineConfig::default()
        };

        assert!(config.check_decoded_limits(1000, 1000).is_ok());
        assert!(matches!(
            config.check_decoded_limits(2000, 2000),
            Err(PipelineError::ResourceLimit(_))
        ));
    }

    #[test]
    fn rejects_estimated_memory_over_budget() {
        let config = PipelineConfig {
            max_decoded_bytes: 1024,
            ..PipelineConfig::default()
        };

        assert!(config.check_decoded_limits(16, 16).is_ok());
        assert!(config.check_decoded_limits(17, 16).is_err());
    }
}
