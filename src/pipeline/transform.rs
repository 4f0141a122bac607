//! # 通道变换
//!
//! ## 设计思路
//!
//! 变换是规范像素上的纯函数：逐像素、无跨像素状态、与遍历顺序无关，
//! 因此可以在不相交的区间上并行执行，只需要在编码前等待全部完成。
//!
//! ## 实现思路
//!
//! - `ChannelTransform` 约束为 `Sync`，闭包也可以直接当作变换使用。
//! - `apply_transform` 按配置选择顺序执行或 `rayon` 分块并行；返回即全部完成。

use rayon::prelude::*;

use super::config::PipelineConfig;
use super::pixel::CanonicalPixel;

/// 逐像素通道变换。
pub trait ChannelTransform: Sync {
    fn apply(&self, pixel: CanonicalPixel) -> CanonicalPixel;

    /// 用于日志的名称。
    fn name(&self) -> &'static str {
        "custom"
    }
}

impl<F> ChannelTransform for F
where
    F: Fn(CanonicalPixel) -> CanonicalPixel + Sync,
{
    fn apply(&self, pixel: CanonicalPixel) -> CanonicalPixel {
        self(pixel)
    }
}

/// 交换红、蓝通道：`(A,R,G,B) → (A,B,G,R)`。
///
/// 自反（应用两次还原），对 R=B 的像素（包括所有灰度来源的像素）无影响。
#[derive(Debug, Clone, Copy, Default)]
pub struct SwapRedBlue;

impl ChannelTransform for SwapRedBlue {
    #[inline]
    fn apply(&self, pixel: CanonicalPixel) -> CanonicalPixel {
        let v = pixel.0;
        CanonicalPixel((v & 0xFF00_FF00) | (v.rotate_left(16) & 0x00FF_00FF))
    }

    fn name(&self) -> &'static str {
        "swap-red-blue"
    }
}

/// 原样返回。
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl ChannelTransform for Identity {
    #[inline]
    fn apply(&self, pixel: CanonicalPixel) -> CanonicalPixel {
        pixel
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

/// 对整个缓冲原地应用变换。返回时所有像素都已处理完毕。
pub fn apply_transform<T>(pixels: &mut [CanonicalPixel], transform: &T, config: &PipelineConfig)
where
    T: ChannelTransform + ?Sized,
{
    let parallel = config.parallel_transform && pixels.len() >= config.parallel_min_pixels;

    if parallel {
        let chunk = config.parallel_chunk_pixels.max(1);
        log::debug!(
            "🧵 并行变换 {}：{} 像素，分块 {}",
            transform.name(),
            pixels.len(),
            chunk
        );
        pixels.par_chunks_mut(chunk).for_each(|chunk| {
            for pixel in chunk {
                *pixel = transform.apply(*pixel);
            }
        });
    } else {
        for pixel in pixels.iter_mut() {
            *pixel = transform.apply(*pixel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_red_blue_matches_lane_definition() {
        let pixel = CanonicalPixel::from_argb(0x80, 10, 20, 30);
        assert_eq!(
            SwapRedBlue.apply(pixel),
            CanonicalPixel::from_argb(0x80, 30, 20, 10)
        );
    }

    #[test]
    fn swap_red_blue_leaves_gray_untouched() {
        let gray = CanonicalPixel::from_gray(7);
        assert_eq!(SwapRedBlue.apply(gray), gray);
    }

    #[test]
    fn parallel_and_sequential_results_agree() {
        let source: Vec<CanonicalPixel> = (0..10_000u32)
            .map(|i| CanonicalPixel(i.wrapping_mul(2_654_435_761)))
            .collect();

        let sequential_config = PipelineConfig {
            parallel_transform: false,
            ..PipelineConfig::default()
        };
        let parallel_config = PipelineConfig {
            parallel_transform: true,
            parallel_min_pixels: 1,
            parallel_chunk_pixels: 333,
            ..PipelineConfig::default()
        };

        let mut sequential = source.clone();
        apply_transform(&mut sequential, &SwapRedBlue, &sequential_config);
        let mut parallel = source.clone();
        apply_transform(&mut parallel, &SwapRedBlue, &parallel_config);

        assert_eq!(sequential, parallel);
        assert_ne!(sequential, source);
    }

    #[test]
    fn closures_are_transforms() {
        let keep_blue_only = |p: CanonicalPixel| CanonicalPixel(p.0 & 0xFF00_00FF);
        let mut pixels = vec![CanonicalPixel(0xFF11_2233)];

        apply_transform(&mut pixels, &keep_blue_only, &PipelineConfig::default());
        assert_eq!(pixels, vec![CanonicalPixel(0xFF00_0033)]);
    }
}
