//! # 规范像素
//!
//! 解码与编码之间统一使用的 32 位像素：`0xAARRGGBB`。

use std::fmt;

use super::error::{PipelineError, UsageError};

/// 四个 8 位通道：alpha(24..32) red(16..24) green(8..16) blue(0..8)。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct CanonicalPixel(pub u32);

impl CanonicalPixel {
    pub const fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// 灰度样本：alpha 固定 0xFF，R=G=B=gray。
    pub const fn from_gray(gray: u8) -> Self {
        Self::from_argb(0xFF, gray, gray, gray)
    }

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    pub const fn to_argb(self) -> [u8; 4] {
        [self.alpha(), self.red(), self.green(), self.blue()]
    }
}

impl fmt::Debug for CanonicalPixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for CanonicalPixel {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<CanonicalPixel> for u32 {
    fn from(pixel: CanonicalPixel) -> Self {
        pixel.0
    }
}

/// 行优先排列的规范像素缓冲：下标 = `y * width + x`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<CanonicalPixel>,
}

impl CanonicalPixelBuffer {
    /// 以 `fill` 预填充分配 `width * height` 个像素；分配失败为资源错误。
    pub fn try_filled(width: u32, height: u32, fill: CanonicalPixel) -> Result<Self, PipelineError> {
        let len = (width as usize).checked_mul(height as usize).ok_or_else(|| {
            PipelineError::ResourceLimit(format!("像素数量溢出：{}x{}", width, height))
        })?;

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|e| {
            PipelineError::ResourceLimit(format!(
                "无法分配 {} 像素的规范缓冲（{}x{}）：{}",
                len, width, height, e
            ))
        })?;
        pixels.resize(len, fill);

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// 由现成像素构建，长度必须等于 `width * height`。
    pub fn from_pixels(
        width: u32,
        height: u32,
        pixels: Vec<CanonicalPixel>,
    ) -> Result<Self, UsageError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(UsageError::PixelCountMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn get(&self, x: u32, y: u32) -> Option<CanonicalPixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn as_slice(&self) -> &[CanonicalPixel] {
        &self.pixels
    }

    pub fn as_mut_slice(&mut self) -> &mut [CanonicalPixel] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<CanonicalPixel> {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lanes_follow_argb_bit_positions() {
        let pixel = CanonicalPixel::from_argb(0x11, 0x22, 0x33, 0x44);

        assert_eq!(pixel.0, 0x1122_3344);
        assert_eq!(pixel.to_argb(), [0x11, 0x22, 0x33, 0x44]);
        assert_eq!(format!("{:?}", pixel), "0x11223344");
    }

    #[test]
    fn gray_broadcasts_to_rgb_with_opaque_alpha() {
        assert_eq!(CanonicalPixel::from_gray(7).0, 0xFF07_0707);
    }

    #[test]
    fn get_uses_row_major_index() {
        let pixels = (0..6).map(CanonicalPixel).collect();
        let buffer = CanonicalPixelBuffer::from_pixels(3, 2, pixels).expect("buffer");

        assert_eq!(buffer.get(1, 1), Some(CanonicalPixel(4)));
        assert_eq!(buffer.get(3, 0), None);
    }

    #[test]
    fn from_pixels_checks_length() {
        let result = CanonicalPixelBuffer::from_pixels(2, 2, vec![CanonicalPixel(0); 3]);
        assert_eq!(
            result,
            Err(UsageError::PixelCountMismatch {
                expected: 4,
                actual: 3
            })
        );
    }
}
