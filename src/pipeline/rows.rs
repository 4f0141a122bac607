//! # 行缓冲管理
//!
//! ## 设计思路
//!
//! 行缓冲是“一段连续内存 + 固定步长”的切片视图，按行号做越界检查后借出。
//! `RowBufferManager` 以整体为单位持有它：一次解码或编码过程分配一次、释放一次，
//! 不跨过程共享。
//!
//! ## 实现思路
//!
//! - 分配使用 `try_reserve_exact`，分配失败或 `stride * rows` 溢出都转为资源错误。
//! - 重复分配属于用法错误；释放是幂等的。
//! - `Option` 持有 + `Drop` 兜底，提前返回的错误路径也不会泄漏。

use super::error::{PipelineError, UsageError};

/// 一组等长扫描行，底层为一段连续字节。
#[derive(Debug)]
pub struct RowBuffers {
    bytes: Vec<u8>,
    stride: usize,
    rows: usize,
}

impl RowBuffers {
    /// 分配 `rows` 行、每行 `stride` 字节的缓冲（内容为零，但调用方不应依赖）。
    pub fn allocate(stride: usize, rows: usize) -> Result<Self, PipelineError> {
        let total = stride.checked_mul(rows).ok_or_else(|| {
            PipelineError::ResourceLimit(format!(
                "行缓冲尺寸溢出：stride={} rows={}",
                stride, rows
            ))
        })?;

        let mut bytes = Vec::new();
        bytes.try_reserve_exact(total).map_err(|e| {
            PipelineError::ResourceLimit(format!(
                "无法分配 {} 字节的行缓冲（stride={} rows={}）：{}",
                total, stride, rows, e
            ))
        })?;
        bytes.resize(total, 0);

        Ok(Self {
            bytes,
            stride,
            rows,
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row(&self, y: usize) -> Option<&[u8]> {
        if y >= self.rows {
            return None;
        }
        let start = y * self.stride;
        self.bytes.get(start..start + self.stride)
    }

    pub fn row_mut(&mut self, y: usize) -> Option<&mut [u8]> {
        if y >= self.rows {
            return None;
        }
        let start = y * self.stride;
        self.bytes.get_mut(start..start + self.stride)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        (0..self.rows).filter_map(move |y| self.row(y))
    }

    /// 全部行按顺序拼接后的字节（编解码器边界使用）。
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

/// 行缓冲的唯一持有者。
#[derive(Debug, Default)]
pub struct RowBufferManager {
    rows: Option<RowBuffers>,
}

impl RowBufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 分配一组行缓冲；已持有缓冲时拒绝。
    pub fn allocate(&mut self, stride: usize, rows: usize) -> Result<&mut RowBuffers, PipelineError> {
        if self.rows.is_some() {
            return Err(UsageError::DoubleAllocation { stride, rows }.into());
        }

        let buffers = RowBuffers::allocate(stride, rows)?;
        log::debug!("🧱 已分配行缓冲：{} 行 x {} 字节", rows, stride);

        Ok(self.rows.insert(buffers))
    }

    pub fn is_allocated(&self) -> bool {
        self.rows.is_some()
    }

    pub fn rows(&self) -> Result<&RowBuffers, UsageError> {
        self.rows.as_ref().ok_or(UsageError::RowsNotAllocated)
    }

    pub fn rows_mut(&mut self) -> Result<&mut RowBuffers, UsageError> {
        self.rows.as_mut().ok_or(UsageError::RowsNotAllocated)
    }

    /// 释放全部行缓冲。未持有时为空操作。
    pub fn release(&mut self) {
        if let Some(rows) = self.rows.take() {
            log::debug!("🧹 已释放行缓冲：{} 行", rows.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_returns_rows_of_exact_stride() {
        let mut manager = RowBufferManager::new();
        let rows = manager.allocate(12, 3).expect("allocate");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows.stride(), 12);
        assert!(rows.iter().all(|row| row.len() == 12));
        assert!(rows.row(3).is_none());
        assert_eq!(rows.as_bytes().len(), 36);
    }

    #[test]
    fn double_allocation_is_usage_error() {
        let mut manager = RowBufferManager::new();
        manager.allocate(4, 2).expect("first allocation");

        let result = manager.allocate(4, 2);
        assert!(matches!(
            result,
            Err(PipelineError::Usage(UsageError::DoubleAllocation { stride: 4, rows: 2 }))
        ));
    }

    #[test]
    fn release_is_idempotent_and_allows_reallocation() {
        let mut manager = RowBufferManager::new();
        manager.release();

        manager.allocate(3, 1).expect("allocate");
        manager.release();
        manager.release();

        assert!(!manager.is_allocated());
        assert_eq!(manager.rows().err(), Some(UsageError::RowsNotAllocated));
        manager.allocate(3, 1).expect("reallocate after release");
    }

    #[test]
    fn row_mut_writes_are_visible_in_flat_bytes() {
        let mut rows = RowBuffers::allocate(2, 2).expect("allocate");
        rows.row_mut(1).expect("row 1").copy_from_slice(&[9, 8]);

        assert_eq!(rows.as_bytes(), &[0, 0, 9, 8]);
    }

    #[test]
    fn overflowing_size_is_resource_error() {
        let result = RowBuffers::allocate(usize::MAX, 2);
        assert!(matches!(result, Err(PipelineError::ResourceLimit(_))));
    }
}
