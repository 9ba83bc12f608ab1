use atomic_float::AtomicF32;
use nalgebra::Vector3;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU8, Ordering};

/// 支持多线程写入的帧缓冲
///
/// 颜色按RGB三通道的AtomicU8存放，深度为AtomicF32，
/// 光栅化线程通过compare_exchange完成深度测试后写入颜色。
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    color: Vec<AtomicU8>,
    depth: Vec<AtomicF32>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let pixel_count = width * height;
        let color = (0..pixel_count * 3).map(|_| AtomicU8::new(0)).collect();
        let depth = (0..pixel_count)
            .map(|_| AtomicF32::new(f32::INFINITY))
            .collect();
        Self {
            width,
            height,
            color,
            depth,
        }
    }

    /// 以背景色清空颜色缓冲并重置深度
    pub fn clear(&self, background: [u8; 3]) {
        self.color
            .par_chunks(3)
            .for_each(|pixel| {
                for (c, &bg) in pixel.iter().zip(background.iter()) {
                    c.store(bg, Ordering::Relaxed);
                }
            });
        self.depth
            .par_iter()
            .for_each(|d| d.store(f32::INFINITY, Ordering::Relaxed));
    }

    #[inline]
    pub fn pixel_index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// 深度测试通过时写入颜色，返回是否写入
    ///
    /// 深度采用循环compare_exchange，保证并发下只保留最近片元。
    pub fn write_pixel_if_closer(&self, index: usize, depth: f32, rgb: [u8; 3]) -> bool {
        let slot = &self.depth[index];
        let mut current = slot.load(Ordering::Relaxed);
        loop {
            if depth >= current {
                return false;
            }
            match slot.compare_exchange_weak(current, depth, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        let base = index * 3;
        self.color[base].store(rgb[0], Ordering::Relaxed);
        self.color[base + 1].store(rgb[1], Ordering::Relaxed);
        self.color[base + 2].store(rgb[2], Ordering::Relaxed);
        true
    }

    /// 无深度测试直接写入
    pub fn write_pixel(&self, index: usize, rgb: [u8; 3]) {
        let base = index * 3;
        self.color[base].store(rgb[0], Ordering::Relaxed);
        self.color[base + 1].store(rgb[1], Ordering::Relaxed);
        self.color[base + 2].store(rgb[2], Ordering::Relaxed);
    }

    /// 导出为连续RGB字节数组
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.color.iter().map(|c| c.load(Ordering::Relaxed)).collect()
    }

    /// 读取单个像素（测试与调试用）
    pub fn pixel_rgb(&self, x: usize, y: usize) -> [u8; 3] {
        let base = self.pixel_index(x, y) * 3;
        [
            self.color[base].load(Ordering::Relaxed),
            self.color[base + 1].load(Ordering::Relaxed),
            self.color[base + 2].load(Ordering::Relaxed),
        ]
    }

    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        self.depth[self.pixel_index(x, y)].load(Ordering::Relaxed)
    }
}

/// 把[0,1]线性颜色转换为背景填充用的RGB字节
pub fn background_bytes(color: &Vector3<f32>, apply_gamma: bool) -> [u8; 3] {
    crate::utils::color_utils::linear_rgb_to_u8(color, apply_gamma)
}
