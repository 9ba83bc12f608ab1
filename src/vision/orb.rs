use crate::vision::fast::detect_corners;
use crate::vision::keypoint::{Descriptor, Features, KeyPoint};
use image::GrayImage;
use image::imageops::{FilterType, resize};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 描述子采样patch的半径（31x31 patch）
const PATCH_RADIUS: i32 = 15;
/// BRIEF点对数量，对应256位描述子
const PATTERN_SIZE: usize = 256;
/// 点对采样的固定随机种子，保证跨运行可复现
const PATTERN_SEED: u64 = 0x0e1b_5eed;

/// ORB特征提取参数
#[derive(Debug, Clone, Copy)]
pub struct OrbConfig {
    pub max_features: usize,
    pub n_levels: usize,
    pub scale_factor: f32,
    pub fast_threshold: u8,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            max_features: 500,
            n_levels: 8,
            scale_factor: 1.2,
            fast_threshold: 20,
        }
    }
}

/// ORB特征提取器：多尺度FAST + 方向化BRIEF描述子
pub struct OrbExtractor {
    config: OrbConfig,
    /// 预生成的BRIEF点对，patch内坐标
    pattern: Vec<[(i32, i32); 2]>,
}

impl OrbExtractor {
    pub fn new(config: OrbConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
        let pattern = (0..PATTERN_SIZE)
            .map(|_| {
                [
                    (
                        rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS),
                        rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    ),
                    (
                        rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS),
                        rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    ),
                ]
            })
            .collect();
        Self { config, pattern }
    }

    /// 提取特征点与描述子
    pub fn detect_and_compute(&self, image: &GrayImage) -> Features {
        let pyramid = self.build_pyramid(image);

        // (金字塔层, 层内坐标的特征点)
        let mut candidates: Vec<(usize, KeyPoint)> = Vec::new();
        for (level, level_image) in pyramid.iter().enumerate() {
            for mut kp in detect_corners(level_image, self.config.fast_threshold) {
                if !patch_in_bounds(level_image, kp.x as i32, kp.y as i32) {
                    continue;
                }
                kp.octave = level;
                candidates.push((level, kp));
            }
        }

        // 按响应强度保留最优的max_features个
        candidates.sort_by(|a, b| b.1.response.total_cmp(&a.1.response));
        candidates.truncate(self.config.max_features);

        let mut features = Features::default();
        for (level, mut kp) in candidates {
            let level_image = &pyramid[level];
            kp.angle = intensity_centroid_angle(level_image, kp.x as i32, kp.y as i32);
            let descriptor = self.steered_brief(level_image, &kp);

            // 坐标换算回第0层
            let scale = self.config.scale_factor.powi(level as i32);
            kp.x *= scale;
            kp.y *= scale;

            features.keypoints.push(kp);
            features.descriptors.push(descriptor);
        }

        debug!(
            "ORB提取完成: {} 个特征点（金字塔 {} 层）",
            features.len(),
            pyramid.len()
        );
        features
    }

    fn build_pyramid(&self, image: &GrayImage) -> Vec<GrayImage> {
        let mut pyramid = vec![image.clone()];
        for level in 1..self.config.n_levels {
            let scale = self.config.scale_factor.powi(level as i32);
            let w = (image.width() as f32 / scale).round() as u32;
            let h = (image.height() as f32 / scale).round() as u32;
            if w < 32 || h < 32 {
                break;
            }
            pyramid.push(resize(image, w, h, FilterType::Triangle));
        }
        pyramid
    }

    /// 按主方向旋转点对后采样的BRIEF描述子
    fn steered_brief(&self, image: &GrayImage, kp: &KeyPoint) -> Descriptor {
        let (sin, cos) = kp.angle.sin_cos();
        let cx = kp.x as i32;
        let cy = kp.y as i32;

        let mut bytes = [0u8; 32];
        for (bit, pair) in self.pattern.iter().enumerate() {
            let sample = |p: (i32, i32)| {
                let rx = (p.0 as f32 * cos - p.1 as f32 * sin).round() as i32;
                let ry = (p.0 as f32 * sin + p.1 as f32 * cos).round() as i32;
                pixel_clamped(image, cx + rx, cy + ry)
            };
            if sample(pair[0]) < sample(pair[1]) {
                bytes[bit / 8] |= 1 << (bit % 8);
            }
        }
        Descriptor(bytes)
    }
}

/// 灰度质心法计算特征点主方向
fn intensity_centroid_angle(image: &GrayImage, cx: i32, cy: i32) -> f32 {
    let mut m01 = 0f32;
    let mut m10 = 0f32;
    for dy in -PATCH_RADIUS..=PATCH_RADIUS {
        for dx in -PATCH_RADIUS..=PATCH_RADIUS {
            // 只统计圆形patch内的像素
            if dx * dx + dy * dy > PATCH_RADIUS * PATCH_RADIUS {
                continue;
            }
            let v = pixel_clamped(image, cx + dx, cy + dy) as f32;
            m10 += dx as f32 * v;
            m01 += dy as f32 * v;
        }
    }
    m01.atan2(m10)
}

fn patch_in_bounds(image: &GrayImage, x: i32, y: i32) -> bool {
    // 旋转后的点对最远可达 sqrt(2)*radius，留出裕量
    let margin = (PATCH_RADIUS as f32 * std::f32::consts::SQRT_2).ceil() as i32 + 1;
    x >= margin
        && y >= margin
        && x < image.width() as i32 - margin
        && y < image.height() as i32 - margin
}

#[inline]
fn pixel_clamped(image: &GrayImage, x: i32, y: i32) -> u8 {
    let x = x.clamp(0, image.width() as i32 - 1) as u32;
    let y = y.clamp(0, image.height() as i32 - 1) as u32;
    image.get_pixel(x, y)[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 暗背景上按网格排布的亮方块，方块四角提供充足的角点
    fn square_grid(size: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if x % 32 < 12 && y % 32 < 12 {
                image::Luma([230u8])
            } else {
                image::Luma([25u8])
            }
        })
    }

    #[test]
    fn extracts_features_from_square_grid() {
        let extractor = OrbExtractor::new(OrbConfig::default());
        let features = extractor.detect_and_compute(&square_grid(256));
        assert!(!features.is_empty());
        assert_eq!(features.keypoints.len(), features.descriptors.len());
        for kp in &features.keypoints {
            assert!(kp.x >= 0.0 && kp.x < 256.0);
            assert!(kp.y >= 0.0 && kp.y < 256.0);
        }
    }

    #[test]
    fn descriptors_are_deterministic() {
        let image = square_grid(128);
        let a = OrbExtractor::new(OrbConfig::default()).detect_and_compute(&image);
        let b = OrbExtractor::new(OrbConfig::default()).detect_and_compute(&image);
        assert_eq!(a.keypoints.len(), b.keypoints.len());
        assert_eq!(a.descriptors, b.descriptors);
    }

    #[test]
    fn respects_feature_cap() {
        let config = OrbConfig {
            max_features: 10,
            ..Default::default()
        };
        let features = OrbExtractor::new(config).detect_and_compute(&square_grid(256));
        assert!(features.len() <= 10);
    }
}
