use crate::vision::keypoint::KeyPoint;
use image::GrayImage;

/// Bresenham半径3圆周上的16个采样偏移
const CIRCLE_OFFSETS: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// 连续弧段的最小长度（FAST-9）
const MIN_ARC_LENGTH: usize = 9;

/// 检测FAST角点，带3x3非极大值抑制
pub fn detect_corners(image: &GrayImage, threshold: u8) -> Vec<KeyPoint> {
    let width = image.width() as i32;
    let height = image.height() as i32;
    if width < 7 || height < 7 {
        return Vec::new();
    }

    let mut responses = vec![0f32; (width * height) as usize];
    let mut candidates = Vec::new();

    for y in 3..height - 3 {
        for x in 3..width - 3 {
            if let Some(response) = corner_response(image, x, y, threshold) {
                responses[(y * width + x) as usize] = response;
                candidates.push((x, y, response));
            }
        }
    }

    // 非极大值抑制：只保留3x3邻域内响应最大的候选
    let mut corners = Vec::new();
    for (x, y, response) in candidates {
        let mut is_max = true;
        'nms: for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= width || ny >= height {
                    continue;
                }
                if responses[(ny * width + nx) as usize] > response {
                    is_max = false;
                    break 'nms;
                }
            }
        }
        if is_max {
            let mut kp = KeyPoint::new(x as f32, y as f32);
            kp.response = response;
            corners.push(kp);
        }
    }

    corners
}

/// 若该像素是角点则返回响应值（圆周绝对差之和）
fn corner_response(image: &GrayImage, x: i32, y: i32, threshold: u8) -> Option<f32> {
    let center = image.get_pixel(x as u32, y as u32)[0] as i32;
    let t = threshold as i32;

    let ring: Vec<i32> = CIRCLE_OFFSETS
        .iter()
        .map(|(dx, dy)| image.get_pixel((x + dx) as u32, (y + dy) as u32)[0] as i32)
        .collect();

    // 快速排除：长度9的连续弧段至少覆盖上下左右四点中的两个
    let cardinal = [ring[0], ring[4], ring[8], ring[12]];
    let brighter = cardinal.iter().filter(|&&p| p > center + t).count();
    let darker = cardinal.iter().filter(|&&p| p < center - t).count();
    if brighter < 2 && darker < 2 {
        return None;
    }

    if has_contiguous_arc(&ring, |p| p > center + t) || has_contiguous_arc(&ring, |p| p < center - t)
    {
        let response = ring.iter().map(|&p| (p - center).abs()).sum::<i32>() as f32;
        Some(response)
    } else {
        None
    }
}

/// 检查圆周上是否存在满足谓词的长度≥MIN_ARC_LENGTH的连续弧段
fn has_contiguous_arc(ring: &[i32], predicate: impl Fn(i32) -> bool) -> bool {
    let mut run = 0usize;
    // 环形遍历两圈以覆盖跨越起点的弧段
    for i in 0..ring.len() * 2 {
        if predicate(ring[i % ring.len()]) {
            run += 1;
            if run >= MIN_ARC_LENGTH {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 暗背景上的亮方块，四角应当被检出
    fn bright_square_image() -> GrayImage {
        let mut image = GrayImage::from_pixel(32, 32, image::Luma([10u8]));
        for y in 10..22 {
            for x in 10..22 {
                image.put_pixel(x, y, image::Luma([200u8]));
            }
        }
        image
    }

    #[test]
    fn detects_square_corners() {
        let corners = detect_corners(&bright_square_image(), 20);
        assert!(!corners.is_empty());
        // 所有检出的角点都应落在方块边界附近
        for kp in &corners {
            assert!(kp.x >= 8.0 && kp.x <= 23.0);
            assert!(kp.y >= 8.0 && kp.y <= 23.0);
        }
    }

    #[test]
    fn flat_image_has_no_corners() {
        let image = GrayImage::from_pixel(32, 32, image::Luma([128u8]));
        assert!(detect_corners(&image, 20).is_empty());
    }

    #[test]
    fn tiny_image_is_rejected() {
        let image = GrayImage::from_pixel(5, 5, image::Luma([0u8]));
        assert!(detect_corners(&image, 20).is_empty());
    }
}
