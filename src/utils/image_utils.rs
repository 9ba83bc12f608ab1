use chrono::Local;
use image::{GrayImage, RgbImage};
use log::info;
use std::path::{Path, PathBuf};

/// 保存RGB图像为PNG，必要时创建输出目录
pub fn save_png<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<(), String> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("无法创建输出目录 {parent:?}: {e}"))?;
        }
    }
    image
        .save(path)
        .map_err(|e| format!("无法保存图像 {path:?}: {e}"))?;
    info!("图像已保存: {path:?}");
    Ok(())
}

/// 加载图像并转换为灰度
pub fn load_gray<P: AsRef<Path>>(path: P) -> Result<GrayImage, String> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|e| format!("无法打开图像 {path:?}: {e}"))?;
    Ok(image.to_luma8())
}

/// RGB图像转灰度（ITU-R BT.601加权）
pub fn rgb_to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let luma =
            0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
        image::Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// 组合输出路径；目标已存在时追加时间戳避免覆盖
pub fn unique_output_path(dir: &str, base: &str) -> PathBuf {
    let plain = Path::new(dir).join(format!("{base}.png"));
    if !plain.exists() {
        return plain;
    }
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    Path::new(dir).join(format!("{base}_{stamp}.png"))
}

/// 把RGB字节缓冲转换为egui纹理图像
pub fn rgb_bytes_to_color_image(width: usize, height: usize, bytes: &[u8]) -> egui::ColorImage {
    egui::ColorImage::from_rgb([width, height], bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_conversion_weights_channels() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        image.put_pixel(1, 0, image::Rgb([0, 255, 0]));
        let gray = rgb_to_gray(&image);
        // 绿色通道权重高于红色
        assert!(gray.get_pixel(1, 0)[0] > gray.get_pixel(0, 0)[0]);
    }

    #[test]
    fn color_image_preserves_pixels() {
        let bytes = [10u8, 20, 30, 40, 50, 60];
        let ci = rgb_bytes_to_color_image(2, 1, &bytes);
        assert_eq!(ci.size, [2, 1]);
        assert_eq!(ci.pixels[1], egui::Color32::from_rgb(40, 50, 60));
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = std::env::temp_dir().join("skullalign_img_test");
        let path = dir.join("sample.png");
        let image = RgbImage::from_pixel(4, 4, image::Rgb([128, 64, 32]));
        save_png(&image, &path).unwrap();
        let gray = load_gray(&path).unwrap();
        assert_eq!(gray.width(), 4);
        std::fs::remove_file(&path).ok();
    }
}
