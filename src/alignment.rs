use crate::core::renderer::Renderer;
use crate::geometry::camera::Camera;
use crate::io::obj_loader::{Mesh, load_obj, resolve_model_path};
use crate::io::render_settings::{RenderSettings, parse_point3, parse_vec3};
use crate::scene::scene_object::{SceneObject, Transformable};
use crate::utils::image_utils::{load_gray, rgb_to_gray, save_png};
use crate::vision::homography::{
    RansacParams, find_homography_ransac, homography_to_object_transform,
};
use crate::vision::matcher::{match_descriptors, retain_best_matches};
use crate::vision::orb::{OrbConfig, OrbExtractor};
use image::GrayImage;
use log::{info, warn};
use nalgebra::{Matrix3, Matrix4, Vector2};
use std::path::{Path, PathBuf};

/// 默认参考图像路径
pub const DEFAULT_REFERENCE: &str = "resources/principal.png";

/// 配准流程的结果
#[derive(Debug)]
pub struct AlignmentOutcome {
    /// 参考图像到渲染视图的单应性
    pub homography: Matrix3<f64>,
    /// RANSAC内点掩码，与筛选后的匹配一一对应
    pub inlier_mask: Vec<bool>,
    /// 参与估计的匹配对数
    pub matches_used: usize,
    /// 初始渲染图路径
    pub initial_image_path: PathBuf,
    /// 配准后渲染图路径
    pub aligned_image_path: PathBuf,
}

/// 按配置加载模型并做归一化
pub fn load_scene_mesh(settings: &RenderSettings) -> Result<Mesh, String> {
    let query = settings
        .obj
        .as_deref()
        .ok_or("未指定OBJ文件路径")?;
    let path = resolve_model_path(query, &settings.model_dir)?;
    let mut mesh = load_obj(path)?;
    mesh.normalize_and_center();
    Ok(mesh)
}

/// 按配置构建相机：设定初始位姿后绕目标做方位角与仰角旋转，
/// 再按包围球调整距离使模型充满视野
pub fn build_camera(settings: &RenderSettings, bounding_radius: f32) -> Result<Camera, String> {
    let position = parse_point3(&settings.camera_from)
        .map_err(|e| format!("相机位置解析失败: {e}"))?;
    let target = parse_point3(&settings.camera_at)
        .map_err(|e| format!("相机目标解析失败: {e}"))?;
    let up = parse_vec3(&settings.camera_up)
        .map_err(|e| format!("相机上方向解析失败: {e}"))?;

    let aspect = settings.width as f32 / settings.height as f32;
    let mut camera = Camera::new_perspective(
        position,
        target,
        up,
        settings.camera_fov,
        aspect,
        0.01,
        100.0,
    );
    camera.azimuth(settings.camera_azimuth);
    camera.elevation(settings.camera_elevation);
    camera.reset_distance(bounding_radius);
    Ok(camera)
}

/// 无界面渲染一帧并按配置名保存，可附加初始姿态变换
pub fn run_headless_snapshot(
    settings: &RenderSettings,
    initial_transform: Option<Matrix4<f32>>,
) -> Result<PathBuf, String> {
    let mesh = load_scene_mesh(settings)?;
    let object = SceneObject::new(settings.output.clone())
        .with_transform(initial_transform.unwrap_or_else(Matrix4::identity));
    let camera = build_camera(settings, mesh.bounding_radius())?;
    let renderer = Renderer::new(settings.width, settings.height);

    let image = renderer.render_to_image(&mesh, &object, &camera, settings)?;
    let path = Path::new(&settings.output_dir).join(format!("{}.png", settings.output));
    save_png(&image, &path)?;
    Ok(path)
}

/// 完整配准流程：渲染初始视角，与参考图做ORB匹配，
/// 估计单应性并施加到模型后重新渲染
pub fn run_alignment(settings: &RenderSettings) -> Result<AlignmentOutcome, String> {
    let reference_path = settings.reference.as_deref().unwrap_or(DEFAULT_REFERENCE);
    let reference = load_gray(reference_path)?;

    let mesh = load_scene_mesh(settings)?;
    let mut object = SceneObject::new(settings.output.clone());
    let camera = build_camera(settings, mesh.bounding_radius())?;
    let renderer = Renderer::new(settings.width, settings.height);

    let initial = renderer.render_to_image(&mesh, &object, &camera, settings)?;
    let initial_path =
        Path::new(&settings.output_dir).join(format!("{}_initial.png", settings.output));
    save_png(&initial, &initial_path)?;

    let rendered_gray = rgb_to_gray(&initial);
    let estimate = estimate_view_homography(&rendered_gray, &reference, settings)?;

    log_homography(&estimate.0);
    info!(
        "内点掩码 ({}/{}): {}",
        estimate.1.iter().filter(|&&b| b).count(),
        estimate.1.len(),
        format_inlier_mask(&estimate.1)
    );

    // 把图像平面的单应性提升为物体的全局变换后重新渲染
    let object_transform = homography_to_object_transform(&estimate.0);
    object.apply_global(object_transform);

    let aligned = renderer.render_to_image(&mesh, &object, &camera, settings)?;
    let aligned_path =
        Path::new(&settings.output_dir).join(format!("{}_aligned.png", settings.output));
    save_png(&aligned, &aligned_path)?;

    Ok(AlignmentOutcome {
        homography: estimate.0,
        inlier_mask: estimate.1,
        matches_used: estimate.2,
        initial_image_path: initial_path,
        aligned_image_path: aligned_path,
    })
}

/// 估计参考图像到渲染视图的单应性
///
/// 返回(单应性, 内点掩码, 匹配对数)。
pub fn estimate_view_homography(
    rendered: &GrayImage,
    reference: &GrayImage,
    settings: &RenderSettings,
) -> Result<(Matrix3<f64>, Vec<bool>, usize), String> {
    let extractor = OrbExtractor::new(OrbConfig {
        max_features: settings.orb_features,
        n_levels: settings.orb_levels,
        scale_factor: settings.orb_scale_factor,
        fast_threshold: settings.fast_threshold,
    });

    let rendered_features = extractor.detect_and_compute(rendered);
    let reference_features = extractor.detect_and_compute(reference);
    info!(
        "特征提取: 渲染图 {} 个，参考图 {} 个",
        rendered_features.len(),
        reference_features.len()
    );
    if rendered_features.len() < 4 || reference_features.len() < 4 {
        return Err("特征点过少，无法估计单应性".to_string());
    }

    let all_matches = match_descriptors(&reference_features, &rendered_features);
    let matches = retain_best_matches(all_matches, settings.match_keep_ratio);
    if matches.len() < 4 {
        return Err(format!(
            "筛选后匹配对数不足: {} 对（至少需要4对）",
            matches.len()
        ));
    }

    let src: Vec<Vector2<f64>> = matches
        .iter()
        .map(|m| {
            let kp = &reference_features.keypoints[m.query_idx];
            Vector2::new(kp.x as f64, kp.y as f64)
        })
        .collect();
    let dst: Vec<Vector2<f64>> = matches
        .iter()
        .map(|m| {
            let kp = &rendered_features.keypoints[m.train_idx];
            Vector2::new(kp.x as f64, kp.y as f64)
        })
        .collect();

    let params = RansacParams {
        threshold: settings.ransac_threshold,
        max_iterations: settings.ransac_max_iterations,
        confidence: settings.ransac_confidence,
    };
    let estimate = find_homography_ransac(&src, &dst, &params)?;

    let inlier_count = estimate.inlier_count();
    if inlier_count * 2 < matches.len() {
        warn!(
            "内点比例偏低: {}/{}，配准结果可能不可靠",
            inlier_count,
            matches.len()
        );
    }

    Ok((estimate.matrix, estimate.inlier_mask, matches.len()))
}

/// 内点掩码转为0/1字符串，便于日志输出
fn format_inlier_mask(mask: &[bool]) -> String {
    mask.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

fn log_homography(h: &Matrix3<f64>) {
    info!("估计的单应性矩阵:");
    for row in 0..3 {
        info!(
            "  [{:+.6}, {:+.6}, {:+.6}]",
            h[(row, 0)],
            h[(row, 1)],
            h[(row, 2)]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 种子化的随机纹理，角点丰富且描述子互不重复
    fn noise_image(size: u32) -> GrayImage {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut image = GrayImage::new(size, size);
        for p in image.pixels_mut() {
            p[0] = rng.random_range(0..=255u8);
        }
        image
    }

    #[test]
    fn blank_images_fail_with_error() {
        let blank = GrayImage::from_pixel(128, 128, image::Luma([128u8]));
        let settings = RenderSettings {
            obj: Some("x.obj".to_string()),
            ..Default::default()
        };
        assert!(estimate_view_homography(&blank, &blank, &settings).is_err());
    }

    #[test]
    fn identical_images_yield_near_identity_homography() {
        let image = noise_image(256);
        let settings = RenderSettings {
            obj: Some("x.obj".to_string()),
            match_keep_ratio: 0.5,
            ..Default::default()
        };
        let (h, mask, used) = estimate_view_homography(&image, &image, &settings).unwrap();
        assert!(used >= 4);
        assert!(mask.iter().any(|&b| b));
        assert!((h[(0, 0)] - 1.0).abs() < 0.1);
        assert!((h[(1, 1)] - 1.0).abs() < 0.1);
        assert!(h[(0, 2)].abs() < 5.0);
        assert!(h[(1, 2)].abs() < 5.0);
    }

    #[test]
    fn inlier_mask_formats_as_bits() {
        assert_eq!(format_inlier_mask(&[true, false, true, true]), "1011");
        assert_eq!(format_inlier_mask(&[]), "");
    }

    #[test]
    fn camera_distance_fits_bounding_sphere() {
        let settings = RenderSettings {
            obj: Some("x.obj".to_string()),
            ..Default::default()
        };
        let camera = build_camera(&settings, 1.0).unwrap();
        let distance = (camera.position - camera.target).norm();
        let expected = 1.0 / (camera.fov_y / 2.0).sin();
        assert!((distance - expected).abs() < 1e-4);
    }
}
