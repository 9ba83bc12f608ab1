use crate::core::frame_buffer::FrameBuffer;
use crate::geometry::interpolation::{
    barycentric_coordinates, interpolate_depth, interpolate_scalar, is_inside_triangle,
};
use crate::utils::color_utils::linear_rgb_to_u8;
use nalgebra::{Point2, Vector3};
use rayon::prelude::*;

/// 单个顶点经过变换后进入光栅化阶段的数据
#[derive(Debug, Clone, Copy)]
pub struct VertexRenderData {
    /// 像素坐标
    pub pix: Point2<f32>,
    /// 视图空间深度（相机前方为正）
    pub z_view: f32,
    /// Gouraud顶点光照强度
    pub intensity: f32,
}

/// 一个待光栅化的三角形
#[derive(Debug, Clone, Copy)]
pub struct TriangleData {
    pub vertices: [VertexRenderData; 3],
}

/// 光栅化参数
#[derive(Debug, Clone, Copy)]
pub struct RasterizeParams {
    pub object_color: Vector3<f32>,
    pub ambient: f32,
    pub use_zbuffer: bool,
    pub use_gamma: bool,
    pub use_multithreading: bool,
}

/// 把一批三角形写入帧缓冲
pub fn rasterize_triangles(
    triangles: &[TriangleData],
    frame_buffer: &FrameBuffer,
    params: &RasterizeParams,
) {
    if params.use_multithreading {
        triangles
            .par_iter()
            .for_each(|tri| rasterize_triangle(tri, frame_buffer, params));
    } else {
        for tri in triangles {
            rasterize_triangle(tri, frame_buffer, params);
        }
    }
}

/// 光栅化单个三角形：包围盒扫描 + 重心坐标 + 透视校正深度
fn rasterize_triangle(tri: &TriangleData, frame_buffer: &FrameBuffer, params: &RasterizeParams) {
    let [v0, v1, v2] = &tri.vertices;
    let width = frame_buffer.width;
    let height = frame_buffer.height;

    let min_x = v0.pix.x.min(v1.pix.x).min(v2.pix.x).floor().max(0.0) as usize;
    let max_x = (v0.pix.x.max(v1.pix.x).max(v2.pix.x).ceil() as usize).min(width.saturating_sub(1));
    let min_y = v0.pix.y.min(v1.pix.y).min(v2.pix.y).floor().max(0.0) as usize;
    let max_y =
        (v0.pix.y.max(v1.pix.y).max(v2.pix.y).ceil() as usize).min(height.saturating_sub(1));

    if min_x > max_x || min_y > max_y {
        return;
    }

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            // 像素中心采样
            let p = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
            let Some(bary) = barycentric_coordinates(p, v0.pix, v1.pix, v2.pix) else {
                continue;
            };
            if !is_inside_triangle(bary) {
                continue;
            }

            let depth = interpolate_depth(bary, v0.z_view, v1.z_view, v2.z_view);
            if !depth.is_finite() {
                continue;
            }

            let intensity =
                interpolate_scalar(bary, v0.intensity, v1.intensity, v2.intensity);
            let lit = params.ambient + (1.0 - params.ambient) * intensity.clamp(0.0, 1.0);
            let color = params.object_color * lit;
            let rgb = linear_rgb_to_u8(&color, params.use_gamma);

            let index = frame_buffer.pixel_index(x, y);
            if params.use_zbuffer {
                frame_buffer.write_pixel_if_closer(index, depth, rgb);
            } else {
                frame_buffer.write_pixel(index, rgb);
            }
        }
    }
}
