use crate::core::frame_buffer::{FrameBuffer, background_bytes};
use crate::core::rasterizer::{RasterizeParams, TriangleData, VertexRenderData, rasterize_triangles};
use crate::geometry::camera::Camera;
use crate::geometry::transform::{compute_normal_matrix, ndc_to_pixel, transform_normals, world_to_ndc, world_to_view};
use crate::io::obj_loader::Mesh;
use crate::io::render_settings::RenderSettings;
use crate::scene::scene_object::{SceneObject, Transformable};
use image::RgbImage;
use log::debug;
use nalgebra::{Point2, Point3};

/// 渲染器：把网格经过完整管线写入帧缓冲
pub struct Renderer {
    pub frame_buffer: FrameBuffer,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            frame_buffer: FrameBuffer::new(width, height),
        }
    }

    /// 执行一次完整渲染
    ///
    /// 顶点阶段（变换、光照）在此完成，像素阶段交给光栅化模块。
    pub fn render(
        &self,
        mesh: &Mesh,
        object: &SceneObject,
        camera: &Camera,
        settings: &RenderSettings,
    ) {
        self.frame_buffer.clear(background_bytes(
            &settings.background_color_vec(),
            settings.use_gamma,
        ));

        let model = *object.get_transform();
        let world_points: Vec<Point3<f32>> = mesh
            .vertices
            .iter()
            .map(|v| model.transform_point(v))
            .collect();

        let view_points = world_to_view(&world_points, &camera.view_matrix);
        let ndc_points = world_to_ndc(&world_points, &camera.view_projection_matrix);
        let pixel_points = ndc_to_pixel(
            &ndc_points,
            self.frame_buffer.width as f32,
            self.frame_buffer.height as f32,
        );

        let normal_matrix = compute_normal_matrix(&(camera.view_matrix * model));
        let view_normals = transform_normals(&mesh.normals, &normal_matrix);

        let mut triangles = Vec::with_capacity(mesh.indices.len());
        let mut culled = 0usize;
        let mut clipped = 0usize;

        for tri in &mesh.indices {
            let [i0, i1, i2] = *tri;

            // 视图空间中相机朝向-Z，深度取正值
            let depths = [-view_points[i0].z, -view_points[i1].z, -view_points[i2].z];
            if depths.iter().any(|&d| d <= camera.near) {
                clipped += 1;
                continue;
            }

            if settings.backface_culling {
                let centroid =
                    (view_points[i0].coords + view_points[i1].coords + view_points[i2].coords)
                        / 3.0;
                let e1 = view_points[i1] - view_points[i0];
                let e2 = view_points[i2] - view_points[i0];
                let face_normal = e1.cross(&e2);
                // 面法线与指向相机方向同向才可见
                if face_normal.dot(&-centroid) <= 0.0 {
                    culled += 1;
                    continue;
                }
            }

            let vertex = |i: usize| {
                // 头灯光照：视图空间中从顶点指向相机的方向
                let to_camera = -view_points[i].coords;
                let intensity = if to_camera.norm() > 1e-8 {
                    view_normals[i].dot(&to_camera.normalize()).max(0.0)
                } else {
                    0.0
                };
                VertexRenderData {
                    pix: Point2::new(pixel_points[i].x, pixel_points[i].y),
                    z_view: -view_points[i].z,
                    intensity,
                }
            };

            triangles.push(TriangleData {
                vertices: [vertex(i0), vertex(i1), vertex(i2)],
            });
        }

        debug!(
            "顶点阶段完成: {} 个三角形进入光栅化，{} 个被剔除，{} 个被近平面裁剪",
            triangles.len(),
            culled,
            clipped
        );

        let params = RasterizeParams {
            object_color: settings.object_color_vec(),
            ambient: settings.ambient,
            use_zbuffer: settings.use_zbuffer,
            use_gamma: settings.use_gamma,
            use_multithreading: settings.use_multithreading,
        };
        rasterize_triangles(&triangles, &self.frame_buffer, &params);
    }

    /// 渲染并导出为RGB图像
    pub fn render_to_image(
        &self,
        mesh: &Mesh,
        object: &SceneObject,
        camera: &Camera,
        settings: &RenderSettings,
    ) -> Result<RgbImage, String> {
        self.render(mesh, object, camera, settings);
        let width = self.frame_buffer.width as u32;
        let height = self.frame_buffer.height as u32;
        RgbImage::from_raw(width, height, self.frame_buffer.to_rgb_bytes())
            .ok_or_else(|| "帧缓冲尺寸与图像尺寸不一致".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn camera_looking_at_origin() -> Camera {
        Camera::new_perspective(
            Point3::new(0.0, 0.0, 3.0),
            Point3::origin(),
            Vector3::new(0.0, 1.0, 0.0),
            45.0,
            1.0,
            0.1,
            100.0,
        )
    }

    fn facing_triangle() -> Mesh {
        let mut mesh = Mesh {
            vertices: vec![
                Point3::new(-1.0, -1.0, 0.0),
                Point3::new(1.0, -1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            normals: vec![],
            indices: vec![[0, 1, 2]],
        };
        mesh.compute_smooth_normals();
        mesh
    }

    #[test]
    fn renders_triangle_to_image_center() {
        let mesh = facing_triangle();
        let object = SceneObject::new("tri".to_string());
        let camera = camera_looking_at_origin();
        let settings = RenderSettings {
            obj: Some("tri.obj".to_string()),
            width: 64,
            height: 64,
            use_multithreading: false,
            use_gamma: false,
            ..Default::default()
        };

        let renderer = Renderer::new(64, 64);
        let image = renderer.render_to_image(&mesh, &object, &camera, &settings).unwrap();

        let center = image.get_pixel(32, 32);
        let corner = image.get_pixel(0, 0);
        assert!(center[0] > corner[0]);
    }

    #[test]
    fn fragments_written_at_positive_view_depth() {
        let mesh = facing_triangle();
        let object = SceneObject::new("tri".to_string());
        let camera = camera_looking_at_origin();
        let settings = RenderSettings {
            obj: Some("tri.obj".to_string()),
            width: 64,
            height: 64,
            use_multithreading: false,
            use_gamma: false,
            background_color: "0,0,0".to_string(),
            ..Default::default()
        };

        let renderer = Renderer::new(64, 64);
        renderer.render(&mesh, &object, &camera, &settings);

        // 相机前方的三角形必须写入颜色与深度，不能整帧留白
        assert_ne!(renderer.frame_buffer.pixel_rgb(32, 32), [0, 0, 0]);
        let depth = renderer.frame_buffer.depth_at(32, 32);
        assert!(depth.is_finite());
        // 三角形位于z=0平面，相机在z=3，深度应接近3
        assert!((depth - 3.0).abs() < 0.2);
    }

    #[test]
    fn backface_culling_hides_reversed_triangle() {
        let mut mesh = facing_triangle();
        // 反转绕向使三角形背对相机
        mesh.indices = vec![[0, 2, 1]];
        mesh.compute_smooth_normals();

        let object = SceneObject::new("tri".to_string());
        let camera = camera_looking_at_origin();
        let settings = RenderSettings {
            obj: Some("tri.obj".to_string()),
            width: 64,
            height: 64,
            use_multithreading: false,
            use_gamma: false,
            background_color: "0,0,0".to_string(),
            ..Default::default()
        };

        let renderer = Renderer::new(64, 64);
        renderer.render(&mesh, &object, &camera, &settings);
        assert_eq!(renderer.frame_buffer.pixel_rgb(32, 32), [0, 0, 0]);
    }
}
