use crate::geometry::transform::TransformFactory;
use nalgebra::{Matrix4, Point3, Vector3};

/// 透视相机，负责管理视角与投影变换
///
/// 初始姿态沿用配置中的 from/at/up，随后可通过 azimuth/elevation
/// 绕观察目标旋转，并用 reset_distance 将模型包围球拉入视野。
#[derive(Debug, Clone)]
pub struct Camera {
    /// 相机位置（眼睛位置）
    pub position: Point3<f32>,
    /// 相机观察点（目标位置）
    pub target: Point3<f32>,
    /// 相机上方向
    pub up: Vector3<f32>,
    /// 垂直视场角（弧度）
    pub fov_y: f32,
    /// 宽高比（视口宽度/高度）
    pub aspect_ratio: f32,
    /// 近裁剪平面距离
    pub near: f32,
    /// 远裁剪平面距离
    pub far: f32,
    /// 视图矩阵（世界坐标 -> 相机坐标）
    pub view_matrix: Matrix4<f32>,
    /// 投影矩阵（相机坐标 -> 裁剪坐标）
    pub projection_matrix: Matrix4<f32>,
    /// 视图-投影组合矩阵
    pub view_projection_matrix: Matrix4<f32>,
}

impl Camera {
    /// 创建一个新的透视投影相机
    pub fn new_perspective(
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        fov_y_degrees: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let mut camera = Camera {
            position,
            target,
            up: up.normalize(),
            fov_y: fov_y_degrees.to_radians(),
            aspect_ratio,
            near,
            far,
            view_matrix: Matrix4::identity(),
            projection_matrix: Matrix4::identity(),
            view_projection_matrix: Matrix4::identity(),
        };
        camera.update_matrices();
        camera
    }

    /// 更新所有相机矩阵
    pub fn update_matrices(&mut self) {
        self.view_matrix = TransformFactory::view(&self.position, &self.target, &self.up);
        self.projection_matrix =
            TransformFactory::perspective(self.aspect_ratio, self.fov_y, self.near, self.far);
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }

    /// 围绕目标点进行任意轴旋转
    pub fn orbit(&mut self, axis: &Vector3<f32>, angle_rad: f32) {
        let camera_to_target = self.position - self.target;
        let rotation_matrix = TransformFactory::rotation(axis, angle_rad);
        let rotated_vector = rotation_matrix.transform_vector(&camera_to_target);

        self.position = self.target + rotated_vector;
        self.up = rotation_matrix.transform_vector(&self.up).normalize();
        self.update_matrices();
    }

    /// 方位角旋转：绕上方向轴旋转相机位置
    pub fn azimuth(&mut self, angle_degrees: f32) {
        let axis = self.up;
        self.orbit(&axis, angle_degrees.to_radians());
    }

    /// 仰角旋转：绕右方向轴旋转相机位置
    pub fn elevation(&mut self, angle_degrees: f32) {
        let forward = (self.target - self.position).normalize();
        let right = forward.cross(&self.up);
        if right.norm_squared() < 1e-12 {
            log::warn!("相机视线与上方向平行，忽略仰角旋转");
            return;
        }
        self.orbit(&right.normalize(), angle_degrees.to_radians());
    }

    /// 沿视线方向调整相机距离，使给定包围球半径恰好充满垂直视场
    pub fn reset_distance(&mut self, bounding_radius: f32) {
        let radius = bounding_radius.max(1e-4);
        let distance = radius / (self.fov_y * 0.5).sin().max(1e-4);

        let direction = (self.position - self.target).normalize();
        self.position = self.target + direction * distance;

        // 裁剪平面跟随距离，避免模型被近/远平面截断
        self.near = (distance - 2.0 * radius).max(distance * 0.01);
        self.far = distance + 2.0 * radius;
        self.update_matrices();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera() -> Camera {
        Camera::new_perspective(
            Point3::new(0.0, -1.0, 0.0),
            Point3::origin(),
            Vector3::new(0.0, 0.0, -1.0),
            30.0,
            1.0,
            0.1,
            100.0,
        )
    }

    #[test]
    fn orbit_preserves_distance_to_target() {
        let mut camera = test_camera();
        let before = (camera.position - camera.target).norm();
        camera.azimuth(30.0);
        camera.elevation(30.0);
        let after = (camera.position - camera.target).norm();
        assert!((before - after).abs() < 1e-4);
    }

    #[test]
    fn reset_distance_fits_bounding_sphere() {
        let mut camera = test_camera();
        camera.reset_distance(1.0);
        let distance = (camera.position - camera.target).norm();
        let expected = 1.0 / (camera.fov_y * 0.5).sin();
        assert!((distance - expected).abs() < 1e-3);
        assert!(camera.near < distance);
        assert!(camera.far > distance);
    }

    #[test]
    fn target_projects_to_view_center() {
        let camera = test_camera();
        let view_h = camera.view_matrix * camera.target.to_homogeneous();
        // 目标点位于视线正前方（x=y=0, z<0）
        assert!(view_h.x.abs() < 1e-5);
        assert!(view_h.y.abs() < 1e-5);
        assert!(view_h.z < 0.0);
    }
}
