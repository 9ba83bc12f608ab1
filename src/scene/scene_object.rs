use crate::geometry::transform::TransformFactory;
use nalgebra::{Matrix4, Vector3};

/// 可变换对象特性，定义对象变换的标准接口和便捷方法
pub trait Transformable {
    /// 获取对象的变换矩阵
    fn get_transform(&self) -> &Matrix4<f32>;

    /// 设置对象的变换矩阵
    fn set_transform(&mut self, transform: Matrix4<f32>);

    /// 在局部坐标系中应用变换矩阵（后乘 M_new = M_old * T）
    fn apply_local(&mut self, transform: Matrix4<f32>);

    /// 在全局坐标系中应用变换矩阵（前乘 M_new = T * M_old）
    fn apply_global(&mut self, transform: Matrix4<f32>);

    /// 绕任意全局轴旋转
    fn rotate(&mut self, axis: &Vector3<f32>, angle_rad: f32) {
        self.apply_global(TransformFactory::rotation(axis, angle_rad));
    }

    /// 绕全局X轴旋转
    fn rotate_x(&mut self, angle_rad: f32) {
        self.apply_global(TransformFactory::rotation_x(angle_rad));
    }

    /// 绕全局Y轴旋转
    fn rotate_y(&mut self, angle_rad: f32) {
        self.apply_global(TransformFactory::rotation_y(angle_rad));
    }

    /// 绕全局Z轴旋转
    fn rotate_z(&mut self, angle_rad: f32) {
        self.apply_global(TransformFactory::rotation_z(angle_rad));
    }
}

/// 场景中的模型实例：持有姿态矩阵与名称
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// 对象在世界空间中的变换矩阵
    pub transform: Matrix4<f32>,
    /// 对象名称（用于截图命名）
    pub name: String,
}

impl SceneObject {
    /// 创建一个位于原点的新对象
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            transform: Matrix4::identity(),
            name: name.into(),
        }
    }

    /// 使用指定变换创建对象
    pub fn with_transform(mut self, transform: Matrix4<f32>) -> Self {
        self.transform = transform;
        self
    }
}

impl Transformable for SceneObject {
    fn get_transform(&self) -> &Matrix4<f32> {
        &self.transform
    }

    fn set_transform(&mut self, transform: Matrix4<f32>) {
        self.transform = transform;
    }

    fn apply_local(&mut self, transform_matrix: Matrix4<f32>) {
        self.transform *= transform_matrix;
    }

    fn apply_global(&mut self, transform_matrix: Matrix4<f32>) {
        self.transform = transform_matrix * self.transform;
    }
}

impl Default for SceneObject {
    fn default() -> Self {
        Self::new("object")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn global_rotations_compose_left_to_right() {
        let mut object = SceneObject::new("test");
        object.rotate_x(std::f32::consts::FRAC_PI_2);
        object.rotate_z(std::f32::consts::FRAC_PI_2);

        let expected = TransformFactory::rotation_z(std::f32::consts::FRAC_PI_2)
            * TransformFactory::rotation_x(std::f32::consts::FRAC_PI_2);
        assert!((object.transform - expected).abs().max() < 1e-5);
    }

    #[test]
    fn rotation_keeps_origin_fixed() {
        let mut object = SceneObject::new("test");
        object.rotate_y(1.2);
        let p = object.transform.transform_point(&Point3::origin());
        assert!(p.coords.norm() < 1e-6);
    }
}
