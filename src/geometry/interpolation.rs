use nalgebra::{Point2, Vector3};

const EPSILON: f32 = 1e-5;

/// 计算点p相对于2D三角形(v1, v2, v3)的重心坐标(alpha, beta, gamma)
/// 三角形退化时返回None
pub fn barycentric_coordinates(
    p: Point2<f32>,
    v1: Point2<f32>,
    v2: Point2<f32>,
    v3: Point2<f32>,
) -> Option<Vector3<f32>> {
    let e1 = v2 - v1;
    let e2 = v3 - v1;
    let p_v1 = p - v1;

    // 主三角形面积的两倍（2D叉积行列式）
    let total_area_x2 = e1.x * e2.y - e1.y * e2.x;

    if total_area_x2.abs() < EPSILON {
        return None; // 退化三角形
    }

    let inv_total_area_x2 = 1.0 / total_area_x2;

    let beta = (p_v1.x * e2.y - p_v1.y * e2.x) * inv_total_area_x2;
    let gamma = (e1.x * p_v1.y - e1.y * p_v1.x) * inv_total_area_x2;
    let alpha = 1.0 - beta - gamma;

    Some(Vector3::new(alpha, beta, gamma))
}

/// 判断重心坐标是否落在三角形内部
#[inline(always)]
pub fn is_inside_triangle(bary: Vector3<f32>) -> bool {
    bary.x >= -EPSILON && bary.y >= -EPSILON && bary.z >= -EPSILON
}

/// 使用重心坐标插值深度，透视投影下对1/z插值
///
/// 输入输出均为正的视图空间深度（相机前方为正），与深度缓冲
/// 的比较方向一致。调用方负责先用重心坐标剔除三角形外的像素。
pub fn interpolate_depth(bary: Vector3<f32>, z1_view: f32, z2_view: f32, z3_view: f32) -> f32 {
    let inv_z = |z: f32| if z.abs() > EPSILON { 1.0 / z } else { 0.0 };
    let interpolated_inv_z =
        bary.x * inv_z(z1_view) + bary.y * inv_z(z2_view) + bary.z * inv_z(z3_view);

    let interpolated_z = if interpolated_inv_z.abs() > EPSILON {
        1.0 / interpolated_inv_z
    } else {
        // 透视矫正失败时退回线性插值
        bary.x * z1_view + bary.y * z2_view + bary.z * z3_view
    };

    // 位于相机后方或过近的点映射到无穷远
    if interpolated_z < EPSILON {
        f32::INFINITY
    } else {
        interpolated_z
    }
}

/// 使用重心坐标对标量属性做线性插值（用于Gouraud光照强度）
#[inline]
pub fn interpolate_scalar(bary: Vector3<f32>, s1: f32, s2: f32, s3: f32) -> f32 {
    bary.x * s1 + bary.y * s2 + bary.z * s3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> (Point2<f32>, Point2<f32>, Point2<f32>) {
        (
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        )
    }

    #[test]
    fn barycentric_at_vertices() {
        let (v1, v2, v3) = unit_triangle();
        let bary = barycentric_coordinates(v1, v1, v2, v3).unwrap();
        assert!((bary.x - 1.0).abs() < 1e-5);

        let bary = barycentric_coordinates(v3, v1, v2, v3).unwrap();
        assert!((bary.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn point_outside_triangle_detected() {
        let (v1, v2, v3) = unit_triangle();
        let bary = barycentric_coordinates(Point2::new(2.0, 2.0), v1, v2, v3).unwrap();
        assert!(!is_inside_triangle(bary));
    }

    #[test]
    fn degenerate_triangle_returns_none() {
        let v = Point2::new(1.0, 1.0);
        assert!(barycentric_coordinates(Point2::new(0.0, 0.0), v, v, v).is_none());
    }

    #[test]
    fn depth_is_positive_for_points_in_front() {
        let bary = Vector3::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0);
        let depth = interpolate_depth(bary, 2.0, 2.0, 2.0);
        assert!((depth - 2.0).abs() < 1e-4);
    }

    #[test]
    fn depth_interpolation_is_perspective_correct() {
        // 1/z插值: 中点深度为 1 / (0.5/1 + 0.5/3) = 1.5，而非线性的2.0
        let bary = Vector3::new(0.5, 0.5, 0.0);
        let depth = interpolate_depth(bary, 1.0, 3.0, 3.0);
        assert!((depth - 1.5).abs() < 1e-4);
    }

    #[test]
    fn depth_behind_camera_is_infinite() {
        let bary = Vector3::new(1.0, 0.0, 0.0);
        assert_eq!(interpolate_depth(bary, -2.0, -2.0, -2.0), f32::INFINITY);
        assert_eq!(interpolate_depth(bary, 0.0, 0.0, 0.0), f32::INFINITY);
    }
}
