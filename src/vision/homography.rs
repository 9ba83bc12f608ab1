use log::{debug, info};
use nalgebra::{DMatrix, Matrix3, Matrix4, Vector2, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// RANSAC参数
#[derive(Debug, Clone, Copy)]
pub struct RansacParams {
    /// 重投影误差阈值（像素）
    pub threshold: f64,
    /// 最大迭代次数
    pub max_iterations: usize,
    /// 置信度，用于自适应提前终止
    pub confidence: f64,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            max_iterations: 2000,
            confidence: 0.995,
        }
    }
}

/// 单应性估计结果
#[derive(Debug, Clone)]
pub struct HomographyEstimate {
    /// 3x3单应性矩阵，h22归一化为1
    pub matrix: Matrix3<f64>,
    /// 每对输入对应关系是否为内点
    pub inlier_mask: Vec<bool>,
    /// 实际执行的迭代次数
    pub iterations: usize,
}

impl HomographyEstimate {
    pub fn inlier_count(&self) -> usize {
        self.inlier_mask.iter().filter(|&&b| b).count()
    }
}

/// 对一个点应用单应性变换
pub fn apply_homography(h: &Matrix3<f64>, p: &Vector2<f64>) -> Vector2<f64> {
    let q = h * Vector3::new(p.x, p.y, 1.0);
    if q.z.abs() > 1e-12 {
        Vector2::new(q.x / q.z, q.y / q.z)
    } else {
        Vector2::new(f64::INFINITY, f64::INFINITY)
    }
}

/// RANSAC单应性估计
///
/// 每次迭代随机抽取4对对应关系做最小样本DLT估计，
/// 按重投影误差统计内点，最后用全部内点重新估计。
pub fn find_homography_ransac(
    src: &[Vector2<f64>],
    dst: &[Vector2<f64>],
    params: &RansacParams,
) -> Result<HomographyEstimate, String> {
    if src.len() != dst.len() {
        return Err("对应点数量不一致".to_string());
    }
    let n = src.len();
    if n < 4 {
        return Err(format!("单应性估计至少需要4对对应点，当前只有 {n} 对"));
    }

    let mut rng = StdRng::seed_from_u64(0x7a_11c4);
    let mut best_inliers: Vec<bool> = Vec::new();
    let mut best_count = 0usize;
    let mut max_iterations = params.max_iterations;
    let mut iteration = 0usize;

    while iteration < max_iterations {
        iteration += 1;

        let sample = rand::seq::index::sample(&mut rng, n, 4);
        let sample_src: Vec<Vector2<f64>> = sample.iter().map(|i| src[i]).collect();
        let sample_dst: Vec<Vector2<f64>> = sample.iter().map(|i| dst[i]).collect();

        let Ok(h) = estimate_homography_dlt(&sample_src, &sample_dst) else {
            continue;
        };

        let inliers: Vec<bool> = src
            .iter()
            .zip(dst.iter())
            .map(|(s, d)| (apply_homography(&h, s) - d).norm() < params.threshold)
            .collect();
        let count = inliers.iter().filter(|&&b| b).count();

        if count > best_count {
            best_count = count;
            best_inliers = inliers;

            // 根据当前内点率自适应收缩迭代上限
            let inlier_ratio = count as f64 / n as f64;
            let p_all_inliers = inlier_ratio.powi(4);
            if p_all_inliers > 1e-12 {
                let needed =
                    (1.0 - params.confidence).ln() / (1.0 - p_all_inliers).max(1e-12).ln();
                if needed.is_finite() && needed >= 0.0 {
                    max_iterations = max_iterations.min((needed.ceil() as usize).max(1));
                }
            }
        }
    }

    if best_count < 4 {
        return Err(format!("RANSAC失败: 内点不足（{best_count} 个）"));
    }

    // 用全部内点重新估计
    let inlier_src: Vec<Vector2<f64>> = src
        .iter()
        .zip(best_inliers.iter())
        .filter_map(|(p, &keep)| keep.then_some(*p))
        .collect();
    let inlier_dst: Vec<Vector2<f64>> = dst
        .iter()
        .zip(best_inliers.iter())
        .filter_map(|(p, &keep)| keep.then_some(*p))
        .collect();
    let matrix = estimate_homography_dlt(&inlier_src, &inlier_dst)?;

    info!(
        "RANSAC完成: {} 次迭代，{}/{} 个内点",
        iteration, best_count, n
    );
    Ok(HomographyEstimate {
        matrix,
        inlier_mask: best_inliers,
        iterations: iteration,
    })
}

/// DLT直接线性变换估计单应性，带Hartley归一化
pub fn estimate_homography_dlt(
    src: &[Vector2<f64>],
    dst: &[Vector2<f64>],
) -> Result<Matrix3<f64>, String> {
    let n = src.len();
    if n < 4 || n != dst.len() {
        return Err("DLT需要至少4对对应点".to_string());
    }

    let t_src = normalization_transform(src)?;
    let t_dst = normalization_transform(dst)?;
    let src_n: Vec<Vector2<f64>> = src.iter().map(|p| apply_homography(&t_src, p)).collect();
    let dst_n: Vec<Vector2<f64>> = dst.iter().map(|p| apply_homography(&t_dst, p)).collect();

    // SVD要求行数不少于9才能给出完整的右奇异向量，不足时补零行
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (i, (s, d)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        let (x, y) = (s.x, s.y);
        let (u, v) = (d.x, d.y);
        a.set_row(
            2 * i,
            &nalgebra::RowDVector::from_row_slice(&[
                -x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u,
            ]),
        );
        a.set_row(
            2 * i + 1,
            &nalgebra::RowDVector::from_row_slice(&[
                0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v,
            ]),
        );
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or("SVD未返回右奇异向量")?;
    let h_vec = v_t.row(8);

    let h_normalized = Matrix3::new(
        h_vec[0], h_vec[1], h_vec[2],
        h_vec[3], h_vec[4], h_vec[5],
        h_vec[6], h_vec[7], h_vec[8],
    );

    // 去归一化: H = T_dst^-1 * H_n * T_src
    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or("目标归一化变换不可逆")?;
    let mut h = t_dst_inv * h_normalized * t_src;

    if h[(2, 2)].abs() < 1e-12 {
        return Err("退化的单应性矩阵 (h22接近0)".to_string());
    }
    h /= h[(2, 2)];
    debug!("DLT估计完成，条件点数 {n}");
    Ok(h)
}

/// Hartley归一化: 平移到质心并缩放使平均距离为sqrt(2)
fn normalization_transform(points: &[Vector2<f64>]) -> Result<Matrix3<f64>, String> {
    let n = points.len() as f64;
    let centroid = points.iter().sum::<Vector2<f64>>() / n;
    let mean_dist = points.iter().map(|p| (p - centroid).norm()).sum::<f64>() / n;
    if mean_dist < 1e-12 {
        return Err("所有对应点重合，无法归一化".to_string());
    }
    let scale = std::f64::consts::SQRT_2 / mean_dist;
    Ok(Matrix3::new(
        scale, 0.0, -scale * centroid.x,
        0.0, scale, -scale * centroid.y,
        0.0, 0.0, 1.0,
    ))
}

/// 把图像平面的3x3单应性提升为作用于XY平面的4x4物体变换
///
/// Z分量保持不变，透视项作用于w。结果按h22归一化。
pub fn homography_to_object_transform(h: &Matrix3<f64>) -> Matrix4<f32> {
    let h = h / h[(2, 2)];
    Matrix4::new(
        h[(0, 0)] as f32, h[(0, 1)] as f32, 0.0, h[(0, 2)] as f32,
        h[(1, 0)] as f32, h[(1, 1)] as f32, 0.0, h[(1, 2)] as f32,
        0.0,              0.0,              1.0, 0.0,
        h[(2, 0)] as f32, h[(2, 1)] as f32, 0.0, h[(2, 2)] as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_points() -> Vec<Vector2<f64>> {
        let mut pts = Vec::new();
        for y in 0..6 {
            for x in 0..6 {
                pts.push(Vector2::new(x as f64 * 20.0 + 13.0, y as f64 * 20.0 + 7.0));
            }
        }
        pts
    }

    #[test]
    fn dlt_recovers_translation() {
        let src = grid_points();
        let dst: Vec<Vector2<f64>> = src.iter().map(|p| p + Vector2::new(8.0, -3.0)).collect();
        let h = estimate_homography_dlt(&src, &dst).unwrap();

        for (s, d) in src.iter().zip(dst.iter()) {
            assert!((apply_homography(&h, s) - d).norm() < 1e-6);
        }
        assert!((h[(0, 2)] - 8.0).abs() < 1e-6);
        assert!((h[(1, 2)] + 3.0).abs() < 1e-6);
    }

    #[test]
    fn ransac_survives_outliers() {
        let src = grid_points();
        let mut dst: Vec<Vector2<f64>> = src
            .iter()
            .map(|p| {
                // 旋转10度加平移
                let (sin, cos) = 10f64.to_radians().sin_cos();
                Vector2::new(
                    cos * p.x - sin * p.y + 15.0,
                    sin * p.x + cos * p.y - 4.0,
                )
            })
            .collect();
        // 污染约四分之一的对应点
        for i in (0..dst.len()).step_by(4) {
            dst[i] += Vector2::new(120.0, -85.0);
        }

        let estimate = find_homography_ransac(&src, &dst, &RansacParams::default()).unwrap();
        assert!(estimate.inlier_count() >= src.len() / 2);
        // 未污染的点应当被正确映射
        for i in 1..src.len() {
            if i % 4 == 0 {
                continue;
            }
            assert!((apply_homography(&estimate.matrix, &src[i]) - dst[i]).norm() < 1.0);
        }
    }

    #[test]
    fn ransac_rejects_too_few_points() {
        let pts = vec![Vector2::new(0.0, 0.0); 3];
        assert!(find_homography_ransac(&pts, &pts, &RansacParams::default()).is_err());
    }

    #[test]
    fn identity_lifts_to_identity_transform() {
        let m = homography_to_object_transform(&Matrix3::identity());
        assert!((m - Matrix4::identity()).abs().max() < 1e-6);
    }

    #[test]
    fn translation_lifts_to_xy_translation() {
        let h = Matrix3::new(1.0, 0.0, 5.0, 0.0, 1.0, -2.0, 0.0, 0.0, 1.0);
        let m = homography_to_object_transform(&h);
        let p = m.transform_point(&nalgebra::Point3::new(1.0, 1.0, 3.0));
        assert!((p.x - 6.0).abs() < 1e-5);
        assert!((p.y + 1.0).abs() < 1e-5);
        assert!((p.z - 3.0).abs() < 1e-5);
    }
}
