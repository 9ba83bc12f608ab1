use log::{debug, info, warn};
use nalgebra::{Point3, Vector3};
use std::path::{Path, PathBuf};

/// 以三角形索引方式存放的网格数据
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Point3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub indices: Vec<[usize; 3]>,
}

impl Mesh {
    /// 包围球半径（以原点为球心）
    pub fn bounding_radius(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| v.coords.norm())
            .fold(0.0f32, f32::max)
    }

    /// 平移网格使质心位于原点，并缩放到单位包围球
    pub fn normalize_and_center(&mut self) {
        if self.vertices.is_empty() {
            return;
        }

        let centroid = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.coords)
            / self.vertices.len() as f32;

        for v in &mut self.vertices {
            v.coords -= centroid;
        }

        let radius = self.bounding_radius();
        if radius > 1e-8 {
            let inv = 1.0 / radius;
            for v in &mut self.vertices {
                v.coords *= inv;
            }
        }

        debug!(
            "网格归一化: 质心偏移 ({:.4}, {:.4}, {:.4})，半径 {:.4}",
            centroid.x, centroid.y, centroid.z, radius
        );
    }

    /// 由面片面积加权计算逐顶点平滑法线
    pub fn compute_smooth_normals(&mut self) {
        let mut accum = vec![Vector3::zeros(); self.vertices.len()];
        for tri in &self.indices {
            let [i0, i1, i2] = *tri;
            let e1 = self.vertices[i1] - self.vertices[i0];
            let e2 = self.vertices[i2] - self.vertices[i0];
            // 叉积长度正比于面积，直接累加即完成面积加权
            let face_normal = e1.cross(&e2);
            accum[i0] += face_normal;
            accum[i1] += face_normal;
            accum[i2] += face_normal;
        }

        self.normals = accum
            .into_iter()
            .map(|n| {
                let len = n.norm();
                if len > 1e-8 {
                    n / len
                } else {
                    Vector3::new(0.0, 0.0, 1.0)
                }
            })
            .collect();
    }
}

/// 从OBJ文件加载网格，合并所有子模型为单个三角形网格
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, String> {
    let path = path.as_ref();
    let load_options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };

    let (models, _materials) = tobj::load_obj(path, &load_options)
        .map_err(|e| format!("无法加载OBJ文件 {path:?}: {e}"))?;

    if models.is_empty() {
        return Err(format!("OBJ文件不包含任何网格: {path:?}"));
    }

    let mut mesh = Mesh::default();
    let mut has_all_normals = true;

    for model in &models {
        let m = &model.mesh;
        let base = mesh.vertices.len();

        for chunk in m.positions.chunks_exact(3) {
            mesh.vertices
                .push(Point3::new(chunk[0], chunk[1], chunk[2]));
        }

        if m.normals.len() == m.positions.len() {
            for chunk in m.normals.chunks_exact(3) {
                mesh.normals
                    .push(Vector3::new(chunk[0], chunk[1], chunk[2]));
            }
        } else {
            has_all_normals = false;
        }

        for tri in m.indices.chunks_exact(3) {
            mesh.indices.push([
                base + tri[0] as usize,
                base + tri[1] as usize,
                base + tri[2] as usize,
            ]);
        }
    }

    if !has_all_normals || mesh.normals.len() != mesh.vertices.len() {
        warn!("OBJ缺少完整法线，改为由面片计算平滑法线");
        mesh.compute_smooth_normals();
    }

    info!(
        "已加载模型 {:?}: {} 个顶点，{} 个三角形",
        path.file_name().unwrap_or_default(),
        mesh.vertices.len(),
        mesh.indices.len()
    );

    Ok(mesh)
}

/// 解析模型路径：先按原样查找，找不到时在模型目录下模糊匹配
///
/// 模糊匹配按文件名（忽略大小写、忽略扩展名）查找首个包含
/// 查询串的 .obj 文件。
pub fn resolve_model_path(query: &str, model_dir: &str) -> Result<PathBuf, String> {
    let direct = PathBuf::from(query);
    if direct.is_file() {
        return Ok(direct);
    }

    let dir = Path::new(model_dir);
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("无法读取模型目录 {dir:?}: {e}"))?;

    let needle = query
        .trim_end_matches(".obj")
        .trim_end_matches(".OBJ")
        .to_lowercase();

    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let is_obj = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("obj"));
        if !is_obj {
            continue;
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();
        if stem.contains(&needle) {
            candidates.push(path);
        }
    }

    candidates.sort();
    match candidates.first() {
        Some(path) => {
            debug!("模型路径解析: '{query}' -> {path:?}");
            Ok(path.clone())
        }
        None => Err(format!("在 {dir:?} 中找不到与 '{query}' 匹配的OBJ文件")),
    }
}
