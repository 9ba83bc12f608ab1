use nalgebra::{Point3, Vector3};

/// 所有可通过TOML配置的参数，纯数据结构
///
/// 渲染、相机、查看器交互与特征配准参数统一存放，
/// CLI和GUI都直接读写这里的字段。
#[derive(Debug, Clone)]
pub struct RenderSettings {
    // ===== 文件路径设置 =====
    /// 输入OBJ文件（裸文件名时在model_dir下查找）
    pub obj: Option<String>,
    /// 裸文件名的模型搜索目录
    pub model_dir: String,
    /// 输出文件的基础名称（截图与配准结果），空时由模型文件名推导
    pub output: String,
    /// 输出图像的目录
    pub output_dir: String,
    /// 配准参考图像路径（灰度PNG）
    pub reference: Option<String>,

    // ===== 渲染基础设置 =====
    /// 输出图像的宽度
    pub width: usize,
    /// 输出图像的高度
    pub height: usize,
    /// 背景颜色，格式为"r,g,b"
    pub background_color: String,
    /// 模型颜色，格式为"r,g,b"
    pub object_color: String,
    /// 环境光强度因子
    pub ambient: f32,
    /// 启用Z缓冲（深度测试）
    pub use_zbuffer: bool,
    /// 启用背面剔除
    pub backface_culling: bool,
    /// 启用gamma矫正
    pub use_gamma: bool,
    /// 启用多线程渲染
    pub use_multithreading: bool,

    // ===== 相机参数 =====
    /// 相机位置（视点），格式为"x,y,z"
    pub camera_from: String,
    /// 相机目标（观察点），格式为"x,y,z"
    pub camera_at: String,
    /// 相机上方向，格式为"x,y,z"
    pub camera_up: String,
    /// 相机垂直视场角（度）
    pub camera_fov: f32,
    /// 初始方位角旋转（度）
    pub camera_azimuth: f32,
    /// 初始仰角旋转（度）
    pub camera_elevation: f32,

    // ===== 查看器交互设置 =====
    /// 方向键每次旋转的角度（度）
    pub rotation_step: f32,
    /// 截图后随机扰动的次数
    pub perturbation_count: usize,
    /// 随机扰动角度的上限（度，区间为±该值）
    pub perturbation_max_angle: f32,

    // ===== 特征配准参数 =====
    /// ORB特征点数量上限
    pub orb_features: usize,
    /// ORB金字塔层数
    pub orb_levels: usize,
    /// ORB金字塔相邻层的缩放因子
    pub orb_scale_factor: f32,
    /// FAST角点检测阈值
    pub fast_threshold: u8,
    /// 按距离排序后保留的匹配比例
    pub match_keep_ratio: f32,
    /// RANSAC重投影误差阈值（像素）
    pub ransac_threshold: f64,
    /// RANSAC最大迭代次数
    pub ransac_max_iterations: usize,
    /// RANSAC置信度
    pub ransac_confidence: f64,
}

/// 辅助函数：解析逗号分隔的三个浮点数
pub fn parse_vec3(s: &str) -> Result<Vector3<f32>, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err("需要3个逗号分隔的值".to_string());
    }
    let x = parts[0]
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("无效数字 '{}': {}", parts[0], e))?;
    let y = parts[1]
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("无效数字 '{}': {}", parts[1], e))?;
    let z = parts[2]
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("无效数字 '{}': {}", parts[2], e))?;
    Ok(Vector3::new(x, y, z))
}

pub fn parse_point3(s: &str) -> Result<Point3<f32>, String> {
    parse_vec3(s).map(Point3::from)
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            // ===== 文件路径设置 =====
            obj: None,
            model_dir: "objs".to_string(),
            output: String::new(),
            output_dir: "resources".to_string(),
            reference: None,

            // ===== 渲染基础设置 =====
            width: 800,
            height: 800,
            background_color: "0.05,0.05,0.05".to_string(),
            object_color: "0.85,0.85,0.85".to_string(),
            ambient: 0.15,
            use_zbuffer: true,
            backface_culling: true,
            use_gamma: true,
            use_multithreading: true,

            // ===== 相机参数 =====
            camera_from: "0,-1,0".to_string(),
            camera_at: "0,0,0".to_string(),
            camera_up: "0,0,-1".to_string(),
            camera_fov: 30.0,
            camera_azimuth: 30.0,
            camera_elevation: 30.0,

            // ===== 查看器交互设置 =====
            rotation_step: 5.0,
            perturbation_count: 10,
            perturbation_max_angle: 10.0,

            // ===== 特征配准参数 =====
            orb_features: 500,
            orb_levels: 8,
            orb_scale_factor: 1.2,
            fast_threshold: 20,
            match_keep_ratio: 0.15,
            ransac_threshold: 3.0,
            ransac_max_iterations: 2000,
            ransac_confidence: 0.995,
        }
    }
}

impl RenderSettings {
    /// 获取背景颜色向量（按需计算）
    pub fn background_color_vec(&self) -> Vector3<f32> {
        parse_vec3(&self.background_color).unwrap_or_else(|_| Vector3::new(0.05, 0.05, 0.05))
    }

    /// 获取模型颜色向量（按需计算）
    pub fn object_color_vec(&self) -> Vector3<f32> {
        parse_vec3(&self.object_color).unwrap_or_else(|_| Vector3::new(0.85, 0.85, 0.85))
    }

    /// 验证配置参数
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("错误: 图像宽度和高度必须大于0".to_string());
        }

        if self.obj.is_none() {
            return Err("错误: 未指定OBJ文件路径".to_string());
        }

        if self.output_dir.trim().is_empty() {
            return Err("错误: 输出目录不能为空".to_string());
        }

        if self.output.trim().is_empty() {
            return Err("错误: 输出文件名不能为空".to_string());
        }

        if parse_vec3(&self.camera_from).is_err() {
            return Err("错误: 相机位置格式不正确，应为 x,y,z 格式".to_string());
        }

        if parse_vec3(&self.camera_at).is_err() {
            return Err("错误: 相机目标格式不正确，应为 x,y,z 格式".to_string());
        }

        if parse_vec3(&self.camera_up).is_err() {
            return Err("错误: 相机上方向格式不正确，应为 x,y,z 格式".to_string());
        }

        if parse_vec3(&self.background_color).is_err() || parse_vec3(&self.object_color).is_err() {
            return Err("错误: 颜色格式不正确，应为 r,g,b 格式".to_string());
        }

        if self.camera_fov <= 0.0 || self.camera_fov >= 180.0 {
            return Err("错误: 视场角必须位于(0, 180)度之间".to_string());
        }

        if self.orb_features < 8 {
            return Err("错误: ORB特征点数量至少为8".to_string());
        }

        if !(0.0..=1.0).contains(&self.match_keep_ratio) {
            return Err("错误: 匹配保留比例必须位于[0, 1]之间".to_string());
        }

        if !(0.0..1.0).contains(&self.ransac_confidence) {
            return Err("错误: RANSAC置信度必须位于[0, 1)之间".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_vec3_accepts_spaces() {
        let v = parse_vec3(" 0.1, 0.2 ,0.3 ").unwrap();
        assert!((v.x - 0.1).abs() < 1e-6);
        assert!((v.z - 0.3).abs() < 1e-6);
    }

    #[test]
    fn parse_vec3_rejects_wrong_arity() {
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,2,x").is_err());
    }

    #[test]
    fn default_settings_require_obj_and_output() {
        let settings = RenderSettings::default();
        assert!(settings.validate().is_err());

        // 仅有模型仍缺输出名
        let settings = RenderSettings {
            obj: Some("skull.obj".to_string()),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = RenderSettings {
            obj: Some("skull.obj".to_string()),
            output: "skull".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_keep_ratio() {
        let settings = RenderSettings {
            obj: Some("skull.obj".to_string()),
            match_keep_ratio: 1.5,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
