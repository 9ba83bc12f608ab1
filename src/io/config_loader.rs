use crate::io::render_settings::RenderSettings;
use log::{info, warn};
use std::fs;
use std::path::Path;
use toml::Value;

/// TOML配置文件加载器
pub struct TomlConfigLoader;

impl TomlConfigLoader {
    /// 从TOML文件加载配置，未出现的键保持默认值
    pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<RenderSettings, String> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| format!("无法读取配置文件 {path:?}: {e}"))?;
        let value: Value =
            toml::from_str(&content).map_err(|e| format!("TOML解析失败 {path:?}: {e}"))?;

        let mut settings = RenderSettings::default();

        if let Some(files) = value.get("files").and_then(|v| v.as_table()) {
            if let Some(s) = get_str(files, "obj") {
                settings.obj = Some(s);
            }
            if let Some(s) = get_str(files, "model_dir") {
                settings.model_dir = s;
            }
            if let Some(s) = get_str(files, "output") {
                settings.output = s;
            }
            if let Some(s) = get_str(files, "output_dir") {
                settings.output_dir = s;
            }
            if let Some(s) = get_str(files, "reference") {
                settings.reference = Some(s);
            }
        }

        if let Some(render) = value.get("render").and_then(|v| v.as_table()) {
            if let Some(n) = get_usize(render, "width") {
                settings.width = n;
            }
            if let Some(n) = get_usize(render, "height") {
                settings.height = n;
            }
            if let Some(s) = get_str(render, "background_color") {
                settings.background_color = s;
            }
            if let Some(s) = get_str(render, "object_color") {
                settings.object_color = s;
            }
            if let Some(f) = get_f32(render, "ambient") {
                settings.ambient = f;
            }
            if let Some(b) = get_bool(render, "use_zbuffer") {
                settings.use_zbuffer = b;
            }
            if let Some(b) = get_bool(render, "backface_culling") {
                settings.backface_culling = b;
            }
            if let Some(b) = get_bool(render, "use_gamma") {
                settings.use_gamma = b;
            }
            if let Some(b) = get_bool(render, "use_multithreading") {
                settings.use_multithreading = b;
            }
        }

        if let Some(camera) = value.get("camera").and_then(|v| v.as_table()) {
            if let Some(s) = get_str(camera, "from") {
                settings.camera_from = s;
            }
            if let Some(s) = get_str(camera, "at") {
                settings.camera_at = s;
            }
            if let Some(s) = get_str(camera, "up") {
                settings.camera_up = s;
            }
            if let Some(f) = get_f32(camera, "fov") {
                settings.camera_fov = f;
            }
            if let Some(f) = get_f32(camera, "azimuth") {
                settings.camera_azimuth = f;
            }
            if let Some(f) = get_f32(camera, "elevation") {
                settings.camera_elevation = f;
            }
        }

        if let Some(viewer) = value.get("viewer").and_then(|v| v.as_table()) {
            if let Some(f) = get_f32(viewer, "rotation_step") {
                settings.rotation_step = f;
            }
            if let Some(n) = get_usize(viewer, "perturbation_count") {
                settings.perturbation_count = n;
            }
            if let Some(f) = get_f32(viewer, "perturbation_max_angle") {
                settings.perturbation_max_angle = f;
            }
        }

        if let Some(vision) = value.get("vision").and_then(|v| v.as_table()) {
            if let Some(n) = get_usize(vision, "orb_features") {
                settings.orb_features = n;
            }
            if let Some(n) = get_usize(vision, "orb_levels") {
                settings.orb_levels = n;
            }
            if let Some(f) = get_f32(vision, "orb_scale_factor") {
                settings.orb_scale_factor = f;
            }
            if let Some(n) = get_usize(vision, "fast_threshold") {
                settings.fast_threshold = n.min(u8::MAX as usize) as u8;
            }
            if let Some(f) = get_f32(vision, "match_keep_ratio") {
                settings.match_keep_ratio = f;
            }
            if let Some(f) = get_f64(vision, "ransac_threshold") {
                settings.ransac_threshold = f;
            }
            if let Some(n) = get_usize(vision, "ransac_max_iterations") {
                settings.ransac_max_iterations = n;
            }
            if let Some(f) = get_f64(vision, "ransac_confidence") {
                settings.ransac_confidence = f;
            }
        }

        info!("已加载配置文件: {path:?}");
        Ok(settings)
    }

    /// 写出一份带注释的示例配置文件
    pub fn save_example_config<P: AsRef<Path>>(path: P) -> Result<(), String> {
        let path = path.as_ref();
        if path.exists() {
            warn!("示例配置已存在，跳过写入: {path:?}");
            return Ok(());
        }
        fs::write(path, EXAMPLE_CONFIG)
            .map_err(|e| format!("无法写入示例配置 {path:?}: {e}"))?;
        info!("已生成示例配置: {path:?}");
        Ok(())
    }
}

fn get_str(table: &toml::map::Map<String, Value>, key: &str) -> Option<String> {
    table.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn get_bool(table: &toml::map::Map<String, Value>, key: &str) -> Option<bool> {
    table.get(key).and_then(|v| v.as_bool())
}

fn get_usize(table: &toml::map::Map<String, Value>, key: &str) -> Option<usize> {
    table
        .get(key)
        .and_then(|v| v.as_integer())
        .and_then(|n| usize::try_from(n).ok())
}

fn get_f32(table: &toml::map::Map<String, Value>, key: &str) -> Option<f32> {
    match table.get(key) {
        Some(Value::Float(f)) => Some(*f as f32),
        Some(Value::Integer(n)) => Some(*n as f32),
        _ => None,
    }
}

fn get_f64(table: &toml::map::Map<String, Value>, key: &str) -> Option<f64> {
    match table.get(key) {
        Some(Value::Float(f)) => Some(*f),
        Some(Value::Integer(n)) => Some(*n as f64),
        _ => None,
    }
}

const EXAMPLE_CONFIG: &str = r#"# skullalign 示例配置

[files]
obj = "skull.obj"          # 裸文件名时在 model_dir 下查找
model_dir = "objs"
output = "principal"
output_dir = "resources"
# reference = "resources/reference.png"

[render]
width = 800
height = 800
background_color = "0.05,0.05,0.05"
object_color = "0.85,0.85,0.85"
ambient = 0.15
use_zbuffer = true
backface_culling = true
use_gamma = true
use_multithreading = true

[camera]
from = "0,-1,0"
at = "0,0,0"
up = "0,0,-1"
fov = 30.0
azimuth = 30.0
elevation = 30.0

[viewer]
rotation_step = 5.0
perturbation_count = 10
perturbation_max_angle = 10.0

[vision]
orb_features = 500
orb_levels = 8
orb_scale_factor = 1.2
fast_threshold = 20
match_keep_ratio = 0.15
ransac_threshold = 3.0
ransac_max_iterations = 2000
ransac_confidence = 0.995
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_partial_config_keeps_defaults() {
        let dir = std::env::temp_dir().join("skullalign_cfg_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("partial.toml");
        std::fs::write(
            &path,
            "[files]\nobj = \"cranium.obj\"\n\n[vision]\norb_features = 800\n",
        )
        .unwrap();

        let settings = TomlConfigLoader::load_settings(&path).unwrap();
        assert_eq!(settings.obj.as_deref(), Some("cranium.obj"));
        assert_eq!(settings.orb_features, 800);
        assert_eq!(settings.width, 800);
        assert!((settings.match_keep_ratio - 0.15).abs() < 1e-6);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn example_config_round_trips() {
        let settings_text: toml::Value = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert!(settings_text.get("vision").is_some());

        let dir = std::env::temp_dir().join("skullalign_cfg_example");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("example.toml");
        std::fs::remove_file(&path).ok();
        TomlConfigLoader::save_example_config(&path).unwrap();
        let settings = TomlConfigLoader::load_settings(&path).unwrap();
        assert_eq!(settings.orb_levels, 8);
        std::fs::remove_file(&path).ok();
    }
}
