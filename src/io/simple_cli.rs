use crate::io::config_loader::TomlConfigLoader;
use crate::io::render_settings::RenderSettings;
use clap::Parser;
use log::info;

/// 命令行接口：无参数时启动交互查看器，--headless 进入批处理
#[derive(Parser, Debug)]
#[command(name = "skullalign")]
#[command(about = "颅骨模型查看与ORB单应性配准工具")]
#[command(version)]
pub struct SimpleCli {
    /// TOML配置文件路径
    #[arg(short, long)]
    pub config: Option<String>,

    /// OBJ模型文件（裸文件名时在模型目录下模糊匹配）
    #[arg(long)]
    pub obj: Option<String>,

    /// 输出文件基础名称
    #[arg(long)]
    pub name: Option<String>,

    /// 配准参考图像路径（灰度PNG）
    #[arg(long)]
    pub reference: Option<String>,

    /// 输出图像目录
    #[arg(long)]
    pub output_dir: Option<String>,

    /// 图像宽度
    #[arg(long)]
    pub width: Option<usize>,

    /// 图像高度
    #[arg(long)]
    pub height: Option<usize>,

    /// 无界面模式：渲染初始视角（给定--reference时执行配准）
    #[arg(long)]
    pub headless: bool,

    /// 生成示例配置文件 skullalign.toml 后退出
    #[arg(long)]
    pub use_example_config: bool,
}

impl SimpleCli {
    /// 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// 合并配置文件与命令行覆盖项，得到最终配置
    pub fn build_settings(&self) -> Result<RenderSettings, String> {
        let mut settings = match &self.config {
            Some(path) => TomlConfigLoader::load_settings(path)?,
            None => RenderSettings::default(),
        };

        if let Some(obj) = &self.obj {
            settings.obj = Some(obj.clone());
        }
        if let Some(name) = &self.name {
            settings.output = name.clone();
        }
        if let Some(reference) = &self.reference {
            settings.reference = Some(reference.clone());
        }
        if let Some(output_dir) = &self.output_dir {
            settings.output_dir = output_dir.clone();
        }
        if let Some(width) = self.width {
            settings.width = width;
        }
        if let Some(height) = self.height {
            settings.height = height;
        }

        // 未显式命名输出时，以模型文件名作为截图基础名
        if settings.output.trim().is_empty() {
            if let Some(obj) = &settings.obj {
                settings.output = std::path::Path::new(obj)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("principal")
                    .to_string();
            }
        }

        settings.validate()?;
        info!(
            "配置就绪: 模型 {:?}，输出 {}/{}，分辨率 {}x{}",
            settings.obj, settings.output_dir, settings.output, settings.width, settings.height
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_take_effect() {
        let cli = SimpleCli::parse_from([
            "skullalign",
            "--obj",
            "skull.obj",
            "--name",
            "out",
            "--width",
            "640",
        ]);
        let settings = cli.build_settings().unwrap();
        assert_eq!(settings.obj.as_deref(), Some("skull.obj"));
        assert_eq!(settings.output, "out");
        assert_eq!(settings.width, 640);
        assert_eq!(settings.height, 800);
        assert!(!cli.headless);
    }

    #[test]
    fn output_defaults_to_model_stem() {
        let cli = SimpleCli::parse_from(["skullalign", "--obj", "objs/Skull_A.obj"]);
        let settings = cli.build_settings().unwrap();
        assert_eq!(settings.output, "Skull_A");

        let cli = SimpleCli::parse_from(["skullalign", "--obj", "skull.obj", "--name", "pose1"]);
        let settings = cli.build_settings().unwrap();
        assert_eq!(settings.output, "pose1");
    }

    #[test]
    fn missing_obj_fails_validation() {
        let cli = SimpleCli::parse_from(["skullalign", "--headless"]);
        assert!(cli.build_settings().is_err());
    }
}
