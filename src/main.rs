mod alignment;
mod core;
mod geometry;
mod io;
mod scene;
mod ui;
mod utils;
mod vision;

use crate::io::config_loader::TomlConfigLoader;
use crate::io::simple_cli::SimpleCli;
use log::info;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = SimpleCli::parse_args();

    if cli.use_example_config {
        return TomlConfigLoader::save_example_config("skullalign.toml");
    }

    let settings = cli.build_settings()?;

    if cli.headless {
        // 显式给定参考图像，或默认参考图像存在时，执行配准
        let has_reference = settings.reference.is_some()
            || std::path::Path::new(alignment::DEFAULT_REFERENCE).is_file();
        if has_reference {
            let outcome = alignment::run_alignment(&settings)?;
            info!(
                "配准完成: {}/{} 个内点，结果保存至 {:?}",
                outcome.inlier_mask.iter().filter(|&&b| b).count(),
                outcome.matches_used,
                outcome.aligned_image_path
            );
        } else {
            let path = alignment::run_headless_snapshot(&settings, None)?;
            info!("渲染完成: {path:?}");
        }
        return Ok(());
    }

    ui::app::run_viewer(settings)
}
