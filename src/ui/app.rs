use crate::alignment::{build_camera, load_scene_mesh};
use crate::core::renderer::Renderer;
use crate::geometry::camera::Camera;
use crate::io::obj_loader::Mesh;
use crate::io::render_settings::RenderSettings;
use crate::scene::scene_object::{SceneObject, Transformable};
use crate::utils::image_utils::{rgb_bytes_to_color_image, save_png, unique_output_path};
use eframe::egui;
use log::{error, info};
use rand::Rng;

/// 交互式模型查看器
///
/// 方向键调整模型姿态，Q键截图并生成随机扰动视图。
pub struct ViewerApp {
    settings: RenderSettings,
    mesh: Mesh,
    object: SceneObject,
    camera: Camera,
    renderer: Renderer,
    texture: Option<egui::TextureHandle>,
    needs_render: bool,
    status: String,
}

impl ViewerApp {
    pub fn new(settings: RenderSettings) -> Result<Self, String> {
        let mesh = load_scene_mesh(&settings)?;
        let camera = build_camera(&settings, mesh.bounding_radius())?;
        let renderer = Renderer::new(settings.width, settings.height);
        let object = SceneObject::new(settings.output.clone());
        Ok(Self {
            settings,
            mesh,
            object,
            camera,
            renderer,
            texture: None,
            needs_render: true,
            status: "方向键旋转模型，Shift+上下绕Y轴，Q键截图".to_string(),
        })
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let step = self.settings.rotation_step.to_radians();
        let shift = ctx.input(|i| i.modifiers.shift);

        if ctx.input(|i| i.key_pressed(egui::Key::ArrowUp)) {
            if shift {
                self.object.rotate_y(step);
            } else {
                self.object.rotate_x(step);
            }
            self.needs_render = true;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowDown)) {
            if shift {
                self.object.rotate_y(-step);
            } else {
                self.object.rotate_x(-step);
            }
            self.needs_render = true;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowRight)) {
            self.object.rotate_z(step);
            self.needs_render = true;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowLeft)) {
            self.object.rotate_z(-step);
            self.needs_render = true;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            match self.capture_views() {
                Ok(count) => {
                    self.status = format!("已保存截图与 {count} 个扰动视图");
                }
                Err(e) => {
                    error!("截图失败: {e}");
                    self.status = format!("截图失败: {e}");
                }
            }
            self.needs_render = true;
        }
    }

    /// 保存当前视图截图，再逐次对当前姿态施加随机小角度
    /// 扰动并保存，扰动在姿态上累积
    fn capture_views(&mut self) -> Result<usize, String> {
        let image =
            self.renderer
                .render_to_image(&self.mesh, &self.object, &self.camera, &self.settings)?;
        let path = unique_output_path(&self.settings.output_dir, &self.settings.output);
        save_png(&image, &path)?;

        let mut rng = rand::rng();
        let max_angle = self.settings.perturbation_max_angle;
        for i in 0..self.settings.perturbation_count {
            let angle = rng.random_range(-max_angle..=max_angle).to_radians();
            // 位掩码决定扰动作用的坐标轴组合，0表示不旋转
            let axis_mask: u8 = rng.random_range(0..7);

            if axis_mask & 0b001 != 0 {
                self.object.rotate_x(angle);
            }
            if axis_mask & 0b010 != 0 {
                self.object.rotate_y(angle);
            }
            if axis_mask & 0b100 != 0 {
                self.object.rotate_z(angle);
            }

            let image = self.renderer.render_to_image(
                &self.mesh,
                &self.object,
                &self.camera,
                &self.settings,
            )?;
            let perturbed_path = std::path::Path::new(&self.settings.output_dir)
                .join(format!("{}_{}.png", self.settings.output, i));
            save_png(&image, &perturbed_path)?;
        }

        info!(
            "截图完成: {:?} 以及 {} 个扰动视图",
            path, self.settings.perturbation_count
        );
        Ok(self.settings.perturbation_count)
    }

    fn render_if_needed(&mut self, ctx: &egui::Context) {
        if !self.needs_render {
            return;
        }
        self.renderer
            .render(&self.mesh, &self.object, &self.camera, &self.settings);
        let color_image = rgb_bytes_to_color_image(
            self.renderer.frame_buffer.width,
            self.renderer.frame_buffer.height,
            &self.renderer.frame_buffer.to_rgb_bytes(),
        );
        match &mut self.texture {
            Some(texture) => texture.set(color_image, egui::TextureOptions::NEAREST),
            None => {
                self.texture = Some(ctx.load_texture(
                    "viewport",
                    color_image,
                    egui::TextureOptions::NEAREST,
                ));
            }
        }
        self.needs_render = false;
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_input(ctx);
        self.render_if_needed(ctx);

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(&self.status);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(texture) = &self.texture {
                ui.centered_and_justified(|ui| {
                    ui.image(texture);
                });
            }
        });
    }
}


/// 启动交互查看器窗口
pub fn run_viewer(settings: RenderSettings) -> Result<(), String> {
    let width = settings.width as f32;
    let height = settings.height as f32;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([width, height + 24.0]),
        ..Default::default()
    };

    let app = ViewerApp::new(settings)?;
    eframe::run_native(
        "skullalign viewer",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|e| format!("查看器启动失败: {e}"))
}
