use eframe::egui;
use glam::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::analysis::FluidMetrics;
use crate::backend::ComputeBackend;
use crate::config::FrameClock;
use crate::export::ImageExporter;
use crate::input::{self, PointerTracker, Stream};
use crate::render;
use crate::simulation::FluidSim;

pub const WINDOW_SIZE: f32 = 600.0;

pub struct DesktopApp<B: ComputeBackend> {
    simulation: FluidSim<B>,
    texture: Option<egui::TextureHandle>,
    tracker: PointerTracker,
    streams: Vec<Stream>,
    rng: StdRng,
    clock: FrameClock,
    exporter: ImageExporter,
    paused: bool,
    streams_enabled: bool,
    status: Option<String>,
    fps: f32,
    exported: usize,
}

impl<B: ComputeBackend> DesktopApp<B> {
    pub fn new(simulation: FluidSim<B>) -> Self {
        let clock = FrameClock::new(simulation.params().max_timestep);
        let n = simulation.grid().sim_size as u32;
        Self {
            simulation,
            texture: None,
            tracker: PointerTracker::new(),
            streams: input::default_streams().to_vec(),
            rng: StdRng::from_entropy(),
            clock,
            exporter: ImageExporter::new(n, n),
            paused: false,
            streams_enabled: true,
            status: None,
            fps: 0.0,
            exported: 0,
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let (toggle, pause, reset) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::P),
                i.key_pressed(egui::Key::R),
            )
        });
        if toggle {
            self.tracker.toggle_density_field();
        }
        if pause {
            self.paused = !self.paused;
        }
        if reset {
            self.reset();
        }
    }

    fn reset(&mut self) {
        if let Err(err) = self.simulation.reset() {
            log::error!("reset failed: {err}");
            self.status = Some(err.to_string());
        }
        self.tracker.release();
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, rect: egui::Rect, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                let normalized = Vec2::new(
                    (pos.x - rect.left()) / rect.width(),
                    (pos.y - rect.top()) / rect.height(),
                );
                let shift = ctx.input(|i| i.modifiers.shift);
                let impulses = self.tracker.drag(normalized, shift);
                if let Err(err) = input::apply_all(&mut self.simulation, &impulses) {
                    log::warn!("ignored pointer input: {err}");
                }
            }
        } else if self.tracker.is_dragging() {
            self.tracker.release();
        }
    }

    fn advance(&mut self, ctx: &egui::Context) {
        let frame_time = self.clock.tick();
        if frame_time.wall > 0.0 {
            self.fps = 1.0 / frame_time.wall;
        }
        if self.paused {
            return;
        }

        if self.streams_enabled {
            for stream in &self.streams {
                let impulses = stream.impulses(&mut self.rng);
                if let Err(err) = input::apply_all(&mut self.simulation, &impulses) {
                    log::warn!("ignored stream input: {err}");
                }
            }
        }

        match self.simulation.step(frame_time.sim) {
            Ok(view) => {
                let image = render::to_color_image(&view);
                match &mut self.texture {
                    Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                    None => {
                        self.texture =
                            Some(ctx.load_texture("density", image, egui::TextureOptions::LINEAR));
                    }
                }
            }
            Err(err) => {
                log::error!("simulation step failed: {err}");
                self.status = Some(err.to_string());
                self.paused = true;
            }
        }
    }

    fn export_frame(&mut self) {
        let path = std::path::PathBuf::from(format!("frame_{:04}.png", self.exported));
        let view = self.simulation.view();
        match self.exporter.export_density_png(&view, &path) {
            Ok(()) => {
                self.exported += 1;
                self.status = Some(format!("exported {}", path.display()));
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn log_metrics(&mut self) {
        match FluidMetrics::capture(&mut self.simulation) {
            Ok(metrics) => log::info!("{metrics}"),
            Err(err) => self.status = Some(err.to_string()),
        }
    }
}

impl<B: ComputeBackend> eframe::App for DesktopApp<B> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);
        self.advance(ctx);

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button(if self.paused { "Resume" } else { "Pause" }).clicked() {
                    self.paused = !self.paused;
                }
                if ui.button("Reset").clicked() {
                    self.reset();
                }
                if ui.button("Export PNG").clicked() {
                    self.export_frame();
                }
                if ui.button("Metrics").clicked() {
                    self.log_metrics();
                }
                ui.checkbox(&mut self.streams_enabled, "Streams");
                ui.separator();
                ui.label(format!("Shift-drag: {}", self.tracker.density_field()));
            });
            ui.horizontal(|ui| {
                ui.label(format!(
                    "{} | {:.0} fps | frame {}",
                    self.simulation.backend_name(),
                    self.fps,
                    self.simulation.frames()
                ));
                if let Some(status) = &self.status {
                    ui.separator();
                    ui.label(status);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let side = ui.available_width().min(ui.available_height());
            let (rect, response) =
                ui.allocate_exact_size(egui::Vec2::splat(side), egui::Sense::click_and_drag());

            self.handle_pointer(ctx, rect, &response);

            if let Some(texture) = &self.texture {
                ui.painter().image(
                    texture.id(),
                    rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
        });

        ctx.request_repaint();
    }
}

pub fn run<B: ComputeBackend + 'static>(simulation: FluidSim<B>) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([WINDOW_SIZE, WINDOW_SIZE + 60.0])
            .with_title("fluid2d"),
        ..Default::default()
    };

    eframe::run_native(
        "fluid2d",
        options,
        Box::new(|_cc| Box::new(DesktopApp::new(simulation))),
    )
}
