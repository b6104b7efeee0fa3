use std::path::{Path, PathBuf};

use crate::backend::ComputeBackend;
use crate::error::{FluidError, Result};
use crate::render::Renderer;
use crate::simulation::{FieldView, FluidSim};

fn image_error(err: image::ImageError) -> FluidError {
    match err {
        image::ImageError::IoError(io) => FluidError::Io(io),
        other => FluidError::Io(std::io::Error::other(other)),
    }
}

pub struct ImageExporter {
    renderer: Renderer,
}

impl ImageExporter {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            renderer: Renderer::new(width, height),
        }
    }

    pub fn export_density_png(&self, view: &FieldView<'_>, path: &Path) -> Result<()> {
        self.renderer
            .render_density(view)
            .save(path)
            .map_err(image_error)
    }

    pub fn export_velocity_png<B: ComputeBackend>(
        &self,
        simulation: &mut FluidSim<B>,
        scale: f32,
        path: &Path,
    ) -> Result<()> {
        let velocity = simulation.read_velocity()?;
        self.renderer
            .render_velocity(simulation.grid(), &velocity, scale)
            .save(path)
            .map_err(image_error)
    }

    pub fn export_frame_sequence<B: ComputeBackend>(
        &self,
        simulation: &mut FluidSim<B>,
        steps: usize,
        dt: f32,
        output_dir: &Path,
        prefix: &str,
        mut before_step: impl FnMut(&mut FluidSim<B>, usize),
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(output_dir)?;
        let mut written = Vec::with_capacity(steps);

        for i in 0..steps {
            before_step(simulation, i);
            let view = simulation.step(dt)?;

            let path = output_dir.join(format!("{prefix}_frame_{i:04}.png"));
            self.export_density_png(&view, &path)?;
            log::debug!("wrote {}", path.display());
            written.push(path);
        }

        Ok(written)
    }
}
