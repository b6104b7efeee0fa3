use std::fmt;

use crate::backend::ComputeBackend;
use crate::error::Result;
use crate::grid::Grid;
use crate::simulation::{FieldView, FluidSim};

pub fn divergence_stats(grid: Grid, velocity: &[f32]) -> (f32, f32) {
    let view = FieldView::new(grid, velocity);
    let n = grid.sim_size;
    let mut max: f32 = 0.0;
    let mut sum = 0.0;

    for y in 1..=n {
        for x in 1..=n {
            let div = 0.5
                * (view.get(x + 1, y, 0) - view.get(x - 1, y, 0) + view.get(x, y + 1, 1)
                    - view.get(x, y - 1, 1));
            max = max.max(div.abs());
            sum += div.abs();
        }
    }

    (max, sum / (n * n) as f32)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FluidMetrics {
    pub frame: u64,
    pub mass_a: f32,
    pub mass_b: f32,
    pub max_density: f32,
    pub kinetic_energy: f32,
    pub max_speed: f32,
    pub max_divergence: f32,
    pub mean_divergence: f32,
}

impl FluidMetrics {
    pub fn analyze(grid: Grid, density: &[f32], velocity: &[f32], frame: u64) -> Self {
        let dens = FieldView::new(grid, density);
        let vel = FieldView::new(grid, velocity);
        let n = grid.sim_size;

        let mut max_density: f32 = 0.0;
        let mut kinetic_energy = 0.0;
        let mut max_speed: f32 = 0.0;

        for y in 1..=n {
            for x in 1..=n {
                let rho = dens.a(x, y) + dens.b(x, y);
                let u = vel.get(x, y, 0);
                let v = vel.get(x, y, 1);
                let speed_sqrd = u * u + v * v;

                max_density = max_density.max(dens.a(x, y)).max(dens.b(x, y));
                kinetic_energy += 0.5 * rho * speed_sqrd;
                max_speed = max_speed.max(speed_sqrd.sqrt());
            }
        }

        let (max_divergence, mean_divergence) = divergence_stats(grid, velocity);

        Self {
            frame,
            mass_a: dens.total(0),
            mass_b: dens.total(1),
            max_density,
            kinetic_energy,
            max_speed,
            max_divergence,
            mean_divergence,
        }
    }

    pub fn capture<B: ComputeBackend>(simulation: &mut FluidSim<B>) -> Result<Self> {
        let density = simulation.read_density()?;
        let velocity = simulation.read_velocity()?;
        Ok(Self::analyze(
            simulation.grid(),
            &density,
            &velocity,
            simulation.frames(),
        ))
    }

    pub fn total_mass(&self) -> f32 {
        self.mass_a + self.mass_b
    }
}

impl fmt::Display for FluidMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Frame {} metrics:", self.frame)?;
        writeln!(f, "  Mass A/B: {:.6} / {:.6}", self.mass_a, self.mass_b)?;
        writeln!(f, "  Max density: {:.6}", self.max_density)?;
        writeln!(f, "  Kinetic energy: {:.6}", self.kinetic_energy)?;
        writeln!(f, "  Max speed: {:.6}", self.max_speed)?;
        write!(
            f,
            "  Divergence max/mean: {:.6} / {:.6}",
            self.max_divergence, self.mean_divergence
        )
    }
}

#[derive(Debug, Default)]
pub struct AnalysisRecorder {
    pub metrics_history: Vec<FluidMetrics>,
}

impl AnalysisRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame<B: ComputeBackend>(&mut self, simulation: &mut FluidSim<B>) -> Result<()> {
        let metrics = FluidMetrics::capture(simulation)?;
        log::debug!("{metrics}");
        self.metrics_history.push(metrics);
        Ok(())
    }

    pub fn trends(&self) -> Option<(f32, f32)> {
        let (first, last) = match self.metrics_history.as_slice() {
            [first, .., last] => (first, last),
            _ => return None,
        };
        let mass = (last.total_mass() - first.total_mass()) / first.total_mass().max(1e-6) * 100.0;
        let energy =
            (last.kinetic_energy - first.kinetic_energy) / first.kinetic_energy.max(1e-6) * 100.0;
        Some((mass, energy))
    }

    pub fn log_trends(&self) {
        if let Some((mass, energy)) = self.trends() {
            log::info!("mass change {mass:+.3}%, kinetic energy change {energy:+.3}%");
        }
    }
}
