use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{FluidError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    pub sim_size: usize,
    pub diffusion_rate: f32,
    pub viscosity: f32,
    pub relaxation_iterations: usize,
    pub max_timestep: f32,
    pub profile: bool,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            sim_size: 256,
            diffusion_rate: 0.0001,
            viscosity: 0.0000001,
            relaxation_iterations: 20,
            max_timestep: 0.05,
            profile: false,
        }
    }
}

impl SimulationParameters {
    pub fn new(sim_size: usize, diffusion_rate: f32, viscosity: f32) -> Self {
        Self {
            sim_size,
            diffusion_rate,
            viscosity,
            ..Default::default()
        }
    }

    pub fn with_relaxation_iterations(mut self, iterations: usize) -> Self {
        self.relaxation_iterations = iterations;
        self
    }

    pub fn with_profiling(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sim_size == 0 {
            return Err(FluidError::InvalidConfig("sim_size must be positive".into()));
        }
        if !self.diffusion_rate.is_finite() || self.diffusion_rate < 0.0 {
            return Err(FluidError::InvalidConfig(format!(
                "diffusion_rate {} must be finite and non-negative",
                self.diffusion_rate
            )));
        }
        if !self.viscosity.is_finite() || self.viscosity < 0.0 {
            return Err(FluidError::InvalidConfig(format!(
                "viscosity {} must be finite and non-negative",
                self.viscosity
            )));
        }
        if self.relaxation_iterations == 0 {
            return Err(FluidError::InvalidConfig(
                "relaxation_iterations must be positive".into(),
            ));
        }
        if !self.max_timestep.is_finite() || self.max_timestep <= 0.0 {
            return Err(FluidError::InvalidConfig(format!(
                "max_timestep {} must be positive",
                self.max_timestep
            )));
        }
        Ok(())
    }

    pub fn clamp_timestep(&self, dt: f32) -> f32 {
        dt.min(self.max_timestep).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub wall: f32,
    pub sim: f32,
}

#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    max_timestep: f32,
}

impl FrameClock {
    pub fn new(max_timestep: f32) -> Self {
        Self {
            last: Instant::now(),
            max_timestep,
        }
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let wall = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        FrameTime {
            wall,
            sim: wall.min(self.max_timestep),
        }
    }
}
