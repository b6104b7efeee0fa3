#[cfg(feature = "cpu")]
pub mod cpu;

#[cfg(feature = "gpu")]
pub mod gpu;

use crate::error::BackendError;
use crate::events::SourceEvent;
use crate::field::BoundaryKind;
use crate::grid::Grid;

// Buffers are borrowed for the duration of the call only; backends keep no
// references between dispatches.
pub enum Kernel<'a, B> {
    AddSource { dest: &'a mut B, src: &'a B, dt: f32 },
    SetBoundary { dest: &'a mut B, kind: BoundaryKind },
    DiffuseSweep {
        dest: &'a mut B,
        src: &'a B,
        a: f32,
        denominator: f32,
    },
    Advect {
        dest: &'a mut B,
        src: &'a B,
        vel: &'a B,
        dt0: f32,
    },
    // Divergence of `vel` into channel 1 of `tmp`, zero pressure in channel 0.
    ProjectDivergence { tmp: &'a mut B, vel: &'a B, h: f32 },
    ProjectPressure { tmp: &'a mut B },
    ProjectSubtract { vel: &'a mut B, tmp: &'a B, h: f32 },
    ScatterEvents {
        dest: &'a mut B,
        channel: usize,
        count: usize,
    },
}

impl<B> Kernel<'_, B> {
    pub fn name(&self) -> &'static str {
        match self {
            Kernel::AddSource { .. } => "add_source",
            Kernel::SetBoundary { .. } => "set_boundary",
            Kernel::DiffuseSweep { .. } => "diffuse",
            Kernel::Advect { .. } => "advect",
            Kernel::ProjectDivergence { .. } => "project_divergence",
            Kernel::ProjectPressure { .. } => "project_pressure",
            Kernel::ProjectSubtract { .. } => "project_subtract",
            Kernel::ScatterEvents { .. } => "scatter_events",
        }
    }
}

pub trait ComputeBackend {
    type Buffer;

    fn grid(&self) -> Grid;

    fn allocate(&mut self, label: &str) -> Result<Self::Buffer, BackendError>;

    fn clear(&mut self, buffer: &mut Self::Buffer) -> Result<(), BackendError>;

    fn upload_events(&mut self, events: &[SourceEvent]) -> Result<(), BackendError>;

    fn dispatch(&mut self, kernel: Kernel<'_, Self::Buffer>) -> Result<(), BackendError>;

    fn finish(&mut self) -> Result<(), BackendError>;

    fn read_into(&mut self, buffer: &Self::Buffer, out: &mut [f32]) -> Result<(), BackendError>;

    fn read(&mut self, buffer: &Self::Buffer) -> Result<Vec<f32>, BackendError> {
        let mut out = vec![0.0; self.grid().buffer_len()];
        self.read_into(buffer, &mut out)?;
        Ok(out)
    }

    fn write(&mut self, buffer: &mut Self::Buffer, data: &[f32]) -> Result<(), BackendError>;

    fn name(&self) -> String;
}
