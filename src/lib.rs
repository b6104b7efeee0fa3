//! Real-time 2-D stable-fluids solver with pluggable compute backends.

pub mod analysis;
pub mod backend;
pub mod cli;
pub mod config;
pub mod desktop;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod export;
pub mod field;
pub mod grid;
pub mod input;
pub mod profiler;
pub mod render;
pub mod simulation;

// Feature-based backend selection
#[cfg(feature = "cpu")]
pub type DefaultBackend = backend::cpu::CpuBackend;

#[cfg(all(feature = "gpu", not(feature = "cpu")))]
pub type DefaultBackend = backend::gpu::GpuBackend;

pub use analysis::{AnalysisRecorder, FluidMetrics};
pub use backend::{ComputeBackend, Kernel};
pub use config::{FrameClock, SimulationParameters};
pub use desktop::DesktopApp;
pub use error::{BackendError, FluidError, Result};
pub use events::{MAX_EVENTS_PER_FIELD, SourceEvent};
pub use export::ImageExporter;
pub use field::{BoundaryKind, FieldKind};
pub use grid::{Grid, SlotPair};
pub use input::PointerTracker;
pub use profiler::{FrameReport, Profiler};
pub use render::Renderer;
pub use simulation::{FieldView, FluidSim};

#[cfg(feature = "cpu")]
pub use backend::cpu::CpuBackend;

#[cfg(feature = "gpu")]
pub use backend::gpu::GpuBackend;
