use std::time::{Duration, Instant};

use crate::backend::{ComputeBackend, Kernel};
use crate::error::BackendError;
use crate::events::SourceEvent;
use crate::field::BoundaryKind;
use crate::profiler::{FrameReport, Op, Profiler};

pub struct Dispatcher<B: ComputeBackend> {
    backend: B,
    profiler: Option<Profiler>,
    issued: usize,
}

impl<B: ComputeBackend> Dispatcher<B> {
    pub fn new(backend: B, profile: bool) -> Self {
        let sim_size = backend.grid().sim_size;
        Self {
            backend,
            profiler: profile.then(|| Profiler::new(sim_size)),
            issued: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn begin_frame(&mut self) {
        self.issued = 0;
        if let Some(profiler) = self.profiler.as_mut() {
            profiler.begin_frame();
        }
    }

    pub fn end_frame(&mut self, wall: Duration) -> Option<FrameReport> {
        log::debug!("frame issued {} device operations", self.issued);
        self.profiler.as_ref().map(|profiler| profiler.report(wall))
    }

    fn timed<T>(
        &mut self,
        op: Op,
        run: impl FnOnce(&mut B) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        self.issued += 1;
        let Self {
            backend, profiler, ..
        } = self;
        match profiler {
            None => run(backend),
            Some(profiler) => {
                let start = Instant::now();
                let out = run(&mut *backend)?;
                // Join so the sample covers execution, not just submission
                backend.finish()?;
                profiler.record(op, start.elapsed());
                Ok(out)
            }
        }
    }

    pub fn allocate(&mut self, label: &str) -> Result<B::Buffer, BackendError> {
        self.backend.allocate(label)
    }

    pub fn clear(&mut self, buffer: &mut B::Buffer) -> Result<(), BackendError> {
        self.timed(Op::Clear, |backend| backend.clear(buffer))
    }

    pub fn add_source(
        &mut self,
        dest: &mut B::Buffer,
        src: &B::Buffer,
        dt: f32,
    ) -> Result<(), BackendError> {
        self.timed(Op::AddSource, |backend| {
            backend.dispatch(Kernel::AddSource { dest, src, dt })
        })
    }

    pub fn set_boundary(
        &mut self,
        dest: &mut B::Buffer,
        kind: BoundaryKind,
    ) -> Result<(), BackendError> {
        self.timed(Op::SetBoundary, |backend| {
            backend.dispatch(Kernel::SetBoundary { dest, kind })
        })
    }

    pub fn diffuse_sweep(
        &mut self,
        dest: &mut B::Buffer,
        src: &B::Buffer,
        a: f32,
        denominator: f32,
    ) -> Result<(), BackendError> {
        self.timed(Op::Diffuse, |backend| {
            backend.dispatch(Kernel::DiffuseSweep {
                dest,
                src,
                a,
                denominator,
            })
        })
    }

    pub fn advect(
        &mut self,
        dest: &mut B::Buffer,
        src: &B::Buffer,
        vel: &B::Buffer,
        dt0: f32,
    ) -> Result<(), BackendError> {
        self.timed(Op::Advect, |backend| {
            backend.dispatch(Kernel::Advect {
                dest,
                src,
                vel,
                dt0,
            })
        })
    }

    pub fn project_divergence(
        &mut self,
        tmp: &mut B::Buffer,
        vel: &B::Buffer,
        h: f32,
    ) -> Result<(), BackendError> {
        self.timed(Op::ProjectDivergence, |backend| {
            backend.dispatch(Kernel::ProjectDivergence { tmp, vel, h })
        })
    }

    pub fn project_pressure_sweep(&mut self, tmp: &mut B::Buffer) -> Result<(), BackendError> {
        self.timed(Op::ProjectPressure, |backend| {
            backend.dispatch(Kernel::ProjectPressure { tmp })
        })
    }

    pub fn project_subtract(
        &mut self,
        vel: &mut B::Buffer,
        tmp: &B::Buffer,
        h: f32,
    ) -> Result<(), BackendError> {
        self.timed(Op::ProjectSubtract, |backend| {
            backend.dispatch(Kernel::ProjectSubtract { vel, tmp, h })
        })
    }

    pub fn scatter_events(
        &mut self,
        dest: &mut B::Buffer,
        channel: usize,
        events: &[SourceEvent],
    ) -> Result<(), BackendError> {
        if events.is_empty() {
            return Ok(());
        }
        self.timed(Op::ScatterEvents, |backend| {
            backend.upload_events(events)?;
            backend.dispatch(Kernel::ScatterEvents {
                dest,
                channel,
                count: events.len(),
            })
        })
    }

    pub fn present(&mut self, src: &B::Buffer, surface: &mut [f32]) -> Result<(), BackendError> {
        self.timed(Op::Present, |backend| backend.read_into(src, surface))
    }

    pub fn read(&mut self, buffer: &B::Buffer) -> Result<Vec<f32>, BackendError> {
        self.backend.read(buffer)
    }

    pub fn finish(&mut self) -> Result<(), BackendError> {
        self.backend.finish()
    }
}
