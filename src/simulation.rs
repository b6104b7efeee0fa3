use std::time::Instant;

use crate::backend::ComputeBackend;
use crate::config::SimulationParameters;
use crate::dispatch::Dispatcher;
use crate::error::{BackendError, FluidError, Result};
use crate::events::{EventQueues, SourceEvent};
use crate::field::{BoundaryKind, FieldKind, Storage};
use crate::grid::{CHANNELS, Grid, SlotPair};
use crate::profiler::FrameReport;

pub struct FluidSim<B: ComputeBackend> {
    params: SimulationParameters,
    grid: Grid,
    dispatcher: Dispatcher<B>,
    density: SlotPair<B::Buffer>,
    velocity: SlotPair<B::Buffer>,
    events: EventQueues,
    surface: Vec<f32>,
    last_report: Option<FrameReport>,
    frames: u64,
}

impl<B: ComputeBackend> FluidSim<B> {
    pub fn new(backend: B, params: SimulationParameters) -> Result<Self> {
        params.validate()?;
        let grid = backend.grid();
        if grid.sim_size != params.sim_size {
            return Err(FluidError::InvalidConfig(format!(
                "backend grid is {}² but parameters ask for {}²",
                grid.sim_size, params.sim_size
            )));
        }

        let mut dispatcher = Dispatcher::new(backend, params.profile);
        let density = SlotPair::new(
            dispatcher.allocate("density 0")?,
            dispatcher.allocate("density 1")?,
        );
        let velocity = SlotPair::new(
            dispatcher.allocate("velocity 0")?,
            dispatcher.allocate("velocity 1")?,
        );

        log::info!(
            "fluid simulation {}x{} on {}",
            grid.sim_size,
            grid.sim_size,
            dispatcher.backend().name()
        );

        Ok(Self {
            events: EventQueues::new(grid.sim_size),
            surface: vec![0.0; grid.buffer_len()],
            params,
            grid,
            dispatcher,
            density,
            velocity,
            last_report: None,
            frames: 0,
        })
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn backend(&self) -> &B {
        self.dispatcher.backend()
    }

    pub fn backend_name(&self) -> String {
        self.dispatcher.backend().name()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn inject(
        &mut self,
        field: FieldKind,
        x_norm: f32,
        y_norm: f32,
        strength: f32,
        max_radius_norm: f32,
    ) -> Result<()> {
        self.events
            .enqueue(field, x_norm, y_norm, strength, max_radius_norm)
    }

    pub fn current_slots(&self) -> (usize, usize) {
        (self.density.current_slot(), self.velocity.current_slot())
    }

    pub fn pending_events(&self, field: FieldKind) -> usize {
        self.events.batch(field).len()
    }

    pub fn step(&mut self, dt: f32) -> Result<FieldView<'_>> {
        let started = Instant::now();
        let slots = self.current_slots();
        let batches = FieldKind::ALL.map(|field| self.events.drain(field));
        let dt = self.params.clamp_timestep(dt);

        self.dispatcher.begin_frame();
        if let Err(err) = self.run_frame(&batches, dt) {
            self.density.restore(slots.0);
            self.velocity.restore(slots.1);
            log::error!("frame {} aborted: {err}", self.frames);
            return Err(err.into());
        }

        self.last_report = self.dispatcher.end_frame(started.elapsed());
        if let Some(report) = &self.last_report {
            log::info!("frame {} profile\n{report}", self.frames);
        }
        self.frames += 1;

        Ok(FieldView::new(self.grid, &self.surface))
    }

    pub fn view(&self) -> FieldView<'_> {
        FieldView::new(self.grid, &self.surface)
    }

    pub fn last_report(&self) -> Option<&FrameReport> {
        self.last_report.as_ref()
    }

    pub fn reset(&mut self) -> Result<()> {
        self.events.clear();
        self.density.restore(0);
        self.velocity.restore(0);
        for buffer in self.density.iter_mut().chain(self.velocity.iter_mut()) {
            self.dispatcher.clear(buffer)?;
        }
        self.dispatcher.finish()?;
        self.surface.fill(0.0);
        self.last_report = None;
        self.frames = 0;
        log::debug!("simulation reset");
        Ok(())
    }

    pub fn read_velocity(&mut self) -> Result<Vec<f32>> {
        Ok(self.dispatcher.read(self.velocity.current())?)
    }

    pub fn read_density(&mut self) -> Result<Vec<f32>> {
        Ok(self.dispatcher.read(self.density.current())?)
    }

    fn run_frame(&mut self, batches: &[Vec<SourceEvent>], dt: f32) -> Result<(), BackendError> {
        self.dispatcher.clear(self.density.previous_mut())?;
        self.dispatcher.clear(self.velocity.previous_mut())?;

        for (field, events) in FieldKind::ALL.iter().zip(batches) {
            let pair = match field.storage() {
                Storage::Density => &mut self.density,
                Storage::Velocity => &mut self.velocity,
            };
            self.dispatcher
                .scatter_events(pair.previous_mut(), field.channel(), events)?;
        }

        self.velocity_step(dt)?;
        self.density_step(dt)?;

        self.dispatcher
            .present(self.density.current(), &mut self.surface)
    }

    fn velocity_step(&mut self, dt: f32) -> Result<(), BackendError> {
        let n = self.grid.sim_size as f32;
        let a = dt * self.params.viscosity * n * n;
        let iterations = self.params.relaxation_iterations;
        let dispatcher = &mut self.dispatcher;
        let velocity = &mut self.velocity;

        let (current, previous) = velocity.split_mut();
        dispatcher.add_source(current, previous, dt)?;
        velocity.swap();

        let (current, previous) = velocity.split_mut();
        diffuse(dispatcher, current, previous, a, BoundaryKind::Velocity, iterations)?;
        project(dispatcher, current, previous, n, iterations)?;
        velocity.swap();

        // Self-advection: the field being moved is also the one moving it.
        let (current, previous) = velocity.split_mut();
        let source = &*previous;
        advect(dispatcher, current, source, source, dt * n, BoundaryKind::Velocity)?;
        project(dispatcher, current, previous, n, iterations)
    }

    fn density_step(&mut self, dt: f32) -> Result<(), BackendError> {
        let n = self.grid.sim_size as f32;
        let a = dt * self.params.diffusion_rate * n * n;
        let iterations = self.params.relaxation_iterations;
        let dispatcher = &mut self.dispatcher;
        let density = &mut self.density;

        let (current, previous) = density.split_mut();
        dispatcher.add_source(current, previous, dt)?;
        density.swap();

        let (current, previous) = density.split_mut();
        diffuse(dispatcher, current, previous, a, BoundaryKind::Density, iterations)?;
        density.swap();

        let (current, previous) = density.split_mut();
        advect(
            dispatcher,
            current,
            previous,
            self.velocity.current(),
            dt * n,
            BoundaryKind::Density,
        )
    }
}

fn diffuse<B: ComputeBackend>(
    dispatcher: &mut Dispatcher<B>,
    x: &mut B::Buffer,
    x0: &B::Buffer,
    a: f32,
    kind: BoundaryKind,
    iterations: usize,
) -> Result<(), BackendError> {
    let denominator = 1.0 / (1.0 + 4.0 * a);
    for _ in 0..iterations {
        dispatcher.diffuse_sweep(x, x0, a, denominator)?;
        dispatcher.set_boundary(x, kind)?;
    }
    Ok(())
}

fn advect<B: ComputeBackend>(
    dispatcher: &mut Dispatcher<B>,
    dest: &mut B::Buffer,
    src: &B::Buffer,
    vel: &B::Buffer,
    dt0: f32,
    kind: BoundaryKind,
) -> Result<(), BackendError> {
    dispatcher.advect(dest, src, vel, dt0)?;
    dispatcher.set_boundary(dest, kind)
}

// Make `vel` divergence free, using `tmp` for pressure (channel 0) and
// divergence (channel 1).
fn project<B: ComputeBackend>(
    dispatcher: &mut Dispatcher<B>,
    vel: &mut B::Buffer,
    tmp: &mut B::Buffer,
    n: f32,
    iterations: usize,
) -> Result<(), BackendError> {
    dispatcher.project_divergence(tmp, vel, 0.5 / n)?;
    dispatcher.set_boundary(tmp, BoundaryKind::Scalar)?;

    for _ in 0..iterations {
        dispatcher.project_pressure_sweep(tmp)?;
        dispatcher.set_boundary(tmp, BoundaryKind::Scalar)?;
    }

    dispatcher.project_subtract(vel, tmp, 0.5 * n)?;
    dispatcher.set_boundary(vel, BoundaryKind::Velocity)
}

#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    grid: Grid,
    data: &'a [f32],
}

impl<'a> FieldView<'a> {
    pub fn new(grid: Grid, data: &'a [f32]) -> Self {
        debug_assert_eq!(data.len(), grid.buffer_len());
        Self { grid, data }
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn sim_size(&self) -> usize {
        self.grid.sim_size
    }

    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, channel: usize) -> f32 {
        self.data[self.grid.index(x, y, channel)]
    }

    pub fn a(&self, x: usize, y: usize) -> f32 {
        self.get(x, y, 0)
    }

    pub fn b(&self, x: usize, y: usize) -> f32 {
        self.get(x, y, 1)
    }

    pub fn interior(&self, channel: usize) -> impl Iterator<Item = f32> + 'a {
        let grid = self.grid;
        let data = self.data;
        (1..=grid.sim_size).flat_map(move |y| {
            (1..=grid.sim_size).map(move |x| data[grid.index(x, y, channel)])
        })
    }

    pub fn total(&self, channel: usize) -> f32 {
        debug_assert!(channel < CHANNELS);
        self.interior(channel).sum()
    }
}
