//! wgpu compute backend. Relaxation sweeps run as red/black passes.

use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use wgpu::{BindGroupLayout, Buffer, ComputePipeline, Device, Queue};

use super::{ComputeBackend, Kernel};
use crate::error::BackendError;
use crate::events::{MAX_EVENTS_PER_FIELD, SourceEvent};
use crate::field::BoundaryKind;
use crate::grid::Grid;

pub const READBACK_TIMEOUT: Duration = Duration::from_secs(5);

const WORKGROUP_2D: u32 = 8;
const WORKGROUP_1D: u32 = 64;

pub fn readback_status(
    outcome: Result<Result<(), wgpu::BufferAsyncError>, mpsc::RecvTimeoutError>,
    timeout: Duration,
) -> Result<(), BackendError> {
    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(BackendError::BufferMap(e.to_string())),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(BackendError::Timeout(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(BackendError::DeviceLost),
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct KernelParams {
    sim_size: u32,
    stride: u32,
    channel: u32,
    parity: u32,
    a: f32,
    scalar: f32,
    count: u32,
    kind: u32,
}

impl KernelParams {
    fn new(grid: Grid) -> Self {
        Self {
            sim_size: grid.sim_size as u32,
            stride: grid.stride as u32,
            channel: 0,
            parity: 0,
            a: 0.0,
            scalar: 0.0,
            count: 0,
            kind: 0,
        }
    }

    fn scalar(mut self, value: f32) -> Self {
        self.scalar = value;
        self
    }

    fn parity(mut self, parity: u32) -> Self {
        self.parity = parity;
        self
    }
}

struct Pipelines {
    add_source: ComputePipeline,
    set_boundary: ComputePipeline,
    set_boundary_corners: ComputePipeline,
    diffuse: ComputePipeline,
    advect: ComputePipeline,
    project_divergence: ComputePipeline,
    project_pressure: ComputePipeline,
    project_subtract: ComputePipeline,
    scatter_events: ComputePipeline,
}

pub struct GpuBackend {
    device: Device,
    queue: Queue,
    grid: Grid,
    adapter_name: String,

    params_buffer: Buffer,
    events_buffer: Buffer,
    // Bound to slots a kernel does not read.
    placeholder: Buffer,
    staging: Buffer,

    bind_group_layout: BindGroupLayout,
    pipelines: Pipelines,

    errors: Arc<Mutex<Option<String>>>,
}

impl GpuBackend {
    pub async fn new(sim_size: usize) -> Result<Self, BackendError> {
        let instance = wgpu::Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(BackendError::AdapterUnavailable)?;

        let adapter_name = adapter.get_info().name;
        log::info!("Using GPU adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Fluid Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .await
            .map_err(|e| BackendError::DeviceRequest(e.to_string()))?;

        let errors = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&errors);
        device.on_uncaptured_error(Box::new(move |error: wgpu::Error| {
            log::error!("wgpu error: {error}");
            if let Ok(mut slot) = sink.lock() {
                if slot.is_none() {
                    *slot = Some(error.to_string());
                }
            }
        }));

        let grid = Grid::new(sim_size);
        let buffer_bytes = (grid.buffer_len() * std::mem::size_of::<f32>()) as u64;

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Kernel Params"),
            size: std::mem::size_of::<KernelParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let events_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Source Events"),
            size: (MAX_EVENTS_PER_FIELD * std::mem::size_of::<SourceEvent>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let placeholder = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Unused Binding"),
            size: 16,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Field Readback"),
            size: buffer_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fluid Kernels"),
            source: wgpu::ShaderSource::Wgsl(include_str!("fluid.wgsl").into()),
        });

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Fluid Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<KernelParams>() as u64),
                    },
                    count: None,
                },
                storage_entry(1, false),
                storage_entry(2, true),
                storage_entry(3, true),
                storage_entry(4, true),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Fluid Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            })
        };

        let pipelines = Pipelines {
            add_source: pipeline("add_source"),
            set_boundary: pipeline("set_boundary"),
            set_boundary_corners: pipeline("set_boundary_corners"),
            diffuse: pipeline("diffuse"),
            advect: pipeline("advect"),
            project_divergence: pipeline("project_divergence"),
            project_pressure: pipeline("project_pressure"),
            project_subtract: pipeline("project_subtract"),
            scatter_events: pipeline("scatter_events"),
        };

        let backend = Self {
            device,
            queue,
            grid,
            adapter_name,
            params_buffer,
            events_buffer,
            placeholder,
            staging,
            bind_group_layout,
            pipelines,
            errors,
        };
        backend.check_errors()?;
        Ok(backend)
    }

    fn check_errors(&self) -> Result<(), BackendError> {
        let mut slot = self.errors.lock().map_err(|_| BackendError::DeviceLost)?;
        match slot.take() {
            Some(message) => Err(BackendError::Dispatch(message)),
            None => Ok(()),
        }
    }

    fn interior_workgroups(&self) -> (u32, u32) {
        let groups = (self.grid.sim_size as u32).div_ceil(WORKGROUP_2D);
        (groups, groups)
    }

    fn padded_workgroups(&self) -> (u32, u32) {
        let groups = (self.grid.stride as u32).div_ceil(WORKGROUP_2D);
        (groups, groups)
    }

    fn run(
        &self,
        pipeline: &ComputePipeline,
        params: KernelParams,
        dest: &Buffer,
        src: Option<&Buffer>,
        vel: Option<&Buffer>,
        workgroups: (u32, u32),
    ) -> Result<(), BackendError> {
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Fluid Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: dest.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: src.unwrap_or(&self.placeholder).as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: vel.unwrap_or(&self.placeholder).as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.events_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Fluid Compute Encoder"),
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Fluid Compute Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(workgroups.0, workgroups.1, 1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.check_errors()
    }

    // Red pass then black pass.
    fn run_red_black(
        &self,
        pipeline: &ComputePipeline,
        params: KernelParams,
        dest: &Buffer,
        src: Option<&Buffer>,
    ) -> Result<(), BackendError> {
        let workgroups = self.interior_workgroups();
        for parity in 0..2 {
            self.run(pipeline, params.parity(parity), dest, src, None, workgroups)?;
        }
        Ok(())
    }

    fn set_boundary(&self, dest: &Buffer, kind: BoundaryKind) -> Result<(), BackendError> {
        let mut params = KernelParams::new(self.grid);
        params.kind = kind.code();
        let edges = ((self.grid.sim_size as u32).div_ceil(WORKGROUP_1D), 1);
        self.run(&self.pipelines.set_boundary, params, dest, None, None, edges)?;
        self.run(&self.pipelines.set_boundary_corners, params, dest, None, None, (1, 1))
    }
}

impl ComputeBackend for GpuBackend {
    type Buffer = Buffer;

    fn grid(&self) -> Grid {
        self.grid
    }

    fn allocate(&mut self, label: &str) -> Result<Buffer, BackendError> {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (self.grid.buffer_len() * std::mem::size_of::<f32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.check_errors()?;
        Ok(buffer)
    }

    fn clear(&mut self, buffer: &mut Buffer) -> Result<(), BackendError> {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Clear Field Encoder"),
        });
        encoder.clear_buffer(buffer, 0, None);
        self.queue.submit(std::iter::once(encoder.finish()));
        self.check_errors()
    }

    fn upload_events(&mut self, events: &[SourceEvent]) -> Result<(), BackendError> {
        if events.len() > MAX_EVENTS_PER_FIELD {
            return Err(BackendError::SizeMismatch {
                expected: MAX_EVENTS_PER_FIELD,
                actual: events.len(),
            });
        }
        if !events.is_empty() {
            self.queue
                .write_buffer(&self.events_buffer, 0, bytemuck::cast_slice(events));
        }
        self.check_errors()
    }

    fn dispatch(&mut self, kernel: Kernel<'_, Buffer>) -> Result<(), BackendError> {
        let grid = self.grid;
        let p = &self.pipelines;
        match kernel {
            Kernel::AddSource { dest, src, dt } => self.run(
                &p.add_source,
                KernelParams::new(grid).scalar(dt),
                dest,
                Some(src),
                None,
                self.padded_workgroups(),
            ),
            Kernel::SetBoundary { dest, kind } => self.set_boundary(dest, kind),
            Kernel::DiffuseSweep {
                dest,
                src,
                a,
                denominator,
            } => {
                let mut params = KernelParams::new(grid).scalar(denominator);
                params.a = a;
                self.run_red_black(&p.diffuse, params, dest, Some(src))
            }
            Kernel::Advect { dest, src, vel, dt0 } => self.run(
                &p.advect,
                KernelParams::new(grid).scalar(dt0),
                dest,
                Some(src),
                Some(vel),
                self.interior_workgroups(),
            ),
            Kernel::ProjectDivergence { tmp, vel, h } => self.run(
                &p.project_divergence,
                KernelParams::new(grid).scalar(h),
                tmp,
                None,
                Some(vel),
                self.interior_workgroups(),
            ),
            Kernel::ProjectPressure { tmp } => {
                self.run_red_black(&p.project_pressure, KernelParams::new(grid), tmp, None)
            }
            Kernel::ProjectSubtract { vel, tmp, h } => self.run(
                &p.project_subtract,
                KernelParams::new(grid).scalar(h),
                vel,
                Some(tmp),
                None,
                self.interior_workgroups(),
            ),
            Kernel::ScatterEvents {
                dest,
                channel,
                count,
            } => {
                let mut params = KernelParams::new(grid);
                params.channel = channel as u32;
                params.count = count.min(MAX_EVENTS_PER_FIELD) as u32;
                self.run(
                    &p.scatter_events,
                    params,
                    dest,
                    None,
                    None,
                    self.interior_workgroups(),
                )
            }
        }
    }

    fn finish(&mut self) -> Result<(), BackendError> {
        let _ = self.device.poll(wgpu::Maintain::Wait);
        self.check_errors()
    }

    fn read_into(&mut self, buffer: &Buffer, out: &mut [f32]) -> Result<(), BackendError> {
        let expected = self.grid.buffer_len();
        if out.len() != expected {
            return Err(BackendError::SizeMismatch {
                expected,
                actual: out.len(),
            });
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Field Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(buffer, 0, &self.staging, 0, self.staging.size());
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = self.staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);

        let outcome = receiver.recv_timeout(READBACK_TIMEOUT);
        if let Err(err) = readback_status(outcome, READBACK_TIMEOUT) {
            // Cancels a map that is still pending so the next read can map again
            self.staging.unmap();
            return Err(err);
        }

        {
            let data = slice.get_mapped_range();
            out.copy_from_slice(bytemuck::cast_slice(&data));
        }
        self.staging.unmap();
        self.check_errors()
    }

    fn write(&mut self, buffer: &mut Buffer, data: &[f32]) -> Result<(), BackendError> {
        let expected = self.grid.buffer_len();
        if data.len() != expected {
            return Err(BackendError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(data));
        self.check_errors()
    }

    fn name(&self) -> String {
        format!("GPU ({})", self.adapter_name)
    }
}
