//! Multithreaded CPU backend. Relaxation sweeps stay sequential (true Gauss-Seidel).

use rayon::prelude::*;

use super::{ComputeBackend, Kernel};
use crate::error::BackendError;
use crate::events::SourceEvent;
use crate::field::{BoundaryKind, ChannelRule};
use crate::grid::{CHANNELS, Grid};

pub struct CpuBackend {
    grid: Grid,
    events: Vec<SourceEvent>,
}

impl CpuBackend {
    pub fn new(sim_size: usize) -> Self {
        Self {
            grid: Grid::new(sim_size),
            events: Vec::new(),
        }
    }

    fn check_len(&self, buffer: &[f32]) -> Result<(), BackendError> {
        let expected = self.grid.buffer_len();
        if buffer.len() != expected {
            return Err(BackendError::SizeMismatch {
                expected,
                actual: buffer.len(),
            });
        }
        Ok(())
    }
}

impl ComputeBackend for CpuBackend {
    type Buffer = Vec<f32>;

    fn grid(&self) -> Grid {
        self.grid
    }

    fn allocate(&mut self, _label: &str) -> Result<Vec<f32>, BackendError> {
        Ok(vec![0.0; self.grid.buffer_len()])
    }

    fn clear(&mut self, buffer: &mut Vec<f32>) -> Result<(), BackendError> {
        self.check_len(buffer)?;
        buffer.par_iter_mut().for_each(|value| *value = 0.0);
        Ok(())
    }

    fn upload_events(&mut self, events: &[SourceEvent]) -> Result<(), BackendError> {
        self.events.clear();
        self.events.extend_from_slice(events);
        Ok(())
    }

    fn dispatch(&mut self, kernel: Kernel<'_, Vec<f32>>) -> Result<(), BackendError> {
        let grid = self.grid;
        match kernel {
            Kernel::AddSource { dest, src, dt } => {
                self.check_len(dest)?;
                self.check_len(src)?;
                add_source(dest, src, dt);
            }
            Kernel::SetBoundary { dest, kind } => {
                self.check_len(dest)?;
                set_boundary(grid, dest, kind);
            }
            Kernel::DiffuseSweep {
                dest,
                src,
                a,
                denominator,
            } => {
                self.check_len(dest)?;
                self.check_len(src)?;
                diffuse_sweep(grid, dest, src, a, denominator);
            }
            Kernel::Advect { dest, src, vel, dt0 } => {
                self.check_len(dest)?;
                self.check_len(src)?;
                self.check_len(vel)?;
                advect(grid, dest, src, vel, dt0);
            }
            Kernel::ProjectDivergence { tmp, vel, h } => {
                self.check_len(tmp)?;
                self.check_len(vel)?;
                project_divergence(grid, tmp, vel, h);
            }
            Kernel::ProjectPressure { tmp } => {
                self.check_len(tmp)?;
                project_pressure_sweep(grid, tmp);
            }
            Kernel::ProjectSubtract { vel, tmp, h } => {
                self.check_len(vel)?;
                self.check_len(tmp)?;
                project_subtract(grid, vel, tmp, h);
            }
            Kernel::ScatterEvents {
                dest,
                channel,
                count,
            } => {
                self.check_len(dest)?;
                if count > self.events.len() {
                    return Err(BackendError::SizeMismatch {
                        expected: self.events.len(),
                        actual: count,
                    });
                }
                scatter_events(grid, dest, &self.events[..count], channel);
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn read_into(&mut self, buffer: &Vec<f32>, out: &mut [f32]) -> Result<(), BackendError> {
        self.check_len(buffer)?;
        self.check_len(out)?;
        out.copy_from_slice(buffer);
        Ok(())
    }

    fn write(&mut self, buffer: &mut Vec<f32>, data: &[f32]) -> Result<(), BackendError> {
        self.check_len(buffer)?;
        self.check_len(data)?;
        buffer.copy_from_slice(data);
        Ok(())
    }

    fn name(&self) -> String {
        format!("CPU ({} threads)", rayon::current_num_threads())
    }
}

fn add_source(dest: &mut [f32], src: &[f32], dt: f32) {
    dest.par_iter_mut()
        .zip(src.par_iter())
        .for_each(|(d, s)| *d += dt * s);
}

fn set_boundary(grid: Grid, dest: &mut [f32], kind: BoundaryKind) {
    let n = grid.sim_size;
    for c in 0..CHANNELS {
        let rule = kind.channel_rule(c);
        let x_sign = if rule == ChannelRule::NegateX { -1.0 } else { 1.0 };
        let y_sign = if rule == ChannelRule::NegateY { -1.0 } else { 1.0 };

        for i in 1..=n {
            dest[grid.index(0, i, c)] = x_sign * dest[grid.index(1, i, c)];
            dest[grid.index(n + 1, i, c)] = x_sign * dest[grid.index(n, i, c)];
            dest[grid.index(i, 0, c)] = y_sign * dest[grid.index(i, 1, c)];
            dest[grid.index(i, n + 1, c)] = y_sign * dest[grid.index(i, n, c)];
        }

        dest[grid.index(0, 0, c)] = 0.5 * (dest[grid.index(1, 0, c)] + dest[grid.index(0, 1, c)]);
        dest[grid.index(0, n + 1, c)] =
            0.5 * (dest[grid.index(1, n + 1, c)] + dest[grid.index(0, n, c)]);
        dest[grid.index(n + 1, 0, c)] =
            0.5 * (dest[grid.index(n, 0, c)] + dest[grid.index(n + 1, 1, c)]);
        dest[grid.index(n + 1, n + 1, c)] =
            0.5 * (dest[grid.index(n, n + 1, c)] + dest[grid.index(n + 1, n, c)]);
    }
}

fn diffuse_sweep(grid: Grid, dest: &mut [f32], src: &[f32], a: f32, denominator: f32) {
    let n = grid.sim_size;
    let row = grid.row_len();
    for y in 1..=n {
        for x in 1..=n {
            for c in 0..CHANNELS {
                let i = grid.index(x, y, c);
                dest[i] = (src[i]
                    + a * (dest[i - CHANNELS] + dest[i + CHANNELS] + dest[i - row] + dest[i + row]))
                    * denominator;
            }
        }
    }
}

fn advect(grid: Grid, dest: &mut [f32], src: &[f32], vel: &[f32], dt0: f32) {
    let n = grid.sim_size;
    let max = n as f32 + 0.5;

    dest.par_chunks_mut(grid.row_len())
        .enumerate()
        .filter(|(y, _)| (1..=n).contains(y))
        .for_each(|(y, row)| {
            for x in 1..=n {
                let px = (x as f32 - dt0 * vel[grid.index(x, y, 0)]).clamp(0.5, max);
                let py = (y as f32 - dt0 * vel[grid.index(x, y, 1)]).clamp(0.5, max);

                let i0 = px.floor() as usize;
                let j0 = py.floor() as usize;
                let s1 = px - i0 as f32;
                let t1 = py - j0 as f32;
                let s0 = 1.0 - s1;
                let t0 = 1.0 - t1;

                for c in 0..CHANNELS {
                    row[CHANNELS * x + c] = s0
                        * (t0 * src[grid.index(i0, j0, c)] + t1 * src[grid.index(i0, j0 + 1, c)])
                        + s1 * (t0 * src[grid.index(i0 + 1, j0, c)]
                            + t1 * src[grid.index(i0 + 1, j0 + 1, c)]);
                }
            }
        });
}

fn project_divergence(grid: Grid, tmp: &mut [f32], vel: &[f32], h: f32) {
    let n = grid.sim_size;
    tmp.par_chunks_mut(grid.row_len())
        .enumerate()
        .filter(|(y, _)| (1..=n).contains(y))
        .for_each(|(y, row)| {
            for x in 1..=n {
                let div = -h
                    * (vel[grid.index(x + 1, y, 0)] - vel[grid.index(x - 1, y, 0)]
                        + vel[grid.index(x, y + 1, 1)]
                        - vel[grid.index(x, y - 1, 1)]);
                row[CHANNELS * x] = 0.0;
                row[CHANNELS * x + 1] = div;
            }
        });
}

fn project_pressure_sweep(grid: Grid, tmp: &mut [f32]) {
    let n = grid.sim_size;
    let row = grid.row_len();
    for y in 1..=n {
        for x in 1..=n {
            let i = grid.index(x, y, 0);
            tmp[i] = (tmp[i + 1]
                + tmp[i - CHANNELS]
                + tmp[i + CHANNELS]
                + tmp[i - row]
                + tmp[i + row])
                * 0.25;
        }
    }
}

fn project_subtract(grid: Grid, vel: &mut [f32], tmp: &[f32], h: f32) {
    let n = grid.sim_size;
    vel.par_chunks_mut(grid.row_len())
        .enumerate()
        .filter(|(y, _)| (1..=n).contains(y))
        .for_each(|(y, row)| {
            for x in 1..=n {
                row[CHANNELS * x] -= h * (tmp[grid.index(x + 1, y, 0)] - tmp[grid.index(x - 1, y, 0)]);
                row[CHANNELS * x + 1] -=
                    h * (tmp[grid.index(x, y + 1, 0)] - tmp[grid.index(x, y - 1, 0)]);
            }
        });
}

fn scatter_events(grid: Grid, dest: &mut [f32], events: &[SourceEvent], channel: usize) {
    let n = grid.sim_size;
    dest.par_chunks_mut(grid.row_len())
        .enumerate()
        .filter(|(y, _)| (1..=n).contains(y))
        .for_each(|(y, row)| {
            for x in 1..=n {
                let amount: f32 = events
                    .iter()
                    .map(|e| {
                        let dx = x as i32 - e.x;
                        let dy = y as i32 - e.y;
                        e.strength * e.falloff(dx * dx + dy * dy)
                    })
                    .sum();
                row[CHANNELS * x + channel] += amount;
            }
        });
}
