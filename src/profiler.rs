use std::fmt;
use std::time::Duration;

pub const PROFILE_SAMPLES: usize = 10;

const BYTES_PER_FLOAT: f64 = 4.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const OP_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Clear,
    ScatterEvents,
    AddSource,
    SetBoundary,
    Diffuse,
    Advect,
    ProjectDivergence,
    ProjectPressure,
    ProjectSubtract,
    Present,
}

impl Op {
    pub const ALL: [Op; OP_COUNT] = [
        Op::Clear,
        Op::ScatterEvents,
        Op::AddSource,
        Op::SetBoundary,
        Op::Diffuse,
        Op::Advect,
        Op::ProjectDivergence,
        Op::ProjectPressure,
        Op::ProjectSubtract,
        Op::Present,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Op::Clear => "clear",
            Op::ScatterEvents => "scatter_events",
            Op::AddSource => "add_source",
            Op::SetBoundary => "set_boundary",
            Op::Diffuse => "diffuse",
            Op::Advect => "advect",
            Op::ProjectDivergence => "project_divergence",
            Op::ProjectPressure => "project_pressure",
            Op::ProjectSubtract => "project_subtract",
            Op::Present => "present",
        }
    }

    pub fn floats_touched(self, n: usize) -> f64 {
        let n = n as f64;
        let entries = match self {
            Op::SetBoundary => return 8.0 * n,
            Op::ScatterEvents => 1.0,
            Op::AddSource | Op::Present | Op::Clear => 2.0,
            Op::Diffuse | Op::Advect => 10.0,
            Op::ProjectDivergence => 4.0,
            Op::ProjectPressure => 5.0,
            Op::ProjectSubtract => 6.0,
        };
        n * n * entries
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Default)]
struct SampleRing {
    samples: [Duration; PROFILE_SAMPLES],
    filled: usize,
    cursor: usize,
    calls: usize,
}

impl SampleRing {
    fn push(&mut self, sample: Duration) {
        self.samples[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % PROFILE_SAMPLES;
        self.filled = (self.filled + 1).min(PROFILE_SAMPLES);
        self.calls += 1;
    }

    fn mean(&self) -> Duration {
        if self.filled == 0 {
            return Duration::ZERO;
        }
        let sum: Duration = self.samples[..self.filled].iter().sum();
        sum / self.filled as u32
    }
}

#[derive(Debug, Clone)]
pub struct OpReport {
    pub op: Op,
    pub calls: usize,
    pub mean: Duration,
    pub frame_time: Duration,
    pub bandwidth_gbps: f64,
}

#[derive(Debug, Clone)]
pub struct FrameReport {
    pub ops: Vec<OpReport>,
    pub total: Duration,
    pub wall: Duration,
}

impl fmt::Display for FrameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.ops {
            writeln!(
                f,
                "{:.3} ms at {:.2} GB/s (ran {} times) for {}",
                report.frame_time.as_secs_f64() * 1000.0,
                report.bandwidth_gbps,
                report.calls,
                report.op.name()
            )?;
        }
        write!(
            f,
            "Total device runtime: {:.3} ms, wallclock: {:.0} ms",
            self.total.as_secs_f64() * 1000.0,
            self.wall.as_secs_f64() * 1000.0
        )
    }
}

#[derive(Debug, Clone)]
pub struct Profiler {
    sim_size: usize,
    rings: [SampleRing; OP_COUNT],
}

impl Profiler {
    pub fn new(sim_size: usize) -> Self {
        Self {
            sim_size,
            rings: Default::default(),
        }
    }

    pub fn begin_frame(&mut self) {
        for ring in &mut self.rings {
            ring.calls = 0;
        }
    }

    pub fn record(&mut self, op: Op, elapsed: Duration) {
        self.rings[op.index()].push(elapsed);
    }

    pub fn calls(&self, op: Op) -> usize {
        self.rings[op.index()].calls
    }

    pub fn mean(&self, op: Op) -> Duration {
        self.rings[op.index()].mean()
    }

    pub fn report(&self, wall: Duration) -> FrameReport {
        let ops: Vec<OpReport> = Op::ALL
            .iter()
            .filter_map(|&op| {
                let ring = &self.rings[op.index()];
                if ring.calls == 0 {
                    return None;
                }
                let mean = ring.mean();
                let secs = mean.as_secs_f64();
                let bandwidth_gbps = if secs > 0.0 {
                    op.floats_touched(self.sim_size) * BYTES_PER_FLOAT / secs / GIB
                } else {
                    0.0
                };
                Some(OpReport {
                    op,
                    calls: ring.calls,
                    mean,
                    frame_time: mean * ring.calls as u32,
                    bandwidth_gbps,
                })
            })
            .collect();

        let total = ops.iter().map(|r| r.frame_time).sum();
        FrameReport { ops, total, wall }
    }
}
