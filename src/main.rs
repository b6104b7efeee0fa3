use fluid2d::cli::{CliOptions, Device, Mode, USAGE};
use fluid2d::input;
use fluid2d::{
    AnalysisRecorder, ComputeBackend, FieldKind, FluidSim, FrameClock, ImageExporter,
    SimulationParameters,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;

const HEADLESS_DT: f32 = 1.0 / 60.0;
const EXPORT_SIZE: u32 = 600;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = CliOptions::parse(std::env::args().skip(1))?;
    let mode = options.mode();
    if mode == Mode::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let params = options.parameters()?;
    log::info!("parameters: {params:?}");

    match options.device {
        Device::Cpu => run_cpu(params, mode),
        Device::Gpu => run_gpu(params, mode),
    }
}

#[cfg(feature = "cpu")]
fn run_cpu(params: SimulationParameters, mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
    let backend = fluid2d::CpuBackend::new(params.sim_size);
    run(FluidSim::new(backend, params)?, mode)
}

#[cfg(not(feature = "cpu"))]
fn run_cpu(_params: SimulationParameters, _mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
    Err("built without the `cpu` feature".into())
}

#[cfg(feature = "gpu")]
fn run_gpu(params: SimulationParameters, mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
    // Adapter and device requests are async
    let runtime = tokio::runtime::Runtime::new()?;
    let backend = runtime.block_on(fluid2d::GpuBackend::new(params.sim_size))?;
    run(FluidSim::new(backend, params)?, mode)
}

#[cfg(not(feature = "gpu"))]
fn run_gpu(_params: SimulationParameters, _mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
    Err("built without the `gpu` feature".into())
}

fn run<B: ComputeBackend + 'static>(
    simulation: FluidSim<B>,
    mode: Mode,
) -> Result<(), Box<dyn std::error::Error>> {
    match mode {
        Mode::Headless { frames, output } => run_headless(simulation, frames, &output),
        Mode::Profile { frames } => run_profile(simulation, frames),
        Mode::Gui => {
            fluid2d::desktop::run(simulation)?;
            Ok(())
        }
        Mode::Help => Ok(()),
    }
}

fn run_profile<B: ComputeBackend>(
    mut simulation: FluidSim<B>,
    frames: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    log::info!(
        "profiling {frames} frames of {}² on {}",
        simulation.grid().sim_size,
        simulation.backend_name()
    );

    let mut clock = FrameClock::new(simulation.params().max_timestep);
    for _ in 0..frames {
        for field in FieldKind::ALL {
            simulation.inject(field, 0.5, 0.5, 1.0, 1.0)?;
        }
        let dt = clock.tick().sim;
        simulation.step(dt)?;
    }

    // Each step already logs its own report; repeat the final window
    if let Some(report) = simulation.last_report() {
        log::info!("profile after {} frames\n{report}", simulation.frames());
    }
    Ok(())
}

fn run_headless<B: ComputeBackend>(
    mut simulation: FluidSim<B>,
    frames: usize,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    log::info!(
        "rendering {frames} frames on {} into {}",
        simulation.backend_name(),
        output.display()
    );

    let exporter = ImageExporter::new(EXPORT_SIZE, EXPORT_SIZE);
    let streams = input::default_streams();
    let mut rng = StdRng::seed_from_u64(0);
    let mut recorder = AnalysisRecorder::new();

    let written = exporter.export_frame_sequence(
        &mut simulation,
        frames,
        HEADLESS_DT,
        output,
        "density",
        |sim, frame| {
            if frame % 10 == 0 {
                if let Err(err) = recorder.record_frame(sim) {
                    log::warn!("metrics skipped: {err}");
                }
            }
            for stream in &streams {
                let impulses = stream.impulses(&mut rng);
                if let Err(err) = input::apply_all(sim, &impulses) {
                    log::warn!("stream skipped: {err}");
                }
            }
        },
    )?;

    recorder.record_frame(&mut simulation)?;
    exporter.export_velocity_png(&mut simulation, 0.1, &output.join("velocity.png"))?;

    if let Some(metrics) = recorder.metrics_history.last() {
        log::info!("{metrics}");
    }
    recorder.log_trends();
    log::info!("wrote {} frames", written.len());
    Ok(())
}
