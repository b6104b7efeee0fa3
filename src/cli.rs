use std::path::PathBuf;
use std::str::FromStr;

use crate::config::SimulationParameters;
use crate::error::{FluidError, Result};

pub const PROFILE_SIM_SIZE: usize = 512;

pub const USAGE: &str = "\
usage: fluid2d [options]
  -n <size>        interior cells per side
  -d <rate>        diffusion rate
  -v <viscosity>   viscosity
  -r <sweeps>      relaxation iterations
  -p               print kernel profile every frame
  -t CPU|GPU       compute device
  --config <file>  JSON parameter file, flags override it
  --headless <n>   render n frames to PNG instead of opening a window
  --out <dir>      output directory for --headless (default: frames)
  --profile-run <n>
                   step n frames with no output and log kernel profiles
                   (grid defaults to 512 unless -n or --config sets it)
  -h, --help       show this message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu,
}

impl Default for Device {
    fn default() -> Self {
        if cfg!(feature = "gpu") {
            Device::Gpu
        } else {
            Device::Cpu
        }
    }
}

impl FromStr for Device {
    type Err = FluidError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CPU" => Ok(Device::Cpu),
            "GPU" => Ok(Device::Gpu),
            _ => Err(FluidError::InvalidConfig(format!("invalid device type {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Gui,
    Headless { frames: usize, output: PathBuf },
    Profile { frames: usize },
    Help,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub sim_size: Option<usize>,
    pub diffusion_rate: Option<f32>,
    pub viscosity: Option<f32>,
    pub relaxation_iterations: Option<usize>,
    pub profile: bool,
    pub device: Device,
    pub headless_frames: Option<usize>,
    pub profile_frames: Option<usize>,
    pub output: Option<PathBuf>,
    pub help: bool,
}

fn value<T: FromStr>(flag: &str, args: &mut impl Iterator<Item = String>) -> Result<T> {
    let raw = args
        .next()
        .ok_or_else(|| FluidError::InvalidConfig(format!("{flag} needs a value")))?;
    raw.parse()
        .map_err(|_| FluidError::InvalidConfig(format!("invalid value {raw:?} for {flag}")))
}

impl CliOptions {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut options = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-n" => options.sim_size = Some(value(&arg, &mut args)?),
                "-d" => options.diffusion_rate = Some(value(&arg, &mut args)?),
                "-v" => options.viscosity = Some(value(&arg, &mut args)?),
                "-r" => options.relaxation_iterations = Some(value(&arg, &mut args)?),
                "-p" => options.profile = true,
                "-t" => options.device = value(&arg, &mut args)?,
                "--config" => options.config = Some(value(&arg, &mut args)?),
                "--headless" => options.headless_frames = Some(value(&arg, &mut args)?),
                "--out" => options.output = Some(value(&arg, &mut args)?),
                "--profile-run" => options.profile_frames = Some(value(&arg, &mut args)?),
                "-h" | "--help" => options.help = true,
                other => {
                    return Err(FluidError::InvalidConfig(format!("unknown flag {other:?}")));
                }
            }
        }

        Ok(options)
    }

    pub fn mode(&self) -> Mode {
        if self.help {
            return Mode::Help;
        }
        if let Some(frames) = self.profile_frames {
            return Mode::Profile { frames };
        }
        match self.headless_frames {
            Some(frames) => Mode::Headless {
                frames,
                output: self.output.clone().unwrap_or_else(|| PathBuf::from("frames")),
            },
            None => Mode::Gui,
        }
    }

    pub fn parameters(&self) -> Result<SimulationParameters> {
        let mut params = match &self.config {
            Some(path) => SimulationParameters::from_json_file(path)?,
            None => SimulationParameters::default(),
        };

        if let Some(n) = self.sim_size {
            params.sim_size = n;
        } else if self.profile_frames.is_some() && self.config.is_none() {
            params.sim_size = PROFILE_SIM_SIZE;
        }
        if let Some(rate) = self.diffusion_rate {
            params.diffusion_rate = rate;
        }
        if let Some(visc) = self.viscosity {
            params.viscosity = visc;
        }
        if let Some(iterations) = self.relaxation_iterations {
            params.relaxation_iterations = iterations;
        }
        params.profile |= self.profile || self.profile_frames.is_some();

        params.validate()?;
        Ok(params)
    }
}
