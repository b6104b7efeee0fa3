use glam::Vec2;
use rand::Rng;

use crate::backend::ComputeBackend;
use crate::error::{FluidError, Result};
use crate::field::FieldKind;
use crate::simulation::FluidSim;

pub const DENSITY_STRENGTH: f32 = 2.0;
pub const DENSITY_RADIUS: f32 = 1.0;
pub const VELOCITY_STRENGTH: f32 = 10.0;
pub const VELOCITY_RADIUS: f32 = 0.05;
pub const STREAM_RADIUS: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impulse {
    pub field: FieldKind,
    pub position: Vec2,
    pub strength: f32,
    pub radius: f32,
}

impl Impulse {
    pub fn apply<B: ComputeBackend>(&self, simulation: &mut FluidSim<B>) -> Result<()> {
        simulation.inject(
            self.field,
            self.position.x,
            self.position.y,
            self.strength,
            self.radius,
        )
    }
}

pub fn apply_all<B: ComputeBackend>(
    simulation: &mut FluidSim<B>,
    impulses: &[Impulse],
) -> Result<usize> {
    let mut dropped = 0;
    for impulse in impulses {
        match impulse.apply(simulation) {
            Ok(()) => {}
            Err(FluidError::CapacityExceeded { field, capacity }) => {
                log::warn!("dropping impulse: {field} queue already holds {capacity} events");
                dropped += 1;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(dropped)
}

#[derive(Debug, Clone)]
pub struct PointerTracker {
    previous: Option<Vec2>,
    density_field: FieldKind,
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerTracker {
    pub fn new() -> Self {
        Self {
            previous: None,
            density_field: FieldKind::ADensity,
        }
    }

    pub fn density_field(&self) -> FieldKind {
        self.density_field
    }

    pub fn toggle_density_field(&mut self) {
        self.density_field = match self.density_field {
            FieldKind::ADensity => FieldKind::BDensity,
            _ => FieldKind::ADensity,
        };
    }

    pub fn drag(&mut self, position: Vec2, shift: bool) -> Vec<Impulse> {
        let position = position.clamp(Vec2::ZERO, Vec2::ONE);
        let previous = self.previous.replace(position);

        let Some(previous) = previous else {
            return Vec::new();
        };
        let delta = position - previous;
        if delta.length_squared() <= 0.0 {
            return Vec::new();
        }

        if shift {
            return vec![Impulse {
                field: self.density_field,
                position,
                strength: DENSITY_STRENGTH,
                radius: DENSITY_RADIUS,
            }];
        }

        let velocity = delta.normalize() * VELOCITY_STRENGTH;
        vec![
            Impulse {
                field: FieldKind::UVelocity,
                position,
                strength: velocity.x,
                radius: VELOCITY_RADIUS,
            },
            Impulse {
                field: FieldKind::VVelocity,
                position,
                strength: velocity.y,
                radius: VELOCITY_RADIUS,
            },
        ]
    }

    pub fn release(&mut self) {
        self.previous = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.previous.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stream {
    pub position: Vec2,
    pub direction: Vec2,
    pub density_strength: f32,
    pub velocity_strength: f32,
    pub field: FieldKind,
}

impl Stream {
    pub fn impulses(&self, rng: &mut impl Rng) -> Vec<Impulse> {
        let jitter = Vec2::new(
            (rng.gen_range(0..100) - 50) as f32 / 30.0,
            (rng.gen_range(0..100) - 50) as f32 / 30.0,
        );
        let direction = self.direction + jitter;
        if direction.length_squared() <= 0.0 {
            return Vec::new();
        }
        let velocity = direction.normalize() * self.velocity_strength;

        vec![
            Impulse {
                field: self.field,
                position: self.position,
                strength: self.density_strength,
                radius: STREAM_RADIUS,
            },
            Impulse {
                field: FieldKind::UVelocity,
                position: self.position,
                strength: velocity.x,
                radius: STREAM_RADIUS,
            },
            Impulse {
                field: FieldKind::VVelocity,
                position: self.position,
                strength: velocity.y,
                radius: STREAM_RADIUS,
            },
        ]
    }
}

pub fn default_streams() -> [Stream; 3] {
    [
        Stream {
            position: Vec2::new(0.5, 0.75),
            direction: Vec2::new(0.0, -1.0),
            density_strength: 1.0,
            velocity_strength: 1.0,
            field: FieldKind::BDensity,
        },
        Stream {
            position: Vec2::new(0.25, 0.25),
            direction: Vec2::new(1.0, 1.0),
            density_strength: 1.0,
            velocity_strength: 1.0,
            field: FieldKind::ADensity,
        },
        Stream {
            position: Vec2::new(0.75, 0.25),
            direction: Vec2::new(-1.0, 1.0),
            density_strength: 1.0,
            velocity_strength: 1.0,
            field: FieldKind::ADensity,
        },
    ]
}
