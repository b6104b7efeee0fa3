use bytemuck::{Pod, Zeroable};

use crate::error::{FluidError, Result};
use crate::field::FieldKind;

pub const MAX_EVENTS_PER_FIELD: usize = 10;

// A point impulse in grid space. Layout matches the GPU event buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SourceEvent {
    pub x: i32,
    pub y: i32,
    pub strength: f32,
    pub max_radius_sqrd: i32,
}

impl SourceEvent {
    pub fn from_normalized(
        sim_size: usize,
        x_norm: f32,
        y_norm: f32,
        strength: f32,
        radius_norm: f32,
    ) -> Result<Self> {
        for (name, value) in [("x", x_norm), ("y", y_norm)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(FluidError::InvalidInjection(format!(
                    "{name} = {value} is outside [0, 1]"
                )));
            }
        }
        if !strength.is_finite() {
            return Err(FluidError::InvalidInjection(format!(
                "strength {strength} is not finite"
            )));
        }
        if !radius_norm.is_finite() || radius_norm < 0.0 {
            return Err(FluidError::InvalidInjection(format!(
                "radius {radius_norm} must be finite and non-negative"
            )));
        }

        let n = sim_size as f32;
        Ok(Self {
            x: (x_norm * n) as i32,
            y: (y_norm * n) as i32,
            strength,
            max_radius_sqrd: (radius_norm * radius_norm * n * n) as i32,
        })
    }

    #[inline]
    pub fn falloff(&self, d_sqrd: i32) -> f32 {
        if d_sqrd > self.max_radius_sqrd {
            0.0
        } else {
            1.0 - d_sqrd as f32 / (self.max_radius_sqrd as f32 + 1.0)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventBatch {
    events: Vec<SourceEvent>,
}

impl EventBatch {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(MAX_EVENTS_PER_FIELD),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= MAX_EVENTS_PER_FIELD
    }

    pub fn as_slice(&self) -> &[SourceEvent] {
        &self.events
    }

    fn push(&mut self, field: FieldKind, event: SourceEvent) -> Result<()> {
        if self.is_full() {
            return Err(FluidError::CapacityExceeded {
                field,
                capacity: MAX_EVENTS_PER_FIELD,
            });
        }
        self.events.push(event);
        Ok(())
    }

    pub fn drain(&mut self) -> Vec<SourceEvent> {
        std::mem::replace(&mut self.events, Vec::with_capacity(MAX_EVENTS_PER_FIELD))
    }
}

#[derive(Debug, Clone)]
pub struct EventQueues {
    sim_size: usize,
    batches: [EventBatch; 4],
}

impl EventQueues {
    pub fn new(sim_size: usize) -> Self {
        Self {
            sim_size,
            batches: Default::default(),
        }
    }

    pub fn enqueue(
        &mut self,
        field: FieldKind,
        x_norm: f32,
        y_norm: f32,
        strength: f32,
        radius_norm: f32,
    ) -> Result<()> {
        let event = SourceEvent::from_normalized(self.sim_size, x_norm, y_norm, strength, radius_norm)?;
        self.batches[field.index()].push(field, event)
    }

    pub fn batch(&self, field: FieldKind) -> &EventBatch {
        &self.batches[field.index()]
    }

    pub fn drain(&mut self, field: FieldKind) -> Vec<SourceEvent> {
        self.batches[field.index()].drain()
    }

    pub fn clear(&mut self) {
        for batch in &mut self.batches {
            batch.drain();
        }
    }
}
