use std::fmt;
use std::str::FromStr;

use crate::error::FluidError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    Density,
    Velocity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    Density,
    // Channel 0 is negated at the left/right walls, channel 1 at top/bottom.
    Velocity,
    Scalar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRule {
    Reflect,
    NegateX,
    NegateY,
}

impl BoundaryKind {
    pub fn channel_rule(self, channel: usize) -> ChannelRule {
        match (self, channel) {
            (BoundaryKind::Velocity, 0) => ChannelRule::NegateX,
            (BoundaryKind::Velocity, _) => ChannelRule::NegateY,
            _ => ChannelRule::Reflect,
        }
    }

    pub(crate) fn code(self) -> u32 {
        match self {
            BoundaryKind::Density => 0,
            BoundaryKind::Velocity => 1,
            BoundaryKind::Scalar => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    ADensity,
    BDensity,
    UVelocity,
    VVelocity,
}

impl FieldKind {
    pub const ALL: [FieldKind; 4] = [
        FieldKind::ADensity,
        FieldKind::BDensity,
        FieldKind::UVelocity,
        FieldKind::VVelocity,
    ];

    pub fn storage(self) -> Storage {
        match self {
            FieldKind::ADensity | FieldKind::BDensity => Storage::Density,
            FieldKind::UVelocity | FieldKind::VVelocity => Storage::Velocity,
        }
    }

    pub fn channel(self) -> usize {
        match self {
            FieldKind::ADensity | FieldKind::UVelocity => 0,
            FieldKind::BDensity | FieldKind::VVelocity => 1,
        }
    }

    pub fn boundary(self) -> BoundaryKind {
        match self.storage() {
            Storage::Density => BoundaryKind::Density,
            Storage::Velocity => BoundaryKind::Velocity,
        }
    }

    pub fn rule(self) -> ChannelRule {
        self.boundary().channel_rule(self.channel())
    }

    pub(crate) fn index(self) -> usize {
        match self {
            FieldKind::ADensity => 0,
            FieldKind::BDensity => 1,
            FieldKind::UVelocity => 2,
            FieldKind::VVelocity => 3,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::ADensity => "A density",
            FieldKind::BDensity => "B density",
            FieldKind::UVelocity => "U velocity",
            FieldKind::VVelocity => "V velocity",
        };
        f.write_str(name)
    }
}

impl FromStr for FieldKind {
    type Err = FluidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "a_density" => Ok(FieldKind::ADensity),
            "b" | "b_density" => Ok(FieldKind::BDensity),
            "u" | "u_velocity" => Ok(FieldKind::UVelocity),
            "v" | "v_velocity" => Ok(FieldKind::VVelocity),
            _ => Err(FluidError::InvalidFieldSelector(s.to_string())),
        }
    }
}
