//! The built-in emitter declaration: parameter names, enum parameters, and defaults

use crate::curves::Gradient;
use crate::definition::ParamValue;
use plume_core::{PlumeError, Result};
use std::path::PathBuf;

/// Declaration name of the built-in particle emitter
pub const EMITTER_DECLARATION: &str = "Emitter";
/// Declaration name for container nodes
pub const GROUP_DECLARATION: &str = "Group";

/// Sub-parameter holding the jitter amplitude of a randomized value
pub const RANDOM: &str = "Random";
/// Sub-parameter curve sampled by emitter life fraction
pub const GRAPH_EMITTER: &str = "GraphEmitter";
/// Sub-parameter curve sampled by particle life fraction
pub const GRAPH_PARTICLE: &str = "GraphParticle";

pub const QUALITY_LEVEL: &str = "QualityLevel";
pub const TEXTURE: &str = "Texture";
pub const TEXTURE_ANCHOR_X: &str = "TextureAnchorX";
pub const TEXTURE_ANCHOR_Y: &str = "TextureAnchorY";
pub const TEXTURE_CELLS_X: &str = "TextureCellsX";
pub const TEXTURE_CELLS_Y: &str = "TextureCellsY";
pub const TEXTURE_FRAME_TIME: &str = "TextureFrameTime";
pub const BLEND_MODE: &str = "BlendMode";
pub const SORT_MODE: &str = "SortMode";
pub const PARTICLE_INFINITE: &str = "ParticleInfinite";
pub const PARTICLE_ORIENT_TO_VELOCITY: &str = "ParticleOrientToVelocity";
pub const PARTICLE_RELATIVE_TO_PARENT: &str = "ParticleRelativeToParent";
pub const PARTICLE_COLOR: &str = "ParticleColor";
pub const EMITTER_LIFE: &str = "EmitterLife";
pub const EMITTER_LOOP: &str = "EmitterLoop";
pub const PARTICLE_GRAVITY_SCALE: &str = "ParticleGravityScale";
pub const PARTICLE_ACCELERATION_X: &str = "ParticleAccelerationX";
pub const PARTICLE_ACCELERATION_Y: &str = "ParticleAccelerationY";
pub const PARTICLE_ACCELERATION_ANGULAR: &str = "ParticleAccelerationAngular";
pub const PARTICLE_AIR_RESISTANCE: &str = "ParticleAirResistance";
pub const PARTICLE_TURN: &str = "ParticleTurn";
pub const PARTICLE_SCALE: &str = "ParticleScale";
pub const PARTICLE_SCALE_X: &str = "ParticleScaleX";
pub const PARTICLE_SCALE_Y: &str = "ParticleScaleY";
pub const PARTICLE_TURBULENCE_STRENGTH: &str = "ParticleTurbulenceStrength";
pub const PARTICLE_TURBULENCE_SCALE: &str = "ParticleTurbulenceScale";
pub const PARTICLE_TURBULENCE_SPEED: &str = "ParticleTurbulenceSpeed";
pub const PARTICLE_LIFE: &str = "ParticleLife";
pub const EMITTER_COUNT: &str = "EmitterCount";
pub const EMITTER_DIRECTION: &str = "EmitterDirection";
pub const EMITTER_RANGE: &str = "EmitterRange";
pub const EMITTER_INITIAL_SPEED: &str = "EmitterInitialSpeed";
pub const EMITTER_SPAWN_DELAY: &str = "EmitterSpawnDelay";
pub const EMITTER_SPAWN_RATE: &str = "EmitterSpawnRate";
pub const EMITTER_OFFSET_X: &str = "EmitterOffsetX";
pub const EMITTER_OFFSET_Y: &str = "EmitterOffsetY";
pub const EMITTER_INITIAL_ROTATION: &str = "EmitterInitialRotation";
pub const EMITTER_INITIAL_ROTATION_SPEED: &str = "EmitterInitialRotationSpeed";
pub const EMITTER_INITIAL_SCALE: &str = "EmitterInitialScale";

/// Integer-backed enumeration parameter, addressable by name in definition files
pub trait EnumParameter: Sized + Copy + 'static {
    /// `(name, value)` pairs in declaration order
    const VARIANTS: &'static [(&'static str, Self)];

    fn to_int(self) -> i32;

    fn from_int(parameter: &str, value: i32) -> Result<Self> {
        Self::VARIANTS
            .iter()
            .map(|(_, v)| *v)
            .find(|v| v.to_int() == value)
            .ok_or_else(|| Self::invalid(parameter, value.to_string()))
    }

    fn from_name(parameter: &str, name: &str) -> Result<Self> {
        let wanted = normalize(name);
        Self::VARIANTS
            .iter()
            .find(|(n, _)| normalize(n) == wanted)
            .map(|(_, v)| *v)
            .ok_or_else(|| Self::invalid(parameter, name.to_string()))
    }

    fn invalid(parameter: &str, value: String) -> PlumeError {
        PlumeError::InvalidEnumValue {
            name: parameter.to_string(),
            value,
            allowed: Self::VARIANTS.iter().map(|(n, _)| n.to_string()).collect(),
        }
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlendMode {
    #[default]
    Alpha,
    Additive,
    Opaque,
}

impl EnumParameter for BlendMode {
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("alpha", BlendMode::Alpha),
        ("additive", BlendMode::Additive),
        ("opaque", BlendMode::Opaque),
    ];

    fn to_int(self) -> i32 {
        self as i32
    }
}

/// Draw order of an emitter's live particles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortMode {
    #[default]
    Unsorted,
    NewestOnTop,
    OldestOnTop,
}

impl EnumParameter for SortMode {
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("unsorted", SortMode::Unsorted),
        ("newest_on_top", SortMode::NewestOnTop),
        ("oldest_on_top", SortMode::OldestOnTop),
    ];

    fn to_int(self) -> i32 {
        self as i32
    }
}

/// What an emitter does when its age passes its life
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoopMode {
    /// Wrap the age and restart the emission budget
    #[default]
    Loop,
    /// Never expire
    Infinite,
    /// Stop at the end of the first cycle
    Once,
}

impl EnumParameter for LoopMode {
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("loop", LoopMode::Loop),
        ("infinite", LoopMode::Infinite),
        ("once", LoopMode::Once),
    ];

    fn to_int(self) -> i32 {
        self as i32
    }
}

/// Resolve an enum parameter given by variant name to its integer value.
/// `None` when `parameter` is not an enum parameter.
pub fn enum_value_by_name(parameter: &str, name: &str) -> Option<Result<i32>> {
    match parameter {
        BLEND_MODE => Some(BlendMode::from_name(parameter, name).map(BlendMode::to_int)),
        SORT_MODE => Some(SortMode::from_name(parameter, name).map(SortMode::to_int)),
        EMITTER_LOOP => Some(LoopMode::from_name(parameter, name).map(LoopMode::to_int)),
        _ => None,
    }
}

/// Default parameters of the built-in emitter declaration
pub fn emitter_defaults() -> Vec<(&'static str, ParamValue)> {
    vec![
        (QUALITY_LEVEL, ParamValue::Int(0)),
        (TEXTURE, ParamValue::FilePath(PathBuf::new())),
        (TEXTURE_ANCHOR_X, ParamValue::Float(0.5)),
        (TEXTURE_ANCHOR_Y, ParamValue::Float(0.5)),
        (TEXTURE_CELLS_X, ParamValue::Int(1)),
        (TEXTURE_CELLS_Y, ParamValue::Int(1)),
        (TEXTURE_FRAME_TIME, ParamValue::Float(0.0)),
        (BLEND_MODE, ParamValue::Int(BlendMode::Alpha.to_int())),
        (SORT_MODE, ParamValue::Int(SortMode::Unsorted.to_int())),
        (PARTICLE_INFINITE, ParamValue::Bool(false)),
        (PARTICLE_ORIENT_TO_VELOCITY, ParamValue::Bool(false)),
        (PARTICLE_RELATIVE_TO_PARENT, ParamValue::Bool(false)),
        (PARTICLE_COLOR, ParamValue::Gradient(Gradient::default())),
        (EMITTER_LIFE, ParamValue::Float(1.0)),
        (EMITTER_LOOP, ParamValue::Int(LoopMode::Loop.to_int())),
        (PARTICLE_GRAVITY_SCALE, ParamValue::Float(1.0)),
        (PARTICLE_ACCELERATION_X, ParamValue::Float(0.0)),
        (PARTICLE_ACCELERATION_Y, ParamValue::Float(0.0)),
        (PARTICLE_ACCELERATION_ANGULAR, ParamValue::Float(0.0)),
        (PARTICLE_AIR_RESISTANCE, ParamValue::Float(0.0)),
        (PARTICLE_TURN, ParamValue::Float(0.0)),
        (PARTICLE_SCALE, ParamValue::Float(1.0)),
        (PARTICLE_SCALE_X, ParamValue::Float(1.0)),
        (PARTICLE_SCALE_Y, ParamValue::Float(1.0)),
        (PARTICLE_TURBULENCE_STRENGTH, ParamValue::Float(0.0)),
        (PARTICLE_TURBULENCE_SCALE, ParamValue::Float(1.0)),
        (PARTICLE_TURBULENCE_SPEED, ParamValue::Float(1.0)),
        (PARTICLE_LIFE, ParamValue::Float(1.0)),
        (EMITTER_COUNT, ParamValue::Int(0)),
        (EMITTER_DIRECTION, ParamValue::Float(0.0)),
        (EMITTER_RANGE, ParamValue::Float(0.0)),
        (EMITTER_INITIAL_SPEED, ParamValue::Float(0.0)),
        (EMITTER_SPAWN_DELAY, ParamValue::Float(0.0)),
        (EMITTER_SPAWN_RATE, ParamValue::Float(10.0)),
        (EMITTER_OFFSET_X, ParamValue::Float(0.0)),
        (EMITTER_OFFSET_Y, ParamValue::Float(0.0)),
        (EMITTER_INITIAL_ROTATION, ParamValue::Float(0.0)),
        (EMITTER_INITIAL_ROTATION_SPEED, ParamValue::Float(0.0)),
        (EMITTER_INITIAL_SCALE, ParamValue::Float(1.0)),
    ]
}
