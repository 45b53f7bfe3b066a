//! Plume Particles - 2D particle effect simulation core
//!
//! Provides pooled, definition-driven effect simulation with:
//! - Structure-of-arrays particle storage with typed column handles
//! - Randomized parameters with emitter/particle life curves
//! - Emission, integration, turbulence and sorted-lifetime ordering
//! - Per-definition node pooling with in-place reload of edited definitions
//! - Instance packing for instanced draw calls
//! - TOML definition files

pub mod assets;
pub mod attributes;
pub mod config;
pub mod curves;
pub mod declaration;
pub mod definition;
pub mod draw;
pub mod effect;
pub mod manager;
pub mod noise;
pub mod param;
pub mod pool;
pub mod rand;
pub mod simulator;

pub use assets::{AssetLoader, TextureCache, TextureHandle};
pub use attributes::{Attribute, AttributeStore, Column};
pub use config::{DefinitionTable, SimulationConfig};
pub use curves::{Curve, Gradient, GradientStop};
pub use declaration::{BlendMode, EnumParameter, LoopMode, SortMode};
pub use definition::{DeclarationKind, Definition, ParamValue, Parameter};
pub use draw::{pack_instances, DrawBatch, ParticleInstance};
pub use effect::{EffectNode, EffectTransform, EmitterParams, EmitterTiming, Particle};
pub use manager::{EffectHandle, EffectManager};
pub use noise::NoiseDescriptor;
pub use param::{RandomFloat, RandomInt};
pub use pool::{EffectPool, Pool};
pub use rand::{ParticleRng, RandomSource};
pub use simulator::{FrameTime, Simulator, StepStats};
