//! Runtime effect nodes.
//!
//! An [`EffectNode`] is the live instance of a [`Definition`] node: it owns
//! the resolved emitter parameters, the emitter timing state, the particle
//! columns, and one child node per child definition. Nodes are created and
//! recycled by [`EffectPool`]; the [`Simulator`](crate::Simulator) steps them.

use crate::assets::{AssetLoader, TextureHandle};
use crate::attributes::{AttributeStore, Column};
use crate::curves::Gradient;
use crate::declaration::*;
use crate::definition::Definition;
use crate::param::{RandomFloat, RandomInt};
use crate::pool::EffectPool;
use crate::rand::RandomSource;
use plume_core::{DefinitionId, Result, Vec2};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Externally driven transform shared by a node and all of its descendants
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EffectTransform {
    pub position: Vec2,
    /// Radians
    pub rotation: f32,
    pub gravity: Vec2,
    pub emitter_disabled: bool,
}

/// Emitter clock and emission budget
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmitterTiming {
    pub time_since_start: f64,
    pub spawn_delay: f32,
    pub age: f32,
    pub spawn_accumulator: f32,
    pub count: i32,
    pub count_max: i32,
}

impl EmitterTiming {
    /// Emitter age over emitter life, or 0 for a non-positive life
    pub fn life_fraction(&self, emitter_life: f32) -> f32 {
        if emitter_life > 0.0 {
            self.age / emitter_life
        } else {
            0.0
        }
    }

    /// Start a new emission cycle: re-roll the count budget and spawn delay
    pub fn restart<R: RandomSource + ?Sized>(&mut self, params: &EmitterParams, rng: &mut R) {
        self.spawn_accumulator = 0.0;
        self.count = 0;
        self.count_max = params.emitter_count.get(rng, 0.0, 0.0);
        self.spawn_delay = params.emitter_spawn_delay.get(rng, 0.0, 0.0);
    }

    fn reset(&mut self) {
        self.time_since_start = 0.0;
        self.age = 0.0;
        self.spawn_accumulator = 0.0;
        self.count = 0;
    }
}

/// Emitter parameters resolved from a definition
#[derive(Debug, Clone)]
pub struct EmitterParams {
    pub quality_level: i32,
    pub texture: TextureHandle,
    pub texture_anchor: Vec2,
    pub texture_cells: [u32; 2],
    pub texture_frame_time: f32,
    pub blend_mode: BlendMode,
    pub sort_mode: SortMode,
    pub particle_infinite: bool,
    pub orient_to_velocity: bool,
    pub relative_to_parent: bool,
    pub color: Gradient,
    pub loop_mode: LoopMode,
    pub emitter_life: f32,

    pub gravity_scale: RandomFloat,
    pub acceleration_x: RandomFloat,
    pub acceleration_y: RandomFloat,
    pub acceleration_angular: RandomFloat,
    pub air_resistance: RandomFloat,
    pub turn: RandomFloat,
    pub scale: RandomFloat,
    pub scale_x: RandomFloat,
    pub scale_y: RandomFloat,
    pub turbulence_strength: RandomFloat,
    pub turbulence_scale: RandomFloat,
    pub turbulence_speed: RandomFloat,
    pub particle_life: RandomFloat,

    pub emitter_count: RandomInt,
    pub emitter_direction: RandomFloat,
    pub emitter_range: RandomFloat,
    pub emitter_initial_speed: RandomFloat,
    pub emitter_spawn_delay: RandomFloat,
    pub emitter_spawn_rate: RandomFloat,
    pub emitter_offset_x: RandomFloat,
    pub emitter_offset_y: RandomFloat,
    pub emitter_initial_rotation: RandomFloat,
    pub emitter_initial_rotation_speed: RandomFloat,
    pub emitter_initial_scale: RandomFloat,
}

impl EmitterParams {
    /// Bind every parameter of the emitter declaration
    pub fn bind(definition: &Definition, loader: &mut dyn AssetLoader) -> Result<Self> {
        let float = |name| RandomFloat::bind(definition, name);
        let mut params = Self {
            quality_level: 0,
            texture: TextureHandle::NONE,
            texture_anchor: Vec2::new(0.5, 0.5),
            texture_cells: [1, 1],
            texture_frame_time: 0.0,
            blend_mode: BlendMode::default(),
            sort_mode: SortMode::default(),
            particle_infinite: false,
            orient_to_velocity: false,
            relative_to_parent: false,
            color: Gradient::default(),
            loop_mode: LoopMode::default(),
            emitter_life: 0.0,

            gravity_scale: float(PARTICLE_GRAVITY_SCALE)?,
            acceleration_x: float(PARTICLE_ACCELERATION_X)?,
            acceleration_y: float(PARTICLE_ACCELERATION_Y)?,
            acceleration_angular: float(PARTICLE_ACCELERATION_ANGULAR)?,
            air_resistance: float(PARTICLE_AIR_RESISTANCE)?,
            turn: float(PARTICLE_TURN)?,
            scale: float(PARTICLE_SCALE)?,
            scale_x: float(PARTICLE_SCALE_X)?,
            scale_y: float(PARTICLE_SCALE_Y)?,
            turbulence_strength: float(PARTICLE_TURBULENCE_STRENGTH)?,
            turbulence_scale: float(PARTICLE_TURBULENCE_SCALE)?,
            turbulence_speed: float(PARTICLE_TURBULENCE_SPEED)?,
            particle_life: float(PARTICLE_LIFE)?,

            emitter_count: RandomInt::bind(definition, EMITTER_COUNT)?,
            emitter_direction: float(EMITTER_DIRECTION)?,
            emitter_range: float(EMITTER_RANGE)?,
            emitter_initial_speed: float(EMITTER_INITIAL_SPEED)?,
            emitter_spawn_delay: float(EMITTER_SPAWN_DELAY)?,
            emitter_spawn_rate: float(EMITTER_SPAWN_RATE)?,
            emitter_offset_x: float(EMITTER_OFFSET_X)?,
            emitter_offset_y: float(EMITTER_OFFSET_Y)?,
            emitter_initial_rotation: float(EMITTER_INITIAL_ROTATION)?,
            emitter_initial_rotation_speed: float(EMITTER_INITIAL_ROTATION_SPEED)?,
            emitter_initial_scale: float(EMITTER_INITIAL_SCALE)?,
        };
        params.load_plain(definition, loader)?;
        Ok(params)
    }

    /// Re-read every parameter after the definition changed
    pub fn reload(&mut self, definition: &Definition, loader: &mut dyn AssetLoader) -> Result<()> {
        for param in [
            &mut self.gravity_scale,
            &mut self.acceleration_x,
            &mut self.acceleration_y,
            &mut self.acceleration_angular,
            &mut self.air_resistance,
            &mut self.turn,
            &mut self.scale,
            &mut self.scale_x,
            &mut self.scale_y,
            &mut self.turbulence_strength,
            &mut self.turbulence_scale,
            &mut self.turbulence_speed,
            &mut self.particle_life,
            &mut self.emitter_direction,
            &mut self.emitter_range,
            &mut self.emitter_initial_speed,
            &mut self.emitter_spawn_delay,
            &mut self.emitter_spawn_rate,
            &mut self.emitter_offset_x,
            &mut self.emitter_offset_y,
            &mut self.emitter_initial_rotation,
            &mut self.emitter_initial_rotation_speed,
            &mut self.emitter_initial_scale,
        ] {
            param.reload(definition)?;
        }
        self.emitter_count.reload(definition)?;
        self.load_plain(definition, loader)
    }

    fn load_plain(&mut self, definition: &Definition, loader: &mut dyn AssetLoader) -> Result<()> {
        let cells = |name| -> Result<u32> { Ok(definition.int(name)?.max(1) as u32) };

        self.quality_level = definition.int(QUALITY_LEVEL)?;
        self.texture_anchor = Vec2::new(
            definition.float(TEXTURE_ANCHOR_X)?,
            definition.float(TEXTURE_ANCHOR_Y)?,
        );
        self.texture_cells = [cells(TEXTURE_CELLS_X)?, cells(TEXTURE_CELLS_Y)?];
        self.texture_frame_time = definition.float(TEXTURE_FRAME_TIME)?;
        self.blend_mode = definition.enum_value(BLEND_MODE)?;
        self.sort_mode = definition.enum_value(SORT_MODE)?;
        self.particle_infinite = definition.bool(PARTICLE_INFINITE)?;
        self.orient_to_velocity = definition.bool(PARTICLE_ORIENT_TO_VELOCITY)?;
        self.relative_to_parent = definition.bool(PARTICLE_RELATIVE_TO_PARENT)?;
        self.color = definition
            .value(PARTICLE_COLOR)?
            .as_gradient(PARTICLE_COLOR)?
            .clone();
        self.emitter_life = definition.float(EMITTER_LIFE)?;
        self.loop_mode = definition.enum_value(EMITTER_LOOP)?;

        let texture = definition.value(TEXTURE)?.as_path(TEXTURE)?;
        self.texture = loader.load_texture(texture)?;
        Ok(())
    }

    /// Additive blending ignores draw order
    pub fn effective_sort_mode(&self) -> SortMode {
        if self.blend_mode == BlendMode::Additive {
            SortMode::Unsorted
        } else {
            self.sort_mode
        }
    }

    pub fn animation_cells(&self) -> u32 {
        self.texture_cells[0].saturating_mul(self.texture_cells[1])
    }

    /// Whether the emitter may still spawn particles
    pub fn is_alive(&self, timing: &EmitterTiming) -> bool {
        self.emitter_life > 0.0
            && (self.emitter_count.is_zero() || timing.count < timing.count_max)
            && (timing.age < self.emitter_life || self.loop_mode == LoopMode::Infinite)
    }
}

pub const POSITION: &str = "Position";
pub const VELOCITY: &str = "Velocity";
pub const ROTATION: &str = "Rotation";
pub const ROTATION_SPEED: &str = "RotationSpeed";
pub const SCALE: &str = "Scale";
pub const LIFE: &str = "Life";
pub const AGE: &str = "Age";

/// A single particle gathered from the columns
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub rotation_speed: f32,
    pub scale: f32,
    pub life: f32,
    pub age: f32,
}

impl Particle {
    /// Age over life, or 1 for a non-positive life
    pub fn life_fraction(&self) -> f32 {
        if self.life > 0.0 {
            self.age / self.life
        } else {
            1.0
        }
    }
}

/// Column handles of the emitter particle attributes
#[derive(Debug, Clone, Copy)]
pub struct ParticleColumns {
    pub position: Column<Vec2>,
    pub velocity: Column<Vec2>,
    pub rotation: Column<f32>,
    pub rotation_speed: Column<f32>,
    pub scale: Column<f32>,
    pub life: Column<f32>,
    pub age: Column<f32>,
}

impl ParticleColumns {
    pub fn register(store: &mut AttributeStore) -> Result<Self> {
        Ok(Self {
            position: store.register(POSITION)?,
            velocity: store.register(VELOCITY)?,
            rotation: store.register(ROTATION)?,
            rotation_speed: store.register(ROTATION_SPEED)?,
            scale: store.register(SCALE)?,
            life: store.register(LIFE)?,
            age: store.register(AGE)?,
        })
    }

    pub fn read(&self, store: &AttributeStore, index: usize) -> Result<Particle> {
        Ok(Particle {
            position: store.value(self.position, index)?,
            velocity: store.value(self.velocity, index)?,
            rotation: store.value(self.rotation, index)?,
            rotation_speed: store.value(self.rotation_speed, index)?,
            scale: store.value(self.scale, index)?,
            life: store.value(self.life, index)?,
            age: store.value(self.age, index)?,
        })
    }

    pub fn write(&self, store: &mut AttributeStore, index: usize, particle: &Particle) -> Result<()> {
        store.set(self.position, index, particle.position)?;
        store.set(self.velocity, index, particle.velocity)?;
        store.set(self.rotation, index, particle.rotation)?;
        store.set(self.rotation_speed, index, particle.rotation_speed)?;
        store.set(self.scale, index, particle.scale)?;
        store.set(self.life, index, particle.life)?;
        store.set(self.age, index, particle.age)?;
        Ok(())
    }
}

/// Disjoint mutable view of an emitter node used while stepping it
pub(crate) struct NodeParts<'a> {
    pub params: &'a EmitterParams,
    pub columns: &'a ParticleColumns,
    pub store: &'a mut AttributeStore,
    pub timing: &'a mut EmitterTiming,
    pub transform: &'a EffectTransform,
}

/// Live instance of a definition node
#[derive(Debug)]
pub struct EffectNode {
    definition: Arc<Definition>,
    instance: u64,
    transform: EffectTransform,
    timing: EmitterTiming,
    params: Option<EmitterParams>,
    columns: Option<ParticleColumns>,
    particles: AttributeStore,
    children: Vec<EffectNode>,
}

impl EffectNode {
    /// A fresh, unbound node. Emitters get their particle columns here;
    /// parameters are bound by the first [`reload`](Self::reload).
    pub fn new(definition: Arc<Definition>, initial_capacity: usize) -> Result<Self> {
        let mut particles = AttributeStore::new(initial_capacity);
        let columns = if definition.is_group() {
            None
        } else {
            Some(ParticleColumns::register(&mut particles)?)
        };
        Ok(Self {
            definition,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            transform: EffectTransform::default(),
            timing: EmitterTiming::default(),
            params: None,
            columns,
            particles,
            children: Vec::new(),
        })
    }

    /// Point the node at a (possibly edited) definition. Switching between
    /// emitter and group drops the particles and rebuilds the columns.
    pub(crate) fn set_definition(&mut self, definition: Arc<Definition>) -> Result<()> {
        if definition.is_group() != self.is_group() {
            self.params = None;
            self.timing = EmitterTiming::default();
            self.particles = AttributeStore::new(self.particles.max_particles());
            self.columns = if definition.is_group() {
                None
            } else {
                Some(ParticleColumns::register(&mut self.particles)?)
            };
        }
        self.definition = definition;
        Ok(())
    }

    /// Re-read the definition: bind parameters, resolve the texture, restart
    /// the emitter, and rebuild or reload the children.
    pub fn reload(&mut self, pool: &mut EffectPool) -> Result<()> {
        let definition = Arc::clone(&self.definition);
        log::trace!("reloading '{}' (instance {})", definition.name, self.instance);

        if !definition.is_group() {
            let was_relative = self.params.as_ref().is_some_and(|p| p.relative_to_parent);
            let params = match self.params.take() {
                Some(mut params) => {
                    params.reload(&definition, pool.loader.as_mut())?;
                    params
                }
                None => EmitterParams::bind(&definition, pool.loader.as_mut())?,
            };
            self.timing.restart(&params, &mut pool.rng);
            let reset = was_relative != params.relative_to_parent || params.particle_infinite;
            self.params = Some(params);
            if reset {
                self.reset();
            }
        }

        if definition.children.len() != self.children.len() {
            self.clear_children(pool);
            for child_definition in &definition.children {
                let mut child = pool.create(child_definition)?;
                child.set_transform(self.transform);
                self.children.push(child);
            }
        } else {
            for (slot, child_definition) in definition.children.iter().enumerate() {
                if self.children[slot].definition_id() != child_definition.id() {
                    let mut replacement = pool.create(child_definition)?;
                    replacement.set_transform(self.transform);
                    let old = std::mem::replace(&mut self.children[slot], replacement);
                    pool.destroy(old);
                } else {
                    let child = &mut self.children[slot];
                    child.set_definition(Arc::clone(child_definition))?;
                    child.reload(pool)?;
                }
            }
        }
        Ok(())
    }

    /// Drop all particles and rewind the emitter clock
    pub fn reset(&mut self) {
        self.particles.set_active_particles(0);
        self.timing.reset();
    }

    /// Start a new emission cycle without touching live particles
    pub fn restart_emitter<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        if let Some(params) = &self.params {
            self.timing.restart(params, rng);
        }
    }

    /// Reset and return every child to the pool
    pub fn clear(&mut self, pool: &mut EffectPool) {
        self.reset();
        self.timing.spawn_delay = 0.0;
        self.timing.count_max = 0;
        self.clear_children(pool);
    }

    fn clear_children(&mut self, pool: &mut EffectPool) {
        for child in self.children.drain(..) {
            pool.destroy(child);
        }
    }

    pub fn definition(&self) -> &Arc<Definition> {
        &self.definition
    }

    pub fn definition_id(&self) -> DefinitionId {
        self.definition.id()
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Serial number distinguishing node objects, stable across pool reuse
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn is_group(&self) -> bool {
        self.columns.is_none()
    }

    pub fn params(&self) -> Option<&EmitterParams> {
        self.params.as_ref()
    }

    pub fn timing(&self) -> &EmitterTiming {
        &self.timing
    }

    pub(crate) fn timing_mut(&mut self) -> &mut EmitterTiming {
        &mut self.timing
    }

    pub fn particles(&self) -> &AttributeStore {
        &self.particles
    }

    pub fn columns(&self) -> Option<&ParticleColumns> {
        self.columns.as_ref()
    }

    pub fn active_particles(&self) -> usize {
        self.particles.active_particles()
    }

    /// Live particles in this node and every descendant
    pub fn total_active_particles(&self) -> usize {
        self.active_particles()
            + self
                .children
                .iter()
                .map(EffectNode::total_active_particles)
                .sum::<usize>()
    }

    /// Gather particle `index` from the columns
    pub fn particle(&self, index: usize) -> Option<Particle> {
        let columns = self.columns.as_ref()?;
        if index >= self.active_particles() {
            return None;
        }
        columns.read(&self.particles, index).ok()
    }

    pub fn children(&self) -> &[EffectNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [EffectNode] {
        &mut self.children
    }

    pub(crate) fn parts_mut(&mut self) -> Option<NodeParts<'_>> {
        let params = self.params.as_ref()?;
        let columns = self.columns.as_ref()?;
        Some(NodeParts {
            params,
            columns,
            store: &mut self.particles,
            timing: &mut self.timing,
            transform: &self.transform,
        })
    }

    pub fn transform(&self) -> &EffectTransform {
        &self.transform
    }

    fn set_transform(&mut self, transform: EffectTransform) {
        self.transform = transform;
        for child in &mut self.children {
            child.set_transform(transform);
        }
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.transform.position = position;
        for child in &mut self.children {
            child.set_position(position);
        }
    }

    /// Radians
    pub fn set_rotation(&mut self, rotation: f32) {
        self.transform.rotation = rotation;
        for child in &mut self.children {
            child.set_rotation(rotation);
        }
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.transform.gravity = gravity;
        for child in &mut self.children {
            child.set_gravity(gravity);
        }
    }

    pub fn set_emitter_disabled(&mut self, disabled: bool) {
        self.transform.emitter_disabled = disabled;
        for child in &mut self.children {
            child.set_emitter_disabled(disabled);
        }
    }

    /// Emitter age over emitter life
    pub fn life_fraction(&self) -> f32 {
        self.params
            .as_ref()
            .map_or(0.0, |p| self.timing.life_fraction(p.emitter_life))
    }

    pub fn effective_sort_mode(&self) -> SortMode {
        self.params
            .as_ref()
            .map_or(SortMode::Unsorted, EmitterParams::effective_sort_mode)
    }

    pub fn emitter_alive(&self) -> bool {
        self.params
            .as_ref()
            .is_some_and(|p| p.is_alive(&self.timing))
    }

    /// Nothing left to emit, no live particles, and every child dead
    pub fn is_dead(&self) -> bool {
        if !self.transform.emitter_disabled {
            if self.emitter_alive() {
                return false;
            }
            if self.params.as_ref().is_some_and(|p| p.particle_infinite) {
                return false;
            }
        }
        self.active_particles() == 0 && self.children.iter().all(EffectNode::is_dead)
    }
}
