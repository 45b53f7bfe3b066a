//! Owns live effect trees: spawns them from the pool, steps them, reclaims
//! the dead ones, and packs their draw data.

use crate::assets::AssetLoader;
use crate::config::SimulationConfig;
use crate::definition::Definition;
use crate::draw::{pack_instances, DrawBatch, ParticleInstance};
use crate::effect::EffectNode;
use crate::pool::EffectPool;
use crate::rand::{ParticleRng, RandomSource};
use crate::simulator::{FrameTime, Simulator, StepStats};
use plume_core::{Result, Vec2};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Opaque id of a spawned effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectHandle(u64);

impl EffectHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Manages live effects, syncing between the pool, the simulator and the draw buffers
#[derive(Debug)]
pub struct EffectManager<R: RandomSource = ParticleRng> {
    pool: EffectPool,
    simulator: Simulator<R>,
    effects: BTreeMap<EffectHandle, EffectNode>,
    next_handle: u64,
    total_time: f64,
    /// Pre-allocated instance buffer for packing live particles
    instance_buffer: Vec<ParticleInstance>,
    batches: Vec<DrawBatch>,
}

impl EffectManager<ParticleRng> {
    pub fn new(config: SimulationConfig, loader: impl AssetLoader + 'static) -> Self {
        let pool = EffectPool::with_config(loader, &config);
        Self::from_parts(pool, Simulator::new(config))
    }
}

impl<R: RandomSource> EffectManager<R> {
    pub fn with_rng(config: SimulationConfig, loader: impl AssetLoader + 'static, rng: R) -> Self {
        let pool = EffectPool::with_config(loader, &config);
        Self::from_parts(pool, Simulator::with_rng(config, rng))
    }

    fn from_parts(pool: EffectPool, simulator: Simulator<R>) -> Self {
        Self {
            pool,
            simulator,
            effects: BTreeMap::new(),
            next_handle: 1,
            total_time: 0.0,
            instance_buffer: Vec::new(),
            batches: Vec::new(),
        }
    }

    /// Create a node tree for `definition` at `position` and start simulating it
    pub fn spawn(&mut self, definition: &Arc<Definition>, position: Vec2) -> Result<EffectHandle> {
        let mut node = self.pool.create(definition)?;
        node.set_position(position);

        let handle = EffectHandle(self.next_handle);
        self.next_handle += 1;
        log::info!(
            "spawned effect '{}' as {} at ({}, {})",
            definition.name,
            handle,
            position.x,
            position.y
        );
        self.effects.insert(handle, node);
        Ok(handle)
    }

    /// Point a live effect at an edited definition and reload it in place
    pub fn reload(&mut self, handle: EffectHandle, definition: &Arc<Definition>) -> Result<bool> {
        let Some(node) = self.effects.get_mut(&handle) else {
            return Ok(false);
        };
        node.set_definition(Arc::clone(definition))?;
        node.reload(&mut self.pool)?;
        Ok(true)
    }

    pub fn get(&self, handle: EffectHandle) -> Option<&EffectNode> {
        self.effects.get(&handle)
    }

    pub fn get_mut(&mut self, handle: EffectHandle) -> Option<&mut EffectNode> {
        self.effects.get_mut(&handle)
    }

    /// Stop emitting; the effect is reclaimed once its particles expire
    pub fn stop(&mut self, handle: EffectHandle) -> bool {
        match self.effects.get_mut(&handle) {
            Some(node) => {
                node.set_emitter_disabled(true);
                true
            }
            None => false,
        }
    }

    /// Remove an effect immediately and return its nodes to the pool
    pub fn kill(&mut self, handle: EffectHandle) -> bool {
        match self.effects.remove(&handle) {
            Some(node) => {
                self.pool.destroy(node);
                true
            }
            None => false,
        }
    }

    /// Step every live effect by `dt` seconds, then reclaim the dead ones
    pub fn update(&mut self, dt: f32) -> Result<StepStats> {
        let mut stats = StepStats::default();
        if dt <= 0.0 {
            return Ok(stats);
        }
        self.total_time += dt as f64;
        let time = FrameTime::new(dt, self.total_time);

        for node in self.effects.values_mut() {
            stats += self.simulator.update(node, time)?;
        }

        let dead: Vec<EffectHandle> = self
            .effects
            .iter()
            .filter(|(_, node)| node.is_dead())
            .map(|(&handle, _)| handle)
            .collect();
        if !dead.is_empty() {
            log::info!("reclaiming {} finished effect(s)", dead.len());
        }
        for handle in dead {
            if let Some(node) = self.effects.remove(&handle) {
                self.pool.destroy(node);
            }
        }
        Ok(stats)
    }

    /// Pack live particles into the instance buffer for GPU upload.
    /// Call this after `update()`.
    pub fn pack_instances(&mut self) {
        self.instance_buffer.clear();
        self.batches.clear();
        let rng = self.simulator.rng_mut();
        for node in self.effects.values() {
            pack_instances(node, rng, &mut self.instance_buffer, &mut self.batches);
        }
    }

    /// Get the packed instance data
    pub fn instance_data(&self) -> &[ParticleInstance] {
        &self.instance_buffer
    }

    pub fn draw_batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    pub fn handles(&self) -> impl Iterator<Item = EffectHandle> + '_ {
        self.effects.keys().copied()
    }

    /// Number of live effects
    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Total live particles across all effects
    pub fn total_alive(&self) -> usize {
        self.effects
            .values()
            .map(EffectNode::total_active_particles)
            .sum()
    }

    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    pub fn pool(&self) -> &EffectPool {
        &self.pool
    }

    pub fn simulator(&self) -> &Simulator<R> {
        &self.simulator
    }

    /// Return every effect to the pool and drop the draw buffers
    pub fn clear(&mut self) {
        let effects = std::mem::take(&mut self.effects);
        for node in effects.into_values() {
            self.pool.destroy(node);
        }
        self.instance_buffer.clear();
        self.batches.clear();
    }
}
