//! Object recycling for effect nodes

use crate::assets::AssetLoader;
use crate::config::SimulationConfig;
use crate::definition::Definition;
use crate::effect::EffectNode;
use crate::rand::ParticleRng;
use plume_core::{DefinitionId, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Objects created on the first take from an empty pool
pub const POOL_INITIAL_CAPACITY: usize = 8;
/// Fixed part of the growth step: a pool grows by `capacity / 2 + POOL_GROWTH_INCREMENT`
pub const POOL_GROWTH_INCREMENT: usize = 4;

/// Free list of recycled values with capacity accounting
#[derive(Debug)]
pub struct Pool<T> {
    free: Vec<T>,
    capacity: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self {
            free: Vec::new(),
            capacity: 0,
        }
    }
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a recycled value, constructing a batch with `factory` when the free list is empty
    pub fn take_with<F>(&mut self, mut factory: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        if self.free.is_empty() {
            let grow = if self.capacity == 0 {
                POOL_INITIAL_CAPACITY
            } else {
                self.capacity / 2 + POOL_GROWTH_INCREMENT
            };
            self.free.reserve(grow);
            for _ in 0..grow {
                self.free.push(factory()?);
            }
            self.capacity += grow;
            log::debug!("pool grew by {} to {}", grow, self.capacity);
        }
        match self.free.pop() {
            Some(value) => Ok(value),
            None => factory(),
        }
    }

    pub fn give_back(&mut self, value: T) {
        self.free.push(value);
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Total objects this pool has constructed
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Per-definition pools of effect nodes, plus the services nodes need on reload
pub struct EffectPool {
    pools: HashMap<DefinitionId, Pool<EffectNode>>,
    pub(crate) loader: Box<dyn AssetLoader>,
    pub(crate) rng: ParticleRng,
    initial_capacity: usize,
}

impl EffectPool {
    pub fn new(loader: impl AssetLoader + 'static) -> Self {
        Self::with_config(loader, &SimulationConfig::default())
    }

    pub fn with_config(loader: impl AssetLoader + 'static, config: &SimulationConfig) -> Self {
        Self {
            pools: HashMap::new(),
            loader: Box::new(loader),
            rng: ParticleRng::new(config.seed),
            initial_capacity: config.initial_capacity,
        }
    }

    /// Take a node for `definition` (reusing a recycled one when possible) and reload it
    pub fn create(&mut self, definition: &Arc<Definition>) -> Result<EffectNode> {
        let capacity = self.initial_capacity;
        let pool = self.pools.entry(definition.id()).or_default();
        let mut node = pool.take_with(|| EffectNode::new(Arc::clone(definition), capacity))?;
        node.set_definition(Arc::clone(definition))?;

        if let Err(err) = node.reload(self) {
            self.destroy(node);
            return Err(err);
        }
        Ok(node)
    }

    /// Clear a node (returning its children recursively) and recycle it
    pub fn destroy(&mut self, mut node: EffectNode) {
        node.clear(self);
        self.pools
            .entry(node.definition_id())
            .or_default()
            .give_back(node);
    }

    /// Drop every pooled node
    pub fn clear(&mut self) {
        self.pools.clear();
    }

    pub fn available(&self, id: DefinitionId) -> usize {
        self.pools.get(&id).map_or(0, Pool::available)
    }

    pub fn capacity(&self, id: DefinitionId) -> usize {
        self.pools.get(&id).map_or(0, Pool::capacity)
    }

    pub fn loader_mut(&mut self) -> &mut dyn AssetLoader {
        self.loader.as_mut()
    }
}

impl std::fmt::Debug for EffectPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectPool")
            .field("pools", &self.pools.len())
            .field("initial_capacity", &self.initial_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::TextureCache;
    use crate::declaration::EMITTER_SPAWN_RATE;

    #[test]
    fn take_grows_lazily_then_by_half_plus_increment() {
        let mut pool: Pool<u32> = Pool::new();
        assert_eq!(pool.capacity(), 0);
        let mut next = 0;
        let mut factory = || {
            next += 1;
            Ok(next)
        };
        let mut taken = Vec::new();
        for _ in 0..POOL_INITIAL_CAPACITY {
            taken.push(pool.take_with(&mut factory).unwrap());
        }
        assert_eq!(pool.capacity(), POOL_INITIAL_CAPACITY);
        assert_eq!(pool.available(), 0);

        taken.push(pool.take_with(&mut factory).unwrap());
        let grown = POOL_INITIAL_CAPACITY + POOL_INITIAL_CAPACITY / 2 + POOL_GROWTH_INCREMENT;
        assert_eq!(pool.capacity(), grown);
        assert_eq!(pool.available(), grown - POOL_INITIAL_CAPACITY - 1);
    }

    #[test]
    fn given_back_values_are_reused() {
        let mut pool: Pool<String> = Pool::new();
        let value = pool.take_with(|| Ok(String::from("node"))).unwrap();
        let before = pool.available();
        pool.give_back(value);
        assert_eq!(pool.available(), before + 1);
    }

    #[test]
    fn destroyed_node_is_reused_for_same_definition() {
        let def = Definition::emitter("spark").into_shared();
        let mut pool = EffectPool::new(TextureCache::new());
        let node = pool.create(&def).unwrap();
        let instance = node.instance();
        pool.destroy(node);

        let again = pool.create(&def).unwrap();
        assert_eq!(again.instance(), instance);
        assert_eq!(pool.capacity(def.id()), POOL_INITIAL_CAPACITY);
    }

    #[test]
    fn reused_node_keeps_grown_capacity() {
        use crate::declaration::{EMITTER_LIFE, PARTICLE_LIFE};
        use crate::simulator::{FrameTime, Simulator};

        let def = Definition::emitter("flood")
            .with(EMITTER_SPAWN_RATE, 1000.0f32)
            .with(EMITTER_LIFE, 10.0f32)
            .with(PARTICLE_LIFE, 100.0f32)
            .into_shared();
        let mut pool = EffectPool::new(TextureCache::new());
        let mut node = pool.create(&def).unwrap();
        Simulator::default()
            .update(&mut node, FrameTime::new(1.0, 1.0))
            .unwrap();
        let grown = node.particles().max_particles();
        assert!(grown > SimulationConfig::default().initial_capacity);
        let instance = node.instance();
        pool.destroy(node);

        let again = pool.create(&def).unwrap();
        assert_eq!(again.instance(), instance);
        assert_eq!(again.active_particles(), 0);
        assert_eq!(again.particles().max_particles(), grown);
    }

    #[test]
    fn recycled_node_sees_edited_definition() {
        let def = Definition::emitter("spark").into_shared();
        let mut pool = EffectPool::new(TextureCache::new());
        let node = pool.create(&def).unwrap();
        pool.destroy(node);

        let mut edited = (*def).clone();
        edited.set(EMITTER_SPAWN_RATE, 42.0f32);
        let edited = edited.into_shared();
        let node = pool.create(&edited).unwrap();
        assert_eq!(node.params().unwrap().emitter_spawn_rate.base(), 42.0);
    }

    #[test]
    fn destroy_returns_children_recursively() {
        let leaf = Definition::emitter("leaf").into_shared();
        let root = Definition::group("root")
            .with_child(Arc::clone(&leaf))
            .into_shared();
        let mut pool = EffectPool::new(TextureCache::new());
        let node = pool.create(&root).unwrap();
        let leaf_available = pool.available(leaf.id());
        pool.destroy(node);
        assert_eq!(pool.available(leaf.id()), leaf_available + 1);
        assert_eq!(pool.available(root.id()), POOL_INITIAL_CAPACITY);
    }

    #[test]
    fn clear_drops_everything() {
        let def = Definition::emitter("spark").into_shared();
        let mut pool = EffectPool::new(TextureCache::new());
        let node = pool.create(&def).unwrap();
        pool.destroy(node);
        pool.clear();
        assert_eq!(pool.available(def.id()), 0);
        assert_eq!(pool.capacity(def.id()), 0);
    }
}
