//! Per-frame stepping of effect node trees

use crate::attributes::AttributeStore;
use crate::config::SimulationConfig;
use crate::declaration::{LoopMode, SortMode};
use crate::effect::{EffectNode, NodeParts, Particle, ParticleColumns};
use crate::noise::basic_noise;
use crate::rand::{ParticleRng, RandomSource};
use plume_core::{Result, Vec2};
use serde::Serialize;
use std::f32::consts::FRAC_PI_2;
use std::ops::AddAssign;

/// Turbulence noise-space units per world unit
const TURBULENCE_POSITION_SCALE: f32 = 0.01;
/// Turbulence noise-space units per second
const TURBULENCE_TIME_SCALE: f64 = 0.1;

/// Frame timing handed to [`Simulator::update`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous update
    pub elapsed: f32,
    /// Seconds since the clock started
    pub total: f64,
}

impl FrameTime {
    pub fn new(elapsed: f32, total: f64) -> Self {
        Self { elapsed, total }
    }
}

/// Counters accumulated over one update of a node tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepStats {
    pub emitted: usize,
    pub destroyed: usize,
    /// Nodes whose emission loop hit the per-frame cap
    pub capped_nodes: usize,
}

impl AddAssign for StepStats {
    fn add_assign(&mut self, other: Self) {
        self.emitted += other.emitted;
        self.destroyed += other.destroyed;
        self.capped_nodes += other.capped_nodes;
    }
}

/// Definition angles are degrees with 0 pointing up
fn direction_to_radians(degrees: f32) -> f32 {
    (degrees - 90.0).to_radians()
}

fn clamp_abs(value: f32, limit: f32) -> f32 {
    value.max(-limit).min(limit)
}

/// Steps effect nodes using an injected random source
#[derive(Debug, Clone)]
pub struct Simulator<R: RandomSource = ParticleRng> {
    config: SimulationConfig,
    rng: R,
}

impl Simulator<ParticleRng> {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = ParticleRng::new(config.seed);
        Self { config, rng }
    }
}

impl Default for Simulator<ParticleRng> {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl<R: RandomSource> Simulator<R> {
    pub fn with_rng(config: SimulationConfig, rng: R) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Advance `node` and its whole subtree by `time.elapsed` seconds
    pub fn update(&mut self, node: &mut EffectNode, time: FrameTime) -> Result<StepStats> {
        let mut stats = StepStats::default();
        self.update_node(node, time, &mut stats)?;
        Ok(stats)
    }

    fn update_node(
        &mut self,
        node: &mut EffectNode,
        time: FrameTime,
        stats: &mut StepStats,
    ) -> Result<()> {
        if time.elapsed <= 0.0 {
            return Ok(());
        }
        if let Some(params) = node.params() {
            if params.quality_level > self.config.quality_level {
                return Ok(());
            }
        }
        node.timing_mut().time_since_start = time.total;

        if let Some(mut parts) = node.parts_mut() {
            if !parts.transform.emitter_disabled {
                self.update_emitter(&mut parts, time.elapsed, stats)?;
            }
            self.integrate(&mut parts, time.elapsed, stats)?;
        }

        for child in node.children_mut() {
            self.update_node(child, time, stats)?;
        }
        Ok(())
    }

    fn update_emitter(
        &mut self,
        parts: &mut NodeParts<'_>,
        dt: f32,
        stats: &mut StepStats,
    ) -> Result<()> {
        let params = parts.params;
        if params.emitter_life <= 0.0 {
            return Ok(());
        }

        let timing = &mut *parts.timing;
        if timing.spawn_delay > 0.0 {
            timing.spawn_delay -= dt;
            if timing.spawn_delay > 0.0 {
                return Ok(());
            }
        }

        timing.spawn_accumulator += dt;
        timing.age += dt;

        if timing.age > params.emitter_life && params.loop_mode == LoopMode::Loop {
            timing.age %= params.emitter_life;
            timing.restart(params, &mut self.rng);
        }

        let cap = self.config.max_emissions_per_frame;
        let mut iterations = 0;
        while params.is_alive(parts.timing) {
            if iterations == cap {
                stats.capped_nodes += 1;
                log::debug!("emission capped at {} particles this frame", cap);
                break;
            }
            iterations += 1;

            let emitter_fraction = parts.timing.life_fraction(params.emitter_life);
            let rate = params
                .emitter_spawn_rate
                .get(&mut self.rng, emitter_fraction, 0.0);
            if rate <= 0.0 {
                break;
            }
            let seconds_per_particle = 1.0 / rate;
            if parts.timing.spawn_accumulator < seconds_per_particle {
                break;
            }

            self.emit(parts)?;
            parts.timing.spawn_accumulator -= seconds_per_particle;
            parts.timing.count += 1;
            stats.emitted += 1;
        }
        Ok(())
    }

    fn emit(&mut self, parts: &mut NodeParts<'_>) -> Result<()> {
        let params = parts.params;
        let transform = parts.transform;
        let rng = &mut self.rng;
        let e = parts.timing.life_fraction(params.emitter_life);

        let origin = if params.relative_to_parent {
            Vec2::ZERO
        } else {
            transform.position
        };
        let offset = Vec2::new(
            params.emitter_offset_x.get(rng, e, 0.0),
            params.emitter_offset_y.get(rng, e, 0.0),
        );

        let half_range = params.emitter_range.get(rng, e, 0.0) / 2.0;
        let main_direction =
            transform.rotation.to_degrees() + params.emitter_direction.get(rng, e, 0.0);
        let direction = main_direction + rng.range(-half_range, half_range);
        let speed = params.emitter_initial_speed.get(rng, e, 0.0);

        let life = params.particle_life.get(rng, e, 0.0);
        let particle = Particle {
            position: origin + offset,
            velocity: Vec2::from_angle(direction_to_radians(direction)) * speed,
            rotation: params.emitter_initial_rotation.get(rng, e, 0.0).to_radians()
                + transform.rotation,
            rotation_speed: params
                .emitter_initial_rotation_speed
                .get(rng, e, 0.0)
                .to_radians(),
            scale: params.emitter_initial_scale.get(rng, e, 0.0),
            life,
            age: 0.0,
        };

        let index = claim_slot(
            parts.store,
            parts.columns,
            params.effective_sort_mode(),
            life,
        )?;
        parts.columns.write(parts.store, index, &particle)
    }

    fn integrate(
        &mut self,
        parts: &mut NodeParts<'_>,
        dt: f32,
        stats: &mut StepStats,
    ) -> Result<()> {
        let params = parts.params;
        let gravity = parts.transform.gravity;
        let sort_mode = params.effective_sort_mode();
        let e = parts.timing.life_fraction(params.emitter_life);
        let time = parts.timing.time_since_start;
        let rng = &mut self.rng;

        let mut i = 0;
        while i < parts.store.active_particles() {
            let mut p = parts.columns.read(parts.store, i)?;
            let f = p.life_fraction();

            let acceleration = Vec2::new(
                params.acceleration_x.get(rng, e, f),
                params.acceleration_y.get(rng, e, f),
            ) + gravity * params.gravity_scale.get(rng, e, f);
            let resistance = params.air_resistance.get(rng, e, f);
            let turn = params.turn.get(rng, e, f);

            let old_velocity = p.velocity;
            let mut velocity = old_velocity + acceleration * dt;

            if resistance != 0.0 {
                let drag = velocity * (resistance * dt);
                velocity -= Vec2::new(
                    clamp_abs(drag.x, velocity.x.abs()),
                    clamp_abs(drag.y, velocity.y.abs()),
                );
            }
            if turn != 0.0 {
                velocity = velocity.rotated(turn.to_radians());
            }

            let strength = params.turbulence_strength.get(rng, e, f);
            if strength != 0.0 {
                let scale = params.turbulence_scale.get(rng, e, f) * TURBULENCE_POSITION_SCALE;
                let speed = params.turbulence_speed.get(rng, e, f) as f64;
                let t = (time * speed * TURBULENCE_TIME_SCALE) as f32;
                velocity += turbulence(p.position * scale, t) * strength;
            }

            p.position += (old_velocity + velocity) / 2.0 * dt;
            p.velocity = velocity;

            if params.orient_to_velocity {
                p.rotation = velocity.angle() + FRAC_PI_2;
            } else {
                p.rotation_speed += params
                    .acceleration_angular
                    .get(rng, e, f)
                    .to_radians()
                    * dt;
                p.rotation += p.rotation_speed * dt;
            }

            p.age += dt;
            if p.age >= p.life || p.life <= 0.0 {
                if params.particle_infinite {
                    p.age = if p.life > 0.0 { p.age - p.life } else { 0.0 };
                } else {
                    destroy_slot(parts.store, sort_mode, i);
                    stats.destroyed += 1;
                    continue;
                }
            }

            parts.columns.write(parts.store, i, &p)?;
            i += 1;
        }
        Ok(())
    }
}

/// Four-tap noise gradient around `position`
fn turbulence(position: Vec2, t: f32) -> Vec2 {
    let (x, y) = (position.x, position.y);
    let tl = basic_noise(x - 1.0, y - 1.0, t);
    let tr = basic_noise(x + 1.0, y - 1.0, t);
    let bl = basic_noise(x - 1.0, y + 1.0, t);
    let br = basic_noise(x + 1.0, y + 1.0, t);
    Vec2::new((tl + bl) - (tr + br), (tl + tr) - (bl + br))
}

/// Activate one more slot and return the index the new particle goes to,
/// keeping lives ordered for the sorted modes.
fn claim_slot(
    store: &mut AttributeStore,
    columns: &ParticleColumns,
    sort_mode: SortMode,
    new_life: f32,
) -> Result<usize> {
    if store.active_particles() + 1 >= store.max_particles() {
        store.resize();
    }
    let last = store.active_particles();
    store.set_active_particles(last + 1);

    let index = match sort_mode {
        SortMode::Unsorted => last,
        SortMode::OldestOnTop => {
            let lives = &store.column(columns.life)?[..last];
            lives.iter().position(|&l| l >= new_life).unwrap_or(last)
        }
        SortMode::NewestOnTop => {
            let lives = &store.column(columns.life)?[..last];
            lives.iter().rposition(|&l| l >= new_life).map_or(0, |j| j + 1)
        }
    };
    if index != last {
        store.shuffle(index, last);
    }
    Ok(index)
}

/// Remove the particle at `index`, preserving order for the sorted modes
fn destroy_slot(store: &mut AttributeStore, sort_mode: SortMode, index: usize) {
    let last = store.active_particles() - 1;
    if sort_mode == SortMode::Unsorted {
        store.move_slot(last, index);
    } else {
        store.shuffle(last, index);
    }
    store.set_active_particles(last);
}
