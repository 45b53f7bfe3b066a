//! Randomized numeric parameters bound to a definition by name.
//!
//! A bound parameter caches its base value, its `Random` jitter, and the
//! optional `GraphEmitter`/`GraphParticle` curves. `reload` re-reads them
//! after the definition changes. A float parameter whose value is a noise
//! descriptor samples that noise over the emitter's life instead of using a
//! fixed base.

use crate::curves::Curve;
use crate::declaration::{GRAPH_EMITTER, GRAPH_PARTICLE, RANDOM};
use crate::definition::{Definition, ParamValue, Parameter};
use crate::noise::NoiseDescriptor;
use crate::rand::RandomSource;
use plume_core::Result;

fn optional_curve(parameter: &Parameter, sub: &str, name: &str) -> Result<Option<Curve>> {
    match parameter.sub(sub) {
        Some(p) => {
            let curve = p.value.as_curve(name)?;
            Ok((!curve.is_empty()).then(|| curve.clone()))
        }
        None => Ok(None),
    }
}

fn graph_factor(
    graph_emitter: &Option<Curve>,
    graph_particle: &Option<Curve>,
    emitter_fraction: f32,
    particle_fraction: f32,
) -> f32 {
    let mut factor = 1.0;
    if let Some(curve) = graph_emitter {
        factor *= curve.evaluate(emitter_fraction);
    }
    if let Some(curve) = graph_particle {
        factor *= curve.evaluate(particle_fraction);
    }
    factor
}

/// Float parameter: `base + uniform(-jitter, jitter)`, scaled by optional curves
#[derive(Debug, Clone, PartialEq)]
pub struct RandomFloat {
    name: String,
    base: f32,
    jitter: f32,
    noise: Option<NoiseDescriptor>,
    graph_emitter: Option<Curve>,
    graph_particle: Option<Curve>,
}

impl RandomFloat {
    pub fn bind(definition: &Definition, name: &str) -> Result<Self> {
        let mut param = Self::constant(name, 0.0);
        param.reload(definition)?;
        Ok(param)
    }

    /// A fixed value not tied to any definition
    pub fn constant(name: &str, value: f32) -> Self {
        Self {
            name: name.to_string(),
            base: value,
            jitter: 0.0,
            noise: None,
            graph_emitter: None,
            graph_particle: None,
        }
    }

    pub fn reload(&mut self, definition: &Definition) -> Result<()> {
        let parameter = definition.parameter(&self.name)?;
        match &parameter.value {
            ParamValue::Noise(noise) => {
                self.base = noise.base;
                self.noise = Some(*noise);
            }
            value => {
                self.base = value.as_float(&self.name)?;
                self.noise = None;
            }
        }
        self.jitter = match parameter.sub(RANDOM) {
            Some(random) => random.value.as_float(&self.name)?,
            None => 0.0,
        };
        self.graph_emitter = optional_curve(parameter, GRAPH_EMITTER, &self.name)?;
        self.graph_particle = optional_curve(parameter, GRAPH_PARTICLE, &self.name)?;
        Ok(())
    }

    pub fn get<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        emitter_fraction: f32,
        particle_fraction: f32,
    ) -> f32 {
        let mut value = match &self.noise {
            Some(noise) => noise.evaluate(emitter_fraction),
            None => self.base,
        };
        if self.jitter != 0.0 {
            value += rng.range(-self.jitter, self.jitter);
        }
        value
            * graph_factor(
                &self.graph_emitter,
                &self.graph_particle,
                emitter_fraction,
                particle_fraction,
            )
    }

    /// True when every possible sample is exactly zero
    pub fn is_zero(&self) -> bool {
        let flat = self.noise.map_or(true, |n| n.amplitude == 0.0);
        self.base == 0.0 && self.jitter == 0.0 && flat
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> f32 {
        self.base
    }

    pub fn jitter(&self) -> f32 {
        self.jitter
    }

    pub fn noise(&self) -> Option<&NoiseDescriptor> {
        self.noise.as_ref()
    }
}

/// Integer parameter: `base + uniform_int(-jitter, jitter)` inclusive
#[derive(Debug, Clone, PartialEq)]
pub struct RandomInt {
    name: String,
    base: i32,
    jitter: i32,
    graph_emitter: Option<Curve>,
    graph_particle: Option<Curve>,
}

impl RandomInt {
    pub fn bind(definition: &Definition, name: &str) -> Result<Self> {
        let mut param = Self::constant(name, 0);
        param.reload(definition)?;
        Ok(param)
    }

    pub fn constant(name: &str, value: i32) -> Self {
        Self {
            name: name.to_string(),
            base: value,
            jitter: 0,
            graph_emitter: None,
            graph_particle: None,
        }
    }

    pub fn reload(&mut self, definition: &Definition) -> Result<()> {
        let parameter = definition.parameter(&self.name)?;
        self.base = parameter.value.as_int(&self.name)?;
        self.jitter = match parameter.sub(RANDOM) {
            Some(random) => random.value.as_int(&self.name)?,
            None => 0,
        };
        self.graph_emitter = optional_curve(parameter, GRAPH_EMITTER, &self.name)?;
        self.graph_particle = optional_curve(parameter, GRAPH_PARTICLE, &self.name)?;
        Ok(())
    }

    pub fn get<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        emitter_fraction: f32,
        particle_fraction: f32,
    ) -> i32 {
        let mut value = self.base;
        if self.jitter != 0 {
            let spread = self.jitter.saturating_abs();
            value = value.saturating_add(rng.range_i32(-spread, spread));
        }
        if self.graph_emitter.is_none() && self.graph_particle.is_none() {
            return value;
        }
        let factor = graph_factor(
            &self.graph_emitter,
            &self.graph_particle,
            emitter_fraction,
            particle_fraction,
        );
        (value as f32 * factor).round() as i32
    }

    pub fn is_zero(&self) -> bool {
        self.base == 0 && self.jitter == 0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> i32 {
        self.base
    }

    pub fn jitter(&self) -> i32 {
        self.jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{EMITTER_COUNT, EMITTER_LIFE, EMITTER_SPAWN_RATE, PARTICLE_TURN};
    use crate::rand::ParticleRng;
    use plume_core::PlumeError;

    /// Fails the test if the parameter ever asks for randomness
    struct NoRandom;

    impl RandomSource for NoRandom {
        fn next_f32(&mut self) -> f32 {
            panic!("random source consulted for a zero-jitter parameter");
        }
    }

    #[test]
    fn zero_jitter_is_exact_and_skips_rng() {
        let def = Definition::emitter("spark").with(EMITTER_SPAWN_RATE, 5.0f32);
        let rate = RandomFloat::bind(&def, EMITTER_SPAWN_RATE).unwrap();
        assert_eq!(rate.get(&mut NoRandom, 0.3, 0.7), 5.0);
        assert!(!rate.is_zero());
    }

    #[test]
    fn noise_value_varies_over_emitter_life() {
        let noise = NoiseDescriptor {
            base: 10.0,
            amplitude: 4.0,
            scale: 3.0,
            octaves: 2,
            ..NoiseDescriptor::default()
        };
        let def = Definition::emitter("flicker").with(EMITTER_SPAWN_RATE, noise);
        let rate = RandomFloat::bind(&def, EMITTER_SPAWN_RATE).unwrap();
        assert_eq!(rate.base(), 10.0);
        assert_eq!(rate.noise(), Some(&noise));

        let samples: Vec<f32> = (0..20)
            .map(|i| rate.get(&mut NoRandom, i as f32 * 0.05, 0.0))
            .collect();
        assert!(samples.iter().all(|v| (6.0..=14.0).contains(v)), "{samples:?}");
        assert!(samples.iter().any(|v| (v - samples[0]).abs() > 1e-4));
        assert_eq!(rate.get(&mut NoRandom, 0.4, 0.0), noise.evaluate(0.4));
    }

    #[test]
    fn rebinding_to_a_number_drops_noise() {
        let mut def = Definition::emitter("flicker")
            .with(EMITTER_SPAWN_RATE, NoiseDescriptor::default());
        let mut rate = RandomFloat::bind(&def, EMITTER_SPAWN_RATE).unwrap();
        assert!(rate.noise().is_some());
        def.set(EMITTER_SPAWN_RATE, 7.0f32);
        rate.reload(&def).unwrap();
        assert!(rate.noise().is_none());
        assert_eq!(rate.get(&mut NoRandom, 0.5, 0.5), 7.0);
    }

    #[test]
    fn jitter_stays_in_band() {
        let def = Definition::emitter("spark")
            .with(EMITTER_LIFE, 2.0f32)
            .with_random(EMITTER_LIFE, 0.5f32);
        let life = RandomFloat::bind(&def, EMITTER_LIFE).unwrap();
        let mut rng = ParticleRng::new(3);
        for _ in 0..500 {
            let v = life.get(&mut rng, 0.0, 0.0);
            assert!((1.5..=2.5).contains(&v), "{v} outside jitter band");
        }
    }

    #[test]
    fn int_jitter_is_inclusive() {
        let def = Definition::emitter("spark")
            .with(EMITTER_COUNT, 10)
            .with_random(EMITTER_COUNT, 1);
        let count = RandomInt::bind(&def, EMITTER_COUNT).unwrap();
        let mut rng = ParticleRng::new(11);
        let mut seen = [false; 3];
        for _ in 0..600 {
            let v = count.get(&mut rng, 0.0, 0.0);
            assert!((9..=11).contains(&v));
            seen[(v - 9) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn graphs_multiply_the_value() {
        let mut def = Definition::emitter("spark").with(EMITTER_SPAWN_RATE, 4.0f32);
        def.set_sub(EMITTER_SPAWN_RATE, GRAPH_EMITTER, Curve::linear(1.0, 0.0))
            .unwrap();
        def.set_sub(EMITTER_SPAWN_RATE, GRAPH_PARTICLE, Curve::linear(0.0, 2.0))
            .unwrap();
        let rate = RandomFloat::bind(&def, EMITTER_SPAWN_RATE).unwrap();
        // 4 * (1 - 0.25) * (2 * 0.5)
        assert!((rate.get(&mut NoRandom, 0.25, 0.5) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn missing_parameter_fails_fast() {
        let def = Definition::group("root");
        assert!(matches!(
            RandomFloat::bind(&def, EMITTER_LIFE),
            Err(PlumeError::ParameterNotFound(_))
        ));
    }

    #[test]
    fn float_parameter_rejects_bool() {
        let def = Definition::emitter("spark").with(EMITTER_LIFE, true);
        assert!(matches!(
            RandomFloat::bind(&def, EMITTER_LIFE),
            Err(PlumeError::InvalidParameterType { .. })
        ));
    }

    #[test]
    fn reload_picks_up_edits() {
        let mut def = Definition::emitter("spark");
        let mut life = RandomFloat::bind(&def, EMITTER_LIFE).unwrap();
        def.set(EMITTER_LIFE, 3.0f32);
        def.set_random(EMITTER_LIFE, 0.25f32);
        life.reload(&def).unwrap();
        assert_eq!(life.base(), 3.0);
        assert_eq!(life.jitter(), 0.25);
    }

    #[test]
    fn is_zero_requires_zero_jitter() {
        let def = Definition::emitter("spark").with_random(PARTICLE_TURN, 2.0f32);
        let turn = RandomFloat::bind(&def, PARTICLE_TURN).unwrap();
        assert_eq!(turn.base(), 0.0);
        assert!(!turn.is_zero());
        assert!(RandomFloat::constant("x", 0.0).is_zero());
    }
}
