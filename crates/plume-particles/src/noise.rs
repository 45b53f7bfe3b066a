//! Deterministic gradient noise for turbulence and noise-driven parameters

use serde::{Deserialize, Serialize};

/// Integer hash for lattice coordinates
fn hash3(x: i32, y: i32, z: i32) -> u32 {
    let mut h = (x as u32).wrapping_mul(0x8da6_b343)
        ^ (y as u32).wrapping_mul(0xd816_3841)
        ^ (z as u32).wrapping_mul(0xcb1a_b31f);
    h ^= h >> 13;
    h = h.wrapping_mul(0x5bd1_e995);
    h ^ (h >> 15)
}

/// Quintic smoothstep
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Dot product with one of 12 cube-edge gradients selected by the hash
fn grad3(hash: u32, x: f32, y: f32, z: f32) -> f32 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}

/// 3D gradient noise, roughly in [-1, 1] and exactly zero on integer lattice points
pub fn basic_noise(x: f32, y: f32, z: f32) -> f32 {
    let (xf, yf, zf) = (x.floor(), y.floor(), z.floor());
    let (xi, yi, zi) = (xf as i32, yf as i32, zf as i32);
    let (fx, fy, fz) = (x - xf, y - yf, z - zf);
    let (u, v, w) = (fade(fx), fade(fy), fade(fz));

    let corner = |dx: i32, dy: i32, dz: i32| {
        grad3(
            hash3(xi + dx, yi + dy, zi + dz),
            fx - dx as f32,
            fy - dy as f32,
            fz - dz as f32,
        )
    };

    let x00 = lerp(corner(0, 0, 0), corner(1, 0, 0), u);
    let x10 = lerp(corner(0, 1, 0), corner(1, 1, 0), u);
    let x01 = lerp(corner(0, 0, 1), corner(1, 0, 1), u);
    let x11 = lerp(corner(0, 1, 1), corner(1, 1, 1), u);
    lerp(lerp(x00, x10, v), lerp(x01, x11, v), w)
}

/// 1D gradient noise in roughly [-1, 1]; a positive `period` tiles the lattice
fn gradient_1d(x: f32, period: i32) -> f32 {
    let xf = x.floor();
    let mut i0 = xf as i32;
    let mut i1 = i0 + 1;
    if period > 0 {
        i0 = i0.rem_euclid(period);
        i1 = i1.rem_euclid(period);
    }
    let f = x - xf;
    let slope = |i: i32| (hash3(i, 0, 0) & 0xffff) as f32 / 32767.5 - 1.0;
    // Max magnitude of the 1D blend is 0.5
    2.0 * lerp(slope(i0) * f, slope(i1) * (f - 1.0), fade(f))
}

/// Fractal 1D noise normalized to [0, 1]
pub fn complex_noise(x: f32, octaves: u32, persistence: f32, period: i32) -> f32 {
    let octaves = octaves.max(1);
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut max_amplitude = 0.0;
    let mut frequency = 1.0;
    for octave in 0..octaves {
        let octave_period = if period > 0 {
            period.saturating_mul(1 << octave.min(16))
        } else {
            0
        };
        total += gradient_1d(x * frequency, octave_period) * amplitude;
        max_amplitude += amplitude;
        amplitude *= persistence;
        frequency *= 2.0;
    }
    if max_amplitude <= 0.0 {
        return 0.5;
    }
    ((total / max_amplitude + 1.0) * 0.5).clamp(0.0, 1.0)
}

/// A noise-driven value: `base + (2 * noise(x * scale) - 1) * amplitude`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseDescriptor {
    pub base: f32,
    pub scale: f32,
    pub amplitude: f32,
    pub persistence: f32,
    pub period: i32,
    pub octaves: u32,
}

impl Default for NoiseDescriptor {
    fn default() -> Self {
        Self {
            base: 0.0,
            scale: 1.0,
            amplitude: 1.0,
            persistence: 0.5,
            period: 0,
            octaves: 1,
        }
    }
}

impl NoiseDescriptor {
    pub fn evaluate(&self, x: f32) -> f32 {
        let n = complex_noise(x * self.scale, self.octaves, self.persistence, self.period);
        self.base + (2.0 * n - 1.0) * self.amplitude
    }
}
