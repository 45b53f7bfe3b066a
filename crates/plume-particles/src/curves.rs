//! Value-over-lifetime shapes: piecewise linear curves and color gradients

use plume_core::Color;
use serde::{Deserialize, Serialize};

/// Linear interpolation between two floats
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// A piecewise linear curve over keys sorted by x.
///
/// Outside the key range the curve holds the first/last value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    keys: Vec<[f32; 2]>,
}

impl Curve {
    pub fn new(mut keys: Vec<[f32; 2]>) -> Self {
        keys.sort_by(|a, b| a[0].total_cmp(&b[0]));
        Self { keys }
    }

    /// A two-key curve from (0, start) to (1, end)
    pub fn linear(start: f32, end: f32) -> Self {
        Self::new(vec![[0.0, start], [1.0, end]])
    }

    pub fn keys(&self) -> &[[f32; 2]] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn evaluate(&self, x: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 1.0;
        };
        if x <= first[0] || self.keys.len() == 1 {
            return first[1];
        }
        if x >= last[0] {
            return last[1];
        }
        // NaN input or keys fall through both bounds checks
        let upper = self.keys.partition_point(|k| k[0] <= x).clamp(1, self.keys.len() - 1);
        let a = self.keys[upper - 1];
        let b = self.keys[upper];
        let span = b[0] - a[0];
        if span <= 0.0 {
            return b[1];
        }
        lerp_f32(a[1], b[1], (x - a[0]) / span)
    }
}

/// A color stop on a gradient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub position: f32,
    pub color: Color,
}

/// Color over normalized particle life
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    stops: Vec<GradientStop>,
}

impl Gradient {
    pub fn new(mut stops: Vec<GradientStop>) -> Self {
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));
        Self { stops }
    }

    /// Two-stop gradient from `start` at 0 to `end` at 1
    pub fn linear(start: Color, end: Color) -> Self {
        Self::new(vec![
            GradientStop {
                position: 0.0,
                color: start,
            },
            GradientStop {
                position: 1.0,
                color: end,
            },
        ])
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    pub fn evaluate(&self, t: f32) -> Color {
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return Color::WHITE;
        };
        if t <= first.position || self.stops.len() == 1 {
            return first.color;
        }
        if t >= last.position {
            return last.color;
        }
        let upper = self
            .stops
            .partition_point(|s| s.position <= t)
            .clamp(1, self.stops.len() - 1);
        let a = &self.stops[upper - 1];
        let b = &self.stops[upper];
        let span = b.position - a.position;
        if span <= 0.0 {
            return b.color;
        }
        a.color.lerp(&b.color, (t - a.position) / span)
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Self::linear(Color::WHITE, Color::TRANSPARENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_never_indexes_out_of_range() {
        let curve = Curve::new(vec![[-f32::NAN, 5.0], [0.0, 1.0], [1.0, 3.0]]);
        let _ = curve.evaluate(0.5);
        let _ = Curve::linear(0.0, 2.0).evaluate(f32::NAN);
        let _ = Gradient::default().evaluate(f32::NAN);
        assert_eq!(Curve::new(vec![[0.5, 7.0]]).evaluate(f32::NAN), 7.0);
        let single = Gradient::new(vec![GradientStop {
            position: 0.5,
            color: Color::WHITE,
        }]);
        assert_eq!(single.evaluate(f32::NAN), Color::WHITE);
    }

    #[test]
    fn lerp_f32_endpoints() {
        assert!((lerp_f32(0.0, 10.0, 0.0) - 0.0).abs() < 1e-6);
        assert!((lerp_f32(0.0, 10.0, 1.0) - 10.0).abs() < 1e-6);
        assert!((lerp_f32(0.0, 10.0, 0.5) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn curve_interpolates_and_clamps() {
        let curve = Curve::new(vec![[1.0, 0.0], [0.0, 2.0], [0.5, 1.0]]);
        assert_eq!(curve.keys()[0], [0.0, 2.0]);
        assert!((curve.evaluate(0.25) - 1.5).abs() < 1e-6);
        assert!((curve.evaluate(0.75) - 0.5).abs() < 1e-6);
        assert_eq!(curve.evaluate(-1.0), 2.0);
        assert_eq!(curve.evaluate(3.0), 0.0);
    }

    #[test]
    fn empty_curve_is_neutral() {
        assert_eq!(Curve::default().evaluate(0.3), 1.0);
    }

    #[test]
    fn gradient_midpoint() {
        let white = Color::new(1.0, 1.0, 1.0, 1.0);
        let black = Color::new(0.0, 0.0, 0.0, 0.0);
        let mid = Gradient::linear(white, black).evaluate(0.5);
        for c in mid.to_array() {
            assert!((c - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn default_gradient_fades_out() {
        let g = Gradient::default();
        assert_eq!(g.evaluate(0.0).a, 1.0);
        assert_eq!(g.evaluate(1.0).a, 0.0);
    }
}
