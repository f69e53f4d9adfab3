use std::f64::consts::PI;

/// Progress curve for a tween. Scripts name these in snake_case.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    /// Constant rate.
    Linear,
    /// Slow start (power 2).
    InQuad,
    /// Slow finish (power 2). Fade-ins of text and overlays use this.
    OutQuad,
    /// Slow start and finish (power 2). Scene containers and the mixer default to it.
    #[default]
    InOutQuad,
    /// Slow start (power 3).
    InCubic,
    /// Slow finish (power 3).
    OutCubic,
    /// Slow start and finish (power 3).
    InOutCubic,
    /// Half-cosine; the breathing and sway loops ride on it.
    InOutSine,
}

impl Ease {
    /// Maps progress `t` to eased progress. `t` is clamped to `[0, 1]` first, so both
    /// endpoints are exact for every curve.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => power_in(t, 2),
            Self::OutQuad => power_out(t, 2),
            Self::InOutQuad => power_in_out(t, 2),
            Self::InCubic => power_in(t, 3),
            Self::OutCubic => power_out(t, 3),
            Self::InOutCubic => power_in_out(t, 3),
            Self::InOutSine => 0.5 - 0.5 * (PI * t).cos(),
        }
    }
}

fn power_in(t: f64, n: i32) -> f64 {
    t.powi(n)
}

fn power_out(t: f64, n: i32) -> f64 {
    1.0 - (1.0 - t).powi(n)
}

// Mirrored halves meet at (0.5, 0.5).
fn power_in_out(t: f64, n: i32) -> f64 {
    if t < 0.5 {
        power_in(2.0 * t, n) / 2.0
    } else {
        0.5 + power_out(2.0 * t - 1.0, n) / 2.0
    }
}

/// Interpolates from `a` to `b`; `t` is already eased.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
