use crate::animation::ease::{Ease, lerp};
use crate::animation::tween::Tweener;
use crate::foundation::core::{Point, Time, Vec2, is_valid_duration};
use crate::foundation::error::{ReverieError, ReverieResult};

/// Viewport width under which layouts count as narrow (phones).
pub const NARROW_VIEWPORT_WIDTH: f64 = 768.0;

/// Layer depth assumed when a layer carries no usable coefficient.
pub const DEFAULT_DEPTH: f64 = 0.5;

/// Pointer parallax settings.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ParallaxTuning {
    /// Maximum displacement in pixels at depth 1 on wide viewports.
    pub scale: f64,
    /// Same, on narrow viewports.
    pub narrow_scale: f64,
    /// Glide duration toward a new target, in seconds.
    pub smoothing: f64,
}

impl Default for ParallaxTuning {
    fn default() -> Self {
        Self {
            scale: 30.0,
            narrow_scale: 15.0,
            smoothing: 1.5,
        }
    }
}

impl ParallaxTuning {
    /// Check scales and smoothing.
    pub fn validate(&self) -> ReverieResult<()> {
        let ok = self.scale.is_finite()
            && self.narrow_scale.is_finite()
            && is_valid_duration(self.smoothing);
        if !ok {
            return Err(ReverieError::validation(
                "tuning.parallax values must be finite and smoothing >= 0",
            ));
        }
        Ok(())
    }
}

/// Return `true` when `width` is a narrow viewport.
pub fn is_narrow(width: f64) -> bool {
    width < NARROW_VIEWPORT_WIDTH
}

/// Ambient transform of one layer at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwaySample {
    /// Uniform scale, `1.0` at rest.
    pub scale: f64,
    /// Rotation in degrees.
    pub rotation_deg: f64,
    /// Vertical float offset in pixels (narrow viewports only).
    pub float_y: f64,
}

/// Sample the breathing and swaying loops of layer `index` at `t` seconds.
///
/// Each loop is a sine-eased yoyo between the rest value and its target, with a period that grows
/// with the layer index so layers never move in lockstep.
pub fn ambient_sway(depth: f64, index: usize, t: f64, narrow: bool) -> SwaySample {
    let i = index as f64;
    let scale_target = if narrow {
        1.0 + depth * 0.04
    } else {
        1.0 + depth * 0.02
    };
    let rotation_target = if narrow {
        (depth - 0.5) * 1.2
    } else {
        (depth - 0.5) * 0.5
    };

    let float_y = if narrow {
        lerp(0.0, depth * 8.0, yoyo(t, 5.0 + i * 0.4))
    } else {
        0.0
    };

    SwaySample {
        scale: lerp(1.0, scale_target, yoyo(t, 3.0 + i * 0.5)),
        rotation_deg: lerp(0.0, rotation_target, yoyo(t, 4.0 + i * 0.3)),
        float_y,
    }
}

// Eased progress of an infinitely repeating yoyo loop; one leg lasts `period` seconds.
fn yoyo(t: f64, period: f64) -> f64 {
    if period <= 0.0 || !t.is_finite() || t <= 0.0 {
        return 0.0;
    }
    let phase = t / period;
    let leg = phase.floor();
    let mut frac = phase - leg;
    if (leg as u64) % 2 == 1 {
        frac = 1.0 - frac;
    }
    Ease::InOutSine.apply(frac)
}

/// Pointer displacement target for a layer: `delta × depth × scale`.
///
/// `delta` is the pointer position relative to the viewport centre, normalised to `[-1, 1]` on
/// each axis.
pub fn parallax_offset(pointer: Point, viewport: Vec2, depth: f64, movement_scale: f64) -> Vec2 {
    let cx = viewport.x / 2.0;
    let cy = viewport.y / 2.0;
    if cx <= 0.0 || cy <= 0.0 {
        return Vec2::ZERO;
    }
    let dx = (pointer.x - cx) / cx;
    let dy = (pointer.y - cy) / cy;
    Vec2::new(dx * depth * movement_scale, dy * depth * movement_scale)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Axis {
    X,
    Y,
}

/// Smoothed parallax offsets for one layer set.
///
/// Every pointer move retargets each layer's offset, and the offset glides there with an
/// out-quad ease. A newer move overwrites the glide in flight.
#[derive(Clone, Debug)]
pub struct ParallaxRig {
    depths: Vec<f64>,
    wide_scale: f64,
    narrow_scale: f64,
    smoothing: f64,
    offsets: Tweener<(usize, Axis)>,
}

impl ParallaxRig {
    /// Create a rig for layers with the given depth coefficients.
    pub fn new(depths: &[f64], tuning: ParallaxTuning) -> Self {
        let mut offsets = Tweener::new();
        for i in 0..depths.len() {
            offsets.set((i, Axis::X), 0.0);
            offsets.set((i, Axis::Y), 0.0);
        }
        Self {
            depths: depths
                .iter()
                .map(|d| if d.is_finite() { *d } else { DEFAULT_DEPTH })
                .collect(),
            wide_scale: tuning.scale,
            narrow_scale: tuning.narrow_scale,
            smoothing: tuning.smoothing,
            offsets,
        }
    }

    /// Retarget every layer toward the displacement implied by `pointer`.
    pub fn pointer_moved(&mut self, pointer: Point, viewport: Vec2) {
        let scale = if is_narrow(viewport.x) {
            self.narrow_scale
        } else {
            self.wide_scale
        };
        for (i, depth) in self.depths.iter().enumerate() {
            let target = parallax_offset(pointer, viewport, *depth, scale);
            self.offsets
                .to((i, Axis::X), target.x, self.smoothing, Ease::OutQuad, 0.0);
            self.offsets
                .to((i, Axis::Y), target.y, self.smoothing, Ease::OutQuad, 0.0);
        }
    }

    /// Advance the glide.
    pub fn advance(&mut self, now: Time) {
        self.offsets.advance(now);
    }

    /// Current offset of layer `index`.
    pub fn offset(&self, index: usize) -> Vec2 {
        Vec2::new(
            self.offsets.value(&(index, Axis::X)).unwrap_or(0.0),
            self.offsets.value(&(index, Axis::Y)).unwrap_or(0.0),
        )
    }

    /// Number of layers in the rig.
    pub fn len(&self) -> usize {
        self.depths.len()
    }

    /// Return `true` when the rig drives no layers.
    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/sway.rs"]
mod tests;
