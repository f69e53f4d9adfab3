use std::collections::BTreeMap;

use crate::animation::ease::Ease;
use crate::animation::tween::Tweener;
use crate::foundation::core::{Time, is_valid_duration};
use crate::foundation::error::{ReverieError, ReverieResult};
use crate::visual::layers::{LayerSet, Overlay};

/// Crossfade timing.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CrossfadeTuning {
    /// Overlay fade-in, in seconds.
    pub overlay_in: f64,
    /// Old image fade-out, in seconds.
    pub old_out: f64,
    /// Extra delay per layer index, in seconds.
    pub stagger: f64,
    /// Overlay easing.
    pub overlay_ease: Ease,
    /// Old image easing.
    pub old_ease: Ease,
}

impl Default for CrossfadeTuning {
    fn default() -> Self {
        Self {
            overlay_in: 1.4,
            old_out: 1.2,
            stagger: 0.05,
            overlay_ease: Ease::OutQuad,
            old_ease: Ease::InOutQuad,
        }
    }
}

impl CrossfadeTuning {
    /// Check durations.
    pub fn validate(&self) -> ReverieResult<()> {
        for (name, v) in [
            ("overlay_in", self.overlay_in),
            ("old_out", self.old_out),
            ("stagger", self.stagger),
        ] {
            if !is_valid_duration(v) {
                return Err(ReverieError::validation(format!(
                    "tuning.crossfade.{name} must be finite and >= 0"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Part {
    Base,
    Overlay,
}

type Key = (String, usize, Part);

/// A layer set finished crossfading to `image`.
#[derive(Clone, Debug, PartialEq)]
pub struct CrossfadeDone {
    /// Scene key of the set.
    pub scene: String,
    /// Image now committed on every layer.
    pub image: String,
}

/// Per-layer image crossfader for the registered scene layer sets.
///
/// A transition stacks an overlay with the new image above each layer and fades it in while the
/// old image fades out; the new image is committed when the old image's fade completes. While an
/// overlay exists the base opacity never drops below `1 - overlay opacity`, so no layer is ever
/// see-through mid-fade.
#[derive(Clone, Debug)]
pub struct ImageLayerCrossfader {
    tuning: CrossfadeTuning,
    sets: BTreeMap<String, LayerSet>,
    tweens: Tweener<Key>,
}

impl ImageLayerCrossfader {
    /// Create a crossfader with no layer sets.
    pub fn new(tuning: CrossfadeTuning) -> Self {
        Self {
            tuning,
            sets: BTreeMap::new(),
            tweens: Tweener::new(),
        }
    }

    /// Register (or replace) the layer set of `scene`.
    pub fn register(&mut self, scene: &str, folder: &str, depths: &[f64], image: &str) {
        self.tweens.kill_where(|k| k.0 == scene);
        self.sets
            .insert(scene.to_owned(), LayerSet::new(folder, depths, image));
    }

    /// Layer set of `scene`.
    pub fn layer_set(&self, scene: &str) -> Option<&LayerSet> {
        self.sets.get(scene)
    }

    /// Return `true` while any layer of `scene` has an overlay.
    pub fn is_transitioning(&self, scene: &str) -> bool {
        self.sets
            .get(scene)
            .is_some_and(|s| s.layers.iter().any(|l| l.overlay.is_some()))
    }

    /// Show `image` on every layer of `scene` immediately, dropping any crossfade.
    pub fn set_image(&mut self, scene: &str, image: &str) -> ReverieResult<()> {
        let set = self
            .sets
            .get_mut(scene)
            .ok_or_else(|| unknown_scene(scene))?;
        self.tweens.kill_where(|k| k.0 == scene);
        set.set_all(image);
        Ok(())
    }

    /// Crossfade every layer of `scene` to `image`.
    ///
    /// A layer still mid-crossfade first commits its pending overlay image at full opacity, so
    /// the newest request always owns the end state.
    pub fn transition(&mut self, scene: &str, image: &str) -> ReverieResult<()> {
        let set = self
            .sets
            .get_mut(scene)
            .ok_or_else(|| unknown_scene(scene))?;
        self.tweens.kill_where(|k| k.0 == scene);
        set.commit_all();

        let t = self.tuning;
        for (i, layer) in set.layers.iter_mut().enumerate() {
            layer.overlay = Some(Overlay {
                image: image.to_owned(),
                opacity: 0.0,
            });
            let delay = i as f64 * t.stagger;
            let base = (scene.to_owned(), i, Part::Base);
            let over = (scene.to_owned(), i, Part::Overlay);
            self.tweens.set(base.clone(), 1.0);
            self.tweens.set(over.clone(), 0.0);
            self.tweens.to(over, 1.0, t.overlay_in, t.overlay_ease, delay);
            self.tweens.to(base, 0.0, t.old_out, t.old_ease, delay);
        }
        tracing::debug!(%scene, %image, layers = set.layers.len(), "crossfade started");
        Ok(())
    }

    /// Stop any crossfade on `scene`, committing pending overlay images.
    pub fn cancel(&mut self, scene: &str) {
        self.tweens.kill_where(|k| k.0 == scene);
        if let Some(set) = self.sets.get_mut(scene) {
            set.commit_all();
        }
    }

    /// Advance fades to `now`, returning sets that finished crossfading.
    pub fn advance(&mut self, now: Time) -> Vec<CrossfadeDone> {
        let finished = self.tweens.advance(now);

        for (scene, set) in self.sets.iter_mut() {
            for (i, layer) in set.layers.iter_mut().enumerate() {
                let Some(overlay) = layer.overlay.as_mut() else {
                    continue;
                };
                if let Some(v) = self.tweens.value(&(scene.clone(), i, Part::Overlay)) {
                    overlay.opacity = v;
                }
                let base = self
                    .tweens
                    .value(&(scene.clone(), i, Part::Base))
                    .unwrap_or(layer.opacity);
                layer.opacity = base.max(1.0 - overlay.opacity);
            }
        }

        let mut done = Vec::new();
        for d in finished {
            let (scene, index, part) = d.key;
            if part != Part::Base {
                continue;
            }
            self.tweens.remove(&(scene.clone(), index, Part::Base));
            self.tweens.remove(&(scene.clone(), index, Part::Overlay));
            let Some(set) = self.sets.get_mut(&scene) else {
                continue;
            };
            set.commit_layer(index);
            if let Some(image) = set.current_image() {
                tracing::debug!(%scene, %image, "crossfade committed");
                done.push(CrossfadeDone {
                    image: image.to_owned(),
                    scene,
                });
            }
        }
        done
    }
}

fn unknown_scene(scene: &str) -> ReverieError {
    ReverieError::script(format!("no layer set registered for scene '{scene}'"))
}

#[cfg(test)]
#[path = "../../tests/unit/visual/crossfade.rs"]
mod tests;
