use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::animation::sway::ParallaxTuning;
use crate::assets::catalog::AssetCatalog;
use crate::audio::mixer::MixerTuning;
use crate::audio::voice::VoiceTuning;
use crate::foundation::core::{is_unit_interval, is_valid_duration};
use crate::foundation::error::{ReverieError, ReverieResult};
use crate::input::blow::BlowTuning;
use crate::visual::crossfade::CrossfadeTuning;
use crate::visual::particles::{ParticleMode, ParticleTuning};
use crate::visual::text::TextTuning;

/// A whole scripted experience: scenes, asset tables and tuning.
///
/// This is the JSON-facing, hand-edited representation. Load it with [`Script::from_path`] (or
/// [`Script::from_reader`] / [`Script::from_json_str`]) and check it with [`Script::validate`]
/// before handing it to a [`crate::Director`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Script {
    /// Key of the first scene.
    pub start: String,
    /// Scenes in authoring order.
    pub scenes: Vec<SceneDef>,
    /// Logical asset name tables.
    #[serde(default)]
    pub assets: AssetCatalog,
    /// Timing and level constants.
    #[serde(default)]
    pub tuning: Tuning,
}

/// One scene: its background layers, its beat list and what follows it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneDef {
    /// Stable scene key.
    pub key: String,
    /// Folder holding the scene's background images.
    pub image_folder: String,
    /// Background shown on every layer when the scene is entered.
    pub initial_image: String,
    /// Depth coefficient per background layer, back to front.
    pub layers: Vec<f64>,
    /// Container fade-in when entered; falls back to `tuning.scene.enter`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enter_sec: Option<f64>,
    /// Beats, run strictly in order.
    #[serde(default)]
    pub beats: Vec<Beat>,
    /// What happens after the last beat.
    #[serde(default)]
    pub next: Continuation,
}

/// One step of a scene script.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Beat {
    /// Run an effect and move on immediately.
    Cue(Cue),
    /// Wait this many seconds.
    Wait(f64),
    /// Show the continue affordance and wait for the user.
    AwaitContinue,
    /// Wait until the named signal is raised (`blow`, `voice_completed`, or host-defined).
    AwaitSignal(String),
}

/// Side effect triggered by a [`Beat::Cue`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// Show a line of narrative text.
    Text {
        /// The line, possibly with inline markup.
        text: String,
        /// Explicit hold in milliseconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hold_ms: Option<f64>,
    },
    /// Crossfade the current scene's layers to another image.
    Image {
        /// Image name inside the scene folder.
        image: String,
    },
    /// Start a music track.
    Music {
        /// Logical name.
        name: String,
        /// Clip volume.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        volume: Option<f64>,
        /// Crossfade in seconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fade: Option<f64>,
    },
    /// Start or retarget an ambience bed.
    Ambience {
        /// Logical name.
        name: String,
        /// Clip volume.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        volume: Option<f64>,
        /// Fade-in in seconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fade: Option<f64>,
    },
    /// Fade out an ambience bed.
    FadeOutAmbience {
        /// Logical name.
        name: String,
        /// Fade-out in seconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fade: Option<f64>,
    },
    /// Fire a sound effect.
    Sfx {
        /// Logical name.
        name: String,
        /// Clip volume.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        volume: Option<f64>,
    },
    /// Stop the music immediately.
    StopMusic,
    /// Stop all audio immediately.
    StopAll,
    /// Fade the music to a level without stopping it.
    DuckMusic {
        /// Target clip volume.
        volume: f64,
        /// Fade in seconds.
        fade: f64,
    },
    /// Switch the particle effect.
    Particles {
        /// New mode.
        mode: ParticleMode,
    },
    /// Spawn particles at once.
    Burst {
        /// Particle count.
        count: usize,
    },
    /// Start blow detection; completion raises the `blow` signal.
    BlowDetection,
    /// Show the voice message player; its first full listen raises `voice_completed`.
    VoicePlayer {
        /// Logical voice asset name.
        name: String,
    },
    /// Forward a host-defined event.
    Emit {
        /// Event name.
        event: String,
    },
}

/// What follows a scene's last beat.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Continuation {
    /// Enter the named scene right away.
    Auto(String),
    /// Show the continue affordance, then enter the named scene.
    AwaitContinue(String),
    /// The experience ends here.
    #[default]
    End,
}

impl Continuation {
    /// Target scene key, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Auto(k) | Self::AwaitContinue(k) => Some(k),
            Self::End => None,
        }
    }
}

/// Scene container timing.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SceneTuning {
    /// Default container crossfade when entering a scene, in seconds.
    pub enter: f64,
    /// Continue affordance fade-in, in seconds.
    pub continue_fade_in: f64,
    /// Continue affordance fade-out, in seconds.
    pub continue_fade_out: f64,
}

impl Default for SceneTuning {
    fn default() -> Self {
        Self {
            enter: 2.0,
            continue_fade_in: 1.0,
            continue_fade_out: 0.5,
        }
    }
}

/// Every tunable constant, grouped by component.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Audio mixer.
    pub mixer: MixerTuning,
    /// Voice message player.
    pub voice: VoiceTuning,
    /// Text presenter.
    pub text: TextTuning,
    /// Image crossfader.
    pub crossfade: CrossfadeTuning,
    /// Scene containers and continue affordance.
    pub scene: SceneTuning,
    /// Blow detector.
    pub blow: BlowTuning,
    /// Particle field.
    pub particles: ParticleTuning,
    /// Pointer parallax.
    pub parallax: ParallaxTuning,
}

impl Tuning {
    /// Validate every section.
    pub fn validate(&self) -> ReverieResult<()> {
        self.mixer.validate()?;
        self.voice.validate()?;
        self.text.validate()?;
        self.crossfade.validate()?;
        for (name, v) in [
            ("enter", self.scene.enter),
            ("continue_fade_in", self.scene.continue_fade_in),
            ("continue_fade_out", self.scene.continue_fade_out),
        ] {
            if !is_valid_duration(v) {
                return Err(ReverieError::validation(format!(
                    "tuning.scene.{name} must be finite and >= 0"
                )));
            }
        }
        self.blow.validate()?;
        self.particles.validate()?;
        self.parallax.validate()
    }
}

impl Script {
    /// Parse a script from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReverieResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| ReverieError::serde(format!("parse script JSON: {e}")))
    }

    /// Parse a script from a JSON string.
    pub fn from_json_str(s: &str) -> ReverieResult<Self> {
        serde_json::from_str(s).map_err(|e| ReverieError::serde(format!("parse script JSON: {e}")))
    }

    /// Parse a script from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ReverieResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReverieError::validation(format!("open script JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> ReverieResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up a scene by key.
    pub fn scene(&self, key: &str) -> Option<&SceneDef> {
        self.scenes.iter().find(|s| s.key == key)
    }

    /// Check structure, references and value ranges.
    pub fn validate(&self) -> ReverieResult<()> {
        if self.scenes.is_empty() {
            return Err(ReverieError::validation("script must contain at least one scene"));
        }

        let mut keys = BTreeSet::new();
        for scene in &self.scenes {
            if scene.key.trim().is_empty() {
                return Err(ReverieError::validation("scene keys must be non-empty"));
            }
            if !keys.insert(scene.key.as_str()) {
                return Err(ReverieError::validation(format!(
                    "duplicate scene key '{}'",
                    scene.key
                )));
            }
        }

        if !keys.contains(self.start.as_str()) {
            return Err(ReverieError::validation(format!(
                "start scene '{}' is not defined",
                self.start
            )));
        }

        for scene in &self.scenes {
            scene.validate()?;
            if let Some(target) = scene.next.target()
                && !keys.contains(target)
            {
                return Err(ReverieError::validation(format!(
                    "scene '{}' continues to unknown scene '{target}'",
                    scene.key
                )));
            }
        }

        self.check_instant_cycles()?;
        self.assets.validate()?;
        self.tuning.validate()
    }

    // A loop of automatic continuations through scenes that take no time would never yield.
    fn check_instant_cycles(&self) -> ReverieResult<()> {
        let instant = |scene: &SceneDef| {
            scene.enter_sec.unwrap_or(self.tuning.scene.enter) <= 0.0
                && scene.beats.iter().all(|beat| match beat {
                    Beat::Cue(_) => true,
                    Beat::Wait(sec) => *sec <= 0.0,
                    Beat::AwaitContinue | Beat::AwaitSignal(_) => false,
                })
        };
        for first in &self.scenes {
            let mut path = vec![first.key.as_str()];
            let mut scene = first;
            while instant(scene) {
                let Continuation::Auto(next) = &scene.next else {
                    break;
                };
                let Some(next_scene) = self.scene(next) else {
                    break;
                };
                path.push(next.as_str());
                if next_scene.key == first.key {
                    return Err(ReverieError::validation(format!(
                        "scenes {} chain automatically without taking any time",
                        path.join(" -> ")
                    )));
                }
                if path.len() > self.scenes.len() {
                    break;
                }
                scene = next_scene;
            }
        }
        Ok(())
    }
}

impl SceneDef {
    /// Check layers, timings and cue values of this scene.
    pub fn validate(&self) -> ReverieResult<()> {
        let key = &self.key;
        if self.image_folder.trim().is_empty() || self.initial_image.trim().is_empty() {
            return Err(ReverieError::validation(format!(
                "scene '{key}' needs an image_folder and an initial_image"
            )));
        }
        if self.layers.is_empty() {
            return Err(ReverieError::validation(format!(
                "scene '{key}' needs at least one layer"
            )));
        }
        if let Some(i) = self.layers.iter().position(|d| !is_unit_interval(*d)) {
            return Err(ReverieError::validation(format!(
                "scene '{key}' layer {i} depth must be in [0, 1]"
            )));
        }
        if let Some(enter) = self.enter_sec
            && !is_valid_duration(enter)
        {
            return Err(ReverieError::validation(format!(
                "scene '{key}' enter_sec must be finite and >= 0"
            )));
        }

        for (i, beat) in self.beats.iter().enumerate() {
            let at = || format!("scene '{key}' beat {i}");
            match beat {
                Beat::Wait(sec) if !is_valid_duration(*sec) => {
                    return Err(ReverieError::validation(format!(
                        "{}: wait must be finite and >= 0",
                        at()
                    )));
                }
                Beat::AwaitSignal(name) if name.trim().is_empty() => {
                    return Err(ReverieError::validation(format!(
                        "{}: signal name must be non-empty",
                        at()
                    )));
                }
                Beat::Cue(cue) => cue.validate().map_err(|msg| {
                    ReverieError::validation(format!("{}: {msg}", at()))
                })?,
                _ => {}
            }
        }
        Ok(())
    }
}

impl Cue {
    fn validate(&self) -> Result<(), String> {
        let (volume, fade) = match self {
            Self::Music { volume, fade, .. } | Self::Ambience { volume, fade, .. } => {
                (*volume, *fade)
            }
            Self::FadeOutAmbience { fade, .. } => (None, *fade),
            Self::Sfx { volume, .. } => (*volume, None),
            Self::DuckMusic { volume, fade } => (Some(*volume), Some(*fade)),
            Self::Text {
                hold_ms: Some(ms), ..
            } if !is_valid_duration(*ms) => {
                return Err("text hold_ms must be finite and >= 0".to_owned());
            }
            _ => (None, None),
        };
        if let Some(v) = volume
            && !is_unit_interval(v)
        {
            return Err("volume must be in [0, 1]".to_owned());
        }
        if let Some(f) = fade
            && !is_valid_duration(f)
        {
            return Err("fade must be finite and >= 0".to_owned());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/model.rs"]
mod tests;
