use std::collections::{BTreeMap, HashMap};

use crate::animation::ease::Ease;
use crate::animation::tween::{TweenId, Tweener};
use crate::assets::catalog::{AssetCatalog, AssetKind};
use crate::audio::backend::{AudioBackend, ClipId, PlaybackError};
use crate::foundation::core::{Time, is_unit_interval, is_valid_duration};
use crate::foundation::error::{ReverieError, ReverieResult};

/// Independently gained mixer channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Single-instance music slot.
    Music,
    /// Layered looping beds.
    Ambience,
    /// Fire-and-forget effects.
    Sfx,
}

/// Channel gains and fade defaults.
///
/// Gains scale every clip of a channel and default to unity; the per-cue loudness defaults live
/// in the `*_volume` fields.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MixerTuning {
    /// Music channel gain.
    pub music_gain: f64,
    /// Ambience channel gain.
    pub ambience_gain: f64,
    /// Sfx channel gain.
    pub sfx_gain: f64,
    /// Music clip volume when a cue gives none.
    pub music_volume: f64,
    /// Ambience clip volume when a cue gives none.
    pub ambience_volume: f64,
    /// Sfx clip volume when a cue gives none.
    pub sfx_volume: f64,
    /// Default music crossfade, in seconds.
    pub music_fade: f64,
    /// Default ambience fade-in, in seconds.
    pub ambience_fade: f64,
    /// Default ambience fade-out, in seconds.
    pub ambience_fade_out: f64,
    /// Easing used by every mixer fade.
    pub ease: Ease,
}

impl Default for MixerTuning {
    fn default() -> Self {
        Self {
            music_gain: 1.0,
            ambience_gain: 1.0,
            sfx_gain: 1.0,
            music_volume: 0.4,
            ambience_volume: 0.15,
            sfx_volume: 0.6,
            music_fade: 2.0,
            ambience_fade: 2.0,
            ambience_fade_out: 1.0,
            ease: Ease::InOutQuad,
        }
    }
}

impl MixerTuning {
    /// Check gains and fade durations.
    pub fn validate(&self) -> ReverieResult<()> {
        for (name, v) in [
            ("music_gain", self.music_gain),
            ("ambience_gain", self.ambience_gain),
            ("sfx_gain", self.sfx_gain),
            ("music_volume", self.music_volume),
            ("ambience_volume", self.ambience_volume),
            ("sfx_volume", self.sfx_volume),
        ] {
            if !is_unit_interval(v) {
                return Err(ReverieError::validation(format!(
                    "tuning.mixer.{name} must be in [0, 1]"
                )));
            }
        }
        for (name, v) in [
            ("music_fade", self.music_fade),
            ("ambience_fade", self.ambience_fade),
            ("ambience_fade_out", self.ambience_fade_out),
        ] {
            if !is_valid_duration(v) {
                return Err(ReverieError::validation(format!(
                    "tuning.mixer.{name} must be finite and >= 0"
                )));
            }
        }
        Ok(())
    }
}

/// Ambience request recorded while playback is blocked before the first gesture.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingPlayback {
    /// Logical ambience name.
    pub name: String,
    /// Target clip volume.
    pub volume: f64,
    /// Fade-in duration in seconds.
    pub fade: f64,
}

#[derive(Clone, Debug)]
struct Clip {
    id: ClipId,
    name: String,
    channel: Channel,
    // Set while the clip fades toward silence and is released when the tween completes.
    release: Option<TweenId>,
}

/// Layered audio mixer with music, ambience and sfx channels.
///
/// Every clip volume is tweened as a clip level in `[0, 1]`; the backend receives
/// `level × channel gain` after each [`AudioLayerMixer::advance`]. Recoverable playback failures
/// never surface to callers: they are logged, and blocked ambience requests are queued until the
/// first user gesture.
#[derive(Debug)]
pub struct AudioLayerMixer<B> {
    backend: B,
    catalog: AssetCatalog,
    tuning: MixerTuning,
    gains: HashMap<Channel, f64>,
    music: Option<Clip>,
    ambience: BTreeMap<String, Clip>,
    retiring: Vec<Clip>,
    pending: Vec<PendingPlayback>,
    gesture_seen: bool,
    levels: Tweener<ClipId>,
}

impl<B: AudioBackend> AudioLayerMixer<B> {
    /// Create a mixer on top of `backend`.
    pub fn new(backend: B, catalog: AssetCatalog, tuning: MixerTuning) -> Self {
        let gains = HashMap::from([
            (Channel::Music, tuning.music_gain),
            (Channel::Ambience, tuning.ambience_gain),
            (Channel::Sfx, tuning.sfx_gain),
        ]);
        Self {
            backend,
            catalog,
            tuning,
            gains,
            music: None,
            ambience: BTreeMap::new(),
            retiring: Vec::new(),
            pending: Vec::new(),
            gesture_seen: false,
            levels: Tweener::new(),
        }
    }

    /// Mixer tuning in effect.
    pub fn tuning(&self) -> &MixerTuning {
        &self.tuning
    }

    /// Asset tables used for name resolution.
    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    /// Underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Underlying backend, mutably. The voice player shares it.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Start `name` as the music track, crossfading out whatever played before.
    ///
    /// A second call before the first fade finishes supersedes it: the clip that was fading in is
    /// retargeted to silence and released when it gets there.
    #[tracing::instrument(skip(self))]
    pub fn play_music(&mut self, name: &str, volume: f64, fade: f64) {
        let path = self.catalog.resolve(AssetKind::Music, name);
        let id = match self.backend.play(&path, true, 0.0) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(%name, %path, error = %err, "music playback failed");
                return;
            }
        };

        if let Some(old) = self.music.take() {
            self.retire(old, fade);
        }

        tracing::info!(%name, %path, volume, fade, "music started");
        self.levels.set(id, 0.0);
        self.levels
            .to(id, volume.clamp(0.0, 1.0), fade, self.tuning.ease, 0.0);
        self.music = Some(Clip {
            id,
            name: name.to_owned(),
            channel: Channel::Music,
            release: None,
        });
    }

    /// Start (or retarget) a looping ambience bed.
    ///
    /// Re-requesting a bed that is already playing fades it to the new volume instead of starting
    /// a second loop. A bed that is fading out is left to finish and a fresh loop starts.
    pub fn play_ambience(&mut self, name: &str, volume: f64, fade: f64) {
        let volume = volume.clamp(0.0, 1.0);
        if let Some(clip) = self.ambience.get_mut(name) {
            if clip.release.is_none() {
                tracing::debug!(%name, volume, fade, "ambience retargeted");
                self.levels.to(clip.id, volume, fade, self.tuning.ease, 0.0);
                return;
            }
            if let Some(old) = self.ambience.remove(name) {
                self.retiring.push(old);
            }
        }

        let path = self.catalog.resolve(AssetKind::Ambience, name);
        match self.backend.play(&path, true, 0.0) {
            Ok(id) => {
                tracing::debug!(%name, %path, volume, fade, "ambience started");
                self.levels.set(id, 0.0);
                self.levels.to(id, volume, fade, self.tuning.ease, 0.0);
                self.ambience.insert(
                    name.to_owned(),
                    Clip {
                        id,
                        name: name.to_owned(),
                        channel: Channel::Ambience,
                        release: None,
                    },
                );
            }
            Err(PlaybackError::Blocked) if !self.gesture_seen => {
                tracing::warn!(%name, %path, "ambience blocked; queued until first gesture");
                self.pending.push(PendingPlayback {
                    name: name.to_owned(),
                    volume,
                    fade,
                });
            }
            Err(err) => {
                tracing::warn!(%name, %path, error = %err, "ambience playback failed");
            }
        }
    }

    /// Fade a bed to silence, then release it. No-op when `name` is not active.
    pub fn fade_out_ambience(&mut self, name: &str, fade: f64) {
        let Some(clip) = self.ambience.get_mut(name) else {
            tracing::debug!(%name, "fade-out requested for inactive ambience");
            return;
        };
        let tween = self.levels.to(clip.id, 0.0, fade, self.tuning.ease, 0.0);
        clip.release = Some(tween);
    }

    /// Fire a one-shot effect at `volume`. Failures are logged and otherwise ignored.
    pub fn play_sfx(&mut self, name: &str, volume: f64) {
        let path = self.catalog.resolve(AssetKind::Sfx, name);
        let effective = volume.clamp(0.0, 1.0) * self.gain(Channel::Sfx);
        if let Err(err) = self.backend.play(&path, false, effective) {
            tracing::warn!(%name, %path, error = %err, "sfx playback failed");
        }
    }

    /// Fade the current music to `volume` without releasing it.
    pub fn duck_music(&mut self, volume: f64, fade: f64) {
        if let Some(clip) = &self.music {
            self.levels
                .to(clip.id, volume.clamp(0.0, 1.0), fade, self.tuning.ease, 0.0);
        }
    }

    /// Stop the music slot immediately, including clips still fading out.
    pub fn stop_music(&mut self) {
        if let Some(clip) = self.music.take() {
            self.release_now(&clip);
        }
        let (music, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.retiring)
            .into_iter()
            .partition(|c| c.channel == Channel::Music);
        self.retiring = rest;
        for clip in music {
            self.release_now(&clip);
        }
    }

    /// Stop everything immediately and forget queued requests.
    pub fn stop_all(&mut self) {
        self.stop_music();
        for (_, clip) in std::mem::take(&mut self.ambience) {
            self.release_now(&clip);
        }
        for clip in std::mem::take(&mut self.retiring) {
            self.release_now(&clip);
        }
        self.pending.clear();
        tracing::info!("stopped all audio");
    }

    /// Change a channel gain; applied on the next [`AudioLayerMixer::advance`].
    pub fn set_channel_gain(&mut self, channel: Channel, gain: f64) {
        self.gains.insert(channel, gain.clamp(0.0, 1.0));
    }

    /// Current gain of `channel`.
    pub fn gain(&self, channel: Channel) -> f64 {
        self.gains.get(&channel).copied().unwrap_or(1.0)
    }

    /// Record a qualifying user gesture.
    ///
    /// The first call replays every queued ambience request in FIFO order and clears the queue;
    /// later calls do nothing.
    pub fn on_user_gesture(&mut self) {
        if self.gesture_seen {
            return;
        }
        self.gesture_seen = true;
        let queued = std::mem::take(&mut self.pending);
        if !queued.is_empty() {
            tracing::info!(count = queued.len(), "replaying blocked ambience");
        }
        for req in queued {
            self.play_ambience(&req.name, req.volume, req.fade);
        }
    }

    /// Return `true` once a gesture has been observed.
    pub fn gesture_seen(&self) -> bool {
        self.gesture_seen
    }

    /// Advance fades to `now`, release silenced clips and push volumes to the backend.
    ///
    /// Returns clips that ended naturally but are not owned by the mixer (the voice message),
    /// so their owner can react.
    pub fn advance(&mut self, now: Time) -> Vec<ClipId> {
        self.backend.advance(now);

        for done in self.levels.advance(now) {
            if let Some(pos) = self.retiring.iter().position(|c| c.id == done.key) {
                let clip = self.retiring.swap_remove(pos);
                tracing::debug!(name = %clip.name, "faded clip released");
                self.release_now(&clip);
                continue;
            }
            let released = self
                .ambience
                .iter()
                .find(|(_, c)| c.release == Some(done.id))
                .map(|(name, _)| name.clone());
            if let Some(name) = released
                && let Some(clip) = self.ambience.remove(&name)
            {
                tracing::debug!(%name, "ambience faded out");
                self.release_now(&clip);
            }
        }

        let mut foreign = Vec::new();
        for id in self.backend.drain_ended() {
            if !self.forget_ended(id) {
                foreign.push(id);
            }
        }

        self.push_volumes();
        foreign
    }

    /// Name of the current music track.
    pub fn music_name(&self) -> Option<&str> {
        self.music.as_ref().map(|c| c.name.as_str())
    }

    /// Clip level of the current music track.
    pub fn music_level(&self) -> Option<f64> {
        self.music.as_ref().and_then(|c| self.levels.value(&c.id))
    }

    /// Number of music clips (current and fading out) whose level is above zero.
    pub fn audible_music_count(&self) -> usize {
        self.music
            .iter()
            .chain(self.retiring.iter().filter(|c| c.channel == Channel::Music))
            .filter(|c| self.levels.value(&c.id).is_some_and(|v| v > 0.0))
            .count()
    }

    /// Names of retained ambience beds, including ones fading out.
    pub fn ambience_names(&self) -> Vec<&str> {
        self.ambience.keys().map(String::as_str).collect()
    }

    /// Return `true` when `name` is a retained ambience bed.
    pub fn is_ambience_active(&self, name: &str) -> bool {
        self.ambience.contains_key(name)
    }

    /// Clip level of a retained ambience bed.
    pub fn ambience_level(&self, name: &str) -> Option<f64> {
        self.ambience
            .get(name)
            .and_then(|c| self.levels.value(&c.id))
    }

    /// Blocked requests awaiting the first gesture.
    pub fn pending(&self) -> &[PendingPlayback] {
        &self.pending
    }

    fn retire(&mut self, mut clip: Clip, fade: f64) {
        let tween = self.levels.to(clip.id, 0.0, fade, self.tuning.ease, 0.0);
        clip.release = Some(tween);
        self.retiring.push(clip);
    }

    fn release_now(&mut self, clip: &Clip) {
        self.levels.remove(&clip.id);
        self.backend.stop(clip.id);
    }

    fn forget_ended(&mut self, id: ClipId) -> bool {
        let mut owned = false;
        if self.music.as_ref().is_some_and(|c| c.id == id) {
            self.music = None;
            owned = true;
        }
        let before = self.ambience.len() + self.retiring.len();
        self.ambience.retain(|_, c| c.id != id);
        self.retiring.retain(|c| c.id != id);
        owned |= before != self.ambience.len() + self.retiring.len();
        self.levels.remove(&id);
        owned
    }

    fn push_volumes(&mut self) {
        let clips = self
            .music
            .iter()
            .chain(self.ambience.values())
            .chain(self.retiring.iter());
        for clip in clips {
            let level = self.levels.value(&clip.id).unwrap_or(0.0);
            let gain = self.gains.get(&clip.channel).copied().unwrap_or(1.0);
            self.backend.set_volume(clip.id, level * gain);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mixer.rs"]
mod tests;
