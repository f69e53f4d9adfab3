use std::collections::{BTreeMap, BTreeSet};

use crate::foundation::core::Time;

/// Handle of one playing clip instance on a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId(pub u64);

/// Reasons a backend refuses or fails to play a clip.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum PlaybackError {
    /// The platform blocks audible playback until the first user gesture.
    #[error("playback blocked until a user gesture")]
    Blocked,
    /// The asset could not be loaded.
    #[error("audio asset not found: {path}")]
    Missing {
        /// Resolved asset path.
        path: String,
    },
    /// Any other platform failure.
    #[error("audio backend failure: {0}")]
    Backend(String),
}

/// Platform audio playback primitive consumed by the mixer and the voice player.
///
/// Volumes passed here are effective platform volumes in `[0, 1]`. Implementations own clip
/// resources and release them on [`AudioBackend::stop`].
pub trait AudioBackend {
    /// Start playing `path` from the beginning.
    fn play(&mut self, path: &str, looped: bool, volume: f64) -> Result<ClipId, PlaybackError>;
    /// Set the effective volume of a clip.
    fn set_volume(&mut self, clip: ClipId, volume: f64);
    /// Pause a clip, keeping its position.
    fn pause(&mut self, clip: ClipId);
    /// Resume a paused clip.
    fn resume(&mut self, clip: ClipId) -> Result<(), PlaybackError>;
    /// Move the playhead of a clip to `secs`.
    fn seek(&mut self, clip: ClipId, secs: f64);
    /// Playhead position in seconds.
    fn position(&self, clip: ClipId) -> f64;
    /// Clip length in seconds, once metadata is known.
    fn duration(&self, clip: ClipId) -> Option<f64>;
    /// Return `true` while the clip exists and is not paused.
    fn is_playing(&self, clip: ClipId) -> bool;
    /// Stop a clip and release its resources.
    fn stop(&mut self, clip: ClipId);
    /// Clips that reached their natural end since the last call.
    fn drain_ended(&mut self) -> Vec<ClipId>;
    /// Move a simulated playback clock. Platform backends track their own clock and ignore this.
    fn advance(&mut self, _now: Time) {}
}

/// Observable state of one clip inside [`InMemoryAudio`].
#[derive(Clone, Debug, PartialEq)]
pub struct ClipState {
    /// Path the clip was started from.
    pub path: String,
    /// Loop flag.
    pub looped: bool,
    /// Last effective volume pushed by the engine.
    pub volume: f64,
    /// Playhead in seconds.
    pub position: f64,
    /// Known length in seconds.
    pub duration: Option<f64>,
    /// Paused flag.
    pub paused: bool,
    /// Reached its natural end. Explicitly stopped clips are dropped instead.
    pub stopped: bool,
}

/// Call recorded by [`InMemoryAudio`].
#[derive(Clone, Debug, PartialEq)]
pub enum AudioCall {
    /// A clip started.
    Play {
        /// Assigned handle.
        clip: ClipId,
        /// Asset path.
        path: String,
        /// Loop flag.
        looped: bool,
    },
    /// A play request was refused.
    Rejected {
        /// Asset path.
        path: String,
        /// Failure returned to the caller.
        error: PlaybackError,
    },
    /// A clip was paused.
    Pause(ClipId),
    /// A clip was resumed.
    Resume(ClipId),
    /// A clip playhead moved.
    Seek(ClipId, f64),
    /// A clip was stopped.
    Stop(ClipId),
}

/// Recording backend for tests, headless simulation and debugging.
///
/// Clips advance with the simulated clock; a clip with a configured duration ends naturally
/// (or wraps when looping) and can be resumed from there. [`AudioBackend::stop`] releases the
/// clip for good, so a long simulation only keeps live and ended clips. Playback can be blocked
/// until [`InMemoryAudio::unlock`] and individual paths can be marked missing.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAudio {
    clips: BTreeMap<ClipId, ClipState>,
    calls: Vec<AudioCall>,
    blocked: bool,
    missing: BTreeSet<String>,
    durations: BTreeMap<String, f64>,
    ended: Vec<ClipId>,
    next_id: u64,
    now: Time,
}

impl InMemoryAudio {
    /// Create an unlocked backend with no missing assets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that refuses playback until [`InMemoryAudio::unlock`] is called.
    pub fn autoplay_blocked() -> Self {
        Self {
            blocked: true,
            ..Self::default()
        }
    }

    /// Lift the autoplay block.
    pub fn unlock(&mut self) {
        self.blocked = false;
    }

    /// Return `true` while playback is refused.
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Make every play request for `path` fail as missing.
    pub fn mark_missing(&mut self, path: impl Into<String>) {
        self.missing.insert(path.into());
    }

    /// Give clips started from `path` a known length.
    pub fn set_duration(&mut self, path: impl Into<String>, secs: f64) {
        self.durations.insert(path.into(), secs);
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> &[AudioCall] {
        &self.calls
    }

    /// State of one clip, including ones that ended naturally. Stopped clips are gone.
    pub fn clip(&self, clip: ClipId) -> Option<&ClipState> {
        self.clips.get(&clip)
    }

    /// Clips that are neither stopped nor ended.
    pub fn live_clips(&self) -> impl Iterator<Item = (ClipId, &ClipState)> {
        self.clips
            .iter()
            .filter(|(_, c)| !c.stopped)
            .map(|(id, c)| (*id, c))
    }

    /// Paths of live clips whose effective volume is above zero.
    pub fn audible_paths(&self) -> Vec<&str> {
        self.live_clips()
            .filter(|(_, c)| !c.paused && c.volume > 0.0)
            .map(|(_, c)| c.path.as_str())
            .collect()
    }

    /// Number of successful play calls for `path`.
    pub fn play_count(&self, path: &str) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, AudioCall::Play { path: p, .. } if p == path))
            .count()
    }
}

impl AudioBackend for InMemoryAudio {
    fn play(&mut self, path: &str, looped: bool, volume: f64) -> Result<ClipId, PlaybackError> {
        let refusal = if self.blocked {
            Some(PlaybackError::Blocked)
        } else if self.missing.contains(path) {
            Some(PlaybackError::Missing {
                path: path.to_owned(),
            })
        } else {
            None
        };
        if let Some(error) = refusal {
            self.calls.push(AudioCall::Rejected {
                path: path.to_owned(),
                error: error.clone(),
            });
            return Err(error);
        }

        let clip = ClipId(self.next_id);
        self.next_id += 1;
        self.clips.insert(
            clip,
            ClipState {
                path: path.to_owned(),
                looped,
                volume,
                position: 0.0,
                duration: self.durations.get(path).copied(),
                paused: false,
                stopped: false,
            },
        );
        self.calls.push(AudioCall::Play {
            clip,
            path: path.to_owned(),
            looped,
        });
        Ok(clip)
    }

    fn set_volume(&mut self, clip: ClipId, volume: f64) {
        if let Some(c) = self.clips.get_mut(&clip) {
            c.volume = volume.clamp(0.0, 1.0);
        }
    }

    fn pause(&mut self, clip: ClipId) {
        if let Some(c) = self.clips.get_mut(&clip)
            && !c.stopped
        {
            c.paused = true;
            self.calls.push(AudioCall::Pause(clip));
        }
    }

    fn resume(&mut self, clip: ClipId) -> Result<(), PlaybackError> {
        if self.blocked {
            return Err(PlaybackError::Blocked);
        }
        let Some(c) = self.clips.get_mut(&clip) else {
            return Err(PlaybackError::Backend(format!("unknown clip {}", clip.0)));
        };
        if c.stopped {
            // An ended clip restarts from its current position, like a media element.
            c.stopped = false;
        }
        c.paused = false;
        self.calls.push(AudioCall::Resume(clip));
        Ok(())
    }

    fn seek(&mut self, clip: ClipId, secs: f64) {
        if let Some(c) = self.clips.get_mut(&clip) {
            let max = c.duration.unwrap_or(f64::INFINITY);
            c.position = secs.clamp(0.0, max);
            self.calls.push(AudioCall::Seek(clip, c.position));
        }
    }

    fn position(&self, clip: ClipId) -> f64 {
        self.clips.get(&clip).map_or(0.0, |c| c.position)
    }

    fn duration(&self, clip: ClipId) -> Option<f64> {
        self.clips.get(&clip).and_then(|c| c.duration)
    }

    fn is_playing(&self, clip: ClipId) -> bool {
        self.clips
            .get(&clip)
            .is_some_and(|c| !c.stopped && !c.paused)
    }

    fn stop(&mut self, clip: ClipId) {
        if self.clips.remove(&clip).is_some() {
            self.calls.push(AudioCall::Stop(clip));
        }
    }

    fn drain_ended(&mut self) -> Vec<ClipId> {
        std::mem::take(&mut self.ended)
    }

    fn advance(&mut self, now: Time) {
        let dt = now.since(self.now);
        self.now = self.now.max(now);
        if dt == 0.0 {
            return;
        }
        for (id, c) in self.clips.iter_mut() {
            if c.stopped || c.paused {
                continue;
            }
            c.position += dt;
            let Some(len) = c.duration else { continue };
            if c.position < len {
                continue;
            }
            if c.looped && len > 0.0 {
                c.position %= len;
            } else {
                c.position = len;
                c.stopped = true;
                self.ended.push(*id);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/backend.rs"]
mod tests;
