use crate::animation::ease::Ease;
use crate::animation::tween::Tweener;
use crate::audio::backend::{AudioBackend, ClipId};
use crate::foundation::core::{Time, is_unit_interval, is_valid_duration};
use crate::foundation::error::{ReverieError, ReverieResult};

/// Voice message playback settings.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VoiceTuning {
    /// Playback volume reached after the fade-in.
    pub volume: f64,
    /// Fade-in on start, in seconds.
    pub fade_in: f64,
    /// Music level while the message plays.
    pub duck_music_to: f64,
    /// Fade used to duck the music, in seconds.
    pub duck_fade: f64,
}

impl Default for VoiceTuning {
    fn default() -> Self {
        Self {
            volume: 1.0,
            fade_in: 1.0,
            duck_music_to: 0.0,
            duck_fade: 1.5,
        }
    }
}

impl VoiceTuning {
    /// Check volumes and durations.
    pub fn validate(&self) -> ReverieResult<()> {
        if !is_unit_interval(self.volume) || !is_unit_interval(self.duck_music_to) {
            return Err(ReverieError::validation(
                "tuning.voice volumes must be in [0, 1]",
            ));
        }
        if !is_valid_duration(self.fade_in) || !is_valid_duration(self.duck_fade) {
            return Err(ReverieError::validation(
                "tuning.voice fades must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// Something the voice player did in response to a control or to playback ending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceEvent {
    /// Playback started from the beginning.
    Started,
    /// Playback paused.
    Paused,
    /// Playback resumed where it stopped.
    Resumed,
    /// The message played to its end. `first` is set only on the first full listen.
    Completed {
        /// First full listen.
        first: bool,
    },
}

/// Player for a single persistent voice message clip.
///
/// The clip is created on first play and reused for pause, seek and replay. After the first full
/// listen the "next" affordance becomes visible and stays visible.
#[derive(Clone, Debug)]
pub struct VoiceMessage {
    path: String,
    tuning: VoiceTuning,
    clip: Option<ClipId>,
    ended: bool,
    completed_once: bool,
    replay_visible: bool,
    level: Tweener<ClipId>,
}

impl VoiceMessage {
    /// Create a player for the clip at `path`.
    pub fn new(path: impl Into<String>, tuning: VoiceTuning) -> Self {
        Self {
            path: path.into(),
            tuning,
            clip: None,
            ended: false,
            completed_once: false,
            replay_visible: false,
            level: Tweener::new(),
        }
    }

    /// Path of the message clip.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Handle of the clip, once created.
    pub fn clip(&self) -> Option<ClipId> {
        self.clip
    }

    /// Return `true` after the first full listen.
    pub fn has_completed_once(&self) -> bool {
        self.completed_once
    }

    /// Whether the "next" affordance is visible.
    pub fn next_visible(&self) -> bool {
        self.completed_once
    }

    /// Whether the replay affordance is visible.
    pub fn replay_visible(&self) -> bool {
        self.replay_visible
    }

    /// Return `true` while the message is audibly playing.
    pub fn is_playing<B: AudioBackend>(&self, backend: &B) -> bool {
        self.clip.is_some_and(|c| backend.is_playing(c))
    }

    /// Play/pause toggle.
    ///
    /// Pauses while playing, resumes a paused message, and otherwise starts from the beginning
    /// with a fade-in.
    pub fn toggle<B: AudioBackend>(&mut self, backend: &mut B) -> Option<VoiceEvent> {
        if let Some(clip) = self.clip {
            if backend.is_playing(clip) {
                backend.pause(clip);
                return Some(VoiceEvent::Paused);
            }
            if !self.ended && backend.position(clip) > 0.0 {
                return match backend.resume(clip) {
                    Ok(()) => Some(VoiceEvent::Resumed),
                    Err(err) => {
                        tracing::warn!(path = %self.path, error = %err, "voice resume failed");
                        None
                    }
                };
            }
        }
        self.start(backend)
    }

    /// Restart from the beginning, keeping the "next" affordance as it is.
    pub fn replay<B: AudioBackend>(&mut self, backend: &mut B) -> Option<VoiceEvent> {
        if let Some(clip) = self.clip {
            backend.pause(clip);
            backend.seek(clip, 0.0);
            self.ended = true;
        }
        self.start(backend)
    }

    /// Move the playhead, clamped to the clip length. Playback continues if it was playing.
    pub fn seek<B: AudioBackend>(&mut self, backend: &mut B, secs: f64) {
        let Some(clip) = self.clip else { return };
        let was_playing = backend.is_playing(clip);
        let max = backend.duration(clip).unwrap_or(f64::INFINITY);
        let target = if secs.is_finite() {
            secs.clamp(0.0, max)
        } else {
            0.0
        };
        backend.pause(clip);
        backend.seek(clip, target);
        self.ended = false;
        if was_playing && let Err(err) = backend.resume(clip) {
            tracing::warn!(path = %self.path, error = %err, "voice resume after seek failed");
        }
    }

    /// Advance the fade-in and push the volume.
    pub fn advance<B: AudioBackend>(&mut self, backend: &mut B, now: Time) {
        self.level.advance(now);
        if let Some(clip) = self.clip
            && let Some(v) = self.level.value(&clip)
        {
            backend.set_volume(clip, v);
        }
    }

    /// React to a clip reaching its natural end. Returns `None` for clips this player does not
    /// own.
    pub fn on_clip_ended(&mut self, clip: ClipId) -> Option<VoiceEvent> {
        if self.clip != Some(clip) {
            return None;
        }
        self.ended = true;
        self.replay_visible = true;
        let first = !self.completed_once;
        self.completed_once = true;
        tracing::debug!(path = %self.path, first, "voice message completed");
        Some(VoiceEvent::Completed { first })
    }

    /// `m:ss` labels for the current position and the clip length.
    pub fn labels<B: AudioBackend>(&self, backend: &B) -> (String, String) {
        match self.clip {
            Some(clip) => (
                format_time(backend.position(clip)),
                format_time(backend.duration(clip).unwrap_or(0.0)),
            ),
            None => (format_time(0.0), format_time(0.0)),
        }
    }

    fn start<B: AudioBackend>(&mut self, backend: &mut B) -> Option<VoiceEvent> {
        let clip = match self.clip {
            Some(clip) => {
                backend.seek(clip, 0.0);
                if let Err(err) = backend.resume(clip) {
                    tracing::warn!(path = %self.path, error = %err, "voice restart failed");
                    return None;
                }
                backend.set_volume(clip, 0.0);
                clip
            }
            None => match backend.play(&self.path, false, 0.0) {
                Ok(clip) => clip,
                Err(err) => {
                    tracing::warn!(path = %self.path, error = %err, "voice playback failed");
                    return None;
                }
            },
        };
        self.clip = Some(clip);
        self.ended = false;
        self.level.set(clip, 0.0);
        self.level
            .to(clip, self.tuning.volume, self.tuning.fade_in, Ease::Linear, 0.0);
        tracing::info!(path = %self.path, "voice message started");
        Some(VoiceEvent::Started)
    }
}

/// Format seconds as `m:ss`, flooring fractions. Negative and non-finite inputs read `0:00`.
pub fn format_time(secs: f64) -> String {
    let s = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", s / 60, s % 60)
}

#[cfg(test)]
#[path = "../../tests/unit/audio/voice.rs"]
mod tests;
