use crate::animation::ease::Ease;
use crate::animation::tween::Tweener;
use crate::foundation::core::{Time, is_valid_duration};
use crate::foundation::error::{ReverieError, ReverieResult};

/// Text line timing.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TextTuning {
    /// Fade-out of the previous line before the swap, in seconds.
    pub fade_out_old: f64,
    /// Fade-in of the new line, in seconds.
    pub fade_in: f64,
    /// Automatic fade-out after the hold, in seconds.
    pub fade_out: f64,
    /// Fade-out after a dismiss tap, in seconds.
    pub dismiss_fade: f64,
    /// Delay before a dismiss tap is accepted, in seconds.
    pub grace: f64,
    /// Base hold time, in milliseconds.
    pub base_ms: f64,
    /// Additional hold per visible character, in milliseconds.
    pub per_char_ms: f64,
}

impl Default for TextTuning {
    fn default() -> Self {
        Self {
            fade_out_old: 0.3,
            fade_in: 0.8,
            fade_out: 1.0,
            dismiss_fade: 0.5,
            grace: 1.5,
            base_ms: 5000.0,
            per_char_ms: 80.0,
        }
    }
}

impl TextTuning {
    /// Check durations.
    pub fn validate(&self) -> ReverieResult<()> {
        for (name, v) in [
            ("fade_out_old", self.fade_out_old),
            ("fade_in", self.fade_in),
            ("fade_out", self.fade_out),
            ("dismiss_fade", self.dismiss_fade),
            ("grace", self.grace),
            ("base_ms", self.base_ms),
            ("per_char_ms", self.per_char_ms),
        ] {
            if !is_valid_duration(v) {
                return Err(ReverieError::validation(format!(
                    "tuning.text.{name} must be finite and >= 0"
                )));
            }
        }
        Ok(())
    }

    /// Hold time in milliseconds for `text`: `explicit_ms` verbatim when given, otherwise
    /// `base + per_char × visible characters`.
    pub fn hold_ms(&self, text: &str, explicit_ms: Option<f64>) -> f64 {
        match explicit_ms {
            Some(ms) => ms.max(0.0),
            None => self.base_ms + self.per_char_ms * visible_char_count(text) as f64,
        }
    }
}

/// Count characters of `text` with `<...>` markup removed.
pub fn visible_char_count(text: &str) -> usize {
    let mut count = 0;
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        // A tag needs at least one character between its brackets.
        if c == '<'
            && let Some(end) = rest[1..].find('>')
            && end > 0
        {
            rest = &rest[end + 2..];
            continue;
        }
        count += 1;
        rest = &rest[c.len_utf8()..];
    }
    count
}

/// Lifecycle phase of the text surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextPhase {
    /// Nothing visible.
    Hidden,
    /// Fading the previous line out before swapping.
    Swapping,
    /// Fading the new line in.
    FadingIn,
    /// Fully visible, waiting for the hold to elapse.
    Holding,
    /// Automatic fade-out after the hold.
    FadingOut,
    /// Early fade-out after a dismiss tap.
    Dismissing,
}

/// Observable text surface changes.
#[derive(Clone, Debug, PartialEq)]
pub enum TextEvent {
    /// A new line replaced the old one on the surface.
    Swapped {
        /// The line now on the surface.
        text: String,
    },
    /// The line faded out, automatically or after a tap.
    Hidden,
}

#[derive(Clone, Debug)]
struct Showing {
    text: String,
    hold: f64,
    arm_at: Time,
    fade_out_at: Option<Time>,
}

/// Narrative text line presenter with fade-in, hold, fade-out and tap-to-dismiss.
#[derive(Clone, Debug)]
pub struct TextBeatPresenter {
    tuning: TextTuning,
    phase: TextPhase,
    text: Option<String>,
    showing: Option<Showing>,
    armed: bool,
    opacity: Tweener<()>,
}

impl TextBeatPresenter {
    /// Create a hidden presenter.
    pub fn new(tuning: TextTuning) -> Self {
        let mut opacity = Tweener::new();
        opacity.set((), 0.0);
        Self {
            tuning,
            phase: TextPhase::Hidden,
            text: None,
            showing: None,
            armed: false,
            opacity,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> TextPhase {
        self.phase
    }

    /// Line currently on the surface.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Surface opacity.
    pub fn opacity(&self) -> f64 {
        self.opacity.value(&()).unwrap_or(0.0)
    }

    /// Return `true` while a dismiss tap would be accepted.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Instant the automatic fade-out of the current line begins, once known.
    pub fn fade_out_at(&self) -> Option<Time> {
        self.showing.as_ref().and_then(|s| s.fade_out_at)
    }

    /// Show `text`, holding it `hold_ms` milliseconds (or a length-based default).
    ///
    /// Any animation in flight on the surface is cancelled and the previous dismiss listener is
    /// disarmed first.
    pub fn show(&mut self, now: Time, text: &str, hold_ms: Option<f64>) {
        let hold = self.tuning.hold_ms(text, hold_ms) / 1000.0;
        self.opacity.kill(&());
        self.armed = false;

        self.opacity
            .to_at((), 0.0, self.tuning.fade_out_old, Ease::InQuad, now);
        self.phase = TextPhase::Swapping;
        self.showing = Some(Showing {
            text: text.to_owned(),
            hold,
            arm_at: now + self.tuning.grace,
            fade_out_at: None,
        });
        tracing::debug!(%text, hold, "text queued");
    }

    /// Dismiss tap on the text surface. Returns `true` when the tap was accepted.
    pub fn tap(&mut self, now: Time) -> bool {
        self.arm_if_due(now);
        if !self.armed || !matches!(self.phase, TextPhase::FadingIn | TextPhase::Holding) {
            return false;
        }
        self.armed = false;
        self.opacity.kill(&());
        self.opacity
            .to_at((), 0.0, self.tuning.dismiss_fade, Ease::InQuad, now);
        self.phase = TextPhase::Dismissing;
        tracing::debug!("text dismissed early");
        true
    }

    /// Advance the surface to `now`.
    pub fn advance(&mut self, now: Time) -> Vec<TextEvent> {
        let mut events = Vec::new();
        // Each completion may start the next leg at its exact end instant; loop until stable.
        loop {
            self.arm_if_due(now);
            let done = self.opacity.advance(now);
            let mut progressed = false;
            for d in done {
                progressed = true;
                self.on_leg_done(d.at, &mut events);
            }
            if self.start_fade_out_if_due(now) {
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
        events
    }

    fn arm_if_due(&mut self, now: Time) {
        if let Some(s) = &self.showing
            && !self.armed
            && matches!(self.phase, TextPhase::FadingIn | TextPhase::Holding)
            && now >= s.arm_at
            && s.fade_out_at.is_none_or(|at| now < at)
        {
            self.armed = true;
        }
    }

    fn on_leg_done(&mut self, at: Time, events: &mut Vec<TextEvent>) {
        match self.phase {
            TextPhase::Swapping => {
                let Some(s) = self.showing.as_mut() else {
                    return;
                };
                self.text = Some(s.text.clone());
                events.push(TextEvent::Swapped {
                    text: s.text.clone(),
                });
                let fade_in_done = at + self.tuning.fade_in;
                s.fade_out_at = Some(fade_in_done + s.hold);
                self.opacity
                    .to_at((), 1.0, self.tuning.fade_in, Ease::OutQuad, at);
                self.phase = TextPhase::FadingIn;
            }
            TextPhase::FadingIn => self.phase = TextPhase::Holding,
            TextPhase::FadingOut | TextPhase::Dismissing => {
                self.phase = TextPhase::Hidden;
                self.armed = false;
                self.showing = None;
                events.push(TextEvent::Hidden);
            }
            TextPhase::Hidden | TextPhase::Holding => {}
        }
    }

    fn start_fade_out_if_due(&mut self, now: Time) -> bool {
        let Some(at) = self.fade_out_at() else {
            return false;
        };
        if !matches!(self.phase, TextPhase::FadingIn | TextPhase::Holding) || now < at {
            return false;
        }
        self.armed = false;
        self.opacity.kill(&());
        self.opacity
            .to_at((), 0.0, self.tuning.fade_out, Ease::InQuad, at);
        self.phase = TextPhase::FadingOut;
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/visual/text.rs"]
mod tests;
