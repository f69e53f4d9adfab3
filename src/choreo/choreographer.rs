use std::collections::BTreeSet;

use crate::animation::ease::Ease;
use crate::animation::timers::Timers;
use crate::animation::tween::{TweenDone, TweenId, Tweener};
use crate::foundation::core::{Time, is_valid_duration};
use crate::foundation::error::{ReverieError, ReverieResult};
use crate::script::model::{Beat, Continuation, Cue, SceneDef, SceneTuning};

/// Where the active scene is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SceneState {
    /// No scene entered yet.
    Idle,
    /// Container fading in; beats have not started.
    Entering,
    /// Running or waiting on beat `beat`.
    Playing {
        /// Index of the beat in flight.
        beat: usize,
    },
    /// Continue affordance shown, waiting for the user.
    AwaitingContinue,
    /// Blocked on a named signal.
    AwaitingSignal {
        /// Signal being waited for.
        signal: String,
    },
    /// Last scene finished with no continuation.
    Completed,
}

/// Output of the choreographer, drained by its owner with
/// [`SceneChoreographer::take_steps`].
#[derive(Clone, Debug, PartialEq)]
pub enum ChoreoStep {
    /// A scene was entered; its container fades in over `duration`.
    SceneEntering {
        /// Scene being left, if any.
        from: Option<String>,
        /// Scene being entered.
        to: String,
        /// Container crossfade in seconds.
        duration: f64,
    },
    /// A left scene's container finished fading out.
    SceneDeactivated(String),
    /// Run this effect now.
    Cue(Cue),
    /// The continue affordance started fading in.
    ContinueShown,
    /// The continue affordance finished fading out.
    ContinueHidden,
    /// The sequence is blocked on a signal.
    AwaitingSignal(String),
    /// A scene ran its last beat.
    SceneCompleted(String),
    /// The experience ended.
    Finished,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Surface {
    Scene(String),
    Continue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Wake {
    BeginBeats,
    Resume(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum ContinueTarget {
    Beat(usize),
    Scene(String),
}

/// Sequential beat runner for a list of scenes.
///
/// Exactly one beat sequence is in flight at a time. Every [`SceneChoreographer::enter_scene`]
/// bumps a generation counter and cancels all timers of the previous one, so a skip never lets
/// beats from two scenes interleave. Side effects are not performed here: they are queued as
/// [`ChoreoStep`]s for the owner to execute.
#[derive(Clone, Debug)]
pub struct SceneChoreographer {
    scenes: Vec<SceneDef>,
    tuning: SceneTuning,
    current: Option<usize>,
    state: SceneState,
    generation: u64,
    timers: Timers<Wake>,
    surfaces: Tweener<Surface>,
    continue_target: Option<ContinueTarget>,
    hide_tween: Option<TweenId>,
    awaiting: Option<(String, usize)>,
    raised: BTreeSet<String>,
    entered_at: Time,
    deferred: Option<String>,
    steps: Vec<ChoreoStep>,
}

impl SceneChoreographer {
    /// Create a choreographer over `scenes`.
    pub fn new(scenes: Vec<SceneDef>, tuning: SceneTuning) -> Self {
        Self {
            scenes,
            tuning,
            current: None,
            state: SceneState::Idle,
            generation: 0,
            timers: Timers::new(),
            surfaces: Tweener::new(),
            continue_target: None,
            hide_tween: None,
            awaiting: None,
            raised: BTreeSet::new(),
            entered_at: Time::ZERO,
            deferred: None,
            steps: Vec::new(),
        }
    }

    /// Key of the active scene.
    pub fn current_scene(&self) -> Option<&str> {
        self.current.map(|i| self.scenes[i].key.as_str())
    }

    /// Lifecycle state of the active scene.
    pub fn state(&self) -> &SceneState {
        &self.state
    }

    /// Sequence generation; bumped on every scene entry.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Scene definition by key.
    pub fn scene(&self, key: &str) -> Option<&SceneDef> {
        self.scenes.iter().find(|s| s.key == key)
    }

    /// Container opacity of a scene; `0` for inactive scenes.
    pub fn container_opacity(&self, key: &str) -> f64 {
        self.surfaces
            .value(&Surface::Scene(key.to_owned()))
            .unwrap_or(0.0)
    }

    /// Opacity of the continue affordance.
    pub fn continue_opacity(&self) -> f64 {
        self.surfaces.value(&Surface::Continue).unwrap_or(0.0)
    }

    /// Return `true` while the continue affordance accepts a press.
    pub fn continue_visible(&self) -> bool {
        self.continue_target.is_some() && self.hide_tween.is_none()
    }

    /// Number of pending beat timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Earliest pending beat timer.
    pub fn next_deadline(&self) -> Option<Time> {
        self.timers.next_deadline()
    }

    /// Return `true` once the last scene completed.
    pub fn is_finished(&self) -> bool {
        self.state == SceneState::Completed
    }

    /// Drain the queued steps in emission order.
    pub fn take_steps(&mut self) -> Vec<ChoreoStep> {
        std::mem::take(&mut self.steps)
    }

    /// Enter `key` with its own container fade duration.
    #[tracing::instrument(skip(self))]
    pub fn enter_scene(&mut self, key: &str, now: Time) -> ReverieResult<()> {
        let duration = self.enter_duration(key)?;
        self.enter_at(key, duration, now)
    }

    /// Enter `key` with an explicit container fade duration.
    pub fn transition_to(&mut self, key: &str, duration: f64, now: Time) -> ReverieResult<()> {
        if !is_valid_duration(duration) {
            return Err(ReverieError::validation(format!(
                "transition duration must be finite and >= 0, got {duration}"
            )));
        }
        self.enter_at(key, duration, now)
    }

    /// Activate the continue affordance. Returns `false` when it is not shown or already
    /// fading out.
    pub fn press_continue(&mut self, now: Time) -> bool {
        if !self.continue_visible() {
            return false;
        }
        let fade = self.tuning.continue_fade_out;
        self.hide_tween = Some(self.surfaces.to_at(
            Surface::Continue,
            0.0,
            fade,
            Ease::InOutQuad,
            now,
        ));
        tracing::debug!(scene = ?self.current_scene(), "continue pressed");
        true
    }

    /// Raise a named signal.
    ///
    /// Resumes the sequence when it is blocked on `signal`. A signal raised before its await
    /// beat is remembered for the rest of the current sequence. Returns `true` when the
    /// sequence resumed.
    pub fn raise(&mut self, signal: &str, now: Time) -> bool {
        if let Some((name, resume)) = self.awaiting.take() {
            if name == signal {
                tracing::debug!(signal, "signal resumed sequence");
                self.run_from(resume, now);
                return true;
            }
            self.awaiting = Some((name, resume));
        }
        if self.current.is_some() && !self.is_finished() {
            self.raised.insert(signal.to_owned());
        }
        false
    }

    /// Advance timers and surface fades to `now`, running every beat that becomes due.
    ///
    /// An automatic continuation out of a scene that took no time is entered on the following
    /// call, so a chain of instant scenes moves one scene per call instead of spinning.
    pub fn advance(&mut self, now: Time) {
        if let Some(next) = self.deferred.take()
            && let Err(err) = self
                .enter_duration(&next)
                .and_then(|d| self.enter_at(&next, d, now))
        {
            tracing::error!(next = %next, "cannot chain scene: {err}");
            self.state = SceneState::Completed;
        }
        loop {
            let mut progressed = false;
            for done in self.surfaces.advance(now) {
                progressed = true;
                self.on_surface_done(done);
            }
            if let Some((at, group, wake)) = self.timers.pop_due(now) {
                progressed = true;
                if group == self.generation {
                    self.wake(at, wake);
                }
            }
            if !progressed {
                break;
            }
        }
    }

    fn enter_duration(&self, key: &str) -> ReverieResult<f64> {
        let scene = self
            .scene(key)
            .ok_or_else(|| ReverieError::script(format!("unknown scene '{key}'")))?;
        Ok(scene.enter_sec.unwrap_or(self.tuning.enter))
    }

    fn enter_at(&mut self, key: &str, duration: f64, at: Time) -> ReverieResult<()> {
        let index = self
            .scenes
            .iter()
            .position(|s| s.key == key)
            .ok_or_else(|| ReverieError::script(format!("unknown scene '{key}'")))?;

        let cancelled = self.timers.cancel_group(self.generation);
        self.generation += 1;
        self.awaiting = None;
        self.raised.clear();
        self.deferred = None;
        self.entered_at = at;
        self.hide_tween = None;
        if self.continue_target.take().is_some() {
            self.steps.push(ChoreoStep::ContinueHidden);
        }
        self.surfaces.set(Surface::Continue, 0.0);

        let previous = self.current.replace(index);
        let from = previous.map(|i| self.scenes[i].key.clone());
        if let Some(prev) = &from
            && previous != Some(index)
        {
            self.surfaces
                .to_at(Surface::Scene(prev.clone()), 0.0, duration, Ease::InOutQuad, at);
        }
        let surface = Surface::Scene(key.to_owned());
        if self.surfaces.value(&surface).is_none() {
            self.surfaces.set(surface, 0.0);
        }
        self.surfaces
            .to_at(Surface::Scene(key.to_owned()), 1.0, duration, Ease::InOutQuad, at);

        self.state = SceneState::Entering;
        tracing::info!(scene = key, from = ?from, duration, cancelled, "entering scene");
        self.steps.push(ChoreoStep::SceneEntering {
            from,
            to: key.to_owned(),
            duration,
        });
        self.timers
            .schedule(at + duration, self.generation, Wake::BeginBeats);
        Ok(())
    }

    fn wake(&mut self, at: Time, wake: Wake) {
        match wake {
            Wake::BeginBeats => self.run_from(0, at),
            Wake::Resume(index) => self.run_from(index, at),
        }
    }

    fn run_from(&mut self, mut index: usize, at: Time) {
        let Some(scene) = self.current else {
            return;
        };
        loop {
            let Some(beat) = self.scenes[scene].beats.get(index).cloned() else {
                self.finish_scene(scene, at);
                return;
            };
            self.state = SceneState::Playing { beat: index };
            tracing::debug!(scene = %self.scenes[scene].key, beat = index, ?beat, "beat");
            match beat {
                Beat::Cue(cue) => {
                    self.steps.push(ChoreoStep::Cue(cue));
                    index += 1;
                }
                Beat::Wait(sec) => {
                    self.timers
                        .schedule(at + sec, self.generation, Wake::Resume(index + 1));
                    return;
                }
                Beat::AwaitContinue => {
                    self.show_continue(at, ContinueTarget::Beat(index + 1));
                    return;
                }
                Beat::AwaitSignal(signal) => {
                    if self.raised.remove(&signal) {
                        index += 1;
                        continue;
                    }
                    self.state = SceneState::AwaitingSignal {
                        signal: signal.clone(),
                    };
                    self.awaiting = Some((signal.clone(), index + 1));
                    self.steps.push(ChoreoStep::AwaitingSignal(signal));
                    return;
                }
            }
        }
    }

    fn finish_scene(&mut self, scene: usize, at: Time) {
        let key = self.scenes[scene].key.clone();
        self.steps.push(ChoreoStep::SceneCompleted(key.clone()));
        match self.scenes[scene].next.clone() {
            Continuation::Auto(next) if at <= self.entered_at => {
                tracing::debug!(scene = %key, next = %next, "instant scene, chaining next frame");
                self.deferred = Some(next);
            }
            Continuation::Auto(next) => {
                if let Err(err) = self
                    .enter_duration(&next)
                    .and_then(|d| self.enter_at(&next, d, at))
                {
                    tracing::error!(scene = %key, next = %next, "cannot chain scene: {err}");
                    self.state = SceneState::Completed;
                }
            }
            Continuation::AwaitContinue(next) => {
                self.show_continue(at, ContinueTarget::Scene(next));
            }
            Continuation::End => {
                tracing::info!(scene = %key, "experience finished");
                self.state = SceneState::Completed;
                self.steps.push(ChoreoStep::Finished);
            }
        }
    }

    fn show_continue(&mut self, at: Time, target: ContinueTarget) {
        self.state = SceneState::AwaitingContinue;
        self.continue_target = Some(target);
        self.hide_tween = None;
        self.surfaces.to_at(
            Surface::Continue,
            1.0,
            self.tuning.continue_fade_in,
            Ease::InOutQuad,
            at,
        );
        self.steps.push(ChoreoStep::ContinueShown);
    }

    fn on_surface_done(&mut self, done: TweenDone<Surface>) {
        match done.key {
            Surface::Continue => {
                if self.hide_tween != Some(done.id) {
                    return;
                }
                self.hide_tween = None;
                self.steps.push(ChoreoStep::ContinueHidden);
                match self.continue_target.take() {
                    Some(ContinueTarget::Beat(index)) => self.run_from(index, done.at),
                    Some(ContinueTarget::Scene(next)) => {
                        if let Err(err) = self
                            .enter_duration(&next)
                            .and_then(|d| self.enter_at(&next, d, done.at))
                        {
                            tracing::error!(next = %next, "cannot continue: {err}");
                            self.state = SceneState::Completed;
                        }
                    }
                    None => {}
                }
            }
            Surface::Scene(key) => {
                if self.current_scene() == Some(key.as_str()) {
                    return;
                }
                tracing::debug!(scene = %key, "scene container deactivated");
                self.surfaces.remove(&Surface::Scene(key.clone()));
                self.steps.push(ChoreoStep::SceneDeactivated(key));
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/choreo/choreographer.rs"]
mod tests;
