use std::collections::BTreeMap;

use crate::animation::sway::{ParallaxRig, SwaySample, ambient_sway, is_narrow};
use crate::assets::catalog::AssetKind;
use crate::audio::backend::AudioBackend;
use crate::audio::mixer::AudioLayerMixer;
use crate::audio::voice::{VoiceEvent, VoiceMessage};
use crate::choreo::choreographer::{ChoreoStep, SceneChoreographer, SceneState};
use crate::foundation::core::{Point, Time, Vec2};
use crate::foundation::error::ReverieResult;
use crate::input::blow::{BlowGestureDetector, BlowState, MicrophoneError, MicrophoneStream};
use crate::script::model::{Cue, Script, Tuning};
use crate::visual::crossfade::ImageLayerCrossfader;
use crate::visual::particles::{ParticleField, ParticleMode};
use crate::visual::text::{TextBeatPresenter, TextEvent, TextPhase};

/// Signal raised when the blow gesture completes.
pub const BLOW_SIGNAL: &str = "blow";

/// Signal raised after the first full listen of the voice message.
pub const VOICE_COMPLETED_SIGNAL: &str = "voice_completed";

/// Observable session changes, in the order they happened.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectorEvent {
    /// A scene container started fading in.
    SceneEntering {
        /// Scene being left.
        from: Option<String>,
        /// Scene being entered.
        to: String,
    },
    /// A left scene's container is fully hidden.
    SceneDeactivated(String),
    /// A scene ran its last beat.
    SceneCompleted(String),
    /// The experience ended.
    Finished,
    /// A text line replaced the previous one.
    TextShown(String),
    /// The text line faded out.
    TextHidden,
    /// A scene's layers committed a new background image.
    ImageCommitted {
        /// Scene key.
        scene: String,
        /// Committed image name.
        image: String,
    },
    /// The continue affordance appeared.
    ContinueShown,
    /// The continue affordance disappeared.
    ContinueHidden,
    /// The sequence is blocked on a signal.
    AwaitingSignal(String),
    /// A signal was raised.
    SignalRaised(String),
    /// The first user gesture was seen and queued audio was replayed.
    AudioUnlocked,
    /// The particle effect changed.
    ParticleMode(ParticleMode),
    /// Blow detection started and waits for microphone permission.
    MicrophoneRequested,
    /// Blow detection started with the manual affordance only.
    BlowManualOnly,
    /// The blow gesture completed.
    BlowDetected,
    /// The voice message player appeared.
    VoicePlayerShown {
        /// Resolved clip path.
        path: String,
    },
    /// The voice message player changed state.
    Voice(VoiceEvent),
    /// A host-defined event from the script.
    Emitted(String),
}

/// Point-in-time summary of the session, for hosts and diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectorSnapshot {
    /// Session time of the snapshot.
    pub at: Time,
    /// Active scene.
    pub scene: Option<String>,
    /// Choreographer state.
    pub state: SceneState,
    /// Line on the text surface.
    pub text: Option<String>,
    /// Text surface phase.
    pub text_phase: TextPhase,
    /// Current music track.
    pub music: Option<String>,
    /// Active ambience beds.
    pub ambience: Vec<String>,
    /// Particle effect.
    pub particle_mode: ParticleMode,
    /// Live particles.
    pub active_particles: usize,
    /// Whether the continue affordance accepts a press.
    pub continue_visible: bool,
    /// Blow detector state.
    pub blow: BlowState,
    /// Whether the voice message "next" affordance is visible.
    pub voice_next_visible: bool,
}

/// Top-level orchestrator: owns every service and turns choreographer steps into effects.
///
/// Hosts construct one `Director` per session, call [`Director::advance`] once per animation
/// frame and forward user input through the other entry points. Input entry points act at the
/// time of the last `advance`.
#[derive(Debug)]
pub struct Director<B> {
    script: Script,
    tuning: Tuning,
    mixer: AudioLayerMixer<B>,
    crossfader: ImageLayerCrossfader,
    text: TextBeatPresenter,
    particles: ParticleField,
    parallax: BTreeMap<String, ParallaxRig>,
    blow: BlowGestureDetector,
    microphone_api: bool,
    voice: Option<VoiceMessage>,
    choreo: SceneChoreographer,
    viewport: Vec2,
    now: Time,
    events: Vec<(Time, DirectorEvent)>,
}

impl<B: AudioBackend> Director<B> {
    /// Validate `script` and wire every service for a `viewport`-sized surface.
    pub fn new(script: Script, backend: B, viewport: Vec2) -> ReverieResult<Self> {
        script.validate()?;
        let tuning = script.tuning;

        let mut crossfader = ImageLayerCrossfader::new(tuning.crossfade);
        let mut parallax = BTreeMap::new();
        for scene in &script.scenes {
            crossfader.register(
                &scene.key,
                &scene.image_folder,
                &scene.layers,
                &scene.initial_image,
            );
            parallax.insert(
                scene.key.clone(),
                ParallaxRig::new(&scene.layers, tuning.parallax),
            );
        }

        Ok(Self {
            mixer: AudioLayerMixer::new(backend, script.assets.clone(), tuning.mixer),
            crossfader,
            text: TextBeatPresenter::new(tuning.text),
            particles: ParticleField::new(tuning.particles, viewport.x, viewport.y),
            parallax,
            blow: BlowGestureDetector::new(tuning.blow),
            microphone_api: true,
            voice: None,
            choreo: SceneChoreographer::new(script.scenes.clone(), tuning.scene),
            viewport,
            now: Time::ZERO,
            events: Vec::new(),
            tuning,
            script,
        })
    }

    /// Declare whether the platform exposes a microphone API at all.
    pub fn with_microphone_api(mut self, available: bool) -> Self {
        self.microphone_api = available;
        self
    }

    /// The loaded script.
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Time of the last [`Director::advance`].
    pub fn now(&self) -> Time {
        self.now
    }

    /// Audio mixer.
    pub fn mixer(&self) -> &AudioLayerMixer<B> {
        &self.mixer
    }

    /// Playback backend.
    pub fn backend(&self) -> &B {
        self.mixer.backend()
    }

    /// Mutable playback backend, for hosts that forward platform state.
    pub fn backend_mut(&mut self) -> &mut B {
        self.mixer.backend_mut()
    }

    /// Image crossfader.
    pub fn crossfader(&self) -> &ImageLayerCrossfader {
        &self.crossfader
    }

    /// Text presenter.
    pub fn text(&self) -> &TextBeatPresenter {
        &self.text
    }

    /// Particle field.
    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    /// Scene choreographer.
    pub fn choreographer(&self) -> &SceneChoreographer {
        &self.choreo
    }

    /// Blow detector of the current (or last) interaction.
    pub fn blow(&self) -> &BlowGestureDetector {
        &self.blow
    }

    /// Voice message player, once a scene showed it.
    pub fn voice(&self) -> Option<&VoiceMessage> {
        self.voice.as_ref()
    }

    /// Enter the script's start scene.
    pub fn start(&mut self) {
        let start = self.script.start.clone();
        self.go_to_scene(&start);
    }

    /// Enter `key` with its own container fade. Unknown keys are logged and ignored.
    #[tracing::instrument(skip(self))]
    pub fn go_to_scene(&mut self, key: &str) {
        let now = self.now;
        if let Err(err) = self.choreo.enter_scene(key, now) {
            tracing::error!("go_to_scene ignored: {err}");
            return;
        }
        self.pump();
    }

    /// Enter `key` with an explicit container fade. Errors are logged and ignored.
    pub fn transition_to(&mut self, key: &str, duration: f64) {
        let now = self.now;
        if let Err(err) = self.choreo.transition_to(key, duration, now) {
            tracing::error!(scene = key, "transition_to ignored: {err}");
            return;
        }
        self.pump();
    }

    /// Skip command: silence all audio immediately, including the voice message, then enter
    /// `key`.
    pub fn skip_to(&mut self, key: &str) {
        if self.choreo.scene(key).is_none() {
            tracing::error!(scene = key, "skip_to ignored: unknown scene");
            return;
        }
        self.mixer.stop_all();
        self.dismiss_voice();
        self.go_to_scene(key);
    }

    /// Forward a qualifying click, key or touch.
    pub fn user_gesture(&mut self) {
        if self.mixer.gesture_seen() {
            return;
        }
        self.mixer.on_user_gesture();
        self.emit(DirectorEvent::AudioUnlocked);
    }

    /// Tap on the text surface. Returns `true` when it dismissed the line early.
    pub fn tap_text(&mut self) -> bool {
        self.text.tap(self.now)
    }

    /// Press the continue affordance.
    pub fn press_continue(&mut self) -> bool {
        self.choreo.press_continue(self.now)
    }

    /// Raise a named signal into the running sequence.
    pub fn raise(&mut self, signal: &str) {
        self.emit(DirectorEvent::SignalRaised(signal.to_owned()));
        self.choreo.raise(signal, self.now);
        self.pump();
    }

    /// Pointer or touch moved to `pointer` (viewport pixels).
    pub fn pointer_moved(&mut self, pointer: Point) {
        let viewport = self.viewport;
        if let Some(key) = self.choreo.current_scene()
            && let Some(rig) = self.parallax.get_mut(key)
        {
            rig.pointer_moved(pointer, viewport);
        }
    }

    /// The viewport changed size.
    pub fn resize(&mut self, viewport: Vec2) {
        self.viewport = viewport;
        self.particles.resize(viewport.x, viewport.y);
    }

    /// Parallax offset of layer `index` of the active scene.
    pub fn parallax_offset(&self, index: usize) -> Vec2 {
        self.choreo
            .current_scene()
            .and_then(|key| self.parallax.get(key))
            .map_or(Vec2::ZERO, |rig| rig.offset(index))
    }

    /// Ambient sway of layer `index` of the active scene at the current time.
    pub fn layer_sway(&self, index: usize) -> Option<SwaySample> {
        let key = self.choreo.current_scene()?;
        let depth = *self.choreo.scene(key)?.layers.get(index)?;
        Some(ambient_sway(
            depth,
            index,
            self.now.secs(),
            is_narrow(self.viewport.x),
        ))
    }

    /// Microphone permission granted for the running blow detection.
    pub fn microphone_granted(&mut self, stream: Box<dyn MicrophoneStream>) {
        self.blow.on_permission(Ok(stream));
    }

    /// Microphone permission denied or the device failed.
    pub fn microphone_denied(&mut self, err: MicrophoneError) {
        self.blow.on_permission(Err(err));
    }

    /// Tap on the manual blow affordance.
    pub fn tap_blow(&mut self) -> bool {
        if !self.blow.tap() {
            return false;
        }
        self.on_blow_detected();
        true
    }

    /// Voice player play/pause toggle.
    pub fn toggle_voice(&mut self) {
        let Some(voice) = self.voice.as_mut() else {
            return;
        };
        let event = voice.toggle(self.mixer.backend_mut());
        self.on_voice_event(event);
    }

    /// Restart the voice message from the beginning.
    pub fn replay_voice(&mut self) {
        let Some(voice) = self.voice.as_mut() else {
            return;
        };
        let event = voice.replay(self.mixer.backend_mut());
        self.on_voice_event(event);
    }

    /// Move the voice message playhead.
    pub fn seek_voice(&mut self, secs: f64) {
        if let Some(voice) = self.voice.as_mut() {
            voice.seek(self.mixer.backend_mut(), secs);
        }
    }

    /// `m:ss` position and length labels of the voice message.
    pub fn voice_labels(&self) -> Option<(String, String)> {
        self.voice.as_ref().map(|v| v.labels(self.mixer.backend()))
    }

    /// Advance every service to `now` and run whatever became due.
    pub fn advance(&mut self, now: Time) {
        self.now = self.now.max(now);
        let now = self.now;

        for clip in self.mixer.advance(now) {
            let event = self.voice.as_mut().and_then(|v| v.on_clip_ended(clip));
            self.on_voice_event(event);
        }

        if matches!(self.blow.state(), BlowState::Monitoring) && self.blow.sample() {
            self.on_blow_detected();
        }

        for done in self.crossfader.advance(now) {
            self.emit(DirectorEvent::ImageCommitted {
                scene: done.scene,
                image: done.image,
            });
        }
        self.particles.advance(now);
        for rig in self.parallax.values_mut() {
            rig.advance(now);
        }

        self.choreo.advance(now);
        self.pump();

        for event in self.text.advance(now) {
            let event = match event {
                TextEvent::Swapped { text } => DirectorEvent::TextShown(text),
                TextEvent::Hidden => DirectorEvent::TextHidden,
            };
            self.emit(event);
        }

        if let Some(voice) = self.voice.as_mut() {
            voice.advance(self.mixer.backend_mut(), now);
        }
    }

    /// Drain the event log.
    pub fn drain_events(&mut self) -> Vec<(Time, DirectorEvent)> {
        std::mem::take(&mut self.events)
    }

    /// Summarize the session.
    pub fn snapshot(&self) -> DirectorSnapshot {
        DirectorSnapshot {
            at: self.now,
            scene: self.choreo.current_scene().map(str::to_owned),
            state: self.choreo.state().clone(),
            text: self.text.text().map(str::to_owned),
            text_phase: self.text.phase(),
            music: self.mixer.music_name().map(str::to_owned),
            ambience: self
                .mixer
                .ambience_names()
                .into_iter()
                .map(str::to_owned)
                .collect(),
            particle_mode: self.particles.mode(),
            active_particles: self.particles.active_count(),
            continue_visible: self.choreo.continue_visible(),
            blow: self.blow.state(),
            voice_next_visible: self.voice.as_ref().is_some_and(|v| v.next_visible()),
        }
    }

    fn emit(&mut self, event: DirectorEvent) {
        self.events.push((self.now, event));
    }

    fn pump(&mut self) {
        loop {
            let steps = self.choreo.take_steps();
            if steps.is_empty() {
                break;
            }
            for step in steps {
                self.apply(step);
            }
        }
    }

    fn apply(&mut self, step: ChoreoStep) {
        match step {
            ChoreoStep::SceneEntering { from, to, .. } => {
                if let Some(from) = &from {
                    self.crossfader.cancel(from);
                }
                if !matches!(self.blow.state(), BlowState::Idle | BlowState::Cleaned) {
                    self.blow.cleanup();
                }
                if let Some(initial) = self.choreo.scene(&to).map(|s| s.initial_image.clone())
                    && let Err(err) = self.crossfader.set_image(&to, &initial)
                {
                    tracing::error!(scene = %to, "initial image not applied: {err}");
                }
                self.emit(DirectorEvent::SceneEntering { from, to });
            }
            ChoreoStep::SceneDeactivated(key) => self.emit(DirectorEvent::SceneDeactivated(key)),
            ChoreoStep::SceneCompleted(key) => self.emit(DirectorEvent::SceneCompleted(key)),
            ChoreoStep::Finished => self.emit(DirectorEvent::Finished),
            ChoreoStep::ContinueShown => self.emit(DirectorEvent::ContinueShown),
            ChoreoStep::ContinueHidden => self.emit(DirectorEvent::ContinueHidden),
            ChoreoStep::AwaitingSignal(signal) => {
                self.emit(DirectorEvent::AwaitingSignal(signal));
            }
            ChoreoStep::Cue(cue) => self.run_cue(cue),
        }
    }

    fn run_cue(&mut self, cue: Cue) {
        let mix = self.tuning.mixer;
        match cue {
            Cue::Text { text, hold_ms } => self.text.show(self.now, &text, hold_ms),
            Cue::Image { image } => {
                let Some(scene) = self.choreo.current_scene().map(str::to_owned) else {
                    return;
                };
                if let Err(err) = self.crossfader.transition(&scene, &image) {
                    tracing::error!(%scene, %image, "image cue ignored: {err}");
                }
            }
            Cue::Music { name, volume, fade } => self.mixer.play_music(
                &name,
                volume.unwrap_or(mix.music_volume),
                fade.unwrap_or(mix.music_fade),
            ),
            Cue::Ambience { name, volume, fade } => self.mixer.play_ambience(
                &name,
                volume.unwrap_or(mix.ambience_volume),
                fade.unwrap_or(mix.ambience_fade),
            ),
            Cue::FadeOutAmbience { name, fade } => self
                .mixer
                .fade_out_ambience(&name, fade.unwrap_or(mix.ambience_fade_out)),
            Cue::Sfx { name, volume } => self
                .mixer
                .play_sfx(&name, volume.unwrap_or(mix.sfx_volume)),
            Cue::StopMusic => self.mixer.stop_music(),
            Cue::StopAll => self.mixer.stop_all(),
            Cue::DuckMusic { volume, fade } => self.mixer.duck_music(volume, fade),
            Cue::Particles { mode } => {
                self.particles.set_mode(mode);
                self.emit(DirectorEvent::ParticleMode(mode));
            }
            Cue::Burst { count } => self.particles.burst(count),
            Cue::BlowDetection => self.start_blow_detection(),
            Cue::VoicePlayer { name } => {
                self.dismiss_voice();
                let path = self.script.assets.resolve(AssetKind::Voice, &name);
                self.voice = Some(VoiceMessage::new(path.clone(), self.tuning.voice));
                self.emit(DirectorEvent::VoicePlayerShown { path });
            }
            Cue::Emit { event } => self.emit(DirectorEvent::Emitted(event)),
        }
    }

    fn dismiss_voice(&mut self) {
        if let Some(old) = self.voice.take()
            && let Some(clip) = old.clip()
        {
            self.mixer.backend_mut().stop(clip);
        }
    }

    fn start_blow_detection(&mut self) {
        self.blow.cleanup();
        self.blow = BlowGestureDetector::new(self.tuning.blow);
        self.blow.start(self.microphone_api);
        let event = match self.blow.state() {
            BlowState::RequestingPermission => DirectorEvent::MicrophoneRequested,
            _ => DirectorEvent::BlowManualOnly,
        };
        self.emit(event);
    }

    fn on_blow_detected(&mut self) {
        self.emit(DirectorEvent::BlowDetected);
        self.blow.cleanup();
        self.raise(BLOW_SIGNAL);
    }

    fn on_voice_event(&mut self, event: Option<VoiceEvent>) {
        let Some(event) = event else {
            return;
        };
        self.emit(DirectorEvent::Voice(event));
        match event {
            VoiceEvent::Started => {
                let voice = self.tuning.voice;
                self.mixer.duck_music(voice.duck_music_to, voice.duck_fade);
            }
            VoiceEvent::Completed { first: true } => self.raise(VOICE_COMPLETED_SIGNAL),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/director.rs"]
mod tests;
