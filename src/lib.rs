//! Reverie is a scene choreography and layered-media engine for scripted interactive narratives.
//!
//! A narrative is a [`Script`] of scenes, each an ordered list of beats (text lines, background
//! crossfades, audio cues, particle effects, waits and user gates). The engine is deterministic
//! and clock-injected: the host owns the frame loop and passes the current [`Time`] in.
//!
//! - Load and validate a [`Script`]
//! - Create a [`Director`] over an [`AudioBackend`]
//! - Call [`Director::advance`] every frame and forward user input
//! - Drain [`DirectorEvent`]s, or read state through the service accessors
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod animation;
mod assets;
mod audio;
mod choreo;
mod foundation;
mod input;
mod script;
mod session;
mod visual;

pub use crate::foundation::core::{Point, Rng64, Time, Vec2};
pub use crate::foundation::error::{ReverieError, ReverieResult};

pub use crate::animation::ease::Ease;
pub use crate::animation::sway::{
    DEFAULT_DEPTH, NARROW_VIEWPORT_WIDTH, ParallaxRig, ParallaxTuning, SwaySample, ambient_sway,
    is_narrow, parallax_offset,
};
pub use crate::animation::timers::{TimerId, Timers};
pub use crate::animation::tween::{TweenDone, TweenId, Tweener};
pub use crate::assets::catalog::{AssetCatalog, AssetKind, normalize_rel_path};
pub use crate::audio::backend::{
    AudioBackend, AudioCall, ClipId, ClipState, InMemoryAudio, PlaybackError,
};
pub use crate::audio::mixer::{AudioLayerMixer, Channel, MixerTuning, PendingPlayback};
pub use crate::audio::voice::{VoiceEvent, VoiceMessage, VoiceTuning, format_time};
pub use crate::choreo::choreographer::{ChoreoStep, SceneChoreographer, SceneState};
pub use crate::input::blow::{
    BlowGestureDetector, BlowState, BlowTuning, MicrophoneError, MicrophoneStream,
    ScriptedMicrophone,
};
pub use crate::script::model::{
    Beat, Continuation, Cue, SceneDef, SceneTuning, Script, Tuning,
};
pub use crate::session::director::{
    BLOW_SIGNAL, Director, DirectorEvent, DirectorSnapshot, VOICE_COMPLETED_SIGNAL,
};
pub use crate::visual::crossfade::{CrossfadeDone, CrossfadeTuning, ImageLayerCrossfader};
pub use crate::visual::layers::{Layer, LayerSet, Overlay};
pub use crate::visual::particles::{
    Particle, ParticleField, ParticleMode, ParticleTuning, active_cap,
};
pub use crate::visual::text::{
    TextBeatPresenter, TextEvent, TextPhase, TextTuning, visible_char_count,
};
