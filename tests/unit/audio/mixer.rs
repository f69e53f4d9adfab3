use super::*;
use crate::audio::backend::{AudioCall, InMemoryAudio};

fn t(secs: f64) -> Time {
    Time::from_secs(secs)
}

fn mixer(backend: InMemoryAudio) -> AudioLayerMixer<InMemoryAudio> {
    AudioLayerMixer::new(backend, AssetCatalog::default(), MixerTuning::default())
}

#[test]
fn music_crossfade_leaves_one_audible_clip() {
    let mut m = mixer(InMemoryAudio::new());
    m.play_music("piano", 0.5, 2.0);
    m.advance(t(1.0));
    m.play_music("wave", 0.3, 2.0);
    m.advance(t(1.5));
    m.play_music("rain", 0.4, 2.0);
    m.advance(t(1.7));
    assert!(m.audible_music_count() >= 2);

    m.advance(t(10.0));
    assert_eq!(m.audible_music_count(), 1);
    assert_eq!(m.music_name(), Some("rain"));
    assert_eq!(m.backend().audible_paths(), vec!["assets/music/rain.mp3"]);
}

#[test]
fn music_volume_is_level_times_gain() {
    let mut m = mixer(InMemoryAudio::new());
    m.play_music("piano", 0.5, 1.0);
    m.advance(t(2.0));
    let (_, clip) = m.backend().live_clips().next().unwrap();
    assert!((clip.volume - 0.5).abs() < 1e-9);

    m.set_channel_gain(Channel::Music, 0.4);
    m.advance(t(2.1));
    let (_, clip) = m.backend().live_clips().next().unwrap();
    assert!((clip.volume - 0.5 * 0.4).abs() < 1e-9);
}

#[test]
fn default_cue_volumes_reach_the_backend_unscaled() {
    let tuning = MixerTuning::default();
    let mut m = mixer(InMemoryAudio::new());
    m.play_music("piano", tuning.music_volume, 0.0);
    m.play_sfx("match", tuning.sfx_volume);
    m.advance(t(0.1));
    let mut volumes: Vec<f64> = m.backend().live_clips().map(|(_, c)| c.volume).collect();
    volumes.sort_by(f64::total_cmp);
    assert!((volumes[0] - 0.4).abs() < 1e-9, "{volumes:?}");
    assert!((volumes[1] - 0.6).abs() < 1e-9, "{volumes:?}");
}

#[test]
fn failed_music_keeps_previous_track() {
    let mut backend = InMemoryAudio::new();
    backend.mark_missing("assets/music/ghost.mp3");
    let mut m = mixer(backend);
    m.play_music("piano", 0.5, 1.0);
    m.advance(t(1.0));
    m.play_music("ghost", 0.5, 1.0);
    m.advance(t(3.0));
    assert_eq!(m.music_name(), Some("piano"));
    assert_eq!(m.music_level(), Some(0.5));
}

#[test]
fn ambience_fade_out_removes_entry_after_fade() {
    let mut m = mixer(InMemoryAudio::new());
    m.play_ambience("rain", 0.2, 1.0);
    m.fade_out_ambience("rain", 0.5);
    m.advance(t(0.25));
    assert!(m.is_ambience_active("rain"));
    m.advance(t(1.5));
    assert!(!m.is_ambience_active("rain"));
    assert!(m.backend().live_clips().next().is_none());
}

#[test]
fn ambience_layers_and_retargets_without_duplicates() {
    let mut m = mixer(InMemoryAudio::new());
    m.play_ambience("rain", 0.2, 1.0);
    m.play_ambience("wind", 0.1, 1.0);
    m.advance(t(2.0));
    m.play_ambience("rain", 0.05, 1.0);
    m.advance(t(4.0));

    assert_eq!(m.ambience_names(), vec!["rain", "wind"]);
    assert_eq!(m.ambience_level("rain"), Some(0.05));
    assert_eq!(m.backend().play_count("assets/sfx/rain.mp3"), 1);
}

#[test]
fn releasing_ambience_restarts_fresh() {
    let mut m = mixer(InMemoryAudio::new());
    m.play_ambience("rain", 0.2, 1.0);
    m.advance(t(1.0));
    m.fade_out_ambience("rain", 2.0);
    m.advance(t(1.5));
    m.play_ambience("rain", 0.2, 1.0);
    m.advance(t(5.0));

    assert!(m.is_ambience_active("rain"));
    assert_eq!(m.backend().play_count("assets/sfx/rain.mp3"), 2);
    assert_eq!(m.backend().live_clips().count(), 1);
}

#[test]
fn stop_all_empties_ambience_mid_fade() {
    let mut m = mixer(InMemoryAudio::new());
    m.play_music("piano", 0.5, 2.0);
    m.play_ambience("rain", 0.2, 2.0);
    m.play_ambience("wind", 0.2, 2.0);
    m.advance(t(0.5));
    m.stop_all();

    assert!(m.ambience_names().is_empty());
    assert_eq!(m.music_name(), None);
    assert!(m.backend().live_clips().next().is_none());
}

#[test]
fn blocked_ambience_is_queued_and_replayed_once() {
    let mut m = mixer(InMemoryAudio::autoplay_blocked());
    m.play_ambience("rain", 0.2, 1.0);
    m.play_ambience("wind", 0.1, 1.0);
    assert_eq!(m.pending().len(), 2);
    assert!(m.ambience_names().is_empty());

    m.backend_mut().unlock();
    m.on_user_gesture();
    assert!(m.pending().is_empty());
    assert_eq!(m.ambience_names(), vec!["rain", "wind"]);

    let plays: Vec<_> = m
        .backend()
        .calls()
        .iter()
        .filter_map(|c| match c {
            AudioCall::Play { path, .. } => Some(path.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(plays, vec!["assets/sfx/rain.mp3", "assets/sfx/wind.mp3"]);

    m.on_user_gesture();
    assert_eq!(m.backend().play_count("assets/sfx/rain.mp3"), 1);
}

#[test]
fn blocked_ambience_after_gesture_is_dropped() {
    let mut m = mixer(InMemoryAudio::autoplay_blocked());
    m.on_user_gesture();
    m.play_ambience("rain", 0.2, 1.0);
    assert!(m.pending().is_empty());
    assert!(!m.is_ambience_active("rain"));
}

#[test]
fn missing_ambience_is_never_queued() {
    let mut backend = InMemoryAudio::new();
    backend.mark_missing("assets/sfx/birds.mp3");
    let mut m = mixer(backend);
    m.play_ambience("birds", 0.2, 1.0);
    assert!(m.pending().is_empty());
}

#[test]
fn stop_all_clears_pending_queue() {
    let mut m = mixer(InMemoryAudio::autoplay_blocked());
    m.play_ambience("rain", 0.2, 1.0);
    m.stop_all();
    m.backend_mut().unlock();
    m.on_user_gesture();
    assert!(m.ambience_names().is_empty());
}

#[test]
fn sfx_is_fire_and_forget() {
    let mut m = mixer(InMemoryAudio::new());
    m.play_sfx("match", 1.0);
    let (_, clip) = m.backend().live_clips().next().unwrap();
    assert!(!clip.looped);
    assert!((clip.volume - 1.0).abs() < 1e-9);
    assert_eq!(m.music_name(), None);
    assert!(m.ambience_names().is_empty());
}

#[test]
fn duck_music_keeps_clip_alive() {
    let mut m = mixer(InMemoryAudio::new());
    m.play_music("piano", 0.5, 0.0);
    m.advance(t(0.1));
    m.duck_music(0.0, 1.5);
    m.advance(t(5.0));
    assert_eq!(m.music_name(), Some("piano"));
    assert_eq!(m.music_level(), Some(0.0));
    assert_eq!(m.backend().live_clips().count(), 1);
}

#[test]
fn tuning_validation_rejects_bad_gain() {
    let tuning = MixerTuning {
        sfx_gain: 1.5,
        ..MixerTuning::default()
    };
    assert!(tuning.validate().is_err());
    assert!(MixerTuning::default().validate().is_ok());
}
