use super::*;
use crate::audio::backend::{AudioCall, InMemoryAudio};
use crate::input::blow::ScriptedMicrophone;

fn script(json: &str) -> Script {
    Script::from_json_str(json).unwrap()
}

fn director(json: &str, backend: InMemoryAudio) -> Director<InMemoryAudio> {
    Director::new(script(json), backend, Vec2::new(1024.0, 768.0)).unwrap()
}

// Step at 60 fps from `from` to `to` inclusive and return the events.
fn run(d: &mut Director<InMemoryAudio>, from: f64, to: f64) -> Vec<DirectorEvent> {
    let mut frame = (from * 60.0).round() as u64;
    let end = (to * 60.0).round() as u64;
    while frame <= end {
        d.advance(Time::from_secs(frame as f64 / 60.0));
        frame += 1;
    }
    events(d)
}

fn events(d: &mut Director<InMemoryAudio>) -> Vec<DirectorEvent> {
    d.drain_events().into_iter().map(|(_, e)| e).collect()
}

fn pos(events: &[DirectorEvent], wanted: &DirectorEvent) -> usize {
    events
        .iter()
        .position(|e| e == wanted)
        .unwrap_or_else(|| panic!("missing {wanted:?} in {events:?}"))
}

const TWO_SCENES: &str = r#"{
    "start": "garden",
    "scenes": [
        {
            "key": "garden", "image_folder": "garden", "initial_image": "dawn",
            "layers": [0.3, 0.8], "enter_sec": 1.0,
            "beats": [
                { "cue": { "music": { "name": "theme" } } },
                { "cue": { "ambience": { "name": "birds" } } },
                { "cue": { "text": { "text": "Hi" } } },
                { "wait": 2.0 },
                { "cue": { "image": { "image": "noon" } } },
                { "wait": 2.0 }
            ],
            "next": { "auto": "beach" }
        },
        {
            "key": "beach", "image_folder": "beach", "initial_image": "shore",
            "layers": [0.5],
            "beats": [
                { "cue": { "sfx": { "name": "wave" } } },
                { "cue": { "particles": { "mode": "petals" } } }
            ]
        }
    ]
}"#;

#[test]
fn plays_scenes_in_order_and_chains() {
    let mut d = director(TWO_SCENES, InMemoryAudio::new());
    d.start();
    let log = run(&mut d, 0.0, 9.0);

    assert_eq!(
        log[0],
        DirectorEvent::SceneEntering {
            from: None,
            to: "garden".to_owned()
        }
    );
    let shown = pos(&log, &DirectorEvent::TextShown("Hi".to_owned()));
    let committed = pos(
        &log,
        &DirectorEvent::ImageCommitted {
            scene: "garden".to_owned(),
            image: "noon".to_owned(),
        },
    );
    let garden_done = pos(&log, &DirectorEvent::SceneCompleted("garden".to_owned()));
    let beach = pos(
        &log,
        &DirectorEvent::SceneEntering {
            from: Some("garden".to_owned()),
            to: "beach".to_owned(),
        },
    );
    let petals = pos(&log, &DirectorEvent::ParticleMode(ParticleMode::Petals));
    let finished = pos(&log, &DirectorEvent::Finished);
    assert!(shown < committed && committed < garden_done);
    assert!(garden_done < beach && beach < petals && petals < finished);
    pos(&log, &DirectorEvent::SceneDeactivated("garden".to_owned()));
    pos(&log, &DirectorEvent::TextHidden);

    assert_eq!(d.mixer().music_name(), Some("theme"));
    assert!(d.mixer().is_ambience_active("birds"));
    assert_eq!(d.backend().play_count("assets/sfx/wave.mp3"), 1);
    assert_eq!(
        d.crossfader()
            .layer_set("garden")
            .and_then(|s| s.current_image()),
        Some("noon")
    );
    assert_eq!(
        d.crossfader()
            .layer_set("beach")
            .and_then(|s| s.current_image()),
        Some("shore")
    );
    assert!(d.particles().active_count() > 0);

    let snap = d.snapshot();
    assert_eq!(snap.scene.as_deref(), Some("beach"));
    assert_eq!(snap.state, SceneState::Completed);
    assert_eq!(snap.ambience, vec!["birds".to_owned()]);
}

#[test]
fn skip_silences_audio_and_drops_pending_beats() {
    let mut d = director(
        r#"{
            "start": "garden",
            "scenes": [
                {
                    "key": "garden", "image_folder": "garden", "initial_image": "dawn",
                    "layers": [0.5], "enter_sec": 0.5,
                    "beats": [
                        { "cue": { "music": { "name": "theme" } } },
                        { "wait": 1.0 },
                        { "cue": { "sfx": { "name": "late" } } }
                    ],
                    "next": { "auto": "beach" }
                },
                { "key": "beach", "image_folder": "beach", "initial_image": "shore", "layers": [0.5] }
            ]
        }"#,
        InMemoryAudio::new(),
    );
    d.start();
    run(&mut d, 0.0, 1.0);
    assert_eq!(d.mixer().music_name(), Some("theme"));

    d.skip_to("beach");
    let log = run(&mut d, 1.0, 6.0);
    pos(
        &log,
        &DirectorEvent::SceneEntering {
            from: Some("garden".to_owned()),
            to: "beach".to_owned(),
        },
    );
    assert_eq!(d.backend().play_count("assets/sfx/late.mp3"), 0);
    assert_eq!(d.mixer().music_name(), None);
    assert!(
        d.backend()
            .calls()
            .iter()
            .any(|c| matches!(c, AudioCall::Stop(_)))
    );
}

#[test]
fn blocked_ambience_replays_on_first_gesture_only() {
    let mut d = director(
        r#"{
            "start": "garden",
            "scenes": [{
                "key": "garden", "image_folder": "garden", "initial_image": "dawn",
                "layers": [0.5], "enter_sec": 1.0,
                "beats": [ { "cue": { "ambience": { "name": "birds", "volume": 0.3 } } } ]
            }]
        }"#,
        InMemoryAudio::autoplay_blocked(),
    );
    d.start();
    run(&mut d, 0.0, 1.5);
    assert_eq!(d.mixer().pending().len(), 1);
    assert!(!d.mixer().is_ambience_active("birds"));

    d.backend_mut().unlock();
    d.user_gesture();
    assert_eq!(events(&mut d), vec![DirectorEvent::AudioUnlocked]);
    assert!(d.mixer().is_ambience_active("birds"));
    assert!(d.mixer().pending().is_empty());

    d.user_gesture();
    assert!(events(&mut d).is_empty());
    assert_eq!(d.backend().play_count("assets/sfx/birds.mp3"), 1);
}

const BLOW_SCENE: &str = r#"{
    "start": "cake",
    "scenes": [{
        "key": "cake", "image_folder": "cake", "initial_image": "candles",
        "layers": [0.5], "enter_sec": 0.0,
        "beats": [
            { "cue": "blow_detection" },
            { "await_signal": "blow" },
            { "cue": { "sfx": { "name": "cheer" } } }
        ]
    }]
}"#;

#[test]
fn microphone_blow_resumes_sequence() {
    let mut d = director(BLOW_SCENE, InMemoryAudio::new());
    d.start();
    d.advance(Time::ZERO);
    let log = events(&mut d);
    pos(&log, &DirectorEvent::MicrophoneRequested);
    pos(&log, &DirectorEvent::AwaitingSignal("blow".to_owned()));
    assert_eq!(d.snapshot().blow, BlowState::RequestingPermission);

    d.microphone_granted(Box::new(ScriptedMicrophone::new([10, 200])));
    d.advance(Time::from_secs(1.0 / 60.0));
    assert!(events(&mut d).is_empty());

    d.advance(Time::from_secs(2.0 / 60.0));
    let log = events(&mut d);
    let detected = pos(&log, &DirectorEvent::BlowDetected);
    let raised = pos(&log, &DirectorEvent::SignalRaised("blow".to_owned()));
    assert!(detected < raised);
    assert_eq!(d.backend().play_count("assets/sfx/cheer.mp3"), 1);
    assert_eq!(d.blow().state(), BlowState::Cleaned);
    assert!(!d.tap_blow());
}

#[test]
fn manual_blow_when_microphone_is_missing() {
    let mut d = director(BLOW_SCENE, InMemoryAudio::new()).with_microphone_api(false);
    d.start();
    d.advance(Time::ZERO);
    pos(&events(&mut d), &DirectorEvent::BlowManualOnly);
    assert!(d.blow().manual_visible());

    assert!(d.tap_blow());
    assert!(!d.tap_blow());
    assert_eq!(d.backend().play_count("assets/sfx/cheer.mp3"), 1);
}

#[test]
fn voice_message_ducks_music_and_gates_continue() {
    let mut backend = InMemoryAudio::new();
    backend.set_duration("assets/voice/msg.mp3", 3.0);
    let mut d = director(
        r#"{
            "start": "letter",
            "scenes": [{
                "key": "letter", "image_folder": "letter", "initial_image": "desk",
                "layers": [0.5], "enter_sec": 0.0,
                "beats": [
                    { "cue": { "music": { "name": "theme", "volume": 0.5, "fade": 0.0 } } },
                    { "cue": { "voice_player": { "name": "msg" } } },
                    { "await_signal": "voice_completed" },
                    "await_continue",
                    { "cue": { "emit": { "event": "done" } } }
                ]
            }]
        }"#,
        backend,
    );
    d.start();
    let log = run(&mut d, 0.0, 1.0);
    pos(
        &log,
        &DirectorEvent::VoicePlayerShown {
            path: "assets/voice/msg.mp3".to_owned(),
        },
    );
    assert_eq!(d.mixer().music_level(), Some(0.5));

    d.toggle_voice();
    assert_eq!(
        events(&mut d),
        vec![DirectorEvent::Voice(VoiceEvent::Started)]
    );
    run(&mut d, 1.0, 2.5);
    assert_eq!(d.mixer().music_level(), Some(0.0));
    assert!(!d.snapshot().voice_next_visible);

    let log = run(&mut d, 2.5, 4.5);
    let completed = pos(
        &log,
        &DirectorEvent::Voice(VoiceEvent::Completed { first: true }),
    );
    let shown = pos(&log, &DirectorEvent::ContinueShown);
    assert!(completed < shown);
    assert!(d.snapshot().voice_next_visible);
    assert_eq!(
        d.voice_labels(),
        Some(("0:03".to_owned(), "0:03".to_owned()))
    );

    assert!(d.press_continue());
    let log = run(&mut d, 4.5, 5.5);
    let emitted = pos(&log, &DirectorEvent::Emitted("done".to_owned()));
    assert!(emitted < pos(&log, &DirectorEvent::Finished));

    d.replay_voice();
    assert_eq!(
        events(&mut d),
        vec![DirectorEvent::Voice(VoiceEvent::Started)]
    );
    assert!(d.voice().is_some_and(|v| v.next_visible()));
}

#[test]
fn unknown_scene_requests_are_no_ops() {
    let mut d = director(TWO_SCENES, InMemoryAudio::new());
    d.start();
    run(&mut d, 0.0, 1.5);

    d.go_to_scene("nowhere");
    d.transition_to("beach", -1.0);
    d.skip_to("nowhere");
    assert!(events(&mut d).is_empty());
    assert_eq!(d.choreographer().current_scene(), Some("garden"));
    assert_eq!(d.mixer().music_name(), Some("theme"));
}

#[test]
fn text_tap_respects_grace_period() {
    let mut d = director(
        r#"{
            "start": "a",
            "scenes": [{
                "key": "a", "image_folder": "a", "initial_image": "x",
                "layers": [0.5], "enter_sec": 0.0,
                "beats": [ { "cue": { "text": { "text": "hello" } } } ]
            }]
        }"#,
        InMemoryAudio::new(),
    );
    d.start();
    run(&mut d, 0.0, 0.5);
    assert!(!d.tap_text());

    run(&mut d, 0.5, 2.0);
    assert!(d.tap_text());
    let log = run(&mut d, 2.0, 2.6);
    pos(&log, &DirectorEvent::TextHidden);
}

#[test]
fn pointer_parallax_and_sway_follow_active_scene() {
    let mut d = director(TWO_SCENES, InMemoryAudio::new());
    d.start();
    d.pointer_moved(Point::new(1024.0, 384.0));
    run(&mut d, 0.0, 2.0);

    // Depth 0.3 at the right edge of a wide viewport.
    assert!((d.parallax_offset(0).x - 9.0).abs() < 1e-9);
    assert!(d.parallax_offset(1).x > d.parallax_offset(0).x);
    assert!(d.layer_sway(1).is_some());
    assert!(d.layer_sway(2).is_none());

    d.resize(Vec2::new(400.0, 700.0));
    assert_eq!(d.particles().max_active(), 8);
}

#[test]
fn skip_silences_the_voice_message_too() {
    let mut backend = InMemoryAudio::new();
    backend.set_duration("assets/voice/msg.mp3", 30.0);
    let mut d = director(
        r#"{
            "start": "letter",
            "scenes": [
                {
                    "key": "letter", "image_folder": "letter", "initial_image": "desk",
                    "layers": [0.5], "enter_sec": 0.0,
                    "beats": [
                        { "cue": { "music": { "name": "theme", "fade": 0.0 } } },
                        { "cue": { "voice_player": { "name": "msg" } } },
                        { "await_signal": "voice_completed" }
                    ],
                    "next": { "auto": "hill" }
                },
                {
                    "key": "hill", "image_folder": "hill", "initial_image": "top",
                    "layers": [0.5], "enter_sec": 0.5
                }
            ]
        }"#,
        backend,
    );
    d.start();
    run(&mut d, 0.0, 0.5);
    d.toggle_voice();
    run(&mut d, 0.5, 2.0);
    assert!(d.backend().audible_paths().contains(&"assets/voice/msg.mp3"));

    d.skip_to("hill");
    run(&mut d, 2.0, 3.0);
    assert!(d.backend().audible_paths().is_empty(), "{:?}", d.backend().audible_paths());
    assert!(d.voice().is_none());
    assert_eq!(d.choreographer().current_scene(), Some("hill"));
}
