use super::*;

fn minimal() -> Script {
    Script::from_json_str(
        r#"{
            "start": "garden",
            "scenes": [
                {
                    "key": "garden",
                    "image_folder": "garden",
                    "initial_image": "dawn",
                    "layers": [0.2, 0.6, 1.0],
                    "beats": [
                        { "cue": { "music": { "name": "theme", "volume": 0.5 } } },
                        { "cue": { "text": { "text": "Hello <b>you</b>" } } },
                        { "wait": 7.0 },
                        { "cue": "stop_music" },
                        "await_continue",
                        { "await_signal": "blow" }
                    ],
                    "next": { "auto": "beach" }
                },
                {
                    "key": "beach",
                    "image_folder": "beach",
                    "initial_image": "shore",
                    "layers": [0.5],
                    "enter_sec": 3.0
                }
            ]
        }"#,
    )
    .unwrap()
}

#[test]
fn parses_beats_cues_and_defaults() {
    let script = minimal();
    script.validate().unwrap();

    let garden = script.scene("garden").unwrap();
    assert_eq!(garden.beats.len(), 6);
    assert_eq!(
        garden.beats[0],
        Beat::Cue(Cue::Music {
            name: "theme".to_owned(),
            volume: Some(0.5),
            fade: None,
        })
    );
    assert_eq!(garden.beats[2], Beat::Wait(7.0));
    assert_eq!(garden.beats[3], Beat::Cue(Cue::StopMusic));
    assert_eq!(garden.beats[4], Beat::AwaitContinue);
    assert_eq!(garden.beats[5], Beat::AwaitSignal("blow".to_owned()));
    assert_eq!(garden.next, Continuation::Auto("beach".to_owned()));

    let beach = script.scene("beach").unwrap();
    assert_eq!(beach.next, Continuation::End);
    assert_eq!(beach.enter_sec, Some(3.0));
    assert_eq!(script.tuning, Tuning::default());
    assert!(script.scene("cafe").is_none());
}

#[test]
fn tuning_sections_override_individually() {
    let script = Script::from_json_str(
        r#"{
            "start": "a",
            "scenes": [{ "key": "a", "image_folder": "a", "initial_image": "x", "layers": [0.5] }],
            "tuning": { "scene": { "enter": 0.5 }, "blow": { "threshold": 80 } }
        }"#,
    )
    .unwrap();
    assert_eq!(script.tuning.scene.enter, 0.5);
    assert_eq!(script.tuning.scene.continue_fade_out, 0.5);
    assert_eq!(script.tuning.blow.threshold, 80.0);
    assert_eq!(script.tuning.mixer, MixerTuning::default());
}

#[test]
fn json_round_trip_preserves_script() {
    let script = minimal();
    let json = script.to_json_pretty().unwrap();
    assert_eq!(Script::from_json_str(&json).unwrap(), script);
}

#[test]
fn rejects_unknown_start_and_continuation_targets() {
    let mut script = minimal();
    script.start = "nowhere".to_owned();
    let err = script.validate().unwrap_err().to_string();
    assert!(err.contains("start scene 'nowhere'"), "{err}");

    let mut script = minimal();
    script.scenes[0].next = Continuation::AwaitContinue("cafe".to_owned());
    let err = script.validate().unwrap_err().to_string();
    assert!(err.contains("unknown scene 'cafe'"), "{err}");
}

#[test]
fn rejects_duplicate_keys_and_empty_layer_sets() {
    let mut script = minimal();
    script.scenes[1].key = "garden".to_owned();
    assert!(script.validate().is_err());

    let mut script = minimal();
    script.scenes[1].layers.clear();
    assert!(script.validate().is_err());

    let mut script = minimal();
    script.scenes[0].layers[1] = 1.5;
    let err = script.validate().unwrap_err().to_string();
    assert!(err.contains("layer 1"), "{err}");
}

#[test]
fn rejects_bad_beat_values_with_location() {
    let mut script = minimal();
    script.scenes[0].beats[2] = Beat::Wait(-1.0);
    let err = script.validate().unwrap_err().to_string();
    assert!(err.contains("scene 'garden' beat 2"), "{err}");

    let mut script = minimal();
    script.scenes[0].beats[0] = Beat::Cue(Cue::Ambience {
        name: "rain".to_owned(),
        volume: Some(2.0),
        fade: None,
    });
    let err = script.validate().unwrap_err().to_string();
    assert!(err.contains("volume"), "{err}");

    let mut script = minimal();
    script.scenes[0].beats[0] = Beat::Cue(Cue::DuckMusic {
        volume: 0.1,
        fade: f64::NAN,
    });
    assert!(script.validate().is_err());
}

#[test]
fn rejects_bad_tuning() {
    let mut script = minimal();
    script.tuning.scene.enter = -2.0;
    let err = script.validate().unwrap_err().to_string();
    assert!(err.contains("tuning.scene.enter"), "{err}");
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = Script::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, ReverieError::Serde(_)));
    assert!(Script::from_path("/definitely/not/here.json").is_err());
}

#[test]
fn instant_auto_cycle_is_rejected() {
    let mut script = minimal();
    let beach = script.scenes.iter_mut().find(|s| s.key == "beach").unwrap();
    beach.enter_sec = Some(0.0);
    beach.next = Continuation::Auto("beach".to_owned());
    let err = script.validate().unwrap_err().to_string();
    assert!(err.contains("beach -> beach"), "{err}");

    let mut script = Script::from_json_str(
        r#"{
            "start": "a",
            "scenes": [
                { "key": "a", "image_folder": "a", "initial_image": "x", "layers": [0.5],
                  "enter_sec": 0.0, "beats": [ { "wait": 0.0 } ], "next": { "auto": "b" } },
                { "key": "b", "image_folder": "b", "initial_image": "x", "layers": [0.5],
                  "enter_sec": 0.0, "next": { "auto": "a" } }
            ]
        }"#,
    )
    .unwrap();
    let err = script.validate().unwrap_err().to_string();
    assert!(err.contains("chain automatically without taking any time"), "{err}");

    // Any beat that takes time breaks the loop.
    script.scenes[1].beats.push(Beat::Wait(0.5));
    script.validate().unwrap();
    script.scenes[1].beats = vec![Beat::AwaitSignal("blow".to_owned())];
    script.validate().unwrap();
}

#[test]
fn instant_cycle_uses_the_default_enter_duration() {
    let mut script = minimal();
    let beach = script.scenes.iter_mut().find(|s| s.key == "beach").unwrap();
    beach.enter_sec = None;
    beach.next = Continuation::Auto("beach".to_owned());
    script.validate().unwrap();

    script.tuning.scene.enter = 0.0;
    assert!(script.validate().is_err());
}
