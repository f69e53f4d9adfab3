use super::*;

fn catalog() -> AssetCatalog {
    let mut c = AssetCatalog::default();
    c.music.insert("strings".into(), "assets/music/string.mp3".into());
    c.music.insert("rain".into(), "assets/music/rain.mp3".into());
    c.sfx.insert("typewriter".into(), "assets/sfx/typing.mp3".into());
    c.voice.insert("message".into(), "assets/music/personal.mp3".into());
    c
}

#[test]
fn listed_names_win_over_convention() {
    let c = catalog();
    assert_eq!(c.resolve(AssetKind::Music, "strings"), "assets/music/string.mp3");
    assert_eq!(c.resolve(AssetKind::Sfx, "typewriter"), "assets/sfx/typing.mp3");
    assert_eq!(c.resolve(AssetKind::Voice, "message"), "assets/music/personal.mp3");
}

#[test]
fn unlisted_names_follow_naming_convention() {
    let c = catalog();
    assert_eq!(c.resolve(AssetKind::Music, "wind"), "assets/music/wind.mp3");
    assert_eq!(c.resolve(AssetKind::Sfx, "bottle"), "assets/sfx/bottle.mp3");
    assert_eq!(c.resolve(AssetKind::Voice, "hello"), "assets/voice/hello.mp3");
}

#[test]
fn ambience_searches_music_then_sfx_then_sfx_folder() {
    let c = catalog();
    assert_eq!(c.resolve(AssetKind::Ambience, "rain"), "assets/music/rain.mp3");
    assert_eq!(c.resolve(AssetKind::Ambience, "typewriter"), "assets/sfx/typing.mp3");
    assert_eq!(c.resolve(AssetKind::Ambience, "birds"), "assets/sfx/birds.mp3");
}

#[test]
fn image_paths_use_scene_folder() {
    assert_eq!(AssetCatalog::image_path("garden", "dawn"), "assets/garden/dawn.png");
}

#[test]
fn normalize_rel_path_rejects_escapes() {
    assert_eq!(normalize_rel_path("a/./b\\c.mp3").unwrap(), "a/b/c.mp3");
    assert!(normalize_rel_path("/abs.mp3").is_err());
    assert!(normalize_rel_path("../up.mp3").is_err());
    assert!(normalize_rel_path("").is_err());
    assert!(normalize_rel_path("./").is_err());
}

#[test]
fn validate_reports_table_and_name() {
    let mut c = catalog();
    assert!(c.validate().is_ok());
    c.sfx.insert("bad".into(), "../escape.mp3".into());
    let err = c.validate().unwrap_err().to_string();
    assert!(err.starts_with("invalid script data:"));
    assert!(err.contains("assets.sfx.bad"));
}
