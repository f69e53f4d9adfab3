use std::collections::BTreeMap;

use crate::foundation::error::{ReverieError, ReverieResult};

/// Kind of audio asset being looked up.
///
/// Lookups differ per kind: ambience beds may be listed in either the music or the sfx table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Single-instance background music.
    Music,
    /// Looping, layerable background bed.
    Ambience,
    /// One-shot effect.
    Sfx,
    /// Recorded voice message.
    Voice,
}

/// Logical asset name to file path tables.
///
/// Names missing from a table resolve through a fixed naming convention, so a script only has to
/// list assets whose file name differs from their logical name.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AssetCatalog {
    /// Music clips.
    pub music: BTreeMap<String, String>,
    /// Sound effects.
    pub sfx: BTreeMap<String, String>,
    /// Voice messages.
    pub voice: BTreeMap<String, String>,
}

impl AssetCatalog {
    /// Resolve a logical audio name to a path.
    ///
    /// Fallbacks when the name is not listed:
    /// - music: `assets/music/{name}.mp3`
    /// - ambience: the music table, then the sfx table, then `assets/sfx/{name}.mp3`
    /// - sfx: `assets/sfx/{name}.mp3`
    /// - voice: `assets/voice/{name}.mp3`
    pub fn resolve(&self, kind: AssetKind, name: &str) -> String {
        let listed = match kind {
            AssetKind::Music => self.music.get(name),
            AssetKind::Ambience => self.music.get(name).or_else(|| self.sfx.get(name)),
            AssetKind::Sfx => self.sfx.get(name),
            AssetKind::Voice => self.voice.get(name),
        };
        if let Some(path) = listed {
            return path.clone();
        }
        let dir = match kind {
            AssetKind::Music => "music",
            AssetKind::Ambience | AssetKind::Sfx => "sfx",
            AssetKind::Voice => "voice",
        };
        format!("assets/{dir}/{name}.mp3")
    }

    /// Path of a background image in a scene's image folder.
    pub fn image_path(folder: &str, name: &str) -> String {
        format!("assets/{folder}/{name}.png")
    }

    /// Check that every listed path is a well-formed relative path.
    pub fn validate(&self) -> ReverieResult<()> {
        for (table, entries) in [
            ("music", &self.music),
            ("sfx", &self.sfx),
            ("voice", &self.voice),
        ] {
            for (name, path) in entries {
                if name.trim().is_empty() {
                    return Err(ReverieError::validation(format!(
                        "assets.{table} contains an empty logical name"
                    )));
                }
                normalize_rel_path(path).map_err(|e| match e {
                    ReverieError::Validation(msg) => {
                        ReverieError::validation(format!("assets.{table}.{name}: {msg}"))
                    }
                    other => other,
                })?;
            }
        }
        Ok(())
    }
}

/// Canonical form of a script-relative asset path: forward slashes, no empty or `.` segments.
///
/// Absolute paths, empty paths and `..` segments are rejected.
pub fn normalize_rel_path(source: &str) -> ReverieResult<String> {
    let unified = source.replace('\\', "/");
    if unified.is_empty() {
        return Err(ReverieError::validation("asset path must be non-empty"));
    }
    if unified.starts_with('/') {
        return Err(ReverieError::validation("asset paths must be relative"));
    }
    let segments: Vec<&str> = unified
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect();
    if segments.contains(&"..") {
        return Err(ReverieError::validation("asset paths must not contain '..'"));
    }
    if segments.is_empty() {
        return Err(ReverieError::validation("asset path names no file"));
    }
    Ok(segments.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/catalog.rs"]
mod tests;
