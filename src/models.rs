//! Persisted state document and catalogue types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AppError, AppResult};

/// Name of the reserved, always-present favorites playlist.
pub const FAVORITES_PLAYLIST: &str = "__favorites__";

/// Case-insensitive comparison used for playlist names and track paths.
pub fn same_key(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Window theme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

impl Theme {
    /// Normalize user input: trimmed, case-insensitive, blank means `system`.
    pub fn parse(input: &str) -> AppResult<Self> {
        match input.trim().to_lowercase().as_str() {
            "" | "system" => Ok(Self::System),
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(AppError::Validation(format!("invalid theme: {}", input.trim()))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Theme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Anything unrecognised on disk self-corrects to [`Theme::System`].
impl<'de> Deserialize<'de> for Theme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(raw
            .as_str()
            .and_then(|s| Theme::parse(s).ok())
            .unwrap_or_default())
    }
}

/// A named, ordered list of canonical track paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Playlist {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tracks: Vec<String>,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
        }
    }

    pub fn is_favorites(&self) -> bool {
        same_key(&self.name, FAVORITES_PLAYLIST)
    }

    pub fn contains_track(&self, track: &str) -> bool {
        self.tracks.iter().any(|t| same_key(t, track))
    }
}

/// The persisted application state, stored as `state.json`.
///
/// Every field is optional on disk. Fields this version does not know about
/// are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    #[serde(deserialize_with = "null_as_default")]
    pub last_played_path: String,
    /// Epoch milliseconds.
    #[serde(deserialize_with = "null_as_default")]
    pub last_played_at: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub composer_filter: String,
    #[serde(deserialize_with = "null_as_default")]
    pub album_filter: String,
    pub theme: Theme,
    /// Single-directory setting written by older versions.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub music_dir: String,
    #[serde(deserialize_with = "null_as_default")]
    pub music_dirs: Vec<PathBuf>,
    #[serde(deserialize_with = "null_as_default")]
    pub playlists: Vec<Playlist>,
    #[serde(deserialize_with = "null_as_default")]
    pub active_playlist: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AppState {
    /// Load-time defaulting applied after every read.
    pub fn apply_defaults(&mut self) {
        self.ensure_favorites();
        if self.music_dirs.is_empty() && !self.music_dir.trim().is_empty() {
            self.music_dirs = vec![PathBuf::from(self.music_dir.trim())];
        }
    }

    /// Exactly one favorites playlist, first, under its canonical name.
    ///
    /// Entries differing only in case are merged in file order.
    fn ensure_favorites(&mut self) {
        let mut favorites = Playlist::new(FAVORITES_PLAYLIST);
        let mut others = Vec::with_capacity(self.playlists.len());
        for playlist in self.playlists.drain(..) {
            if !playlist.is_favorites() {
                others.push(playlist);
                continue;
            }
            for track in playlist.tracks {
                if !favorites.contains_track(&track) {
                    favorites.tracks.push(track);
                }
            }
        }
        others.insert(0, favorites);
        self.playlists = others;
    }

    /// Index of the playlist called `name`, ignoring case.
    pub fn playlist_index(&self, name: &str) -> Option<usize> {
        self.playlists.iter().position(|p| same_key(&p.name, name))
    }
}

/// The last track handed to the player, with when it happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastPlayed {
    pub path: String,
    /// Epoch milliseconds.
    pub played_at: i64,
}

/// One discovered audio file. Rebuilt on every listing, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MusicFile {
    pub name: String,
    pub path: String,
    pub ext: String,
    pub composer: String,
    pub album: String,
}
