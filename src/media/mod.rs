//! Audio file types, path containment and tag extraction.

pub mod path_guard;
pub mod tags;

use std::path::{Path, PathBuf};

pub use path_guard::{canonicalize, ensure_within, is_inside, is_within};
pub use tags::{LoftyTagReader, TagReader, TrackTags};

/// Supported audio extensions and the content type served for each.
///
/// Anything not listed here is rejected by listing, reading, streaming and
/// playlist membership alike.
pub const AUDIO_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("flac", "audio/flac"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
];

/// Lowercased extension of `path` without the leading dot.
fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Content type for a supported audio file, `None` for anything else.
pub fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = extension(path)?;
    AUDIO_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Check if a file has a supported audio extension.
pub fn is_audio_file(path: &Path) -> bool {
    mime_for(path).is_some()
}

/// Extension in catalogue form: lowercase with a leading dot (`.flac`).
pub fn dotted_extension(path: &Path) -> String {
    extension(path).map(|e| format!(".{}", e)).unwrap_or_default()
}

/// Platform music folder used when nothing has been configured.
pub fn default_music_dir() -> Option<PathBuf> {
    dirs::audio_dir().or_else(|| dirs::home_dir().map(|home| home.join("Music")))
}
