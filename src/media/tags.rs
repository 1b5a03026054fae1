//! Embedded tag extraction for catalogue entries.

use std::path::Path;

use lofty::file::TaggedFileExt;
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::{ItemKey, Tag};

/// Composer and album read from a file's tags. Empty when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub composer: String,
    pub album: String,
}

/// Best-effort metadata source used by the library scanner.
///
/// Implementations must not fail: anything unreadable yields empty strings.
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> TrackTags;
}

impl<F> TagReader for F
where
    F: Fn(&Path) -> TrackTags + Send + Sync,
{
    fn read_tags(&self, path: &Path) -> TrackTags {
        self(path)
    }
}

/// Reads ID3, Vorbis comments, MP4 atoms and friends through `lofty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> TrackTags {
        let tagged_file = match read_from_path(path) {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "No readable tags");
                return TrackTags::default();
            }
        };

        tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
            .map(tags_from)
            .unwrap_or_default()
    }
}

/// Composer falls back to the artist when the composer field is blank.
fn tags_from(tag: &Tag) -> TrackTags {
    let composer = tag
        .get_string(&ItemKey::Composer)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| tag.artist().map(|s| s.trim().to_string()))
        .unwrap_or_default();

    let album = tag
        .album()
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    TrackTags { composer, album }
}
