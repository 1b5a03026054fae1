//! Music directories, filters, theme and last-played track.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::media;
use crate::models::{LastPlayed, Theme};

use super::StateStore;

impl StateStore {
    /// Replace the configured music directories.
    ///
    /// Each entry is trimmed and canonicalized and must be an existing
    /// directory. Blank entries are skipped and duplicates collapse onto their
    /// first occurrence. A single bad entry rejects the whole batch. Returns
    /// the directories now in effect.
    pub fn set_music_dirs<S: AsRef<str>>(&self, paths: &[S]) -> AppResult<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut cleaned = Vec::with_capacity(paths.len());

        for raw in paths {
            let trimmed = raw.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            let canonical = media::canonicalize(Path::new(trimmed))?;
            if !fs::metadata(&canonical)?.is_dir() {
                return Err(AppError::Validation(format!(
                    "path is not a directory: {}",
                    trimmed
                )));
            }
            if seen.insert(canonical.clone()) {
                cleaned.push(canonical);
            }
        }

        let count = cleaned.len();
        self.update(move |state| {
            state.music_dir.clear();
            state.music_dirs = cleaned;
            Ok(())
        })?;

        tracing::info!(count, "Updated music directories");
        self.resolve_music_dirs()
    }

    /// Configure a single music directory.
    pub fn set_music_dir(&self, path: &str) -> AppResult<Option<PathBuf>> {
        Ok(self.set_music_dirs(&[path])?.into_iter().next())
    }

    /// First directory in effect, if any.
    pub fn music_dir(&self) -> AppResult<Option<PathBuf>> {
        Ok(self.resolve_music_dirs()?.into_iter().next())
    }

    /// Composer and album filter strings.
    pub fn filters(&self) -> AppResult<(String, String)> {
        let state = self.load()?;
        Ok((state.composer_filter, state.album_filter))
    }

    /// Store filter strings as given.
    pub fn set_filters(&self, composer: &str, album: &str) -> AppResult<()> {
        self.update(|state| {
            state.composer_filter = composer.to_string();
            state.album_filter = album.to_string();
            Ok(())
        })?;
        Ok(())
    }

    /// Path of the last played track, if one was recorded.
    pub fn last_played(&self) -> AppResult<Option<String>> {
        Ok(self.last_played_record()?.map(|record| record.path))
    }

    pub fn last_played_record(&self) -> AppResult<Option<LastPlayed>> {
        let state = self.load()?;
        if state.last_played_path.is_empty() {
            return Ok(None);
        }
        Ok(Some(LastPlayed {
            path: state.last_played_path,
            played_at: state.last_played_at,
        }))
    }

    /// Record `path` as the last played track, stamped with the current time.
    pub fn set_last_played(&self, path: &str) -> AppResult<LastPlayed> {
        let track = self.resolve_track(path)?;
        let record = LastPlayed {
            path: track,
            played_at: chrono::Utc::now().timestamp_millis(),
        };

        self.update(|state| {
            state.last_played_path = record.path.clone();
            state.last_played_at = record.played_at;
            Ok(())
        })?;
        Ok(record)
    }

    pub fn theme(&self) -> AppResult<Theme> {
        Ok(self.load()?.theme)
    }

    /// Normalize and store a theme name, returning what was stored.
    pub fn set_theme(&self, theme: &str) -> AppResult<Theme> {
        let theme = Theme::parse(theme)?;
        self.update(|state| {
            state.theme = theme;
            Ok(())
        })?;
        Ok(theme)
    }
}
