//! JSON-file backed state store.

use parking_lot::RwLock;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult, OptionExt};
use crate::media;
use crate::models::AppState;

/// Application name used when none is supplied.
pub const DEFAULT_APP_NAME: &str = "LiteSound";

/// File name of the persisted document inside the app's config directory.
pub const STATE_FILE_NAME: &str = "state.json";

/// Source of the directories a file must live in to be served.
pub trait MusicDirResolver: Send + Sync {
    /// Currently permitted music directories.
    fn music_dirs(&self) -> AppResult<Vec<PathBuf>>;
}

impl<F> MusicDirResolver for F
where
    F: Fn() -> AppResult<Vec<PathBuf>> + Send + Sync,
{
    fn music_dirs(&self) -> AppResult<Vec<PathBuf>> {
        self()
    }
}

/// Persisted application state guarded by a single reader/writer lock.
///
/// Nothing is cached: every call re-reads `state.json`, so the file on disk is
/// authoritative and external edits are picked up. Writes go to a temporary
/// sibling that is fsynced and renamed over the target.
///
/// The lock is taken only around disk access. Validation that touches the
/// filesystem (canonicalizing directories and tracks) happens before it.
#[derive(Debug)]
pub struct StateStore {
    file_path: PathBuf,
    default_music_dir: Option<PathBuf>,
    lock: RwLock<()>,
}

impl StateStore {
    /// Create a store persisting to `file_path`.
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            default_music_dir: None,
            lock: RwLock::new(()),
        }
    }

    /// Create a store at `<platform-config-dir>/<app_name>/state.json`.
    pub fn for_app(app_name: &str) -> AppResult<Self> {
        let app_name = match app_name.trim() {
            "" => DEFAULT_APP_NAME,
            name => name,
        };
        let config_dir = dirs::config_dir().ok_or_not_found("platform config directory")?;
        Ok(Self::new(config_dir.join(app_name).join(STATE_FILE_NAME)))
    }

    /// Directory to fall back on when the state names none.
    pub fn with_default_music_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.default_music_dir = dir;
        self
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Read the current state with load-time defaults applied.
    pub fn load(&self) -> AppResult<AppState> {
        let _guard = self.lock.read();
        self.read_from_disk()
    }

    /// Replace the persisted state with `state` as given.
    pub fn save(&self, state: &AppState) -> AppResult<()> {
        let _guard = self.lock.write();
        self.write_to_disk(state)
    }

    /// Load, mutate and persist under the write lock.
    ///
    /// If `mutator` fails nothing is written and its error is returned.
    pub fn update<F>(&self, mutator: F) -> AppResult<AppState>
    where
        F: FnOnce(&mut AppState) -> AppResult<()>,
    {
        let _guard = self.lock.write();
        let mut state = self.read_from_disk()?;
        mutator(&mut state)?;
        self.write_to_disk(&state)?;
        Ok(state)
    }

    /// Configured directories, else the legacy single directory, else the
    /// platform default. Empty only when none of those exist.
    pub fn resolve_music_dirs(&self) -> AppResult<Vec<PathBuf>> {
        let state = self.load()?;
        if !state.music_dirs.is_empty() {
            return Ok(state.music_dirs);
        }
        Ok(self.default_music_dir.iter().cloned().collect())
    }

    fn read_from_disk(&self) -> AppResult<AppState> {
        let content = match fs::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.file_path.display(), "State file not found, starting fresh");
                String::new()
            }
            Err(e) => return Err(e.into()),
        };

        let mut state = if content.trim().is_empty() {
            AppState::default()
        } else {
            serde_json::from_str(&content)?
        };
        state.apply_defaults();
        Ok(state)
    }

    fn write_to_disk(&self, state: &AppState) -> AppResult<()> {
        let content = serde_json::to_string_pretty(state)?;

        let parent = self
            .file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        // The temp file is removed on drop if anything below fails.
        let mut temp = tempfile::Builder::new()
            .prefix("state-")
            .suffix(".tmp")
            .tempfile_in(parent)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o644))?;
        }

        temp.persist(&self.file_path)
            .map_err(|e| AppError::Io(e.error))?;
        sync_dir(parent);

        tracing::debug!(path = %self.file_path.display(), bytes = content.len(), "Saved state");
        Ok(())
    }
}

impl MusicDirResolver for StateStore {
    fn music_dirs(&self) -> AppResult<Vec<PathBuf>> {
        self.resolve_music_dirs()
    }
}

/// Flush the directory entry of a freshly renamed file.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), error = %e, "Directory sync skipped");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

/// Canonical form of a track path as stored in the state document.
pub(crate) fn track_key(path: PathBuf) -> AppResult<String> {
    path.into_os_string()
        .into_string()
        .map_err(|_| AppError::Validation("path is not valid UTF-8".to_string()))
}

impl StateStore {
    /// Validate a track path and return its canonical string.
    ///
    /// Checks run in order: non-empty, allowed audio extension, containment in
    /// a resolved music directory. Runs without holding the state lock.
    pub(crate) fn resolve_track(&self, path: &str) -> AppResult<String> {
        if path.trim().is_empty() {
            return Err(AppError::path_required());
        }
        let path = Path::new(path);
        if !media::is_audio_file(path) {
            return Err(AppError::unsupported_audio());
        }
        let dirs = self.resolve_music_dirs()?;
        track_key(media::ensure_within(&dirs, path)?)
    }
}
