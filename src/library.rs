//! Music library scanning and file access.
//!
//! Scans are not cached: each call walks every configured directory again.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use walkdir::WalkDir;

use crate::error::{AppError, AppResult};
use crate::media::{self, LoftyTagReader, TagReader};
use crate::models::MusicFile;
use crate::state::StateStore;

/// Builds catalogues from the directories configured in a [`StateStore`].
#[derive(Clone)]
pub struct LibraryService {
    store: Arc<StateStore>,
    tag_reader: Arc<dyn TagReader>,
}

impl LibraryService {
    /// Create a library reading tags with `lofty`.
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            store,
            tag_reader: Arc::new(LoftyTagReader),
        }
    }

    /// Replace the tag reader.
    pub fn with_tag_reader(mut self, reader: Arc<dyn TagReader>) -> Self {
        self.tag_reader = reader;
        self
    }

    /// List every audio file under the configured directories.
    ///
    /// Fails as a whole if no directory is configured, if any configured
    /// directory is gone, or if walking hits an I/O error. Each physical file
    /// appears once even when directories overlap or are reached through
    /// symlinks. Sorted by name ignoring case; equal names keep discovery
    /// order.
    pub fn list_music_files(&self) -> AppResult<Vec<MusicFile>> {
        let started = Instant::now();
        let roots = self.scan_roots()?;

        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for root in &roots {
            self.scan_root(root, &roots, &mut seen, &mut files)?;
        }

        files.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        tracing::info!(
            files = files.len(),
            dirs = roots.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scanned music library"
        );
        Ok(files)
    }

    /// Read a whole audio file after checking it lies in a music directory.
    pub fn read_music_file(&self, path: &str) -> AppResult<Vec<u8>> {
        if path.trim().is_empty() {
            return Err(AppError::path_required());
        }
        let path = Path::new(path);
        if !media::is_audio_file(path) {
            return Err(AppError::unsupported_audio());
        }

        let dirs = self.store.resolve_music_dirs()?;
        let canonical = media::ensure_within(&dirs, path)?;
        fs::read(&canonical).map_err(|e| AppError::from_io(e, canonical.display()))
    }

    /// Canonical, existing directories to scan.
    fn scan_roots(&self) -> AppResult<Vec<PathBuf>> {
        let dirs: Vec<PathBuf> = self
            .store
            .resolve_music_dirs()?
            .into_iter()
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect();
        if dirs.is_empty() {
            return Err(AppError::NotFound("no music directory configured".to_string()));
        }

        let mut roots = Vec::with_capacity(dirs.len());
        for dir in &dirs {
            let root = media::canonicalize(dir)?;
            if !fs::metadata(&root)?.is_dir() {
                return Err(AppError::Validation(format!(
                    "music directory is not a directory: {}",
                    dir.display()
                )));
            }
            roots.push(root);
        }
        Ok(roots)
    }

    fn scan_root(
        &self,
        root: &Path,
        roots: &[PathBuf],
        seen: &mut HashSet<PathBuf>,
        files: &mut Vec<MusicFile>,
    ) -> AppResult<()> {
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_skippable(&e) => {
                    tracing::warn!(error = %e, "Skipping unresolvable link");
                    continue;
                }
                Err(e) => return Err(AppError::Io(e.into())),
            };

            if !entry.file_type().is_file() || !media::is_audio_file(entry.path()) {
                continue;
            }

            let canonical = media::canonicalize(entry.path())?;
            if !seen.insert(canonical.clone()) {
                continue;
            }
            if !roots.iter().any(|root| media::is_inside(root, &canonical)) {
                tracing::warn!(
                    link = %entry.path().display(),
                    target = %canonical.display(),
                    "Skipping file linked from outside the music directories"
                );
                continue;
            }
            let Some(path) = canonical.to_str() else {
                tracing::warn!(path = %canonical.display(), "Skipping non UTF-8 path");
                continue;
            };

            let tags = self.tag_reader.read_tags(&canonical);
            files.push(MusicFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: path.to_string(),
                ext: media::dotted_extension(entry.path()),
                composer: tags.composer,
                album: tags.album,
            });
        }
        Ok(())
    }
}

/// Symlink loops and dangling symlinks are skipped rather than failing a scan.
fn is_skippable(err: &walkdir::Error) -> bool {
    if err.loop_ancestor().is_some() {
        return true;
    }
    let dangling = err
        .io_error()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false);
    dangling
        && err
            .path()
            .and_then(|p| fs::symlink_metadata(p).ok())
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false)
}
