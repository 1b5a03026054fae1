//! Path canonicalization and directory containment.
//!
//! Every "may this file be touched" decision in the crate goes through this
//! module. Paths are compared in canonical form (absolute, symlinks resolved),
//! component by component, never as string prefixes: `/music2/a.mp3` is not
//! inside `/music`, and a symlink inside a music directory that points
//! elsewhere is judged by where it points.

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Resolve `path` to its absolute, symlink-free form.
///
/// Relative paths are resolved against the current working directory.
/// Fails with [`AppError::NotFound`] when the path does not exist and
/// [`AppError::Io`] for any other resolution failure.
pub fn canonicalize(path: &Path) -> AppResult<PathBuf> {
    std::fs::canonicalize(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => AppError::NotFound(format!("path not found: {}", path.display())),
        _ => AppError::Io(e),
    })
}

/// Relative location of `file` under `root`, both already canonical.
///
/// Returns `None` when the file escapes the root. An empty relative path means
/// the file is the root itself.
fn relative_within<'a>(root: &Path, file: &'a Path) -> Option<&'a Path> {
    let rel = file.strip_prefix(root).ok()?;
    if rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return None;
    }
    Some(rel)
}

/// Whether `file` lies inside `root`. Both must already be canonical.
pub fn is_inside(root: &Path, file: &Path) -> bool {
    relative_within(root, file).is_some()
}

/// Check an already-canonical file against each root, canonicalizing roots.
///
/// Roots that are empty or cannot be resolved never match.
fn contains_canonical<P: AsRef<Path>>(roots: &[P], canonical_file: &Path) -> bool {
    roots
        .iter()
        .map(AsRef::as_ref)
        .filter(|root| !root.as_os_str().is_empty())
        .filter_map(|root| std::fs::canonicalize(root).ok())
        .any(|root| is_inside(&root, canonical_file))
}

/// Whether `file` lies inside at least one of `roots`.
///
/// A file that cannot be resolved is never inside anything.
pub fn is_within<P: AsRef<Path>>(roots: &[P], file: &Path) -> bool {
    match std::fs::canonicalize(file) {
        Ok(canonical) => contains_canonical(roots, &canonical),
        Err(_) => false,
    }
}

/// Canonicalize `file` and return it if it lies inside one of `roots`.
///
/// Resolution failures keep their kind (`NotFound`, `Io`); a resolvable file
/// outside every root is [`AppError::Containment`].
pub fn ensure_within<P: AsRef<Path>>(roots: &[P], file: &Path) -> AppResult<PathBuf> {
    let canonical = canonicalize(file)?;
    if contains_canonical(roots, &canonical) {
        Ok(canonical)
    } else {
        tracing::warn!(
            requested = %file.display(),
            resolved = %canonical.display(),
            "Path outside music directories blocked"
        );
        Err(AppError::outside_music_dirs())
    }
}
