//! Playlist operations.

use crate::error::{AppError, AppResult};
use crate::models::{same_key, Playlist, FAVORITES_PLAYLIST};

use super::StateStore;

/// Trimmed playlist name, rejecting blanks.
fn required_name(name: &str) -> AppResult<&str> {
    match name.trim() {
        "" => Err(AppError::playlist_name_required()),
        name => Ok(name),
    }
}

impl StateStore {
    /// All playlists, favorites first.
    pub fn playlists(&self) -> AppResult<Vec<Playlist>> {
        Ok(self.load()?.playlists)
    }

    /// Append a new empty playlist.
    pub fn create_playlist(&self, name: &str) -> AppResult<()> {
        let name = required_name(name)?;
        if same_key(name, FAVORITES_PLAYLIST) {
            return Err(AppError::reserved_playlist());
        }

        self.update(|state| {
            if state.playlist_index(name).is_some() {
                return Err(AppError::Conflict(format!("playlist already exists: {}", name)));
            }
            state.playlists.push(Playlist::new(name));
            Ok(())
        })?;

        tracing::info!(playlist = %name, "Created playlist");
        Ok(())
    }

    /// Remove a playlist, clearing the active selection if it pointed there.
    pub fn delete_playlist(&self, name: &str) -> AppResult<()> {
        let name = required_name(name)?;
        if same_key(name, FAVORITES_PLAYLIST) {
            return Err(AppError::reserved_playlist());
        }

        self.update(|state| {
            let index = state
                .playlist_index(name)
                .ok_or_else(|| AppError::playlist_not_found(name))?;
            state.playlists.remove(index);
            if same_key(&state.active_playlist, name) {
                state.active_playlist.clear();
            }
            Ok(())
        })?;

        tracing::info!(playlist = %name, "Deleted playlist");
        Ok(())
    }

    /// Add a track to a playlist. Adding a track already present is a no-op.
    pub fn add_to_playlist(&self, name: &str, path: &str) -> AppResult<()> {
        let name = required_name(name)?;
        let track = self.resolve_track(path)?;

        self.update(|state| {
            let index = state
                .playlist_index(name)
                .ok_or_else(|| AppError::playlist_not_found(name))?;
            let playlist = &mut state.playlists[index];
            if !playlist.contains_track(&track) {
                playlist.tracks.push(track.clone());
            }
            Ok(())
        })?;

        tracing::debug!(playlist = %name, track = %track, "Added track to playlist");
        Ok(())
    }

    /// Remove a track from a playlist. Removing an absent track is a no-op.
    pub fn remove_from_playlist(&self, name: &str, path: &str) -> AppResult<()> {
        let name = required_name(name)?;
        let track = self.resolve_track(path)?;

        self.update(|state| {
            let index = state
                .playlist_index(name)
                .ok_or_else(|| AppError::playlist_not_found(name))?;
            state.playlists[index]
                .tracks
                .retain(|existing| !same_key(existing, &track));
            Ok(())
        })?;

        tracing::debug!(playlist = %name, track = %track, "Removed track from playlist");
        Ok(())
    }

    /// Name of the active playlist, empty when none is selected.
    pub fn active_playlist(&self) -> AppResult<String> {
        Ok(self.load()?.active_playlist)
    }

    /// Select a playlist by name (any case), or clear the selection with "".
    ///
    /// The stored name uses the playlist's own spelling.
    pub fn set_active_playlist(&self, name: &str) -> AppResult<()> {
        let name = name.trim();
        self.update(|state| {
            if name.is_empty() {
                state.active_playlist.clear();
                return Ok(());
            }
            let index = state
                .playlist_index(name)
                .ok_or_else(|| AppError::playlist_not_found(name))?;
            state.active_playlist = state.playlists[index].name.clone();
            Ok(())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::Fixture;
    use std::fs;

    fn non_favorites(fx: &Fixture) -> Vec<Playlist> {
        fx.store
            .playlists()
            .unwrap()
            .into_iter()
            .filter(|p| !p.is_favorites())
            .collect()
    }

    #[test]
    fn test_create_playlist() {
        let fx = Fixture::new();
        fx.store.create_playlist("  Jazz  ").unwrap();

        let playlists = fx.store.playlists().unwrap();
        assert_eq!(playlists.len(), 2);
        assert_eq!(playlists[0].name, FAVORITES_PLAYLIST);
        assert_eq!(playlists[1].name, "Jazz");
        assert!(playlists[1].tracks.is_empty());
    }

    #[test]
    fn test_duplicate_playlist_name_conflicts() {
        let fx = Fixture::new();
        fx.store.create_playlist("Jazz").unwrap();
        let result = fx.store.create_playlist("jazz");

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(non_favorites(&fx).len(), 1);
    }

    #[test]
    fn test_blank_playlist_name_rejected() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.store.create_playlist("   "),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            fx.store.delete_playlist(""),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_favorites_is_reserved() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.store.create_playlist("__Favorites__"),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            fx.store.delete_playlist("__favorites__"),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            fx.store.delete_playlist("__FAVORITES__"),
            Err(AppError::Conflict(_))
        ));
        assert_eq!(fx.store.playlists().unwrap()[0].name, FAVORITES_PLAYLIST);
    }

    #[test]
    fn test_delete_playlist() {
        let fx = Fixture::new();
        fx.store.create_playlist("Jazz").unwrap();
        fx.store.create_playlist("Rock").unwrap();
        fx.store.set_active_playlist("jazz").unwrap();

        fx.store.delete_playlist("JAZZ").unwrap();

        let names: Vec<_> = non_favorites(&fx).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Rock"]);
        assert_eq!(fx.store.active_playlist().unwrap(), "");
    }

    #[test]
    fn test_delete_keeps_unrelated_active_playlist() {
        let fx = Fixture::new();
        fx.store.create_playlist("Jazz").unwrap();
        fx.store.create_playlist("Rock").unwrap();
        fx.store.set_active_playlist("Rock").unwrap();

        fx.store.delete_playlist("Jazz").unwrap();
        assert_eq!(fx.store.active_playlist().unwrap(), "Rock");
    }

    #[test]
    fn test_delete_missing_playlist() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.store.delete_playlist("Nope"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_add_track_twice_is_idempotent() {
        let fx = Fixture::with_music_dir();
        fx.store.create_playlist("Jazz").unwrap();
        let track = fx.track("album/take five.mp3");

        fx.store.add_to_playlist("Jazz", &track).unwrap();
        fx.store.add_to_playlist("jazz", &track).unwrap();

        assert_eq!(non_favorites(&fx)[0].tracks, vec![track]);
    }

    #[test]
    fn test_add_stores_canonical_path() {
        let fx = Fixture::with_music_dir();
        let track = fx.track("a/song.flac");
        let messy = fx.music.join("a/../a/./song.flac");

        fx.store
            .add_to_playlist(FAVORITES_PLAYLIST, messy.to_str().unwrap())
            .unwrap();

        assert_eq!(fx.store.playlists().unwrap()[0].tracks, vec![track]);
    }

    #[test]
    fn test_add_outside_music_dir_is_containment() {
        let fx = Fixture::with_music_dir();
        fx.store.create_playlist("Jazz").unwrap();
        let before = fs::read(fx.store.file_path()).unwrap();
        let outside = fx.outside_track("elsewhere.mp3");

        let result = fx.store.add_to_playlist("Jazz", &outside);

        assert!(matches!(result, Err(AppError::Containment(_))));
        assert!(non_favorites(&fx)[0].tracks.is_empty());
        assert_eq!(fs::read(fx.store.file_path()).unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn test_add_symlink_escape_is_containment() {
        let fx = Fixture::with_music_dir();
        let outside = fx.outside_track("secret.mp3");
        let link = fx.music.join("innocent.mp3");
        std::os::unix::fs::symlink(&outside, &link).unwrap();

        let result = fx
            .store
            .add_to_playlist(FAVORITES_PLAYLIST, link.to_str().unwrap());
        assert!(matches!(result, Err(AppError::Containment(_))));
    }

    #[test]
    fn test_add_rejects_unsupported_type_before_lookup() {
        let fx = Fixture::with_music_dir();
        let doc = fx.track("notes.txt");

        assert!(matches!(
            fx.store.add_to_playlist("Missing", &doc),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            fx.store.add_to_playlist("Missing", ""),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_add_to_missing_playlist() {
        let fx = Fixture::with_music_dir();
        let track = fx.track("song.mp3");
        assert!(matches!(
            fx.store.add_to_playlist("Missing", &track),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_from_playlist() {
        let fx = Fixture::with_music_dir();
        fx.store.create_playlist("Jazz").unwrap();
        let a = fx.track("a.mp3");
        let b = fx.track("b.ogg");
        fx.store.add_to_playlist("Jazz", &a).unwrap();
        fx.store.add_to_playlist("Jazz", &b).unwrap();

        fx.store.remove_from_playlist("Jazz", &a).unwrap();
        assert_eq!(non_favorites(&fx)[0].tracks, vec![b.clone()]);

        // second removal is a no-op
        fx.store.remove_from_playlist("Jazz", &a).unwrap();
        assert_eq!(non_favorites(&fx)[0].tracks, vec![b]);
    }

    #[test]
    fn test_remove_matches_tracks_ignoring_case() {
        let fx = Fixture::with_music_dir();
        let track = fx.track("song.mp3");
        let mut state = fx.store.load().unwrap();
        state.playlists[0].tracks.push(track.to_uppercase());
        fx.store.save(&state).unwrap();

        fx.store
            .remove_from_playlist(FAVORITES_PLAYLIST, &track)
            .unwrap();
        assert!(fx.store.playlists().unwrap()[0].tracks.is_empty());
    }

    #[test]
    fn test_set_active_playlist() {
        let fx = Fixture::new();
        fx.store.create_playlist("Jazz").unwrap();

        fx.store.set_active_playlist("JAZZ").unwrap();
        assert_eq!(fx.store.active_playlist().unwrap(), "Jazz");

        fx.store.set_active_playlist("  ").unwrap();
        assert_eq!(fx.store.active_playlist().unwrap(), "");

        assert!(matches!(
            fx.store.set_active_playlist("Nope"),
            Err(AppError::NotFound(_))
        ));
    }
}
