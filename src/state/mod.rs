//! Persisted application state.
//!
//! [`StateStore`] owns the state file. Playlist and settings operations are
//! implemented on it in their own modules; each validates its input first and
//! then performs a single [`StateStore::update`].

mod playlists;
mod settings;
mod store;

pub use store::{MusicDirResolver, StateStore, DEFAULT_APP_NAME, STATE_FILE_NAME};
