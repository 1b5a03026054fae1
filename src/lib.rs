//! LiteSound - local backend for a desktop music player.
//!
//! Persists playlists and preferences, indexes the user's music folders and
//! streams audio to the UI over a loopback HTTP server with range support.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod library;
pub mod media;
pub mod models;
pub mod server;
pub mod shell;
pub mod state;

pub use app::Backend;
pub use error::{AppError, AppResult};
pub use library::LibraryService;
pub use server::{ServerState, StreamOptions, StreamServer};
pub use state::StateStore;
