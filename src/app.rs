//! Composition root the UI binds to.

use std::sync::Arc;
use std::time::Duration;

use crate::error::AppResult;
use crate::library::LibraryService;
use crate::models::Theme;
use crate::server::{ServerState, StreamOptions, StreamServer};
use crate::shell::{PlaybackUpdate, ShellIntegration};
use crate::state::{MusicDirResolver, StateStore};

/// One state store, one library, one stream server and the shell they report to.
pub struct Backend {
    store: Arc<StateStore>,
    library: LibraryService,
    shell: Arc<dyn ShellIntegration>,
    server: StreamServer,
}

impl Backend {
    pub fn new(
        store: Arc<StateStore>,
        shell: Arc<dyn ShellIntegration>,
        options: StreamOptions,
    ) -> Self {
        let resolver: Arc<dyn MusicDirResolver> = store.clone();
        Self {
            library: LibraryService::new(store.clone()),
            server: StreamServer::new(resolver, options),
            store,
            shell,
        }
    }

    /// Replace the library, e.g. to plug in a different tag reader.
    pub fn with_library(mut self, library: LibraryService) -> Self {
        self.library = library;
        self
    }

    /// The state store, for playlist, directory, filter and last-played calls.
    ///
    /// Theme changes belong in [`Backend::set_theme`]; calling
    /// [`StateStore::set_theme`] here persists without notifying the shell.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn library(&self) -> &LibraryService {
        &self.library
    }

    /// Start streaming and push the persisted theme to the shell.
    ///
    /// A server that fails to start is logged; everything else keeps working.
    pub fn startup(&mut self) {
        match self.server.start() {
            Ok(base_url) => self.shell.stream_ready(&base_url),
            Err(e) => tracing::error!(error = %e, "Streaming unavailable"),
        }

        match self.store.theme() {
            Ok(theme) => self.shell.theme_changed(theme),
            Err(e) => tracing::warn!(error = %e, "Could not read persisted theme"),
        }
    }

    /// Stop the stream server, dropping requests still running after `deadline`.
    pub async fn shutdown(&mut self, deadline: Duration) {
        self.server.close(deadline).await;
    }

    /// Base URL of the stream server, `None` unless it is running.
    pub fn stream_base_url(&self) -> Option<String> {
        self.server.base_url()
    }

    pub fn stream_state(&self) -> ServerState {
        self.server.state()
    }

    /// Persist a theme and notify the shell.
    pub fn set_theme(&self, theme: &str) -> AppResult<Theme> {
        let theme = self.store.set_theme(theme)?;
        self.shell.theme_changed(theme);
        Ok(theme)
    }

    /// Forward playback status from the UI to the shell.
    pub fn update_playback(&self, update: PlaybackUpdate) {
        self.shell.playback_changed(&update);
    }
}
