//! Outbound notifications to the desktop shell (window, tray, hotkeys).

use serde::Serialize;

use crate::models::Theme;

/// Playback status reported by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackUpdate {
    /// Track currently loaded, empty when nothing is.
    pub track: String,
    pub is_playing: bool,
    /// Shuffle/repeat mode label as shown by the UI.
    pub play_mode: String,
}

/// Receiver of fire-and-forget notifications from the core.
///
/// Every method defaults to doing nothing, so platforms implement only what
/// they support.
pub trait ShellIntegration: Send + Sync {
    fn theme_changed(&self, _theme: Theme) {}

    fn playback_changed(&self, _update: &PlaybackUpdate) {}

    /// The stream server is accepting requests at `base_url`.
    fn stream_ready(&self, _base_url: &str) {}
}

/// Shell that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopShell;

impl ShellIntegration for NoopShell {}

/// Shell that records notifications in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingShell;

impl ShellIntegration for LoggingShell {
    fn theme_changed(&self, theme: Theme) {
        tracing::info!(theme = %theme, "Theme changed");
    }

    fn playback_changed(&self, update: &PlaybackUpdate) {
        tracing::info!(
            track = %update.track,
            playing = update.is_playing,
            mode = %update.play_mode,
            "Playback changed"
        );
    }

    fn stream_ready(&self, base_url: &str) {
        tracing::info!(base_url = %base_url, "Stream server ready");
    }
}
