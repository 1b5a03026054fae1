//! Loopback streaming server.
//!
//! The server binds an ephemeral port on `127.0.0.1`, publishes its base URL
//! and serves [`crate::api::stream`] until closed. It must be started from
//! inside an actix system (`#[actix_web::main]` or `#[actix_web::test]`).

use actix_cors::Cors;
use actix_web::dev::ServerHandle;
use actix_web::http::header;
use actix_web::{web, App, HttpServer};
use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing_actix_web::TracingLogger;

use crate::api;
use crate::state::MusicDirResolver;

/// Lifecycle of a [`StreamServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Tunables for the streaming server.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Worker threads handling requests.
    pub workers: usize,
    /// Upper bound actix gives workers to finish in-flight requests.
    pub shutdown_timeout: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            workers: 2,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// CORS for media elements served from any origin.
fn configure_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "OPTIONS"])
        .allowed_headers(vec![header::RANGE, header::CONTENT_TYPE])
        .expose_headers(vec![
            header::ACCEPT_RANGES,
            header::CONTENT_RANGE,
            header::CONTENT_LENGTH,
        ])
        .max_age(3600)
}

/// Loopback HTTP server streaming files from the music directories.
pub struct StreamServer {
    resolver: Arc<dyn MusicDirResolver>,
    options: StreamOptions,
    state: Mutex<ServerState>,
    local_addr: Option<SocketAddr>,
    handle: Option<ServerHandle>,
    task: Option<JoinHandle<io::Result<()>>>,
}

impl StreamServer {
    /// Create a stopped server resolving directories through `resolver`.
    pub fn new(resolver: Arc<dyn MusicDirResolver>, options: StreamOptions) -> Self {
        Self {
            resolver,
            options,
            state: Mutex::new(ServerState::Stopped),
            local_addr: None,
            handle: None,
            task: None,
        }
    }

    pub fn state(&self) -> ServerState {
        *self.state.lock()
    }

    fn set_state(&self, state: ServerState) {
        *self.state.lock() = state;
    }

    /// Bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// `http://127.0.0.1:<port>` while running.
    pub fn base_url(&self) -> Option<String> {
        self.local_addr.map(|addr| format!("http://{}", addr))
    }

    /// Bind an ephemeral loopback port and start serving.
    ///
    /// Returns the base URL. Starting a server that is not stopped fails with
    /// [`io::ErrorKind::AlreadyExists`]. On bind failure the server stays
    /// stopped.
    pub fn start(&mut self) -> io::Result<String> {
        if self.state() != ServerState::Stopped {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "stream server already started",
            ));
        }
        self.set_state(ServerState::Starting);

        match self.bind_and_run() {
            Ok(addr) => {
                self.local_addr = Some(addr);
                self.set_state(ServerState::Running);
                let base_url = format!("http://{}", addr);
                tracing::info!(
                    base_url = %base_url,
                    workers = self.options.workers,
                    "Stream server listening"
                );
                Ok(base_url)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to start stream server");
                self.set_state(ServerState::Stopped);
                Err(e)
            }
        }
    }

    fn bind_and_run(&mut self) -> io::Result<SocketAddr> {
        let resolver = self.resolver.clone();

        let server = HttpServer::new(move || {
            App::new()
                // Last wrap is outermost: CORS sees requests before the logger
                .wrap(TracingLogger::default())
                .wrap(configure_cors())
                .app_data(web::Data::from(resolver.clone()))
                .configure(api::stream::configure)
        })
        .workers(self.options.workers.max(1))
        .disable_signals()
        .shutdown_timeout(self.options.shutdown_timeout.as_secs().max(1))
        .bind(("127.0.0.1", 0))?;

        let addr = server
            .addrs()
            .into_iter()
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no bound address"))?;

        let server = server.run();
        self.handle = Some(server.handle());
        self.task = Some(actix_web::rt::spawn(server));
        Ok(addr)
    }

    /// Stop accepting connections and drain in-flight requests.
    ///
    /// Requests still running after `deadline` are dropped. Closing a stopped
    /// server does nothing.
    pub async fn close(&mut self, deadline: Duration) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.set_state(ServerState::Stopping);
        tracing::info!(deadline_ms = deadline.as_millis() as u64, "Stopping stream server");

        if tokio::time::timeout(deadline, handle.stop(true)).await.is_err() {
            tracing::warn!("Graceful drain timed out, forcing stream server stop");
            if let Some(task) = &self.task {
                task.abort();
            }
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(Err(e)) => tracing::warn!(error = %e, "Stream server exited with error"),
                Err(e) if !e.is_cancelled() => {
                    tracing::warn!(error = %e, "Stream server task failed")
                }
                _ => {}
            }
        }

        self.local_addr = None;
        self.set_state(ServerState::Stopped);
        tracing::info!("Stream server stopped");
    }
}
