//! HTTP endpoints served by the stream server.

pub mod stream;
