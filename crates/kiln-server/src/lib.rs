//! Development server with live reload for kiln.
//!
//! Serves the output tree, watches the source tree, and re-runs the matching
//! pipeline task when a source changes. Browsers reload over a WebSocket once
//! a task finishes.

pub mod registrar;
pub mod server;
pub mod watcher;
pub mod websocket;

pub use registrar::{WatchBinding, WatchRegistrar};
pub use server::{BoundServer, DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{ReloadHub, ReloadMessage};
