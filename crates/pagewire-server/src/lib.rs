//! Development server with live reload for pagewire sites.
//!
//! Rebuilds the site whenever a page, partial or asset changes and tells
//! connected browsers to reload over a WebSocket.

pub mod server;
pub mod watcher;
pub mod websocket;

pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{ReloadHub, ReloadMessage};
