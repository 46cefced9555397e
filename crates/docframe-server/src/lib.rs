//! Companion rendering server for docframe.
//!
//! Serves component frames over HTTP and keeps each rendered component
//! alive as a session so the page can push DOM events back and receive
//! live print output over a websocket.

pub mod server;
pub mod session;
pub mod watcher;
pub mod websocket;

pub use server::{FrameServer, FrameServerConfig, ServerError, CLIENT_PATH, WS_PATH};
pub use session::{Session, SessionStore};
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{frame_client_script, ClientMessage, FrameHub, FrameMessage};
