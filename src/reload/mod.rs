//! Live-reload channel.
//!
//! A websocket listener on its own port. Every connected browser receives
//! the literal `reload` message after each successful rebuild; nothing is
//! read back from clients.
//!
//! ```text
//! acceptor thread ──AddClient──► WsActor ──broadcast──► browsers
//! ```

mod channel;
mod server;

pub use channel::{LiveReload, RELOAD, handshake};
pub use server::start_ws_server;
