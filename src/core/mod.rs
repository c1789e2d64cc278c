//! Core types - pure abstractions shared across the codebase.

mod build_id;
mod state;
mod url;

pub use build_id::{BuildId, BuildIdSource};
pub use state::{is_shutdown, register_server, request_shutdown, setup_shutdown_handler};
pub use url::RequestPath;
