//! Dev loop actors.
//!
//! ```text
//! FsActor --Changes--> BuildActor --Reload--> WsActor
//! (watch)              (rebuild)            (broadcast)
//! ```
//!
//! - `messages` - message types between actors
//! - `fs` - watcher with debouncing and classification
//! - `build` - serialized, coalescing rebuilds
//! - `ws` - live-reload clients
//! - `coordinator` - wires up and runs actors

pub mod build;
pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod ws;

pub use coordinator::Coordinator;
