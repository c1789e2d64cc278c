//! Kiln - server-rendered pages with file-based routing, per-route data
//! loaders and live reload.
//!
//! ```text
//! pages/ ─► route ─► template ─► compile (server + client) ─► module
//!                                                               │
//!            browser ◄── reload ◄── actor (watch) ◄─────────────┤
//!            browser ◄── server (SSR, JSON, static) ◄── runtime ◄┘
//! ```

pub mod actor;
pub mod cli;
pub mod compile;
pub mod config;
pub mod core;
pub mod embed;
pub mod error;
pub mod logger;
pub mod module;
pub mod payload;
pub mod reload;
pub mod route;
pub mod runtime;
pub mod server;
pub mod template;
pub mod utils;
