//! Shared utilities.

pub mod date;
pub mod exec;
pub mod glob;
pub mod html;
pub mod mime;
pub mod path;
pub mod plural;
