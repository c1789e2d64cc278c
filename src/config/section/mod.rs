//! Configuration section definitions.
//!
//! Each module corresponds to a section in `kiln.toml`:
//!
//! | Module     | TOML Section   | Purpose                                  |
//! |------------|----------------|------------------------------------------|
//! | `build`    | `[build]`      | Directories, module format, watch globs  |
//! | `serve`    | `[serve]`      | HTTP and live-reload ports, loader limit |
//! | `compiler` | `[compiler]`   | Bundler and module host commands         |

mod build;
mod compiler;
mod serve;

pub use build::BuildSection;
pub use compiler::CompilerSection;
pub use serve::ServeSection;
