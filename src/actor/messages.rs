//! Actor message definitions.
//!
//! ```text
//! FsActor --Changes--> BuildActor --Reload--> WsActor
//! ```

use std::net::TcpStream;
use std::path::PathBuf;

use crate::route::PageEventKind;

/// One classified file-system change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A page file, relative to the pages directory.
    Page {
        kind: PageEventKind,
        relative: String,
    },
    /// Anything else that feeds the bundle: imported modules, styles,
    /// files matching a `--watch` glob.
    Resource(PathBuf),
}

impl WatchEvent {
    /// Short label for status lines.
    pub fn describe(&self) -> String {
        match self {
            Self::Page { kind, relative } => {
                let verb = match kind {
                    PageEventKind::Added => "added",
                    PageEventKind::Changed => "changed",
                    PageEventKind::Removed => "removed",
                };
                format!("{verb} pages/{relative}")
            }
            Self::Resource(path) => format!("changed {}", path.display()),
        }
    }
}

/// Messages to the build actor.
#[derive(Debug)]
pub enum BuildMsg {
    /// The first build of a dev session.
    Initial,
    /// A debounced batch of changes.
    Changes(Vec<WatchEvent>),
    Shutdown,
}

/// Messages to the websocket actor.
#[derive(Debug)]
pub enum WsMsg {
    /// Broadcast the reload signal.
    Reload { reason: String },
    /// Register a freshly accepted connection.
    AddClient(TcpStream),
    Shutdown,
}
