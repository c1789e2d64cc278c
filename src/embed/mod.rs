//! Embedded sources written into each build generation.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `entry` - application shell, server entry and client entry
//! - `host` - module host script run by the node loader
//!
//! # Usage
//!
//! ```ignore
//! use embed::entry::{APP_JSX, AppVars};
//!
//! let app = APP_JSX.render(&AppVars { dev: true, ws_port: 8080 });
//! ```

mod template;

pub use template::{NoVars, Template, TemplateVars};

pub mod entry {
    use super::{Template, TemplateVars};

    /// Variables for app.jsx.
    pub struct AppVars {
        pub dev: bool,
        pub ws_port: u16,
    }

    impl TemplateVars for AppVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__KILN_DEV__", if self.dev { "true" } else { "false" })
                .replace("__KILN_WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Variables for the server and client entries.
    pub struct EntryVars {
        pub imports: String,
        pub routes: String,
        pub build_id: String,
    }

    impl TemplateVars for EntryVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__KILN_IMPORTS__", &self.imports)
                .replace("__KILN_ROUTES__", &self.routes)
                .replace("__KILN_BUILD_ID__", &self.build_id)
        }
    }

    /// Application shell: context, router table, catch-all, live reload.
    pub const APP_JSX: Template<AppVars> = Template::new(include_str!("kiln/app.jsx"));

    /// Server entry: synchronous page bindings and `render`.
    pub const SERVER_ENTRY_JSX: Template<EntryVars> =
        Template::new(include_str!("kiln/server-entry.jsx"));

    /// Client entry: page bindings and hydration.
    pub const CLIENT_ENTRY_JSX: Template<EntryVars> =
        Template::new(include_str!("kiln/client-entry.jsx"));
}

pub mod host {
    use super::{NoVars, Template};

    /// Node script that loads a server bundle and serves load/render requests.
    pub const HOST_CJS: Template<NoVars> = Template::new(include_str!("kiln/host.cjs"));
}
