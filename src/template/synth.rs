//! Server and client entry synthesis.
//!
//! The server entry always binds pages synchronously: rendering cannot wait
//! on module resolution. The client entry binds lazily under ESM so the
//! compiler can split one chunk per route.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use crate::config::ModuleFormat;
use crate::core::BuildId;
use crate::debug;
use crate::embed::entry::{APP_JSX, AppVars, CLIENT_ENTRY_JSX, EntryVars, SERVER_ENTRY_JSX};
use crate::route::{RouteDescriptor, RouteTable};
use crate::utils::path::to_import_specifier;

pub const APP_FILE: &str = "app.jsx";
pub const SERVER_ENTRY_FILE: &str = "server-entry.jsx";
pub const CLIENT_ENTRY_FILE: &str = "client-entry.jsx";

/// Inputs besides the route table and build id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    pub dev: bool,
    pub format: ModuleFormat,
    /// Live-reload socket port baked into the dev client.
    pub ws_port: u16,
}

/// Generated sources for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub app: String,
    pub server_entry: String,
    pub client_entry: String,
}

/// Generate all entry sources. Same inputs, byte-identical output.
pub fn emit(table: &RouteTable, build_id: BuildId, options: &EmitOptions) -> Templates {
    let build_id = build_id.to_string();
    let app = APP_JSX.render(&AppVars {
        dev: options.dev,
        ws_port: options.ws_port,
    });

    let server_entry = SERVER_ENTRY_JSX.render(&EntryVars {
        imports: lines(table.routes(), server_import),
        routes: lines(table.routes(), server_route),
        build_id: build_id.clone(),
    });

    let client_import: Binder = match options.format {
        ModuleFormat::Cjs => client_import_sync,
        ModuleFormat::Esm => client_import_lazy,
    };
    let client_entry = CLIENT_ENTRY_JSX.render(&EntryVars {
        imports: lines(table.routes(), client_import),
        routes: lines(table.routes(), client_route),
        build_id,
    });

    Templates {
        app,
        server_entry,
        client_entry,
    }
}

type Binder = fn(&RouteDescriptor, &mut String);

fn lines(routes: &[RouteDescriptor], bind: Binder) -> String {
    let mut out = String::new();
    for route in routes {
        if !out.is_empty() {
            out.push('\n');
        }
        bind(route, &mut out);
    }
    out
}

/// JS string literal; JSON strings are valid JS expressions.
fn js_str(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

fn specifier(route: &RouteDescriptor) -> String {
    js_str(&to_import_specifier(&route.source_path))
}

fn server_import(route: &RouteDescriptor, out: &mut String) {
    let _ = write!(out, "import * as {} from {}", route.binding(), specifier(route));
}

fn server_route(route: &RouteDescriptor, out: &mut String) {
    let binding = route.binding();
    let _ = write!(
        out,
        "  {{ path: {}, file: {}, Component: {binding}.default, load: {binding}.load }},",
        js_str(route.pattern.as_str()),
        js_str(&route.relative_path),
    );
}

fn client_import_sync(route: &RouteDescriptor, out: &mut String) {
    let _ = write!(out, "import {} from {}", route.binding(), specifier(route));
}

fn client_import_lazy(route: &RouteDescriptor, out: &mut String) {
    let _ = write!(
        out,
        "const {} = React.lazy(() => import({}))",
        route.binding(),
        specifier(route)
    );
}

fn client_route(route: &RouteDescriptor, out: &mut String) {
    let _ = write!(
        out,
        "  {{ path: {}, Component: {} }},",
        js_str(route.pattern.as_str()),
        route.binding()
    );
}

impl Templates {
    /// Write into `dir`, leaving files whose content is unchanged untouched.
    ///
    /// Returns how many files were written.
    pub fn write(&self, dir: &Path) -> io::Result<usize> {
        fs::create_dir_all(dir)?;
        let mut written = 0;
        for (name, content) in self.files() {
            let path = dir.join(name);
            if file_content_matches(&path, content) {
                debug!("template"; "{} unchanged, skipping write", name);
                continue;
            }
            fs::write(&path, content)?;
            written += 1;
        }
        Ok(written)
    }

    /// `(file name, content)` pairs.
    pub fn files(&self) -> [(&'static str, &str); 3] {
        [
            (APP_FILE, self.app.as_str()),
            (SERVER_ENTRY_FILE, self.server_entry.as_str()),
            (CLIENT_ENTRY_FILE, self.client_entry.as_str()),
        ]
    }
}

fn file_content_matches(path: &Path, content: &str) -> bool {
    path.exists() && fs::read_to_string(path).is_ok_and(|existing| existing == content)
}
