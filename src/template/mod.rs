//! Template synthesis: generated entry sources for both compile passes.
//!
//! ```text
//! RouteTable + BuildId + EmitOptions
//!         │
//!         ▼  emit()   (pure)
//! Templates { app.jsx, server-entry.jsx, client-entry.jsx }
//!         │
//!         ▼  write()  (skips unchanged files)
//! .kiln/builds/<id>/templates/
//! ```

mod synth;

pub use synth::{
    APP_FILE, CLIENT_ENTRY_FILE, EmitOptions, SERVER_ENTRY_FILE, Templates, emit,
};
