//! Build actor: one rebuild at a time, coalescing everything that arrives
//! while it runs.
//!
//! ```text
//! Idle ──Initial/Changes──► Rebuilding ──► Idle
//!                              │ events queue in the channel
//!                              └─ drained into one follow-up rebuild
//! ```
//!
//! Every build of a dev session, the first one included, runs here, so
//! two builds never write or prune generation directories at once.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use super::messages::{BuildMsg, WatchEvent, WsMsg};
use crate::logger::{status_error, status_success};
use crate::route::PageEventKind;
use crate::runtime::Runtime;
use crate::debug;

pub struct BuildActor {
    rx: mpsc::Receiver<BuildMsg>,
    ws_tx: mpsc::Sender<WsMsg>,
    runtime: Arc<Runtime>,
}

/// What the last batch did.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BuildOutcome {
    Rebuilt { reason: String },
    Failed,
}

impl BuildActor {
    pub fn new(
        rx: mpsc::Receiver<BuildMsg>,
        ws_tx: mpsc::Sender<WsMsg>,
        runtime: Arc<Runtime>,
    ) -> Self {
        Self { rx, ws_tx, runtime }
    }

    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            let (mut initial, mut events) = match msg {
                BuildMsg::Initial => (true, Vec::new()),
                BuildMsg::Changes(events) => (false, events),
                BuildMsg::Shutdown => break,
            };

            let mut shutdown = false;
            while let Ok(next) = self.rx.try_recv() {
                match next {
                    BuildMsg::Initial => initial = true,
                    BuildMsg::Changes(more) => events.extend(more),
                    BuildMsg::Shutdown => {
                        shutdown = true;
                        break;
                    }
                }
            }

            if let BuildOutcome::Rebuilt { reason } = self.rebuild(initial, &events).await
                && self.ws_tx.send(WsMsg::Reload { reason }).await.is_err()
            {
                break;
            }
            if shutdown {
                break;
            }
        }
        debug!("build"; "stopped");
    }

    /// Apply page events, then compile and swap in a new generation.
    async fn rebuild(&self, initial: bool, events: &[WatchEvent]) -> BuildOutcome {
        let mut routes_changed = false;
        for event in events {
            if let WatchEvent::Page { kind, relative } = event
                && *kind != PageEventKind::Changed
            {
                routes_changed |= self.runtime.apply_file_event(*kind, relative);
            }
        }
        if routes_changed {
            debug!("route"; "page set changed, regenerating routes");
        }

        let reason = if initial {
            INITIAL_REASON.to_string()
        } else {
            describe(events)
        };
        let started = Instant::now();
        match self.runtime.rebuild().await {
            Ok(generation) => {
                let elapsed = started.elapsed().as_millis();
                if initial {
                    status_success(&format!("ready ({}) in {}ms", generation.build_id, elapsed));
                } else {
                    status_success(&format!("rebuilt ({}): {}", generation.build_id, reason));
                }
                BuildOutcome::Rebuilt { reason }
            }
            Err(e) => {
                status_error(e.summary(), &e.to_string());
                BuildOutcome::Failed
            }
        }
    }
}

const INITIAL_REASON: &str = "initial build";

/// `changed pages/about.tsx (+2 more)`.
fn describe(events: &[WatchEvent]) -> String {
    match events {
        [] => "rebuild".to_string(),
        [only] => only.describe(),
        [first, rest @ ..] => format!("{} (+{} more)", first.describe(), rest.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::testing::FakeCompiler;
    use crate::config::{BuildOptions, Mode};
    use crate::module::{PageRegistry, RegistryLoader};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<FakeCompiler>, Arc<Runtime>) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pages")).unwrap();
        fs::write(dir.path().join("pages/index.tsx"), "export default () => null;").unwrap();

        let compiler = Arc::new(FakeCompiler::default());
        let runtime = Arc::new(Runtime::new(
            Arc::new(BuildOptions::new(dir.path(), Mode::Development)),
            compiler.clone(),
            Arc::new(RegistryLoader::new(PageRegistry::new())),
        ));
        runtime.prepare().unwrap();
        (dir, compiler, runtime)
    }

    fn changed(path: &str) -> BuildMsg {
        BuildMsg::Changes(vec![WatchEvent::Resource(PathBuf::from(path))])
    }

    #[tokio::test]
    async fn test_queued_changes_coalesce_into_one_rebuild() {
        let (_dir, compiler, runtime) = setup();
        let (build_tx, build_rx) = mpsc::channel(8);
        let (ws_tx, mut ws_rx) = mpsc::channel(8);

        for path in ["/a.css", "/b.css", "/c.css"] {
            build_tx.send(changed(path)).await.unwrap();
        }
        drop(build_tx);
        BuildActor::new(build_rx, ws_tx, runtime.clone()).run().await;

        // One rebuild: a server and a client pass
        assert_eq!(compiler.compiled(), 2);
        let Some(WsMsg::Reload { reason }) = ws_rx.recv().await else {
            panic!("expected reload");
        };
        assert_eq!(reason, "changed /a.css (+2 more)");
        assert!(ws_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_change_during_initial_build_runs_after_it() {
        let (_dir, compiler, runtime) = setup();
        let (build_tx, build_rx) = mpsc::channel(8);
        let (ws_tx, mut ws_rx) = mpsc::channel(8);

        compiler.pause();
        let actor = tokio::spawn(BuildActor::new(build_rx, ws_tx, runtime.clone()).run());
        build_tx.send(BuildMsg::Initial).await.unwrap();
        while compiler.entered() == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        // Arrives while the initial build is still compiling
        build_tx.send(changed("/a.css")).await.unwrap();
        build_tx.send(BuildMsg::Shutdown).await.unwrap();
        compiler.resume();
        actor.await.unwrap();

        assert_eq!(compiler.compiled(), 4);
        assert!(compiler.max_in_flight() <= 2, "builds overlapped");
        let reasons: Vec<_> = std::iter::from_fn(|| match ws_rx.try_recv() {
            Ok(WsMsg::Reload { reason }) => Some(reason),
            _ => None,
        })
        .collect();
        assert_eq!(reasons, [INITIAL_REASON, "changed /a.css"]);
        assert!(runtime.current().is_some());
    }

    #[tokio::test]
    async fn test_added_page_updates_routes() {
        let (dir, _compiler, runtime) = setup();
        fs::write(dir.path().join("pages/about.tsx"), "export default () => null;").unwrap();

        let (build_tx, build_rx) = mpsc::channel(8);
        let (ws_tx, mut ws_rx) = mpsc::channel(8);
        build_tx
            .send(BuildMsg::Changes(vec![WatchEvent::Page {
                kind: PageEventKind::Added,
                relative: "about.tsx".into(),
            }]))
            .await
            .unwrap();
        build_tx.send(BuildMsg::Shutdown).await.unwrap();
        BuildActor::new(build_rx, ws_tx, runtime.clone()).run().await;

        assert!(runtime.is_page("about.tsx"));
        assert_eq!(runtime.current().unwrap().table.len(), 2);
        assert!(matches!(ws_rx.recv().await, Some(WsMsg::Reload { .. })));
    }

    #[tokio::test]
    async fn test_failed_rebuild_sends_no_reload() {
        let (_dir, compiler, runtime) = setup();
        compiler.fail(crate::compile::Target::Client, "syntax error");

        let (build_tx, build_rx) = mpsc::channel(8);
        let (ws_tx, mut ws_rx) = mpsc::channel(8);
        build_tx.send(changed("/a.css")).await.unwrap();
        drop(build_tx);
        BuildActor::new(build_rx, ws_tx, runtime.clone()).run().await;

        assert!(ws_rx.recv().await.is_none());
        assert!(runtime.current().is_none());
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&[]), "rebuild");
        let page = WatchEvent::Page {
            kind: PageEventKind::Removed,
            relative: "docs/[id].tsx".into(),
        };
        assert_eq!(describe(std::slice::from_ref(&page)), "removed pages/docs/[id].tsx");
    }
}
