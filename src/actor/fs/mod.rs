//! File-system actor.
//!
//! Watches the pages directory and extra globs, and sends debounced,
//! classified batches to the build actor. The watcher starts before the
//! first build so nothing changed during it is lost.
//!
//! ```text
//! Watcher → Debouncer (timing) → Classifier (meaning) → BuildMsg::Changes
//! ```

mod classifier;
mod debouncer;
mod types;
mod watch_roots;


use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use super::messages::BuildMsg;
use crate::runtime::Runtime;
use crate::{debug, log};

use classifier::EventClassifier;
use debouncer::Debouncer;
use watch_roots::{WatchRoots, collect_roots};

pub struct FsActor {
    /// Sync → async bridge fed by the notify callback.
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Must stay alive for events to flow.
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    build_tx: mpsc::Sender<BuildMsg>,
    runtime: Arc<Runtime>,
}

impl FsActor {
    /// Start watching immediately; events buffer until `run`.
    pub fn new(runtime: Arc<Runtime>, build_tx: mpsc::Sender<BuildMsg>) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut watch_roots = WatchRoots::new(collect_roots(runtime.options()));
        watch_roots.attach_existing(&mut watcher)?;
        debug!("watch"; "{} roots attached", watch_roots.attached());

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            build_tx,
            runtime,
        })
    }

    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_roots,
            build_tx,
            runtime,
        } = self;
        let mut debouncer = Debouncer::new();

        let (event_tx, mut event_rx) = mpsc::channel::<notify::Event>(64);
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if event_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                event = event_rx.recv() => match event {
                    Some(event) => debouncer.add_event(&event),
                    None => break,
                },
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    watch_roots.maintain(&mut watcher);
                    let Some(raw) = debouncer.take_if_ready() else {
                        continue;
                    };
                    let tracked = |relative: &str| runtime.is_page(relative);
                    let events = EventClassifier::new(runtime.options(), &tracked).classify(raw);
                    if events.is_empty() {
                        continue;
                    }
                    if build_tx.send(BuildMsg::Changes(events)).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}
