//! Wires up and runs the dev loop actors.
//!
//! ```text
//! FsActor ──► BuildActor ──► WsActor ──► browsers
//!  (watch)     (rebuild)    (broadcast)
//! ```
//!
//! `Coordinator::start` binds the live-reload socket and starts the watcher
//! before the first build, so the socket port can be baked into the first
//! templates and no change made during that build is missed. The first
//! build is queued to the build actor like any other.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, TryRecvError};
use tokio::sync::mpsc;

use super::build::BuildActor;
use super::fs::FsActor;
use super::messages::{BuildMsg, WsMsg};
use super::ws::WsActor;
use crate::reload::start_ws_server;
use crate::runtime::Runtime;
use crate::debug;

const CHANNEL_BUFFER: usize = 32;

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

pub struct Coordinator {
    fs: FsActor,
    build: BuildActor,
    ws: WsActor,
    build_tx: mpsc::Sender<BuildMsg>,
    ws_tx: mpsc::Sender<WsMsg>,
    ws_port: u16,
}

impl Coordinator {
    /// Bind the live-reload socket, record its port on the runtime and
    /// start watching.
    pub fn start(runtime: Arc<Runtime>) -> Result<Self> {
        let (build_tx, build_rx) = mpsc::channel::<BuildMsg>(CHANNEL_BUFFER);
        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);

        let options = runtime.options();
        let ws_port = start_ws_server(options.interface, options.ws_port, ws_tx.clone())?;
        runtime.set_ws_port(ws_port);
        debug!("reload"; "ws://{}:{}", options.interface, ws_port);

        let fs = FsActor::new(Arc::clone(&runtime), build_tx.clone()).context("watcher failed")?;
        let build = BuildActor::new(build_rx, ws_tx.clone(), runtime);

        Ok(Self {
            fs,
            build,
            ws: WsActor::new(ws_rx),
            build_tx,
            ws_tx,
            ws_port,
        })
    }

    pub fn ws_port(&self) -> u16 {
        self.ws_port
    }

    /// Queue the first build, then run until `shutdown_rx` fires.
    pub async fn run(self, shutdown_rx: Receiver<()>) {
        let Self {
            fs,
            build,
            ws,
            build_tx,
            ws_tx,
            ..
        } = self;

        // Queued ahead of anything the watcher can send
        let _ = build_tx.send(BuildMsg::Initial).await;
        let fs_handle = tokio::spawn(fs.run());
        let build_handle = tokio::spawn(build.run());
        let ws_handle = tokio::spawn(ws.run());
        debug!("actor"; "start");

        while let Err(TryRecvError::Empty) = shutdown_rx.try_recv() {
            tokio::time::sleep(SHUTDOWN_POLL).await;
        }
        debug!("actor"; "shutdown signal received");

        fs_handle.abort();
        let _ = build_tx.send(BuildMsg::Shutdown).await;
        let _ = ws_tx.send(WsMsg::Shutdown).await;
        let grace = Duration::from_millis(500);
        let _ = tokio::time::timeout(grace, build_handle).await;
        let _ = tokio::time::timeout(grace, ws_handle).await;
        debug!("actor"; "stopped");
    }
}
