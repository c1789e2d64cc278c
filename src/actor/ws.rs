//! Websocket actor: owns the live-reload clients.
//!
//! Handshakes run on the blocking pool so a peer that connects and then
//! stays silent cannot hold up broadcasts.

use std::net::TcpStream;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tungstenite::WebSocket;

use super::messages::WsMsg;
use crate::debug;
use crate::reload::{LiveReload, RELOAD, handshake};

pub struct WsActor {
    rx: mpsc::Receiver<WsMsg>,
    channel: LiveReload,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>) -> Self {
        Self {
            rx,
            channel: LiveReload::new(),
        }
    }

    pub async fn run(mut self) {
        let mut handshakes: JoinSet<Option<WebSocket<TcpStream>>> = JoinSet::new();
        loop {
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(WsMsg::AddClient(stream)) => {
                        handshakes.spawn_blocking(move || handshake(stream));
                    }
                    Some(WsMsg::Reload { reason }) => {
                        let sent = self.channel.broadcast(RELOAD);
                        debug!("reload"; "{} ({} clients)", reason, sent);
                    }
                    Some(WsMsg::Shutdown) | None => break,
                },
                Some(done) = handshakes.join_next() => {
                    if let Ok(Some(ws)) = done {
                        self.channel.add(ws);
                    }
                }
            }
        }
        handshakes.detach_all();
        self.channel.close_all();
    }
}
