//! Websocket listener feeding accepted connections to the ws actor.

use std::io::ErrorKind;
use std::net::{IpAddr, TcpListener};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::mpsc;

use crate::actor::messages::WsMsg;
use crate::core::is_shutdown;
use crate::{debug, log};

/// Maximum port retry attempts.
const MAX_PORT_RETRIES: u16 = 10;

const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Bind the live-reload listener and spawn its acceptor thread.
///
/// Returns the port actually bound, which may be above `base_port` when
/// that one is taken.
pub fn start_ws_server(
    interface: IpAddr,
    base_port: u16,
    ws_tx: mpsc::Sender<WsMsg>,
) -> Result<u16> {
    let (listener, port) = try_bind_port(interface, base_port)?;
    listener.set_nonblocking(true)?;
    if port != base_port && base_port != 0 {
        log!("reload"; "port {} in use, using {} instead", base_port, port);
    }

    thread::Builder::new()
        .name("kiln-reload-accept".into())
        .spawn(move || {
            while !is_shutdown() {
                match listener.accept() {
                    Ok((stream, addr)) => {
                        debug!("reload"; "connection from {}", addr);
                        // Handshake and sends are blocking
                        let _ = stream.set_nonblocking(false);
                        if ws_tx.blocking_send(WsMsg::AddClient(stream)).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                    Err(e) => {
                        log!("reload"; "accept error: {}", e);
                        thread::sleep(ACCEPT_POLL);
                    }
                }
            }
        })?;

    Ok(port)
}

/// Try binding to port, retry with incremented port if in use.
fn try_bind_port(interface: IpAddr, base_port: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((interface, port)) {
            Ok(listener) => {
                let port = listener.local_addr()?.port();
                return Ok((listener, port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "failed to bind live-reload socket after {} attempts: {}",
        MAX_PORT_RETRIES,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}
