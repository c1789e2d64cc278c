use std::net::TcpStream;
use std::time::Duration;

use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use crate::{debug, log};

/// The only message ever sent to clients.
pub const RELOAD: &str = "reload";

/// Bound on each handshake read and each later send.
const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Complete the websocket handshake on a blocking stream.
///
/// A peer that connects but never speaks gives up after [`IO_TIMEOUT`].
pub fn handshake(stream: TcpStream) -> Option<WebSocket<TcpStream>> {
    let peer = stream.peer_addr().ok();
    if let Err(e) = stream
        .set_read_timeout(Some(IO_TIMEOUT))
        .and_then(|()| stream.set_write_timeout(Some(IO_TIMEOUT)))
    {
        log!("reload"; "cannot configure {:?}: {}", peer, e);
        return None;
    }
    match tungstenite::accept(stream) {
        Ok(ws) => {
            debug!("reload"; "client {:?} connected", peer);
            Some(ws)
        }
        Err(e) => {
            log!("reload"; "handshake with {:?} failed: {}", peer, e);
            None
        }
    }
}

/// Connected live-reload clients.
///
/// Delivery is fire-and-forget: a client whose send fails is dropped, and a
/// client connecting mid-rebuild simply waits for the next signal.
#[derive(Default)]
pub struct LiveReload {
    clients: Vec<WebSocket<TcpStream>>,
}

impl LiveReload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete the websocket handshake and register the client.
    ///
    /// Blocks for up to the handshake timeout.
    pub fn accept(&mut self, stream: TcpStream) {
        if let Some(ws) = handshake(stream) {
            self.add(ws);
        }
    }

    /// Register a client whose handshake already completed.
    pub fn add(&mut self, ws: WebSocket<TcpStream>) {
        self.clients.push(ws);
        debug!("reload"; "{} clients", self.clients.len());
    }

    /// Send `signal` to every client. Returns how many received it.
    pub fn broadcast(&mut self, signal: &str) -> usize {
        if self.clients.is_empty() {
            debug!("reload"; "no clients connected");
            return 0;
        }

        let message = Message::text(signal.to_string());
        self.clients.retain_mut(|ws| match ws.send(message.clone()) {
            Ok(()) => true,
            Err(e) => {
                debug!("reload"; "client disconnected: {}", e);
                false
            }
        });
        debug!("reload"; "broadcast to {} clients", self.clients.len());
        self.clients.len()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Close every connection.
    pub fn close_all(&mut self) {
        for mut ws in self.clients.drain(..) {
            let _ = ws.close(None);
            let _ = ws.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_broadcast_reaches_client() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = thread::spawn(move || {
            let (mut ws, _) = tungstenite::connect(format!("ws://127.0.0.1:{port}")).unwrap();
            ws.read().unwrap().into_text().unwrap().as_str().to_string()
        });

        let (stream, _) = listener.accept().unwrap();
        let mut channel = LiveReload::new();
        channel.accept(stream);
        assert_eq!(channel.len(), 1);
        assert_eq!(channel.broadcast(RELOAD), 1);

        assert_eq!(client.join().unwrap(), "reload");
        channel.close_all();
        assert!(channel.is_empty());
    }

    #[test]
    fn test_broadcast_without_clients() {
        let mut channel = LiveReload::new();
        assert_eq!(channel.broadcast(RELOAD), 0);
    }

    #[test]
    fn test_failed_handshake_not_registered() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = thread::spawn(move || {
            use std::io::Write;
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        });

        let (stream, _) = listener.accept().unwrap();
        client.join().unwrap();
        let mut channel = LiveReload::new();
        channel.accept(stream);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let _silent = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (stream, _) = listener.accept().unwrap();

        let started = std::time::Instant::now();
        assert!(handshake(stream).is_none());
        assert!(started.elapsed() < IO_TIMEOUT * 2);
    }
}
