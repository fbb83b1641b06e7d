//! Client session registry and per-session I/O threads.
//!
//! Sessions live in one growable list behind a mutex. Each session owns two
//! threads: a sender that drains the session's outbound queue into the
//! socket, and a reader that blocks on the socket solely to notice the peer
//! going away. Either side removes the session on failure; removal drops the
//! queue's sender half, which in turn terminates the sender thread.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::filter::IgnoreFilter;

/// Size of the single handshake read. Bytes beyond this are never read as
/// part of the ignore list.
pub const HANDSHAKE_BUF_LEN: usize = 256;

/// One connected follower.
struct ClientSession {
    id: u64,
    filter: IgnoreFilter,
    outbound: Sender<Arc<[u8]>>,
}

/// Registry of connected followers, bounded by a configured maximum.
pub struct SessionRegistry {
    sessions: Mutex<Vec<ClientSession>>,
    next_id: AtomicU64,
    max_clients: usize,
}

impl SessionRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            max_clients,
        }
    }

    /// Number of connected followers.
    pub fn client_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Admit a freshly accepted connection, or refuse it at capacity.
    ///
    /// The session starts with an empty ignore filter and is eligible for
    /// broadcasts immediately; the filter is installed once the handshake
    /// read completes on the session thread.
    pub fn accept(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.len() >= self.max_clients {
            eprintln!(
                "Refusing connection from {}: at capacity ({} clients)",
                peer, self.max_clients
            );
            return; // dropping the stream closes it
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (outbound, outbound_rx) = mpsc::channel::<Arc<[u8]>>();

        let writer = match stream.try_clone() {
            Ok(writer) => writer,
            Err(e) => {
                eprintln!("Failed to set up session for {}: {}", peer, e);
                return;
            }
        };

        sessions.push(ClientSession {
            id,
            filter: IgnoreFilter::default(),
            outbound,
        });
        drop(sessions);

        let registry = Arc::clone(&self);
        thread::spawn(move || sender_loop(id, peer, writer, outbound_rx, registry));

        let registry = Arc::clone(&self);
        thread::spawn(move || session_loop(id, peer, stream, registry));

        println!("Client {} connected", peer);
    }

    /// Enqueue a frame for every session whose filter accepts the path.
    ///
    /// The registry lock is held only for the enqueues themselves; actual
    /// socket writes happen on the per-session sender threads, so a slow
    /// peer delays nobody else.
    pub fn broadcast(&self, rel_path: &str, frame: &Arc<[u8]>) {
        let sessions = self.sessions.lock().unwrap();
        for session in sessions.iter() {
            if session.filter.should_skip(rel_path) {
                continue;
            }
            // A send to a dying session fails harmlessly; the removal path
            // already ran or is about to.
            let _ = session.outbound.send(Arc::clone(frame));
        }
    }

    fn set_filter(&self, id: u64, filter: IgnoreFilter) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.iter_mut().find(|s| s.id == id) {
            session.filter = filter;
        }
    }

    /// Remove a session. Returns true if it was still present, so the two
    /// removal paths (read failure, write failure) report it once.
    fn remove(&self, id: u64) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        sessions.len() != before
    }
}

/// Drain the outbound queue into the socket. A failed write is treated as a
/// disconnect: the session is removed immediately rather than waiting for
/// the read side to notice.
fn sender_loop(
    id: u64,
    peer: SocketAddr,
    mut stream: TcpStream,
    outbound: Receiver<Arc<[u8]>>,
    registry: Arc<SessionRegistry>,
) {
    while let Ok(frame) = outbound.recv() {
        if let Err(e) = stream.write_all(&frame) {
            if registry.remove(id) {
                eprintln!("Client {} write failed, dropping session: {}", peer, e);
            }
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }
    }
    // Queue sender dropped: session was removed elsewhere
    let _ = stream.shutdown(Shutdown::Both);
}

/// Read the handshake, then block on the socket until the peer goes away.
/// The protocol defines no client traffic after the handshake; anything
/// else that arrives is drained and ignored.
fn session_loop(id: u64, peer: SocketAddr, mut stream: TcpStream, registry: Arc<SessionRegistry>) {
    let mut buf = [0u8; HANDSHAKE_BUF_LEN];
    match stream.read(&mut buf) {
        Ok(n) if n > 0 => {
            let list = String::from_utf8_lossy(&buf[..n]);
            registry.set_filter(id, IgnoreFilter::parse(&list));
        }
        _ => {
            // Peer vanished before sending its ignore list; the loop below
            // observes the close and removes the session.
        }
    }

    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(_) => continue,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }

    if registry.remove(id) {
        println!("Client {} disconnected", peer);
    }
    let _ = stream.shutdown(Shutdown::Both);
}
