use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

use may::net::{TcpListener, TcpStream};
use may::sync::mpsc;
use memchr::memmem;
use tracing::{debug, error, warn};

use crate::http::Response;

/// Identifier assigned to a connection at accept time; the queue items
/// carry it instead of a socket handle.
pub(crate) type ConnId = u64;

/// One framed request handed from the receiver stage to a worker.
pub(crate) struct IngressItem {
    pub conn_id: ConnId,
    pub raw: Vec<u8>,
}

/// One finished response handed from a worker to the dispatcher.
pub(crate) struct EgressItem {
    pub conn_id: ConnId,
    pub response: Response,
    /// Close the connection after the response is written instead of
    /// re-arming it for the next request.
    pub terminate: bool,
}

/// Write half and re-arm signal of a live connection. The dispatcher owns
/// the writing side; sending on `rearm` releases the connection's
/// receiver to frame the next request.
pub(crate) struct Outbound {
    pub stream: TcpStream,
    pub rearm: mpsc::Sender<()>,
}

/// Live connections, keyed by id. Inserted by the acceptor, removed by
/// whichever stage closes the connection.
pub(crate) type Registry = Arc<Mutex<HashMap<ConnId, Outbound>>>;

const RECV_CHUNK: usize = 8 * 1024;

/// Accept loop. Registers each connection's write half and spawns a
/// receiver coroutine owning the read half.
pub(crate) fn accept_loop(
    listener: TcpListener,
    ingress: mpsc::Sender<IngressItem>,
    egress: mpsc::Sender<EgressItem>,
    registry: Registry,
    max_header_size: usize,
    stack_size: usize,
) {
    let mut next_id: ConnId = 0;
    loop {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(err) => {
                error!(error = %err, "accept failed");
                continue;
            }
        };
        next_id += 1;
        let conn_id = next_id;
        let writer = match stream.try_clone() {
            Ok(writer) => writer,
            Err(err) => {
                warn!(conn_id, error = %err, "could not clone the write half");
                continue;
            }
        };
        let (rearm_tx, rearm_rx) = mpsc::channel();
        registry
            .lock()
            .unwrap()
            .insert(conn_id, Outbound { stream: writer, rearm: rearm_tx });
        debug!(conn_id, peer = %peer, "connection accepted");

        let ingress = ingress.clone();
        let egress = egress.clone();
        let conn_registry = registry.clone();
        let spawned = unsafe {
            may::coroutine::Builder::new().stack_size(stack_size).spawn(move || {
                receive_loop(conn_id, stream, ingress, egress, rearm_rx, conn_registry, max_header_size);
            })
        };
        if let Err(err) = spawned {
            error!(conn_id, error = %err, "failed to spawn receiver coroutine");
            registry.lock().unwrap().remove(&conn_id);
        }
    }
}

/// Per-connection receiver: appends reads to the connection's buffer,
/// frames complete requests onto the ingress queue, and blocks on the
/// re-arm channel until the dispatcher has written the response. At most
/// one framed request per connection is ever in flight.
fn receive_loop(
    conn_id: ConnId,
    mut stream: TcpStream,
    ingress: mpsc::Sender<IngressItem>,
    egress: mpsc::Sender<EgressItem>,
    rearm: mpsc::Receiver<()>,
    registry: Registry,
    max_header_size: usize,
) {
    let mut guard = ConnGuard { conn_id, registry, armed: true };
    let mut buffer: Vec<u8> = Vec::with_capacity(RECV_CHUNK);
    let mut chunk = [0u8; RECV_CHUNK];
    loop {
        let received = match stream.read(&mut chunk) {
            Ok(0) => {
                debug!(conn_id, "peer closed the connection");
                return;
            }
            Ok(received) => received,
            Err(err) => {
                debug!(conn_id, error = %err, "read failed");
                return;
            }
        };
        buffer.extend_from_slice(&chunk[..received]);

        if let Some(header_end) = memmem::find(&buffer, b"\r\n\r\n") {
            let expected = scan_content_length(&buffer[..header_end]);
            let received_body = buffer.len() - (header_end + 4);
            if received_body < expected {
                // body still incoming
                continue;
            }
            let frame = std::mem::take(&mut buffer);
            if ingress.send(IngressItem { conn_id, raw: frame }).is_err() {
                return;
            }
            // Wait for the dispatcher to finish writing the response. A
            // closed channel means the connection was terminated.
            if rearm.recv().is_err() {
                guard.disarm();
                return;
            }
        } else if buffer.len() > max_header_size {
            warn!(conn_id, size = buffer.len(), "header block exceeds the configured limit");
            let mut res = Response::new();
            res.status(400).send("Header size exceeded");
            let _ = egress.send(EgressItem { conn_id, response: res, terminate: true });
            // The dispatcher owns the shutdown from here.
            guard.disarm();
            return;
        }
    }
}

/// Lenient `Content-Length` scan used only for framing: whitespace around
/// the value is tolerated and anything unparseable counts as no body. The
/// request parser re-validates the header strictly.
fn scan_content_length(head: &[u8]) -> usize {
    let Some(pos) = memmem::find(head, b"Content-Length") else {
        return 0;
    };
    let mut rest = &head[pos + b"Content-Length".len()..];
    while let [b' ' | b'\t', tail @ ..] = rest {
        rest = tail;
    }
    let Some(tail) = rest.strip_prefix(b":") else {
        return 0;
    };
    let digits: Vec<u8> = tail
        .iter()
        .copied()
        .skip_while(|b| matches!(b, b' ' | b'\t'))
        .take_while(|b| b.is_ascii_digit())
        .collect();
    std::str::from_utf8(&digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Removes the connection's registry entry when the receiver exits, so a
/// dead connection never strands its buffer or write half. Disarmed on
/// paths where the dispatcher takes over the shutdown.
struct ConnGuard {
    conn_id: ConnId,
    registry: Registry,
    armed: bool,
}

impl ConnGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ConnGuard {
    fn drop(&mut self) {
        if self.armed {
            self.registry.lock().unwrap().remove(&self.conn_id);
            debug!(conn_id = self.conn_id, "connection deregistered");
        }
    }
}
