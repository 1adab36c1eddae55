use std::fs::File;
use std::io::{self, Read, Write};
use std::net::Shutdown;

use may::net::TcpStream;
use may::sync::mpsc;
use tracing::{debug, error, warn};

use super::conn::{ConnId, EgressItem, Registry};
use crate::http::Response;

/// Chunk size for streamed file bodies.
const FILE_CHUNK_SIZE: usize = 8 * 1024;

/// Dispatcher stage: pops finished responses off the egress queue,
/// serialises them onto the wire, and then either closes the connection
/// or re-arms its receiver, never both.
///
/// File bodies are streamed on a coroutine of their own so a slow client
/// draining a large file cannot stall responses for other connections;
/// the close/re-arm decision happens after the final chunk.
pub(crate) fn dispatch_loop(egress: mpsc::Receiver<EgressItem>, registry: Registry, stack_size: usize) {
    while let Ok(item) = egress.recv() {
        let EgressItem { conn_id, response, terminate } = item;
        let outbound = {
            let connections = registry.lock().unwrap();
            connections.get(&conn_id).and_then(|outbound| {
                outbound
                    .stream
                    .try_clone()
                    .ok()
                    .map(|stream| (stream, outbound.rearm.clone()))
            })
        };
        let Some((mut stream, rearm)) = outbound else {
            debug!(conn_id, "connection went away before the response was written");
            continue;
        };

        if response.is_file_response() {
            let stream_registry = registry.clone();
            let spawned = unsafe {
                may::coroutine::Builder::new().stack_size(stack_size).spawn(move || {
                    stream_file(conn_id, stream, response, terminate, stream_registry, rearm);
                })
            };
            if let Err(err) = spawned {
                error!(conn_id, error = %err, "failed to spawn file streaming coroutine");
                close(conn_id, &registry);
            }
        } else {
            match write_inline(&mut stream, &response) {
                Ok(()) => finish(conn_id, terminate, &registry, &rearm),
                Err(err) => {
                    warn!(conn_id, error = %err, "response write failed");
                    close(conn_id, &registry);
                }
            }
        }
    }
}

fn write_inline(stream: &mut TcpStream, response: &Response) -> io::Result<()> {
    let head = response.serialize_head(response.payload().len() as u64);
    stream.write_all(&head)?;
    stream.write_all(response.payload())
}

/// Stream a file body in fixed-size chunks. The file is opened here, at
/// send time; when it cannot be opened a 404 goes out instead, and a
/// failure mid-stream tears the connection down because the announced
/// length can no longer be honoured.
fn stream_file(
    conn_id: ConnId,
    mut stream: TcpStream,
    response: Response,
    terminate: bool,
    registry: Registry,
    rearm: mpsc::Sender<()>,
) {
    let path = response.file_path().expect("file response without a path");
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!(conn_id, path = %path.display(), error = %err, "file response target missing");
            let mut res = Response::new();
            res.status(404).send("File Not Found");
            match write_inline(&mut stream, &res) {
                Ok(()) => finish(conn_id, terminate, &registry, &rearm),
                Err(_) => close(conn_id, &registry),
            }
            return;
        }
    };
    let length = match file.metadata() {
        Ok(metadata) => metadata.len(),
        Err(err) => {
            warn!(conn_id, path = %path.display(), error = %err, "file metadata unavailable");
            close(conn_id, &registry);
            return;
        }
    };

    let head = response.serialize_head(length);
    if let Err(err) = stream.write_all(&head) {
        warn!(conn_id, error = %err, "file response head write failed");
        close(conn_id, &registry);
        return;
    }

    let mut chunk = [0u8; FILE_CHUNK_SIZE];
    loop {
        let read = match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) => {
                warn!(conn_id, error = %err, "file read failed mid-stream");
                close(conn_id, &registry);
                return;
            }
        };
        if let Err(err) = stream.write_all(&chunk[..read]) {
            warn!(conn_id, error = %err, "file stream aborted by the client");
            close(conn_id, &registry);
            return;
        }
    }
    debug!(conn_id, length, "file response streamed");
    finish(conn_id, terminate, &registry, &rearm);
}

/// Response fully written: close the connection or hand it back to its
/// receiver for the next request.
fn finish(conn_id: ConnId, terminate: bool, registry: &Registry, rearm: &mpsc::Sender<()>) {
    if terminate {
        close(conn_id, registry);
    } else {
        let _ = rearm.send(());
    }
}

fn close(conn_id: ConnId, registry: &Registry) {
    if let Some(outbound) = registry.lock().unwrap().remove(&conn_id) {
        let _ = outbound.stream.shutdown(Shutdown::Both);
        debug!(conn_id, "connection closed");
    }
}
