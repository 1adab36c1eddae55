//! # Server Module
//!
//! Connection management and the three-stage request pipeline.
//!
//! ## Architecture
//!
//! A request crosses three stages, each its own coroutine, joined by FIFO
//! channels:
//!
//! 1. **Receiver** (one coroutine per connection): appends socket reads to
//!    the connection's buffer until a complete request is framed, then
//!    pushes it onto the ingress queue and waits to be re-armed.
//! 2. **Worker** (configurable pool, default 1): parses the frame, runs
//!    CORS, routing, the middleware chains and the handler, and pushes the
//!    finished response onto the egress queue.
//! 3. **Dispatcher** (single coroutine): serialises the response onto the
//!    wire, streaming file bodies chunk by chunk, then closes the
//!    connection or re-arms its receiver.
//!
//! The split keeps slow handlers from blocking other connections' reads
//! and slow clients from blocking handler execution. Because a receiver
//! only frames one request at a time and is re-armed after the response
//! is written, a connection is owned by exactly one stage at any moment.
//!
//! ```no_run
//! use gantry::{Request, Response, Server};
//!
//! let mut server = Server::new();
//! server.get("/hello", |_req: &mut Request, res: &mut Response| {
//!     res.send("Hello");
//! });
//! server.listen(9000, || println!("listening on port 9000")).unwrap();
//! ```

mod conn;
mod core;
mod dispatch;
mod engine;

pub use self::core::{Server, ServerHandle};
