//! # Middleware Module
//!
//! The middleware-and-handler execution pipeline.
//!
//! A request runs through the global chain, then the matched route's
//! chain, then the handler. Each middleware returns a [`Control`] verdict:
//! `Continue` advances to the next middleware, `Skip` jumps past the rest
//! of the current chain, and `Abort` stops the pipeline and sends the
//! response the middleware built. The pipeline owns the cursor, so a
//! middleware can never run twice for one request.
//!
//! ```rust
//! use gantry::{Control, Request, Response, Server};
//!
//! let mut server = Server::new();
//! server.use_middleware(|req: &mut Request, res: &mut Response| {
//!     if req.header("X-Api-Key").is_none() {
//!         res.status(401).send("missing api key");
//!         return Control::Abort;
//!     }
//!     Control::Continue
//! });
//! ```

mod body;
mod core;
mod logger;

pub use body::{JsonBodyParser, UrlencodedBodyParser};
pub use self::core::{Control, Handler, Middleware};
pub(crate) use self::core::run_chain;
pub use logger::RequestLogger;
