//! Embeddable HTTP/1.1 application server.
//!
//! Register routes and middleware against a [`Server`], then bind a port
//! and serve. Requests flow through a three-stage coroutine pipeline
//! (receive, work, dispatch) described in the [`server`] module.

pub mod cors;
pub mod http;
pub mod json;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;
mod util;

pub use cors::{CorsConfig, CorsConfigError};
pub use self::http::{ParamVec, ParseError, Request, Response};
pub use json::{JsonParseError, JsonTypeError, JsonValue};
pub use middleware::{Control, Handler, JsonBodyParser, Middleware, RequestLogger, UrlencodedBodyParser};
pub use router::{PathTrie, Router};
pub use runtime_config::RuntimeConfig;
pub use server::{Server, ServerHandle};
