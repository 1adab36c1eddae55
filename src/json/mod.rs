//! # JSON Module
//!
//! In-crate JSON value, parser and serialiser used for request and response
//! bodies.
//!
//! The parser is a recursive descent over a sized input with strict
//! grammar rules (no trailing commas, string keys only, nothing after the
//! top-level value). The serialiser emits compact output with object keys
//! in sorted order, so equal values always produce identical bytes.
//!
//! ```rust
//! use gantry::json::{self, JsonValue};
//!
//! let value = json::parse(r#"{"n": 7, "tags": ["a", "b"]}"#).unwrap();
//! assert_eq!(value["n"].as_f64().unwrap(), 7.0);
//! assert_eq!(value["tags"][1].as_str().unwrap(), "b");
//! assert_eq!(value.stringify(), r#"{"n":7,"tags":["a","b"]}"#);
//! ```

mod error;
mod parser;
mod value;

pub use error::{JsonParseError, JsonTypeError};
pub use parser::{parse, JsonParser};
pub use value::{JsonArray, JsonObject, JsonValue};
