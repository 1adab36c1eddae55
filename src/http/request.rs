use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use memchr::memmem;
use smallvec::SmallVec;

use super::url::{decode_path, parse_query};
use super::ParseError;
use crate::json::JsonValue;

/// Maximum number of path/query parameters held inline before the vector
/// spills to the heap. Typical REST routes carry well under eight.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter storage for path and query parameters.
///
/// Pairs are kept in arrival order; lookups resolve duplicates with
/// last-wins semantics. Names are `Arc<str>` because path parameter names
/// are shared with the routing trie.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A parsed HTTP request.
///
/// Everything except `body` and `path_params` is fixed once parsing
/// completes. `body` starts out `Null` and is filled in by the JSON body
/// middleware when the content type matches; `path_params` is filled in
/// after route matching.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Raw request target exactly as received.
    pub url: String,
    /// Request target with the query stripped. Percent escapes are decoded
    /// except where the decoded byte is a reserved delimiter.
    pub path: String,
    /// Protocol token from the request line, e.g. `HTTP/1.1`.
    pub protocol: String,
    /// Raw body bytes.
    pub payload: String,
    /// Decoded query parameters (`+` becomes space, last duplicate wins).
    pub query_params: ParamVec,
    /// Parameters captured by the routing trie.
    pub path_params: ParamVec,
    /// Headers exactly as received, values trimmed. Keys are
    /// case-sensitive; a repeated key keeps the last value.
    pub headers: HashMap<String, String>,
    /// Body parsed as JSON, `Null` until a body middleware runs.
    pub body: JsonValue,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Last-wins lookup of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Last-wins lookup of a captured path parameter.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the client asked for the connection to be closed after the
    /// response. Any other `Connection` value, or none, keeps it open.
    pub fn wants_close(&self) -> bool {
        self.headers
            .get("Connection")
            .map(|v| v.trim().eq_ignore_ascii_case("close"))
            .unwrap_or(false)
    }
}

/// Reconstruct a [`Request`] from the framed bytes handed over by the
/// receiver stage.
///
/// The receiver guarantees the header block is complete and, when a valid
/// `Content-Length` is present, that at least that many body bytes follow.
/// The parser still validates the length strictly; the receiver only
/// scans it leniently for framing.
pub fn parse_request(raw: &[u8]) -> Result<Request, ParseError> {
    let header_end = memmem::find(raw, b"\r\n\r\n").ok_or(ParseError::BadRequestLine)?;
    let head = &raw[..header_end];

    let line_end = memmem::find(head, b"\r\n").unwrap_or(head.len());
    let (method, url, protocol) = parse_request_line(&head[..line_end])?;

    let mut headers = HashMap::new();
    let mut rest = &head[(line_end + 2).min(head.len())..];
    while !rest.is_empty() {
        let line_end = memmem::find(rest, b"\r\n").unwrap_or(rest.len());
        let line = &rest[..line_end];
        let colon = memchr::memchr(b':', line).ok_or(ParseError::BadHeaderLine)?;
        let name = String::from_utf8_lossy(&line[..colon]).trim().to_string();
        let value = String::from_utf8_lossy(&line[colon + 1..]).trim().to_string();
        if name.is_empty() {
            return Err(ParseError::BadHeaderLine);
        }
        headers.insert(name, value);
        rest = &rest[(line_end + 2).min(rest.len())..];
    }

    if let Some(te) = headers.get("Transfer-Encoding") {
        if te.to_ascii_lowercase().contains("chunked") {
            return Err(ParseError::UnsupportedTransferEncoding);
        }
    }

    let body = &raw[header_end + 4..];
    let payload = match headers.get("Content-Length") {
        Some(value) => {
            let length: usize = value.parse().map_err(|_| ParseError::BadContentLength)?;
            let take = length.min(body.len());
            String::from_utf8_lossy(&body[..take]).into_owned()
        }
        None => String::new(),
    };

    let (path_raw, query_params) = parse_query(&url);
    let path = decode_path(path_raw);

    Ok(Request {
        method,
        url,
        path,
        protocol,
        payload,
        query_params,
        path_params: ParamVec::new(),
        headers,
        body: JsonValue::Null,
    })
}

fn parse_request_line(line: &[u8]) -> Result<(Method, String, String), ParseError> {
    let first = memchr::memchr(b' ', line).ok_or(ParseError::BadRequestLine)?;
    let rest = &line[first + 1..];
    let second = memchr::memchr(b' ', rest).ok_or(ParseError::BadRequestLine)?;

    let method = Method::from_bytes(&line[..first]).map_err(|_| ParseError::BadRequestLine)?;
    let url = std::str::from_utf8(&rest[..second]).map_err(|_| ParseError::BadRequestLine)?;
    let protocol = String::from_utf8_lossy(&rest[second + 1..]).trim().to_string();
    if url.is_empty() || protocol.is_empty() {
        return Err(ParseError::BadRequestLine);
    }
    Ok((method, url.to_string(), protocol))
}
