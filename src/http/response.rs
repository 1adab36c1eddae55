use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::status::reason_phrase;
use crate::json::{JsonObject, JsonValue};

/// An HTTP response under construction.
///
/// Middlewares and handlers mutate the response through the chaining
/// builder methods. Exactly one of the inline payload or a file path is
/// emitted on the wire; `Content-Length` is always computed at
/// serialisation time and `Connection: keep-alive` is written when the
/// caller set no `Connection` header.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    protocol: String,
    payload: Vec<u8>,
    /// Response headers. Sorted so the wire output is deterministic.
    pub headers: BTreeMap<String, String>,
    file_path: Option<PathBuf>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            protocol: "HTTP/1.1".to_string(),
            payload: Vec::new(),
            headers: BTreeMap::new(),
            file_path: None,
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Default::default()
    }

    /// Response carrying the `{"message": "<reason-phrase>"}` convention
    /// used for errors raised inside the server core.
    pub fn error(status: u16) -> Self {
        let mut message = JsonObject::new();
        message.insert("message".to_string(), JsonValue::from(reason_phrase(status)));
        let mut res = Response::new();
        res.status(status).json(&JsonValue::Object(message));
        res
    }

    pub fn status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    pub fn set_protocol(&mut self, protocol: impl Into<String>) -> &mut Self {
        self.protocol = protocol.into();
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set a plain payload. The content type stays whatever was set
    /// before, defaulting to `text/plain; charset=UTF-8` on the wire.
    pub fn send(&mut self, payload: impl Into<Vec<u8>>) -> &mut Self {
        self.payload = payload.into();
        self.file_path = None;
        self
    }

    /// Serialise a JSON value as the payload.
    pub fn json(&mut self, value: &JsonValue) -> &mut Self {
        self.payload = value.stringify().into_bytes();
        self.file_path = None;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        self
    }

    /// Respond with the contents of a file, rendered inline.
    ///
    /// The file is opened by the dispatcher at send time, never here; a
    /// missing file turns into a 404 at that point.
    pub fn send_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.set_file(path.into(), "inline")
    }

    /// Respond with the contents of a file as a download attachment.
    pub fn download(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.set_file(path.into(), "attachment")
    }

    fn set_file(&mut self, path: PathBuf, disposition: &str) -> &mut Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.headers
            .insert("Content-Type".to_string(), mime_type(&extension).to_string());
        self.headers.insert(
            "Content-Disposition".to_string(),
            format!("{disposition}; filename=\"{filename}\""),
        );
        self.payload = Vec::new();
        self.file_path = Some(path);
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn is_file_response(&self) -> bool {
        self.file_path.is_some()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Build the status line and header block for a body of
    /// `content_length` bytes. `Content-Length` is always the computed
    /// value, overriding anything a handler set.
    pub(crate) fn serialize_head(&self, content_length: u64) -> Vec<u8> {
        let mut headers = self.headers.clone();
        headers.insert("Content-Length".to_string(), content_length.to_string());
        headers
            .entry("Content-Type".to_string())
            .or_insert_with(|| "text/plain; charset=UTF-8".to_string());
        headers
            .entry("Connection".to_string())
            .or_insert_with(|| "keep-alive".to_string());

        let mut head = format!("{} {} {}\r\n", self.protocol, self.status, reason_phrase(self.status));
        for (name, value) in &headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        head.into_bytes()
    }
}

/// Content type for a file extension (lowercase, without the dot).
pub fn mime_type(extension: &str) -> &'static str {
    match extension {
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}
