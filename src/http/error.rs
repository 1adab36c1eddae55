use thiserror::Error;

/// Errors raised while reconstructing a request from raw socket bytes.
///
/// Every variant maps to an HTTP status; the worker stage converts the
/// error into a response and closes the connection, so these never reach
/// the embedder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed request line")]
    BadRequestLine,
    #[error("malformed header line")]
    BadHeaderLine,
    #[error("invalid Content-Length value")]
    BadContentLength,
    #[error("chunked transfer encoding is not supported")]
    UnsupportedTransferEncoding,
}

impl ParseError {
    pub fn status(&self) -> u16 {
        match self {
            ParseError::UnsupportedTransferEncoding => 501,
            _ => 400,
        }
    }
}
