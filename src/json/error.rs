use thiserror::Error;

/// Errors produced while parsing a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonParseError {
    #[error("unexpected character `{found}` at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEof(usize),
    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),
    #[error("invalid escape sequence `\\{found}` at offset {offset}")]
    InvalidEscape { found: char, offset: usize },
    #[error("invalid number literal at offset {0}")]
    InvalidNumber(usize),
    #[error("object keys must be strings (offset {0})")]
    ExpectedKey(usize),
    #[error("expected `:` after object key at offset {0}")]
    ExpectedColon(usize),
    #[error("trailing comma at offset {0}")]
    TrailingComma(usize),
    #[error("unexpected trailing characters after top-level value at offset {0}")]
    TrailingCharacters(usize),
}

/// Error returned by the typed accessors on [`JsonValue`](super::JsonValue)
/// when the stored variant does not match the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected a JSON {expected}, found {found}")]
pub struct JsonTypeError {
    pub expected: &'static str,
    pub found: &'static str,
}
