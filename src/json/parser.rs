use super::{JsonObject, JsonParseError, JsonValue};

/// Recursive-descent JSON parser over a sized input.
///
/// Dispatches on the first non-whitespace byte of each value. Numbers are
/// parsed as IEEE-754 doubles. Trailing commas are rejected, object keys
/// must be strings, and nothing but whitespace may follow the top-level
/// value. Empty input parses to `Null`.
pub struct JsonParser<'a> {
    input: &'a [u8],
    pos: usize,
}

/// Parse a complete JSON document.
pub fn parse(input: &str) -> Result<JsonValue, JsonParseError> {
    JsonParser::new(input).parse()
}

impl<'a> JsonParser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input: input.as_bytes(), pos: 0 }
    }

    pub fn parse(mut self) -> Result<JsonValue, JsonParseError> {
        self.skip_whitespace();
        if self.pos >= self.input.len() {
            return Ok(JsonValue::Null);
        }
        let value = self.parse_value()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(JsonParseError::TrailingCharacters(self.pos));
        }
        Ok(value)
    }

    fn parse_value(&mut self) -> Result<JsonValue, JsonParseError> {
        match self.peek()? {
            b'"' => self.parse_string().map(JsonValue::String),
            b'{' => self.parse_object(),
            b'[' => self.parse_array(),
            b't' => self.parse_literal("true", JsonValue::Bool(true)),
            b'f' => self.parse_literal("false", JsonValue::Bool(false)),
            b'n' => self.parse_literal("null", JsonValue::Null),
            b'-' | b'0'..=b'9' => self.parse_number(),
            other => Err(JsonParseError::UnexpectedChar { found: other as char, offset: self.pos }),
        }
    }

    fn parse_literal(&mut self, literal: &'static str, value: JsonValue) -> Result<JsonValue, JsonParseError> {
        let end = self.pos + literal.len();
        if end <= self.input.len() && &self.input[self.pos..end] == literal.as_bytes() {
            self.pos = end;
            Ok(value)
        } else {
            Err(JsonParseError::UnexpectedChar { found: self.input[self.pos] as char, offset: self.pos })
        }
    }

    fn parse_string(&mut self) -> Result<String, JsonParseError> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut out = Vec::new();
        loop {
            if self.pos >= self.input.len() {
                return Err(JsonParseError::UnterminatedString(start));
            }
            let c = self.input[self.pos];
            self.pos += 1;
            match c {
                b'"' => break,
                b'\\' => {
                    if self.pos >= self.input.len() {
                        return Err(JsonParseError::UnterminatedString(start));
                    }
                    let esc = self.input[self.pos];
                    self.pos += 1;
                    match esc {
                        b'"' => out.push(b'"'),
                        b'\\' => out.push(b'\\'),
                        b'/' => out.push(b'/'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        other => {
                            return Err(JsonParseError::InvalidEscape {
                                found: other as char,
                                offset: self.pos - 1,
                            })
                        }
                    }
                }
                other => out.push(other),
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn parse_number(&mut self) -> Result<JsonValue, JsonParseError> {
        let start = self.pos;
        if self.peek()? == b'-' {
            self.pos += 1;
        }
        self.consume_digits();
        if self.pos < self.input.len() && self.input[self.pos] == b'.' {
            self.pos += 1;
            self.consume_digits();
        }
        if self.pos < self.input.len() && matches!(self.input[self.pos], b'e' | b'E') {
            self.pos += 1;
            if self.pos < self.input.len() && matches!(self.input[self.pos], b'+' | b'-') {
                self.pos += 1;
            }
            self.consume_digits();
        }
        let literal = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| JsonParseError::InvalidNumber(start))?;
        literal
            .parse::<f64>()
            .map(JsonValue::Number)
            .map_err(|_| JsonParseError::InvalidNumber(start))
    }

    fn consume_digits(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
    }

    fn parse_object(&mut self) -> Result<JsonValue, JsonParseError> {
        let mut members = JsonObject::new();
        self.pos += 1; // opening brace
        self.skip_whitespace();
        if self.peek()? == b'}' {
            self.pos += 1;
            return Ok(JsonValue::Object(members));
        }
        loop {
            if self.peek()? != b'"' {
                return Err(JsonParseError::ExpectedKey(self.pos));
            }
            let key = self.parse_string()?;
            self.skip_whitespace();
            if self.peek()? != b':' {
                return Err(JsonParseError::ExpectedColon(self.pos));
            }
            self.pos += 1;
            self.skip_whitespace();
            let value = self.parse_value()?;
            members.insert(key, value);
            self.skip_whitespace();
            match self.peek()? {
                b'}' => {
                    self.pos += 1;
                    break;
                }
                b',' => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.peek()? == b'}' {
                        return Err(JsonParseError::TrailingComma(self.pos));
                    }
                }
                other => {
                    return Err(JsonParseError::UnexpectedChar { found: other as char, offset: self.pos })
                }
            }
        }
        Ok(JsonValue::Object(members))
    }

    fn parse_array(&mut self) -> Result<JsonValue, JsonParseError> {
        let mut items = Vec::new();
        self.pos += 1; // opening bracket
        self.skip_whitespace();
        if self.peek()? == b']' {
            self.pos += 1;
            return Ok(JsonValue::Array(items));
        }
        loop {
            let value = self.parse_value()?;
            items.push(value);
            self.skip_whitespace();
            match self.peek()? {
                b']' => {
                    self.pos += 1;
                    break;
                }
                b',' => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.peek()? == b']' {
                        return Err(JsonParseError::TrailingComma(self.pos));
                    }
                }
                other => {
                    return Err(JsonParseError::UnexpectedChar { found: other as char, offset: self.pos })
                }
            }
        }
        Ok(JsonValue::Array(items))
    }

    fn peek(&self) -> Result<u8, JsonParseError> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(JsonParseError::UnexpectedEof(self.pos))
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len()
            && matches!(self.input[self.pos], b' ' | b'\t' | b'\n' | b'\r')
        {
            self.pos += 1;
        }
    }
}
