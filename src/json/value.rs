use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};

use super::JsonTypeError;

/// A JSON object. Keys are sorted so serialisation is deterministic.
pub type JsonObject = BTreeMap<String, JsonValue>;

/// A JSON array.
pub type JsonArray = Vec<JsonValue>;

/// A parsed JSON value.
///
/// Numbers are stored as IEEE-754 doubles. Element access goes through
/// [`Index`]/[`IndexMut`] for ergonomic traversal (`value["user"]["id"]`),
/// while the `as_*` accessors return a [`JsonTypeError`] when the variant
/// does not match.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(JsonArray),
    Object(JsonObject),
}

static NULL: JsonValue = JsonValue::Null;

impl JsonValue {
    /// Name of the stored variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            JsonValue::Null => "null",
            JsonValue::Bool(_) => "boolean",
            JsonValue::Number(_) => "number",
            JsonValue::String(_) => "string",
            JsonValue::Array(_) => "array",
            JsonValue::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    pub fn as_null(&self) -> Result<(), JsonTypeError> {
        match self {
            JsonValue::Null => Ok(()),
            other => Err(other.type_error("null")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, JsonTypeError> {
        match self {
            JsonValue::Bool(b) => Ok(*b),
            other => Err(other.type_error("boolean")),
        }
    }

    pub fn as_f64(&self) -> Result<f64, JsonTypeError> {
        match self {
            JsonValue::Number(n) => Ok(*n),
            other => Err(other.type_error("number")),
        }
    }

    pub fn as_str(&self) -> Result<&str, JsonTypeError> {
        match self {
            JsonValue::String(s) => Ok(s),
            other => Err(other.type_error("string")),
        }
    }

    pub fn as_array(&self) -> Result<&JsonArray, JsonTypeError> {
        match self {
            JsonValue::Array(a) => Ok(a),
            other => Err(other.type_error("array")),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut JsonArray, JsonTypeError> {
        match self {
            JsonValue::Array(a) => Ok(a),
            other => Err(other.type_error("array")),
        }
    }

    pub fn as_object(&self) -> Result<&JsonObject, JsonTypeError> {
        match self {
            JsonValue::Object(o) => Ok(o),
            other => Err(other.type_error("object")),
        }
    }

    pub fn as_object_mut(&mut self) -> Result<&mut JsonObject, JsonTypeError> {
        match self {
            JsonValue::Object(o) => Ok(o),
            other => Err(other.type_error("object")),
        }
    }

    /// Borrow a member of an object. Returns `None` on missing keys and on
    /// non-object values.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            JsonValue::Object(o) => o.get(key),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut JsonValue> {
        match self {
            JsonValue::Object(o) => o.get_mut(key),
            _ => None,
        }
    }

    fn type_error(&self, expected: &'static str) -> JsonTypeError {
        JsonTypeError { expected, found: self.type_name() }
    }

    /// Serialise this value into compact JSON text.
    pub fn stringify(&self) -> String {
        let mut out = String::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut String) {
        match self {
            JsonValue::Null => out.push_str("null"),
            JsonValue::Bool(true) => out.push_str("true"),
            JsonValue::Bool(false) => out.push_str("false"),
            // f64 Display produces the shortest representation that
            // round-trips; integral values print without a fraction.
            JsonValue::Number(n) => out.push_str(&n.to_string()),
            JsonValue::String(s) => write_escaped(s, out),
            JsonValue::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write(out);
                }
                out.push(']');
            }
            JsonValue::Object(members) => {
                out.push('{');
                for (i, (key, value)) in members.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_escaped(key, out);
                    out.push(':');
                    value.write(out);
                }
                out.push('}');
            }
        }
    }
}

fn write_escaped(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            other => out.push(other),
        }
    }
    out.push('"');
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify())
    }
}

/// Missing keys and non-object receivers index to `Null`, so chained
/// lookups like `value["a"]["b"]` never panic on reads.
impl Index<&str> for JsonValue {
    type Output = JsonValue;

    fn index(&self, key: &str) -> &JsonValue {
        self.get(key).unwrap_or(&NULL)
    }
}

/// Mutable indexing inserts `Null` for missing keys, mirroring the read
/// side of assignment chains like `value["a"] = x.into()`. Panics when the
/// receiver is not an object.
impl IndexMut<&str> for JsonValue {
    fn index_mut(&mut self, key: &str) -> &mut JsonValue {
        match self {
            JsonValue::Object(o) => o.entry(key.to_string()).or_insert(JsonValue::Null),
            other => panic!("cannot index a JSON {} with a string key", other.type_name()),
        }
    }
}

impl Index<usize> for JsonValue {
    type Output = JsonValue;

    fn index(&self, index: usize) -> &JsonValue {
        match self {
            JsonValue::Array(a) => a.get(index).unwrap_or(&NULL),
            _ => &NULL,
        }
    }
}

impl IndexMut<usize> for JsonValue {
    fn index_mut(&mut self, index: usize) -> &mut JsonValue {
        match self {
            JsonValue::Array(a) => &mut a[index],
            other => panic!("cannot index a JSON {} with an array index", other.type_name()),
        }
    }
}

impl From<()> for JsonValue {
    fn from(_: ()) -> Self {
        JsonValue::Null
    }
}

impl From<bool> for JsonValue {
    fn from(b: bool) -> Self {
        JsonValue::Bool(b)
    }
}

impl From<f64> for JsonValue {
    fn from(n: f64) -> Self {
        JsonValue::Number(n)
    }
}

impl From<i64> for JsonValue {
    fn from(n: i64) -> Self {
        JsonValue::Number(n as f64)
    }
}

impl From<&str> for JsonValue {
    fn from(s: &str) -> Self {
        JsonValue::String(s.to_string())
    }
}

impl From<String> for JsonValue {
    fn from(s: String) -> Self {
        JsonValue::String(s)
    }
}

impl From<JsonArray> for JsonValue {
    fn from(a: JsonArray) -> Self {
        JsonValue::Array(a)
    }
}

impl From<JsonObject> for JsonValue {
    fn from(o: JsonObject) -> Self {
        JsonValue::Object(o)
    }
}
