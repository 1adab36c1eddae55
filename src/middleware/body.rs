use tracing::warn;

use super::{Control, Middleware};
use crate::http::url::parse_pairs;
use crate::http::{Request, Response};
use crate::json::{self, JsonObject, JsonValue};

/// Parses `application/json` request bodies into `req.body`.
///
/// Requests with another content type pass through untouched. A body that
/// fails to parse aborts the pipeline with a 400.
pub struct JsonBodyParser;

impl Middleware for JsonBodyParser {
    fn handle(&self, req: &mut Request, res: &mut Response) -> Control {
        let is_json = req
            .headers
            .get("Content-Type")
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);
        if !is_json {
            return Control::Continue;
        }
        match json::parse(&req.payload) {
            Ok(value) => {
                req.body = value;
                Control::Continue
            }
            Err(err) => {
                warn!(error = %err, "request body is not valid JSON");
                res.status(400).send("Bad Request");
                Control::Abort
            }
        }
    }
}

/// Parses `application/x-www-form-urlencoded` request bodies into
/// `req.body` as an object of strings. Duplicate field names keep the
/// last value.
pub struct UrlencodedBodyParser;

impl Middleware for UrlencodedBodyParser {
    fn handle(&self, req: &mut Request, _res: &mut Response) -> Control {
        let is_form = req
            .headers
            .get("Content-Type")
            .map(|ct| ct.contains("application/x-www-form-urlencoded"))
            .unwrap_or(false);
        if !is_form {
            return Control::Continue;
        }
        let mut fields = JsonObject::new();
        for (name, value) in parse_pairs(&req.payload) {
            fields.insert(name, JsonValue::String(value));
        }
        req.body = JsonValue::Object(fields);
        Control::Continue
    }
}
