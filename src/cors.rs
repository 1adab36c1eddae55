//! # CORS Module
//!
//! Cross-origin policy engine: configuration, request validation, the
//! preflight responder and the rejection response.
//!
//! The worker stage consults this module before routing. Requests without
//! an `Origin` header are not cross-origin and always pass. A validated
//! `OPTIONS` request carrying `Access-Control-Request-Method` is answered
//! directly with 204 and never reaches middleware or handlers.

use std::collections::BTreeSet;

use http::Method;
use thiserror::Error;
use tracing::warn;

use crate::http::{Request, Response};
use crate::util::split_csv;

/// Rejected combinations caught when the configuration is frozen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorsConfigError {
    #[error("the wildcard origin cannot be combined with credentials")]
    WildcardWithCredentials,
}

/// Cross-origin resource sharing policy.
///
/// Built once through [`Server::create_cors_config`](crate::Server::create_cors_config)
/// and read-only afterwards. Origin, method and header names are compared
/// exactly as configured.
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    /// Allowed origins; may contain the literal `"*"`.
    pub allowed_origins: BTreeSet<String>,
    pub allowed_methods: BTreeSet<String>,
    pub allowed_headers: BTreeSet<String>,
    /// Headers exposed to cross-origin callers on actual responses.
    pub exposed_headers: BTreeSet<String>,
    pub with_credentials: bool,
}

impl CorsConfig {
    pub(crate) fn check(&self) -> Result<(), CorsConfigError> {
        if self.with_credentials && self.allowed_origins.contains("*") {
            return Err(CorsConfigError::WildcardWithCredentials);
        }
        Ok(())
    }

    /// Whether the request satisfies the policy. Requests without an
    /// `Origin` header are not cross-origin and pass unconditionally.
    pub fn validate(&self, req: &Request) -> bool {
        let Some(origin) = req.header("Origin") else {
            return true;
        };
        if !self.allowed_origins.contains("*") && !self.allowed_origins.contains(origin) {
            warn!(origin, "origin not allowed");
            return false;
        }
        if !self.allowed_methods.contains(req.method.as_str()) {
            warn!(method = %req.method, "method not allowed for cross-origin requests");
            return false;
        }
        if req.method == Method::OPTIONS {
            if let Some(requested) = req.header("Access-Control-Request-Method") {
                if !self.allowed_methods.contains(requested.trim()) {
                    warn!(requested, "preflighted method not allowed");
                    return false;
                }
            }
        }
        if let Some(requested) = req.header("Access-Control-Request-Headers") {
            for header in split_csv(requested) {
                if !self.allowed_headers.contains(header) {
                    warn!(header, "preflighted header not allowed");
                    return false;
                }
            }
        }
        true
    }

    /// Whether this is a browser preflight: `OPTIONS` announcing the
    /// method of the request it precedes.
    pub(crate) fn is_preflight(req: &Request) -> bool {
        req.method == Method::OPTIONS
            && req.header("Origin").is_some()
            && req.header("Access-Control-Request-Method").is_some()
    }

    /// 204 answer for a validated preflight. No middleware or handler runs.
    pub(crate) fn preflight_response(&self, origin: &str) -> Response {
        let mut res = Response::new();
        res.status(204);
        self.apply_common_headers(origin, &mut res);
        res.set_header("Access-Control-Allow-Methods", join(&self.allowed_methods));
        res.set_header("Access-Control-Allow-Headers", join(&self.allowed_headers));
        res
    }

    /// 403 answer for a failed validation. The CORS headers are still
    /// populated so browsers can surface a useful error.
    pub(crate) fn rejection_response(&self, origin: &str) -> Response {
        let mut res = Response::new();
        res.status(403)
            .send("CORS Policy Error: Origin or Method or headers not allowed");
        self.apply_common_headers(origin, &mut res);
        res.set_header("Access-Control-Allow-Methods", join(&self.allowed_methods));
        res.set_header("Access-Control-Allow-Headers", join(&self.allowed_headers));
        res
    }

    /// Add the response headers for a validated actual (non-preflight)
    /// cross-origin request.
    pub(crate) fn decorate(&self, origin: &str, res: &mut Response) {
        self.apply_common_headers(origin, res);
        if !self.exposed_headers.is_empty() {
            res.set_header("Access-Control-Expose-Headers", join(&self.exposed_headers));
        }
    }

    fn apply_common_headers(&self, origin: &str, res: &mut Response) {
        res.set_header("Access-Control-Allow-Origin", self.allow_origin_value(origin));
        if self.with_credentials {
            res.set_header("Access-Control-Allow-Credentials", "true");
        }
    }

    /// `*` when the wildcard is configured (credentials are rejected in
    /// that combination), otherwise the request's own origin echoed back.
    fn allow_origin_value(&self, origin: &str) -> String {
        if self.allowed_origins.contains("*") {
            "*".to_string()
        } else {
            origin.to_string()
        }
    }
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().cloned().collect::<Vec<_>>().join(", ")
}
