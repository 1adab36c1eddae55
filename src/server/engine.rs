use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{error, warn};

use crate::cors::CorsConfig;
use crate::http::{parse_request, Request, Response};
use crate::middleware::{run_chain, Control, Middleware};
use crate::router::Router;

/// The request-lifecycle core shared by all worker coroutines.
///
/// Owns the frozen route table, the global middleware chain and the CORS
/// policy; everything is read-only once the server starts listening, so
/// workers share it without locking.
pub(crate) struct Engine {
    pub router: Router,
    pub global_middlewares: Vec<Arc<dyn Middleware>>,
    pub cors: Option<CorsConfig>,
}

impl Engine {
    /// Turn one framed request into a response plus the decision whether
    /// the connection must be closed after sending it.
    pub fn handle(&self, raw: &[u8]) -> (Response, bool) {
        let mut req = match parse_request(raw) {
            Ok(req) => req,
            Err(err) => {
                warn!(error = %err, "rejecting unparseable request");
                return (Response::error(err.status()), true);
            }
        };
        let close = req.wants_close();
        let mut res = Response::new();
        self.run(&mut req, &mut res);
        (res, close)
    }

    fn run(&self, req: &mut Request, res: &mut Response) {
        let origin = req.header("Origin").map(str::to_string);

        if let (Some(cors), Some(origin)) = (&self.cors, origin.as_deref()) {
            if !cors.validate(req) {
                *res = cors.rejection_response(origin);
                return;
            }
            if CorsConfig::is_preflight(req) {
                *res = cors.preflight_response(origin);
                return;
            }
        }

        match self.router.find(&req.method, &req.path) {
            None => {
                res.status(404).send("Not found");
            }
            Some((params, route)) => {
                req.path_params = params;
                let route = route.clone();
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    if run_chain(&self.global_middlewares, req, res) == Control::Abort {
                        return;
                    }
                    if run_chain(&route.middlewares, req, res) == Control::Abort {
                        return;
                    }
                    route.handler.handle(req, res);
                }));
                if let Err(panic) = outcome {
                    error!(
                        method = %req.method,
                        path = %req.path,
                        panic = ?panic,
                        "handler panicked"
                    );
                    *res = Response::new();
                    res.status(500).send("Internal Server Error");
                }
            }
        }

        if let (Some(cors), Some(origin)) = (&self.cors, origin.as_deref()) {
            cors.decorate(origin, res);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::JsonBodyParser;
    use crate::router::Route;
    use http::Method;

    fn engine_with(routes: Vec<(Method, &str, Route)>) -> Engine {
        let mut router = Router::new();
        for (method, pattern, route) in routes {
            router.register(method, pattern, route);
        }
        Engine { router, global_middlewares: vec![Arc::new(JsonBodyParser)], cors: None }
    }

    fn echo_id_route() -> Route {
        Route {
            middlewares: Vec::new(),
            handler: Arc::new(|req: &mut Request, res: &mut Response| {
                let id = req.path_param("id").unwrap_or("").to_string();
                res.send(id);
            }),
        }
    }

    #[test]
    fn framing_error_closes_the_connection() {
        let engine = engine_with(vec![]);
        let (res, close) = engine.handle(b"garbage\r\n\r\n");
        assert_eq!(res.status_code(), 400);
        assert!(close);
    }

    #[test]
    fn chunked_requests_get_501() {
        let engine = engine_with(vec![]);
        let raw = b"POST /x HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n";
        let (res, close) = engine.handle(raw);
        assert_eq!(res.status_code(), 501);
        assert!(close);
    }

    #[test]
    fn unknown_route_is_404() {
        let engine = engine_with(vec![]);
        let (res, close) = engine.handle(b"GET /nope HTTP/1.1\r\n\r\n");
        assert_eq!(res.status_code(), 404);
        assert_eq!(res.payload(), b"Not found");
        assert!(!close);
    }

    #[test]
    fn path_params_reach_the_handler() {
        let engine = engine_with(vec![(Method::GET, "/users/:id", echo_id_route())]);
        let (res, _) = engine.handle(b"GET /users/42?lang=en HTTP/1.1\r\n\r\n");
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.payload(), b"42");
    }

    #[test]
    fn handler_panic_becomes_500() {
        let route = Route {
            middlewares: Vec::new(),
            handler: Arc::new(|_req: &mut Request, _res: &mut Response| {
                panic!("boom");
            }),
        };
        let engine = engine_with(vec![(Method::GET, "/panic", route)]);
        let (res, close) = engine.handle(b"GET /panic HTTP/1.1\r\n\r\n");
        assert_eq!(res.status_code(), 500);
        assert_eq!(res.payload(), b"Internal Server Error");
        assert!(!close);
    }

    #[test]
    fn connection_close_is_honoured() {
        let engine = engine_with(vec![(Method::GET, "/users/:id", echo_id_route())]);
        let raw = b"GET /users/1 HTTP/1.1\r\nConnection: close\r\n\r\n";
        let (_, close) = engine.handle(raw);
        assert!(close);
    }
}
