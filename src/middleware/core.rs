use std::sync::Arc;

use tracing::debug;

use crate::http::{Request, Response};

/// Verdict returned by a middleware to the pipeline, which owns the
/// cursor over the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Proceed to the next middleware.
    Continue,
    /// Skip the remaining middlewares of the current chain. Later stages
    /// (the route chain after the global chain, then the handler) still
    /// run.
    Skip,
    /// Stop the pipeline entirely. The response the middleware built is
    /// the one sent; the handler never runs.
    Abort,
}

/// A middleware inspects and mutates the request or response before the
/// handler runs, and steers the pipeline through its [`Control`] verdict.
///
/// Any `Fn(&mut Request, &mut Response) -> Control` closure is a
/// middleware.
pub trait Middleware: Send + Sync {
    fn handle(&self, req: &mut Request, res: &mut Response) -> Control;
}

impl<F> Middleware for F
where
    F: Fn(&mut Request, &mut Response) -> Control + Send + Sync,
{
    fn handle(&self, req: &mut Request, res: &mut Response) -> Control {
        self(req, res)
    }
}

/// Terminal callable for a matched route.
pub trait Handler: Send + Sync {
    fn handle(&self, req: &mut Request, res: &mut Response);
}

impl<F> Handler for F
where
    F: Fn(&mut Request, &mut Response) + Send + Sync,
{
    fn handle(&self, req: &mut Request, res: &mut Response) {
        self(req, res)
    }
}

/// Run one middleware chain in registration order.
///
/// Returns `Abort` as soon as a middleware aborts, otherwise reports
/// whether the chain ran to completion or was cut short by `Skip`. Each
/// middleware runs at most once; there is no way to rewind.
pub(crate) fn run_chain(
    chain: &[Arc<dyn Middleware>],
    req: &mut Request,
    res: &mut Response,
) -> Control {
    for (index, middleware) in chain.iter().enumerate() {
        match middleware.handle(req, res) {
            Control::Continue => {}
            Control::Skip => {
                debug!(index, "middleware skipped the rest of the chain");
                return Control::Skip;
            }
            Control::Abort => {
                debug!(index, "middleware aborted the pipeline");
                return Control::Abort;
            }
        }
    }
    Control::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request() -> Request {
        Request {
            method: Method::GET,
            url: "/".to_string(),
            path: "/".to_string(),
            protocol: "HTTP/1.1".to_string(),
            payload: String::new(),
            query_params: Default::default(),
            path_params: Default::default(),
            headers: HashMap::new(),
            body: crate::json::JsonValue::Null,
        }
    }

    fn counting(counter: Arc<AtomicUsize>, verdict: Control) -> Arc<dyn Middleware> {
        Arc::new(move |_req: &mut Request, _res: &mut Response| {
            counter.fetch_add(1, Ordering::SeqCst);
            verdict
        })
    }

    #[test]
    fn chain_runs_in_order_until_abort() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = vec![
            counting(calls.clone(), Control::Continue),
            counting(calls.clone(), Control::Abort),
            counting(calls.clone(), Control::Continue),
        ];
        let verdict = run_chain(&chain, &mut request(), &mut Response::new());
        assert_eq!(verdict, Control::Abort);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn skip_cuts_the_chain_short() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = vec![
            counting(calls.clone(), Control::Skip),
            counting(calls.clone(), Control::Continue),
        ];
        let verdict = run_chain(&chain, &mut request(), &mut Response::new());
        assert_eq!(verdict, Control::Skip);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_chain_completes() {
        let verdict = run_chain(&[], &mut request(), &mut Response::new());
        assert_eq!(verdict, Control::Continue);
    }
}
