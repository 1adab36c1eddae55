use tracing::info;

use super::{Control, Middleware};
use crate::http::{Request, Response};

/// Logs every request passing through the chain at info level.
pub struct RequestLogger;

impl Middleware for RequestLogger {
    fn handle(&self, req: &mut Request, _res: &mut Response) -> Control {
        info!(method = %req.method, path = %req.path, "request received");
        Control::Continue
    }
}
