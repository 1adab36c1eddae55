use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use http::Method;
use may::coroutine::JoinHandle;
use may::net::TcpListener;
use may::sync::mpsc;
use tracing::{error, info};

use super::conn::{accept_loop, EgressItem, IngressItem, Registry};
use super::dispatch::dispatch_loop;
use super::engine::Engine;
use crate::cors::{CorsConfig, CorsConfigError};
use crate::middleware::{Handler, Middleware};
use crate::router::{Route, Router};
use crate::runtime_config::RuntimeConfig;

/// The server façade: routes, middleware and CORS are registered here,
/// then [`start`](Server::start) or [`listen`](Server::listen) freezes
/// everything and brings up the stage coroutines.
pub struct Server {
    router: Router,
    global_middlewares: Vec<Arc<dyn Middleware>>,
    cors: Option<CorsConfig>,
    config: RuntimeConfig,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// Create a server configured from the environment
    /// (see [`RuntimeConfig::from_env`]).
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::from_env())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            router: Router::new(),
            global_middlewares: Vec::new(),
            cors: None,
            config,
        }
    }

    /// Register a global middleware. Global middlewares run before the
    /// matched route's own chain, in registration order.
    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.global_middlewares.push(Arc::new(middleware));
        self
    }

    /// Number of worker coroutines parsing and handling requests.
    pub fn set_workers(&mut self, workers: usize) -> &mut Self {
        self.config.workers = workers.max(1);
        self
    }

    /// Size limit for a request's header block; connections exceeding it
    /// are answered with 400 and closed.
    pub fn set_max_header_size(&mut self, bytes: usize) -> &mut Self {
        self.config.max_header_size = bytes;
        self
    }

    /// Run the one-shot CORS configurer and freeze the policy. Cross-origin
    /// validation is enabled from here on.
    pub fn create_cors_config(
        &mut self,
        configure: impl FnOnce(&mut CorsConfig),
    ) -> Result<(), CorsConfigError> {
        let mut config = CorsConfig::default();
        configure(&mut config);
        config.check()?;
        self.cors = Some(config);
        Ok(())
    }

    pub fn get(&mut self, pattern: &str, handler: impl Handler + 'static) -> &mut Self {
        self.route(Method::GET, pattern, Vec::new(), handler)
    }

    pub fn get_with(
        &mut self,
        pattern: &str,
        middlewares: Vec<Arc<dyn Middleware>>,
        handler: impl Handler + 'static,
    ) -> &mut Self {
        self.route(Method::GET, pattern, middlewares, handler)
    }

    pub fn post(&mut self, pattern: &str, handler: impl Handler + 'static) -> &mut Self {
        self.route(Method::POST, pattern, Vec::new(), handler)
    }

    pub fn post_with(
        &mut self,
        pattern: &str,
        middlewares: Vec<Arc<dyn Middleware>>,
        handler: impl Handler + 'static,
    ) -> &mut Self {
        self.route(Method::POST, pattern, middlewares, handler)
    }

    pub fn put(&mut self, pattern: &str, handler: impl Handler + 'static) -> &mut Self {
        self.route(Method::PUT, pattern, Vec::new(), handler)
    }

    pub fn put_with(
        &mut self,
        pattern: &str,
        middlewares: Vec<Arc<dyn Middleware>>,
        handler: impl Handler + 'static,
    ) -> &mut Self {
        self.route(Method::PUT, pattern, middlewares, handler)
    }

    pub fn patch(&mut self, pattern: &str, handler: impl Handler + 'static) -> &mut Self {
        self.route(Method::PATCH, pattern, Vec::new(), handler)
    }

    pub fn patch_with(
        &mut self,
        pattern: &str,
        middlewares: Vec<Arc<dyn Middleware>>,
        handler: impl Handler + 'static,
    ) -> &mut Self {
        self.route(Method::PATCH, pattern, middlewares, handler)
    }

    pub fn delete(&mut self, pattern: &str, handler: impl Handler + 'static) -> &mut Self {
        self.route(Method::DELETE, pattern, Vec::new(), handler)
    }

    pub fn delete_with(
        &mut self,
        pattern: &str,
        middlewares: Vec<Arc<dyn Middleware>>,
        handler: impl Handler + 'static,
    ) -> &mut Self {
        self.route(Method::DELETE, pattern, middlewares, handler)
    }

    /// Register a route for an arbitrary method. Registering the same
    /// `(method, pattern)` pair again replaces the earlier entry.
    pub fn route(
        &mut self,
        method: Method,
        pattern: &str,
        middlewares: Vec<Arc<dyn Middleware>>,
        handler: impl Handler + 'static,
    ) -> &mut Self {
        self.router
            .register(method, pattern, Route { middlewares, handler: Arc::new(handler) });
        self
    }

    /// Bind the address and bring up the acceptor, worker and dispatcher
    /// coroutines. Returns a handle to the running server.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let listener = TcpListener::bind(addr)?;
        let addr = listener.local_addr()?;
        let config = self.config;

        let engine = Arc::new(Engine {
            router: self.router,
            global_middlewares: self.global_middlewares,
            cors: self.cors,
        });

        let (ingress_tx, ingress_rx) = mpsc::channel::<IngressItem>();
        let (egress_tx, egress_rx) = mpsc::channel::<EgressItem>();
        let registry: Registry = Arc::new(Mutex::new(HashMap::new()));

        // Worker coroutines share one ingress receiver and load-balance
        // over it.
        let ingress_rx = Arc::new(ingress_rx);
        for worker_id in 0..config.workers {
            let ingress_rx = ingress_rx.clone();
            let egress_tx = egress_tx.clone();
            let engine = engine.clone();
            let spawned = unsafe {
                may::coroutine::Builder::new()
                    .stack_size(config.stack_size)
                    .spawn(move || worker_loop(worker_id, &ingress_rx, &egress_tx, &engine))
            };
            if let Err(err) = spawned {
                error!(worker_id, error = %err, "failed to spawn worker coroutine");
            }
        }

        {
            let registry = registry.clone();
            let _ = unsafe {
                may::coroutine::Builder::new()
                    .stack_size(config.stack_size)
                    .spawn(move || dispatch_loop(egress_rx, registry, config.stack_size))
            }?;
        }

        let handle = unsafe {
            may::coroutine::Builder::new().stack_size(config.stack_size).spawn(move || {
                accept_loop(
                    listener,
                    ingress_tx,
                    egress_tx,
                    registry,
                    config.max_header_size,
                    config.stack_size,
                );
            })
        }?;

        info!(%addr, workers = config.workers, "server listening");
        Ok(ServerHandle { addr, handle })
    }

    /// Bind the port on all interfaces, invoke `on_listen`, then serve
    /// until the process exits.
    pub fn listen(self, port: u16, on_listen: impl FnOnce()) -> io::Result<()> {
        let handle = self.start(("0.0.0.0", port))?;
        on_listen();
        let _ = handle.join();
        Ok(())
    }
}

/// Worker stage: pop framed requests, run them through the engine, push
/// the response for the dispatcher. Workers never touch sockets.
fn worker_loop(
    worker_id: usize,
    ingress: &mpsc::Receiver<IngressItem>,
    egress: &mpsc::Sender<EgressItem>,
    engine: &Engine,
) {
    while let Ok(item) = ingress.recv() {
        let (response, terminate) = engine.handle(&item.raw);
        if egress
            .send(EgressItem { conn_id: item.conn_id, response, terminate })
            .is_err()
        {
            break;
        }
    }
    info!(worker_id, "worker stopped");
}

/// Handle to a running server.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener is bound to, with the concrete port when the
    /// server was started on port 0.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Poll until the listener accepts connections.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if std::net::TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Cancel the accept loop and wait for it to unwind.
    pub fn stop(self) {
        unsafe {
            self.handle.coroutine().cancel();
        }
        let _ = self.handle.join();
    }

    /// Block until the accept loop exits.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}
