//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! El accept loop corre en el thread que llama a `start`; cada conexión
//! aceptada se entrega como una tarea al `Executor` (pool de workers o
//! ejecución inline).
//!
//! ```text
//! start() ── bind ── listen ── accept ─┬─▶ worker: ConnectionHandler::handle
//!                                      ├─▶ worker: ...
//! stop()  ── listener.stop() ──────────┘   (el accept loop termina)
//! ```
//!
//! Rutas, middleware y archivos estáticos se configuran con `&mut self`
//! antes de arrancar; `start`, `stop` y los getters toman `&self`, así el
//! servidor se puede compartir en un `Arc` para detenerlo desde otro thread.

use super::connection::{self, ConnectionHandler};
use super::listener::Listener;
use super::tls::TlsContext;
use crate::config::Config;
use crate::error::{HandlerError, HandlerResult, ServerError, ServerResult};
use crate::http::{Method, Request, Response};
use crate::logging::{Logger, TracingLogger};
use crate::router::Router;
use crate::workers::{Executor, WorkerPool};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Parámetros de construcción del servidor
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub workers: usize,
    /// Timeout de lectura/escritura por socket; `None` desactiva el timeout
    pub timeout: Option<Duration>,
    pub max_connections: usize,
    pub backlog: i32,
    /// `false` atiende cada conexión en el thread del accept loop
    pub threaded: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            workers: crate::config::default_workers(),
            timeout: Some(Duration::from_secs(30)),
            max_connections: 100,
            backlog: super::listener::DEFAULT_BACKLOG,
            threaded: true,
        }
    }
}

impl ServerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.workers,
            timeout: timeout_from_secs(config.timeout_secs),
            max_connections: config.max_connections,
            backlog: config.backlog,
            threaded: true,
        }
    }
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Servidor HTTP concurrente
pub struct Server {
    router: Arc<Router>,
    logger: Arc<dyn Logger>,
    options: ServerOptions,
    pool: Arc<WorkerPool>,
    executor: Executor,
    listener: Mutex<Option<Arc<Listener>>>,
    running: AtomicBool,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// Servidor con opciones por defecto que registra en `tracing`
    pub fn new() -> Self {
        Self::with_options(ServerOptions::default(), Arc::new(TracingLogger))
    }

    pub fn with_options(options: ServerOptions, logger: Arc<dyn Logger>) -> Self {
        let pool = Arc::new(WorkerPool::with_logger(options.workers, Arc::clone(&logger)));
        let executor = if options.threaded {
            Executor::Pool(Arc::clone(&pool))
        } else {
            Executor::Inline(Arc::clone(&logger))
        };

        Self {
            router: Arc::new(Router::with_logger(Arc::clone(&logger))),
            logger,
            options,
            pool,
            executor,
            listener: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    // === Configuración (antes de start) ===

    /// Acceso mutable al router
    ///
    /// Si hay tareas en vuelo que comparten el router actual, se clona.
    pub fn router_mut(&mut self) -> &mut Router {
        Arc::make_mut(&mut self.router)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn route<F>(&mut self, method: Method, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router_mut().route(method, pattern, handler);
    }

    pub fn get<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router_mut().get(pattern, handler);
    }

    pub fn post<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router_mut().post(pattern, handler);
    }

    pub fn put<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router_mut().put(pattern, handler);
    }

    pub fn delete<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router_mut().delete(pattern, handler);
    }

    pub fn head<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router_mut().head(pattern, handler);
    }

    pub fn options<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router_mut().options(pattern, handler);
    }

    pub fn patch<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router_mut().patch(pattern, handler);
    }

    pub fn use_middleware<F>(&mut self, middleware: F)
    where
        F: Fn(&Request, &mut Response) -> bool + Send + Sync + 'static,
    {
        self.router_mut().use_middleware(middleware);
    }

    pub fn serve_static(&mut self, prefix: &str, directory: impl Into<PathBuf>) {
        self.router_mut().serve_static(prefix, directory);
    }

    pub fn set_not_found_handler<F>(&mut self, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router_mut().set_not_found_handler(handler);
    }

    pub fn set_error_handler<F>(&mut self, handler: F)
    where
        F: Fn(&HandlerError, &Request, &mut Response) + Send + Sync + 'static,
    {
        self.router_mut().set_error_handler(handler);
    }

    /// Cambia el tamaño del pool (también con el servidor corriendo)
    pub fn set_thread_pool_size(&self, size: usize) {
        self.pool.resize(size);
        self.logger
            .info(&format!("Thread pool size set to {}", self.pool.thread_count()));
    }

    /// Timeout de socket en segundos; 0 lo desactiva
    pub fn set_timeout(&mut self, secs: u64) {
        self.options.timeout = timeout_from_secs(secs);
    }

    /// Máximo de conexiones; es solo indicativo, no se aplica
    pub fn set_max_connections(&mut self, max: usize) {
        self.options.max_connections = max;
        self.logger
            .info(&format!("Max connections hint set to {}", max));
    }

    pub fn server_options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn thread_pool(&self) -> &WorkerPool {
        &self.pool
    }

    // === Ciclo de vida ===

    /// Arranca en HTTP y bloquea en el accept loop hasta `stop()`
    pub fn start(&self, host: &str, port: u16) -> ServerResult<()> {
        self.run(host, port, None)
    }

    /// Inicializa TLS y arranca en HTTPS
    ///
    /// Si el certificado o la clave no cargan, no se abre ningún socket.
    pub fn start_https(
        &self,
        host: &str,
        port: u16,
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> ServerResult<()> {
        let tls = TlsContext::new(cert_path, key_path).map_err(|e| {
            self.logger
                .error(&format!("Failed to initialize TLS: {}", e));
            ServerError::from(e)
        })?;
        self.logger.info("TLS context initialized");
        self.run(host, port, Some(tls))
    }

    /// Detiene el accept loop; puede llamarse desde cualquier thread
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let listener = self.lock_listener().clone();
        if let Some(listener) = listener {
            listener.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Dirección en la que escucha (útil con puerto 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock_listener().as_ref().and_then(|l| l.local_addr())
    }

    /// Procesa un request en memoria, sin sockets ni threads
    ///
    /// # Ejemplo
    /// ```
    /// use hilos_http::server::Server;
    ///
    /// let mut server = Server::new();
    /// server.get("/ping", |_req, res| {
    ///     res.set_text("pong");
    ///     Ok(())
    /// });
    ///
    /// let bytes = server.handle_raw(b"GET /ping HTTP/1.1\r\n\r\n");
    /// let text = String::from_utf8(bytes).unwrap();
    /// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    /// assert!(text.ends_with("pong"));
    /// ```
    pub fn handle_raw(&self, raw: &[u8]) -> Vec<u8> {
        connection::process_raw(&self.router, self.logger.as_ref(), raw)
    }

    fn run(&self, host: &str, port: u16, tls: Option<TlsContext>) -> ServerResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyRunning);
        }

        let _reset = RunReset { server: self };
        let result = self.serve(host, port, tls);

        if let Err(e) = &result {
            self.logger.error(&format!("Failed to start server: {}", e));
        }
        result
    }

    fn serve(&self, host: &str, port: u16, tls: Option<TlsContext>) -> ServerResult<()> {
        let listener = Arc::new(Listener::with_logger(Arc::clone(&self.logger)));
        let addr = listener.bind(host, port)?;
        listener.listen(self.options.backlog)?;

        *self.lock_listener() = Some(Arc::clone(&listener));

        // stop() pudo llegar antes de publicar el listener
        if !self.is_running() {
            listener.stop();
        }

        let scheme = if tls.is_some() { "https" } else { "http" };
        let handler = Arc::new(ConnectionHandler::new(
            Arc::clone(&self.router),
            Arc::clone(&self.logger),
            tls,
            self.options.timeout,
        ));

        if self.options.threaded {
            self.pool.start();
        }
        self.logger.info(&format!(
            "Server started on {}://{} ({} workers, max connections hint {})",
            scheme,
            addr,
            self.pool.thread_count(),
            self.options.max_connections
        ));

        listener.accept(|stream, peer| {
            let handler = Arc::clone(&handler);
            let accepted = self.executor.execute(move || handler.handle(stream, peer));
            if !accepted {
                self.logger
                    .warning(&format!("Dropped connection from {}: pool is stopped", peer));
            }
        });

        self.pool.stop();
        self.logger.info("Server stopped");
        Ok(())
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<Arc<Listener>>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Deja el servidor detenido al salir de `run`, aun con un pánico
struct RunReset<'a> {
    server: &'a Server,
}

impl Drop for RunReset<'_> {
    fn drop(&mut self) {
        self.server.running.store(false, Ordering::SeqCst);
        *self.server.lock_listener() = None;
        self.server.pool.stop();
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
        self.pool.stop();
    }
}
