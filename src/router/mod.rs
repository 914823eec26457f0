//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Convierte un `Request` en un `Response` pasando por una máquina de
//! estados que termina en la primera respuesta producida:
//!
//! ```text
//! Request
//!   │
//!   ├─▶ middleware 1..N ──(false)──────────────────────▶ Response tal cual
//!   │
//!   ├─▶ archivos estáticos (prefijo) ──(match)─────────▶ archivo / 404
//!   │
//!   ├─▶ rutas en orden de registro ──(match)───────────▶ handler
//!   │
//!   └─▶ not found handler
//!
//! Cualquier falla (Err o pánico) ───────────────────────▶ error handler
//! ```
//!
//! Las tablas se llenan antes de arrancar el servidor y después solo se leen.

pub mod pattern;

pub use pattern::RoutePattern;

use crate::error::{HandlerError, HandlerResult};
use crate::http::{Method, Request, Response, StatusCode};
use crate::logging::{Logger, NullLogger};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handler de una ruta o del caso "no encontrado"
pub type Handler = Arc<dyn Fn(&Request, &mut Response) -> HandlerResult + Send + Sync>;

/// Middleware: `false` corta la cadena y envía la respuesta actual
pub type Middleware = Arc<dyn Fn(&Request, &mut Response) -> bool + Send + Sync>;

/// Recibe la falla que interrumpió el procesamiento
pub type ErrorHandler = Arc<dyn Fn(&HandlerError, &Request, &mut Response) + Send + Sync>;

/// Entrada de la tabla de rutas
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: RoutePattern,
    handler: Handler,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

/// Router con middleware, archivos estáticos y rutas
#[derive(Clone)]
pub struct Router {
    routes: Vec<Route>,
    middleware: Vec<Middleware>,
    /// Prefijo de URL → directorio; el `BTreeMap` fija el orden de búsqueda
    static_paths: BTreeMap<String, PathBuf>,
    not_found_handler: Handler,
    error_handler: ErrorHandler,
    logger: Arc<dyn Logger>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Crea un router vacío con los handlers por defecto
    pub fn new() -> Self {
        Self::with_logger(Arc::new(NullLogger))
    }

    /// Crea un router que registra las fallas de los handlers en `logger`
    pub fn with_logger(logger: Arc<dyn Logger>) -> Self {
        Self {
            routes: Vec::new(),
            middleware: Vec::new(),
            static_paths: BTreeMap::new(),
            not_found_handler: Arc::new(default_not_found),
            error_handler: Arc::new(default_error_handler),
            logger,
        }
    }

    pub fn set_logger(&mut self, logger: Arc<dyn Logger>) {
        self.logger = logger;
    }

    /// Registra una ruta para un método y un patrón
    ///
    /// # Ejemplo
    /// ```
    /// use hilos_http::http::{Method, Request, Response};
    /// use hilos_http::router::Router;
    ///
    /// let mut router = Router::new();
    /// router.route(Method::GET, "/hello", |_req: &Request, res: &mut Response| {
    ///     res.set_text("hola");
    ///     Ok(())
    /// });
    ///
    /// let request = Request::parse(b"GET /hello HTTP/1.1\r\n\r\n");
    /// let mut response = Response::default();
    /// router.process(&request, &mut response);
    /// assert_eq!(response.body(), b"hola");
    /// ```
    pub fn route<F>(&mut self, method: Method, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.routes.push(Route {
            method,
            pattern: RoutePattern::new(pattern),
            handler: Arc::new(handler),
        });
    }

    pub fn get<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::GET, pattern, handler);
    }

    pub fn post<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::POST, pattern, handler);
    }

    pub fn put<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::PUT, pattern, handler);
    }

    pub fn delete<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::DELETE, pattern, handler);
    }

    pub fn head<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::HEAD, pattern, handler);
    }

    /// Ruta OPTIONS; también atiende a los demás métodos registrados
    /// con el mismo patrón
    pub fn options<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::OPTIONS, pattern, handler);
    }

    pub fn patch<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::PATCH, pattern, handler);
    }

    /// Agrega un middleware al final de la cadena
    pub fn use_middleware<F>(&mut self, middleware: F)
    where
        F: Fn(&Request, &mut Response) -> bool + Send + Sync + 'static,
    {
        self.middleware.push(Arc::new(middleware));
    }

    /// Sirve los archivos de `directory` bajo el prefijo de URL `prefix`
    ///
    /// `serve_static("/static", "./public")` responde `/static/app.css`
    /// con `./public/app.css`.
    pub fn serve_static(&mut self, prefix: &str, directory: impl Into<PathBuf>) {
        self.static_paths.insert(prefix.to_string(), directory.into());
    }

    pub fn set_not_found_handler<F>(&mut self, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.not_found_handler = Arc::new(handler);
    }

    pub fn set_error_handler<F>(&mut self, handler: F)
    where
        F: Fn(&HandlerError, &Request, &mut Response) + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
    }

    /// Rutas registradas, en orden
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// Procesa un request completo sobre la respuesta compartida
    ///
    /// Nunca falla ni propaga pánicos: las fallas terminan en el
    /// error handler y la respuesta siempre queda bien formada.
    pub fn process(&self, request: &Request, response: &mut Response) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(request, response)));

        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(payload) => HandlerError::from_panic(payload),
        };

        self.logger.error(&format!(
            "Error processing {} {}: {}",
            request.method(),
            request.path(),
            error
        ));

        let handled = panic::catch_unwind(AssertUnwindSafe(|| {
            (self.error_handler)(&error, request, response)
        }));
        if let Err(payload) = handled {
            let nested = HandlerError::from_panic(payload);
            self.logger.error(&format!("Error handler failed: {}", nested));
            default_error_handler(&error, request, response);
        }
    }

    fn dispatch(&self, request: &Request, response: &mut Response) -> HandlerResult {
        for middleware in &self.middleware {
            if !middleware(request, response) {
                return Ok(());
            }
        }

        if self.serve_static_file(request, response) {
            return Ok(());
        }

        if let Some(route) = self.find_route(request) {
            return (route.handler)(request, response);
        }

        (self.not_found_handler)(request, response)
    }

    /// Responde desde el primer prefijo estático que coincida
    ///
    /// Retorna `false` si ningún prefijo aplica y hay que seguir con las rutas.
    fn serve_static_file(&self, request: &Request, response: &mut Response) -> bool {
        let path = request.path();

        let Some((prefix, directory)) = self
            .static_paths
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
        else {
            return false;
        };

        let relative = path[prefix.len()..].trim_start_matches('/');
        match resolve_static_path(directory, relative) {
            Some(file) => response.set_file(&file),
            None => {
                response.set_status(StatusCode::NotFound);
                response.set_text("File not found");
            }
        }
        true
    }

    /// Primera ruta que coincide con el método y el path
    fn find_route(&self, request: &Request) -> Option<&Route> {
        let method = request.method();
        let path = request.path();

        self.routes.iter().find(|route| {
            if !route.pattern.matches(path) {
                return false;
            }
            if route.method == method {
                return true;
            }
            // OPTIONS cubre los métodos registrados para el mismo patrón
            route.method == Method::OPTIONS
                && self
                    .routes
                    .iter()
                    .any(|other| other.method == method && other.pattern == route.pattern)
        })
    }
}

/// Une `relative` a `directory`, rechazando cualquier segmento `..`
fn resolve_static_path(directory: &Path, relative: &str) -> Option<PathBuf> {
    if relative.split(['/', '\\']).any(|segment| segment == "..") {
        return None;
    }
    Some(directory.join(relative))
}

/// 404 con el path en texto plano
pub fn default_not_found(request: &Request, response: &mut Response) -> HandlerResult {
    response.set_status(StatusCode::NotFound);
    response.set_text(&format!("404 Not Found: {}", request.path()));
    Ok(())
}

/// 500 con un mensaje genérico; el detalle solo va al log
pub fn default_error_handler(_error: &HandlerError, _request: &Request, response: &mut Response) {
    response.set_status(StatusCode::InternalServerError);
    response.set_text("Internal Server Error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Level, MemoryLogger};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn run(router: &Router, raw: &[u8]) -> Response {
        let request = Request::parse(raw);
        let mut response = Response::for_request(&request);
        router.process(&request, &mut response);
        response
    }

    fn text(body: &'static str) -> impl Fn(&Request, &mut Response) -> HandlerResult {
        move |_req: &Request, res: &mut Response| {
            res.set_text(body);
            Ok(())
        }
    }

    #[test]
    fn test_router_creation() {
        let router = Router::new();
        assert!(router.routes().is_empty());
        assert_eq!(router.middleware_count(), 0);
    }

    #[test]
    fn test_empty_router_is_not_found() {
        let router = Router::new();
        for raw in [
            &b"GET / HTTP/1.1\r\n\r\n"[..],
            b"POST /api/echo HTTP/1.1\r\n\r\nbody",
            b"DELETE /x/y/z HTTP/1.0\r\n\r\n",
        ] {
            let response = run(&router, raw);
            assert_eq!(response.status(), StatusCode::NotFound);
        }

        let response = run(&router, b"GET /missing HTTP/1.1\r\n\r\n");
        assert_eq!(response.body(), b"404 Not Found: /missing");
        assert_eq!(
            response.header("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_route_found() {
        let mut router = Router::new();
        router.get("/test", text("ok"));

        let response = run(&router, b"GET /test HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body(), b"ok");
    }

    #[test]
    fn test_method_must_match() {
        let mut router = Router::new();
        router.get("/test", text("get"));

        let response = run(&router, b"POST /test HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_first_match_wins() {
        let mut router = Router::new();
        router.get("/api/*", text("wildcard"));
        router.get("/api/users", text("exact"));

        let response = run(&router, b"GET /api/users HTTP/1.1\r\n\r\n");
        assert_eq!(response.body(), b"wildcard");
    }

    #[test]
    fn test_handler_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();
        let c = Arc::clone(&calls);
        router.get("/count", move |_req, _res| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        router.get("/count", move |_req, _res| panic!("second route must not run"));

        run(&router, b"GET /count HTTP/1.1\r\n\r\n");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_options_route_covers_registered_methods() {
        let mut router = Router::new();
        router.options("/api/items", text("preflight"));
        router.get("/api/items", text("list"));

        let response = run(&router, b"OPTIONS /api/items HTTP/1.1\r\n\r\n");
        assert_eq!(response.body(), b"preflight");

        // Registrada antes que el GET, la ruta OPTIONS gana
        let response = run(&router, b"GET /api/items HTTP/1.1\r\n\r\n");
        assert_eq!(response.body(), b"preflight");

        // DELETE no está registrado para ese patrón
        let response = run(&router, b"DELETE /api/items HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_middleware_halts_pipeline() {
        let later = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();

        router.use_middleware(|_req, res| {
            res.set_header("X-First", "1");
            true
        });
        router.use_middleware(|_req, res| {
            res.set_status(StatusCode::Unauthorized);
            res.set_text("denied");
            false
        });
        let l = Arc::clone(&later);
        router.use_middleware(move |_req, _res| {
            l.fetch_add(1, Ordering::SeqCst);
            true
        });
        let l = Arc::clone(&later);
        router.get("/secret", move |_req, _res| {
            l.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let response = run(&router, b"GET /secret HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::Unauthorized);
        assert_eq!(response.body(), b"denied");
        assert_eq!(response.header("X-First"), Some("1"));
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_middleware_mutations_reach_handler_response() {
        let mut router = Router::new();
        router.use_middleware(|_req, res| {
            res.enable_cors("*");
            true
        });
        router.get("/", text("home"));

        let response = run(&router, b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(response.body(), b"home");
    }

    #[test]
    fn test_handler_error_goes_to_error_handler() {
        let logger = MemoryLogger::new();
        let mut router = Router::with_logger(Arc::new(logger.clone()));
        router.get("/fail", |_req, _res| Err(HandlerError::new("database down")));

        let response = run(&router, b"GET /fail HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert_eq!(response.body(), b"Internal Server Error");
        assert!(logger.contains(Level::Error, "database down"));
    }

    #[test]
    fn test_panic_goes_to_error_handler() {
        let logger = MemoryLogger::new();
        let mut router = Router::with_logger(Arc::new(logger.clone()));
        router.get("/panic", |_req, _res| panic!("Test exception"));

        let response = run(&router, b"GET /panic HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert!(logger.contains(Level::Error, "Test exception"));
    }

    #[test]
    fn test_middleware_panic_goes_to_error_handler() {
        let mut router = Router::new();
        router.use_middleware(|_req, _res| panic!("middleware broke"));
        router.get("/", text("unreachable"));

        let response = run(&router, b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::InternalServerError);
    }

    #[test]
    fn test_custom_error_handler_receives_error() {
        let mut router = Router::new();
        router.get("/fail", |_req, _res| Err("boom".into()));
        router.set_error_handler(|err, _req, res| {
            res.set_status(StatusCode::ServiceUnavailable);
            res.set_text(&format!("custom: {}", err));
        });

        let response = run(&router, b"GET /fail HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::ServiceUnavailable);
        assert_eq!(response.body(), b"custom: boom");
    }

    #[test]
    fn test_failing_error_handler_falls_back_to_default() {
        let mut router = Router::new();
        router.get("/fail", |_req, _res| Err("first".into()));
        router.set_error_handler(|_err, _req, _res| panic!("second"));

        let response = run(&router, b"GET /fail HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert_eq!(response.body(), b"Internal Server Error");
    }

    #[test]
    fn test_not_found_handler_failure_is_caught() {
        let mut router = Router::new();
        router.set_not_found_handler(|_req, _res| Err("not found handler broke".into()));

        let response = run(&router, b"GET /nothing HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::InternalServerError);
    }

    #[test]
    fn test_custom_not_found_handler() {
        let mut router = Router::new();
        router.set_not_found_handler(|req, res| {
            res.set_status(StatusCode::NotFound);
            res.set_json(&format!(r#"{{"error":"Not Found","path":"{}"}}"#, req.path()));
            Ok(())
        });

        let response = run(&router, b"GET /nope HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::NotFound);
        assert_eq!(response.body(), br#"{"error":"Not Found","path":"/nope"}"#);
    }

    #[test]
    fn test_invalid_request_flows_through_pipeline() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();
        let s = Arc::clone(&seen);
        router.use_middleware(move |req, _res| {
            assert!(!req.is_valid());
            s.fetch_add(1, Ordering::SeqCst);
            true
        });

        let response = run(&router, b"garbage");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_static_file_served() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/app.css"), "body{}").unwrap();

        let mut router = Router::new();
        router.serve_static("/static", dir.path());
        router.get("/static/css/app.css", text("route"));

        let response = run(&router, b"GET /static/css/app.css HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body(), b"body{}");
        assert_eq!(response.header("Content-Type"), Some("text/css"));
    }

    #[test]
    fn test_static_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut router = Router::new();
        router.serve_static("/static", dir.path());

        let response = run(&router, b"GET /static/missing.js HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::NotFound);
        assert_eq!(response.body(), b"File not found");
    }

    #[test]
    fn test_static_rejects_parent_segments() {
        let dir = TempDir::new().unwrap();
        let public = dir.path().join("public");
        std::fs::create_dir(&public).unwrap();
        std::fs::write(dir.path().join("secret.txt"), "secret").unwrap();

        let mut router = Router::new();
        router.serve_static("/static", &public);

        let response = run(&router, b"GET /static/../secret.txt HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::NotFound);
        assert_ne!(response.body(), b"secret");
    }

    #[test]
    fn test_unmapped_prefix_falls_through_to_routes() {
        let dir = TempDir::new().unwrap();
        let mut router = Router::new();
        router.serve_static("/static", dir.path());
        router.get("/api/status", text("running"));

        let response = run(&router, b"GET /api/status HTTP/1.1\r\n\r\n");
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body(), b"running");
    }

    #[test]
    fn test_resolve_static_path() {
        let dir = Path::new("/srv/public");
        assert_eq!(
            resolve_static_path(dir, "img/logo.png"),
            Some(PathBuf::from("/srv/public/img/logo.png"))
        );
        assert_eq!(resolve_static_path(dir, "../etc/passwd"), None);
        assert_eq!(resolve_static_path(dir, "a/../../b"), None);
        assert!(resolve_static_path(dir, "file..txt").is_some());
    }
}
