//! # Hilos HTTP Server
//! src/lib.rs
//!
//! Servidor HTTP concurrente implementado desde cero sobre sockets
//! bloqueantes: un accept loop, un pool de workers y TLS opcional.
//! Cada conexión atiende exactamente un request y se cierra.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: Parsing de requests y serialización de responses
//! - `workers`: Pool de threads con cola compartida
//! - `server`: Listener, TLS y manejo de conexiones
//! - `router`: Middleware, archivos estáticos y rutas
//! - `config`: Configuración por CLI y variables de entorno
//! - `logging`: Logger inyectable sobre `tracing`
//! - `error`: Tipos de error
//! - `app`: Rutas de demostración del binario
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use hilos_http::server::Server;
//!
//! let mut server = Server::new();
//! server.get("/health", |_req, res| {
//!     res.set_text("OK");
//!     Ok(())
//! });
//!
//! // Bloquea hasta que otro thread llame a `server.stop()`
//! server.start("0.0.0.0", 8080).expect("Error al iniciar servidor");
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod router;
pub mod server;
pub mod workers;

pub use error::{HandlerError, HandlerResult, ServerError, ServerResult};
pub use server::Server;
