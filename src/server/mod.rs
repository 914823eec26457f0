//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa la parte de red del servidor:
//! 1. `listener`: bind / listen / accept sobre un socket TCP
//! 2. `tls`: contexto rustls y handshake del lado servidor
//! 3. `transport`: flujo en claro o cifrado detrás de `Read + Write`
//! 4. `connection`: lectura, procesamiento y respuesta de una conexión
//! 5. `tcp`: el `Server` que une todo lo anterior con el pool de workers

pub mod connection;
pub mod listener;
pub mod tcp;
pub mod tls;
pub mod transport;

// Re-exportar para facilitar el uso
pub use listener::Listener;
pub use tcp::{Server, ServerOptions};
pub use tls::TlsContext;
pub use transport::Connection;
