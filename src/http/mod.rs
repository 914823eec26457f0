//! # Módulo HTTP
//!
//! Este módulo implementa el codec del protocolo desde cero, sin usar
//! librerías de alto nivel. Incluye:
//!
//! - Parsing de requests
//! - Construcción y serialización de responses
//! - Manejo de status codes
//! - Decodificación de URLs y query parameters
//! - Tabla de tipos MIME
//!
//! Cada conexión transporta un único intercambio request/response:
//! no hay keep-alive ni chunked transfer encoding.
//!
//! ### Formato de Request
//!
//! ```text
//! GET /path?query=value HTTP/1.1\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/plain; charset=utf-8\r\n
//! Content-Length: 2\r\n
//! \r\n
//! OK
//! ```

pub mod headers;
pub mod mime;
pub mod request;
pub mod response;
pub mod status;

// Re-exportamos los tipos principales para facilitar su uso
pub use headers::Headers;
pub use request::{url_decode, Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
