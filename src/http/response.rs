//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Este módulo proporciona una API para construir respuestas HTTP
//! de forma incremental y convertirlas a bytes para enviar al cliente.
//!
//! Middleware y handlers comparten una misma `Response` mutable por request.
//!
//! ## Formato de una respuesta
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: application/json; charset=utf-8\r\n
//! Content-Length: 12\r\n
//! \r\n
//! {"ok": true}
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use hilos_http::http::{Response, StatusCode};
//!
//! let mut response = Response::new(StatusCode::Ok);
//! response.set_json(r#"{"message": "Hello"}"#);
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

use super::{mime, Headers, Request, StatusCode};
use std::path::Path;

/// Versión usada cuando no hay request del cual copiarla
pub const DEFAULT_VERSION: &str = "HTTP/1.1";

/// Representa una respuesta HTTP completa
#[derive(Debug, Clone)]
pub struct Response {
    /// Código de estado HTTP (200, 404, etc.)
    status: StatusCode,

    /// Headers en orden de inserción
    headers: Headers,

    /// Cuerpo de la respuesta (puede ser vacío)
    body: Vec<u8>,

    /// Versión de la status line
    version: String,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

impl Response {
    /// Crea una nueva respuesta sin headers ni body
    ///
    /// # Ejemplo
    /// ```
    /// use hilos_http::http::{Response, StatusCode};
    ///
    /// let response = Response::new(StatusCode::NoContent);
    /// assert!(response.body().is_empty());
    /// ```
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    /// Crea una respuesta 200 que responde con la versión del request
    ///
    /// Un request inválido no tiene versión; en ese caso se usa `HTTP/1.1`.
    pub fn for_request(request: &Request) -> Self {
        let mut response = Self::default();
        if request.is_valid() {
            response.version = request.version().to_string();
        }
        response
    }

    /// Cambia el código de estado
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Agrega o reemplaza un header
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.set(name, value);
    }

    /// Versión builder de `set_header`
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Obtiene un header por nombre exacto
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Reemplaza el body y recalcula `Content-Length`
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
        self.update_content_length();
    }

    /// Acceso mutable al body
    ///
    /// Quien lo modifique directamente debe llamar a
    /// `update_content_length` antes de serializar.
    pub fn body_mut(&mut self) -> &mut Vec<u8> {
        &mut self.body
    }

    /// Sincroniza `Content-Length` con el largo actual del body
    pub fn update_content_length(&mut self) {
        let len = self.body.len().to_string();
        self.headers.set("Content-Length", &len);
    }

    /// Body de texto plano (`text/plain; charset=utf-8`)
    pub fn set_text(&mut self, text: &str) {
        self.set_header("Content-Type", "text/plain; charset=utf-8");
        self.set_body(text);
    }

    /// Body HTML (`text/html; charset=utf-8`)
    pub fn set_html(&mut self, html: &str) {
        self.set_header("Content-Type", "text/html; charset=utf-8");
        self.set_body(html);
    }

    /// Body JSON (`application/json; charset=utf-8`)
    pub fn set_json(&mut self, json: &str) {
        self.set_header("Content-Type", "application/json; charset=utf-8");
        self.set_body(json);
    }

    /// Lee un archivo como body, con el Content-Type según su extensión
    ///
    /// Si no se puede leer, la respuesta queda en 404 con "File not found".
    pub fn set_file(&mut self, path: &Path) {
        match std::fs::read(path) {
            Ok(contents) => {
                self.set_header("Content-Type", mime::mime_type_for_path(path));
                self.set_body(contents);
            }
            Err(_) => {
                self.status = StatusCode::NotFound;
                self.set_text("File not found");
            }
        }
    }

    /// Agrega los headers CORS
    ///
    /// # Ejemplo
    /// ```
    /// use hilos_http::http::Response;
    ///
    /// let mut response = Response::default();
    /// response.enable_cors("*");
    /// assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
    /// ```
    pub fn enable_cors(&mut self, origin: &str) {
        self.set_header("Access-Control-Allow-Origin", origin);
        self.set_header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS");
        self.set_header("Access-Control-Allow-Headers", "Content-Type, Authorization");
    }

    /// `true` si el código es >= 400
    pub fn is_error(&self) -> bool {
        self.status.is_error()
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    ///
    /// - Status line: `HTTP/1.1 200 OK\r\n`
    /// - Headers en orden de inserción: `Name: Value\r\n`
    /// - Línea vacía: `\r\n`
    /// - Body sin transformar
    ///
    /// `Content-Length` no se recalcula aquí.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(128 + self.body.len());

        result.extend_from_slice(format!("{} {}\r\n", self.version, self.status).as_bytes());

        for (name, value) in self.headers.iter() {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);

        result
    }

    /// Obtiene el código de estado de la respuesta
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Obtiene una referencia a los headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Obtiene una referencia al body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}
