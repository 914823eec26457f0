//! # Tipos MIME
//! src/http/mime.rs
//!
//! Tabla fija de extensión → Content-Type para servir archivos estáticos.

use std::path::Path;

/// Content-Type para extensiones desconocidas
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const MIME_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("txt", "text/plain"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("mp4", "video/mp4"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("wasm", "application/wasm"),
];

/// Busca el Content-Type de una extensión (sin el punto)
///
/// # Ejemplo
/// ```
/// use hilos_http::http::mime::mime_type;
/// assert_eq!(mime_type("html"), "text/html");
/// assert_eq!(mime_type("PNG"), "image/png");
/// assert_eq!(mime_type("xyz"), "application/octet-stream");
/// ```
pub fn mime_type(extension: &str) -> &'static str {
    MIME_TYPES
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Content-Type de un archivo según su extensión
pub fn mime_type_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(mime_type)
        .unwrap_or(DEFAULT_MIME_TYPE)
}
