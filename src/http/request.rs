//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Este módulo implementa el parser de requests desde cero.
//!
//! ## Formato de un Request
//!
//! ```text
//! GET /path?param1=value1&param2=value2 HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! User-Agent: curl/7.68.0\r\n
//! \r\n
//! body...
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path?query HTTP/x.y`
//! 2. **Headers**: Pares `Name: Value` (uno por línea)
//! 3. **Empty Line**: separa headers del body
//! 4. **Body**: el resto de los bytes
//!
//! Las líneas pueden terminar en `\n` o `\r\n`; el `\r` se descarta.
//!
//! El parser nunca falla hacia afuera: `Request::parse` siempre retorna
//! un `Request`, marcado como inválido cuando la request line no sirve.
//! `Request::try_parse` expone el motivo del error para quien lo necesite.

use super::Headers;
use std::collections::HashMap;

/// Métodos HTTP reconocidos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(clippy::upper_case_acronyms)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// POST - Enviar datos a un recurso
    POST,

    /// PUT - Reemplazar un recurso
    PUT,

    /// DELETE - Eliminar un recurso
    DELETE,

    /// HEAD - Como GET pero solo retorna headers
    HEAD,

    /// OPTIONS - Consultar capacidades (CORS preflight)
    OPTIONS,

    /// PATCH - Modificación parcial
    PATCH,

    /// Cualquier otro método, o un request inválido
    #[default]
    UNKNOWN,
}

impl Method {
    /// Parsea un método HTTP sin distinguir mayúsculas
    ///
    /// Los métodos no reconocidos se mapean a `UNKNOWN`.
    ///
    /// # Ejemplo
    /// ```
    /// use hilos_http::http::Method;
    /// assert_eq!(Method::parse("get"), Method::GET);
    /// assert_eq!(Method::parse("Patch"), Method::PATCH);
    /// assert_eq!(Method::parse("BREW"), Method::UNKNOWN);
    /// ```
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            _ => Method::UNKNOWN,
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::UNKNOWN => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Request vacío
    #[error("Empty request")]
    EmptyRequest,

    /// La request line no tiene exactamente tres partes
    #[error("Invalid request line: {0:?}")]
    InvalidRequestLine(String),

    /// La versión no empieza con `HTTP/`
    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),
}

/// Representa un request HTTP parseado
///
/// Es inmutable después del parsing.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Método HTTP
    method: Method,

    /// Path decodificado, sin query string (ej: "/api/hello")
    path: String,

    /// Versión HTTP tal como vino (ej: "HTTP/1.1")
    version: String,

    /// Headers HTTP (la última aparición de un nombre gana)
    headers: Headers,

    /// Query parameters decodificados (ej: {"name": "John Doe"})
    query_params: HashMap<String, String>,

    /// Body crudo
    body: Vec<u8>,

    /// `false` si la request line no se pudo parsear
    valid: bool,
}

impl Request {
    /// Parsea un request desde bytes, sin fallar nunca
    ///
    /// Si la request line es inválida, retorna un request con
    /// `is_valid() == false` y todos los campos vacíos.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use hilos_http::http::{Method, Request};
    ///
    /// let request = Request::parse(b"GET /api/hello?name=John%20Doe HTTP/1.1\r\n\r\n");
    /// assert!(request.is_valid());
    /// assert_eq!(request.method(), Method::GET);
    /// assert_eq!(request.path(), "/api/hello");
    /// assert_eq!(request.query_param("name"), Some("John Doe"));
    ///
    /// let invalid = Request::parse(b"garbage\r\n\r\n");
    /// assert!(!invalid.is_valid());
    /// assert_eq!(invalid.method(), Method::UNKNOWN);
    /// ```
    pub fn parse(buffer: &[u8]) -> Self {
        Self::try_parse(buffer).unwrap_or_default()
    }

    /// Parsea un request desde bytes, reportando por qué no es válido
    pub fn try_parse(buffer: &[u8]) -> Result<Self, ParseError> {
        if buffer.is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = LineReader::new(buffer);

        // 1. Request line
        let first = lines.next_line().unwrap_or_default();
        let (method, path, query_params, version) = Self::parse_request_line(&first)?;

        // 2. Headers hasta la línea vacía
        let mut headers = Headers::new();
        while let Some(line) = lines.next_line() {
            if line.is_empty() {
                break;
            }
            Self::parse_header_line(&line, &mut headers);
        }

        // 3. Body: todo lo que queda, sin el último salto de línea
        let mut body = lines.rest().to_vec();
        if body.last() == Some(&b'\n') {
            body.pop();
        }

        Ok(Request {
            method,
            path,
            version,
            headers,
            query_params,
            body,
            valid: true,
        })
    }

    /// Parsea la request line
    ///
    /// Formato: `GET /path?query HTTP/1.1`
    fn parse_request_line(
        line: &str,
    ) -> Result<(Method, String, HashMap<String, String>, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        // Debe tener exactamente 3 partes: METHOD PATH VERSION
        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine(line.to_string()));
        }

        let version = parts[2];
        if !version.starts_with("HTTP/") {
            return Err(ParseError::InvalidHttpVersion(version.to_string()));
        }

        let method = Method::parse(parts[0]);
        let (path, query_params) = Self::parse_path_and_query(parts[1]);

        Ok((method, path, query_params, version.to_string()))
    }

    /// Separa path y query string en el primer `?`
    ///
    /// Ejemplo: "/hello%20world?a=1&b" → ("/hello world", {"a": "1", "b": ""})
    fn parse_path_and_query(target: &str) -> (String, HashMap<String, String>) {
        match target.split_once('?') {
            Some((path, query)) => (url_decode(path), Self::parse_query_string(query)),
            None => (url_decode(target), HashMap::new()),
        }
    }

    /// Parsea una query string en un HashMap
    ///
    /// Nombres y valores se decodifican; un par sin `=` queda con valor vacío.
    fn parse_query_string(query: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();

        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }
            match pair.split_once('=') {
                Some((key, value)) => params.insert(url_decode(key), url_decode(value)),
                None => params.insert(url_decode(pair), String::new()),
            };
        }

        params
    }

    /// Parsea una línea `Name: Value`; las líneas sin `:` se ignoran
    fn parse_header_line(line: &str, headers: &mut Headers) {
        if let Some((name, value)) = line.split_once(':') {
            headers.set(name.trim(), value.trim());
        }
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> Method {
        self.method
    }

    /// Obtiene el path decodificado
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene la versión HTTP
    pub fn version(&self) -> &str {
        &self.version
    }

    /// `true` si la request line se parseó correctamente
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Obtiene todos los headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Obtiene un header por nombre exacto
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Obtiene todos los query parameters
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Obtiene un query parameter específico
    ///
    /// # Ejemplo
    /// ```
    /// use hilos_http::http::Request;
    ///
    /// let request = Request::parse(b"GET /test?num=42&flag HTTP/1.0\r\n\r\n");
    /// assert_eq!(request.query_param("num"), Some("42"));
    /// assert_eq!(request.query_param("flag"), Some(""));
    /// assert_eq!(request.query_param("missing"), None);
    /// ```
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Valor de `Content-Length`, o 0 si falta o no es un número
    pub fn content_length(&self) -> usize {
        self.header("Content-Length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Valor de `Content-Type`, si existe
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Obtiene el body crudo
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Obtiene el body como texto (UTF-8 con reemplazo)
    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Decodifica un componente de URL
///
/// - `%XX` se convierte al byte correspondiente
/// - `+` se convierte en espacio
/// - secuencias `%` malformadas se copian sin cambios
///
/// # Ejemplo
/// ```
/// use hilos_http::http::url_decode;
/// assert_eq!(url_decode("John%20Doe"), "John Doe");
/// assert_eq!(url_decode("a+b"), "a b");
/// assert_eq!(url_decode("100%"), "100%");
/// ```
pub fn url_decode(encoded: &str) -> String {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => match (bytes.get(i + 1), bytes.get(i + 2)) {
                (Some(&hi), Some(&lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                    decoded.push((hex_value(hi) << 4) | hex_value(lo));
                    i += 3;
                }
                _ => {
                    decoded.push(b'%');
                    i += 1;
                }
            },
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            other => {
                decoded.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

/// Lector de líneas sobre bytes crudos
///
/// Corta en `\n`, quita un `\r` final, y deja acceder al resto sin tocar.
struct LineReader<'a> {
    buffer: &'a [u8],
    pos: usize,
}

impl<'a> LineReader<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, pos: 0 }
    }

    fn next_line(&mut self) -> Option<String> {
        if self.pos >= self.buffer.len() {
            return None;
        }

        let remaining = &self.buffer[self.pos..];
        let (mut line, advance) = match remaining.iter().position(|&b| b == b'\n') {
            Some(idx) => (&remaining[..idx], idx + 1),
            None => (remaining, remaining.len()),
        };
        self.pos += advance;

        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        Some(String::from_utf8_lossy(line).into_owned())
    }

    fn rest(&self) -> &'a [u8] {
        &self.buffer[self.pos.min(self.buffer.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_get() {
        let request = Request::parse(b"GET / HTTP/1.0\r\n\r\n");

        assert!(request.is_valid());
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/");
        assert_eq!(request.version(), "HTTP/1.0");
        assert!(request.query_params().is_empty());
    }

    #[test]
    fn test_method_is_case_insensitive() {
        for raw in [&b"get / HTTP/1.1\r\n\r\n"[..], &b"GET / HTTP/1.1\r\n\r\n"[..], &b"GeT / HTTP/1.1\r\n\r\n"[..]] {
            let request = Request::parse(raw);
            assert!(request.is_valid());
            assert_eq!(request.method(), Method::GET);
        }
    }

    #[test]
    fn test_all_methods() {
        let cases = [
            ("GET", Method::GET),
            ("POST", Method::POST),
            ("PUT", Method::PUT),
            ("DELETE", Method::DELETE),
            ("HEAD", Method::HEAD),
            ("OPTIONS", Method::OPTIONS),
            ("PATCH", Method::PATCH),
            ("TRACE", Method::UNKNOWN),
        ];
        for (name, expected) in cases {
            let raw = format!("{} /x HTTP/1.1\r\n\r\n", name);
            let request = Request::parse(raw.as_bytes());
            assert!(request.is_valid(), "{} should parse", name);
            assert_eq!(request.method(), expected);
        }
    }

    #[test]
    fn test_parse_with_query_params() {
        let request = Request::parse(b"GET /search?q=rust+lang&page=2&debug HTTP/1.1\r\n\r\n");

        assert_eq!(request.path(), "/search");
        assert_eq!(request.query_param("q"), Some("rust lang"));
        assert_eq!(request.query_param("page"), Some("2"));
        assert_eq!(request.query_param("debug"), Some(""));
    }

    #[test]
    fn test_query_names_are_decoded() {
        let request = Request::parse(b"GET /q?first%20name=John%20Doe HTTP/1.1\r\n\r\n");
        assert_eq!(request.query_param("first name"), Some("John Doe"));
    }

    #[test]
    fn test_value_split_on_first_equals() {
        let request = Request::parse(b"GET /q?expr=a=b HTTP/1.1\r\n\r\n");
        assert_eq!(request.query_param("expr"), Some("a=b"));
    }

    #[test]
    fn test_path_is_decoded() {
        let request = Request::parse(b"GET /files/my%20doc.txt HTTP/1.1\r\n\r\n");
        assert_eq!(request.path(), "/files/my doc.txt");
    }

    #[test]
    fn test_parse_with_headers() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent:   test  \r\n\r\n";
        let request = Request::parse(raw);

        assert_eq!(request.header("Host"), Some("localhost:8080"));
        assert_eq!(request.header("User-Agent"), Some("test"));
        assert_eq!(request.header("host"), None);
    }

    #[test]
    fn test_duplicate_headers_last_wins() {
        let raw = b"GET / HTTP/1.1\r\nX-Token: one\r\nX-Token: two\r\n\r\n";
        let request = Request::parse(raw);
        assert_eq!(request.header("X-Token"), Some("two"));
        assert_eq!(request.headers().len(), 1);
    }

    #[test]
    fn test_header_line_without_colon_is_skipped() {
        let raw = b"GET / HTTP/1.1\r\nnot-a-header\r\nA: 1\r\n\r\n";
        let request = Request::parse(raw);
        assert!(request.is_valid());
        assert_eq!(request.headers().len(), 1);
    }

    #[test]
    fn test_header_value_keeps_extra_colons() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost:8443\r\n\r\n";
        let request = Request::parse(raw);
        assert_eq!(request.header("Host"), Some("localhost:8443"));
    }

    #[test]
    fn test_body_parsing() {
        let raw = b"POST /api/echo HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello world";
        let request = Request::parse(raw);

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.body(), b"hello world");
        assert_eq!(request.content_length(), 11);
    }

    #[test]
    fn test_body_strips_one_trailing_newline() {
        let request = Request::parse(b"POST / HTTP/1.1\n\nline1\nline2\n");
        assert_eq!(request.body(), b"line1\nline2");

        let request = Request::parse(b"POST / HTTP/1.1\n\nline1\n\n");
        assert_eq!(request.body(), b"line1\n");
    }

    #[test]
    fn test_lf_only_line_endings() {
        let request = Request::parse(b"PUT /item HTTP/1.1\nContent-Type: text/plain\n\nbody");
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.content_type(), Some("text/plain"));
        assert_eq!(request.body_str(), "body");
    }

    #[test]
    fn test_content_length_invalid_is_zero() {
        let request = Request::parse(b"GET / HTTP/1.1\r\nContent-Length: abc\r\n\r\n");
        assert_eq!(request.content_length(), 0);
    }

    #[test]
    fn test_empty_request() {
        assert_eq!(Request::try_parse(b"").unwrap_err(), ParseError::EmptyRequest);

        let request = Request::parse(b"");
        assert!(!request.is_valid());
        assert_eq!(request.method(), Method::UNKNOWN);
        assert_eq!(request.path(), "");
    }

    #[test]
    fn test_invalid_request_line() {
        let result = Request::try_parse(b"GET\r\n\r\n");
        assert!(matches!(result, Err(ParseError::InvalidRequestLine(_))));

        let result = Request::try_parse(b"GET / HTTP/1.1 extra\r\n\r\n");
        assert!(matches!(result, Err(ParseError::InvalidRequestLine(_))));
    }

    #[test]
    fn test_invalid_version() {
        let result = Request::try_parse(b"GET / FTP/1.0\r\n\r\n");
        assert!(matches!(result, Err(ParseError::InvalidHttpVersion(_))));

        let request = Request::parse(b"GET /x FTP/1.0\r\nHost: a\r\n\r\n");
        assert!(!request.is_valid());
        assert!(request.headers().is_empty());
        assert_eq!(request.path(), "");
    }

    #[test]
    fn test_url_decode() {
        assert_eq!(url_decode("%20"), " ");
        assert_eq!(url_decode("+"), " ");
        assert_eq!(url_decode("John%20Doe"), "John Doe");
        assert_eq!(url_decode("%41%62c"), "Abc");
    }

    #[test]
    fn test_url_decode_malformed_passthrough() {
        assert_eq!(url_decode("%"), "%");
        assert_eq!(url_decode("%2"), "%2");
        assert_eq!(url_decode("%zz"), "%zz");
        assert_eq!(url_decode("50%off"), "50%off");
    }

    #[test]
    fn test_url_decode_plain_input_unchanged() {
        for plain in ["hello", "/api/users/42", "a-b_c.d~e"] {
            assert_eq!(url_decode(plain), plain);
            assert_eq!(url_decode(&url_decode(plain)), plain);
        }
    }

    #[test]
    fn test_url_decode_utf8_sequence() {
        assert_eq!(url_decode("caf%C3%A9"), "café");
    }
}
