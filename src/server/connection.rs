//! # Manejo de Conexiones
//! src/server/connection.rs
//!
//! Ciclo de vida completo de una conexión, ejecutado como una sola tarea
//! en un worker:
//!
//! ```text
//! timeouts → [handshake TLS] → leer → parsear → router → serializar → escribir → cerrar
//! ```
//!
//! Las fallas de I/O o de handshake terminan solo esta conexión; se
//! registran y nunca llegan al accept loop.

use super::tls::TlsContext;
use super::transport::Connection;
use crate::http::{Request, Response};
use crate::logging::Logger;
use crate::router::Router;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

/// Tamaño máximo de un request (headers + body)
pub const MAX_REQUEST_SIZE: usize = 1024 * 1024;

const READ_CHUNK: usize = 8192;

/// Estado compartido (solo lectura) por todas las tareas de conexión
pub struct ConnectionHandler {
    router: Arc<Router>,
    logger: Arc<dyn Logger>,
    tls: Option<TlsContext>,
    timeout: Option<Duration>,
}

impl ConnectionHandler {
    pub fn new(
        router: Arc<Router>,
        logger: Arc<dyn Logger>,
        tls: Option<TlsContext>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            router,
            logger,
            tls,
            timeout,
        }
    }

    /// Atiende una conexión aceptada de principio a fin
    pub fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = self.serve(stream, peer) {
            self.logger
                .error(&format!("Connection error with {}: {}", peer, e));
        }
    }

    fn serve(&self, stream: TcpStream, peer: SocketAddr) -> io::Result<()> {
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;

        let mut conn = match &self.tls {
            Some(ctx) => match ctx.accept(stream) {
                Ok(tls) => Connection::Tls(Box::new(tls)),
                Err(e) => {
                    // Sin respuesta: el socket se cierra al salir
                    self.logger
                        .error(&format!("TLS handshake failed with {}: {}", peer, e));
                    return Ok(());
                }
            },
            None => Connection::Plain(stream),
        };

        let raw = read_request(&mut conn)?;
        if raw.is_empty() {
            self.logger
                .debug(&format!("Connection from {} closed without data", peer));
            return Ok(());
        }

        let bytes = process_raw(&self.router, self.logger.as_ref(), &raw);

        conn.write_all(&bytes)?;
        conn.flush()?;
        conn.close()
    }
}

/// Parsea, procesa y serializa un request sin tocar sockets
///
/// Un request inválido se registra y sigue por el pipeline igual.
pub fn process_raw(router: &Router, logger: &dyn Logger, raw: &[u8]) -> Vec<u8> {
    let request = match Request::try_parse(raw) {
        Ok(request) => request,
        Err(e) => {
            logger.error(&format!("Failed to parse request: {}", e));
            Request::default()
        }
    };

    let mut response = Response::for_request(&request);
    router.process(&request, &mut response);

    logger.debug(&format!(
        "{} {} -> {}",
        request.method(),
        request.path(),
        response.status()
    ));

    response.update_content_length();
    response.to_bytes()
}

/// Lee un request completo
///
/// Acumula hasta encontrar el fin de los headers (o hasta que el peer
/// cierre) y después, si hay `Content-Length`, sigue hasta completar el
/// body. Nunca pasa de `MAX_REQUEST_SIZE`.
pub fn read_request<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    let header_end = loop {
        if let Some(end) = find_header_end(&buffer) {
            break Some(end);
        }
        if buffer.len() >= MAX_REQUEST_SIZE {
            break None;
        }
        match read_some(reader, &mut chunk)? {
            0 => break None,
            n => buffer.extend_from_slice(&chunk[..n]),
        }
    };

    if let Some(end) = header_end {
        let expected = end
            .saturating_add(header_content_length(&buffer[..end]))
            .min(MAX_REQUEST_SIZE);
        while buffer.len() < expected {
            match read_some(reader, &mut chunk)? {
                0 => break,
                n => buffer.extend_from_slice(&chunk[..n]),
            }
        }
    }

    buffer.truncate(MAX_REQUEST_SIZE);
    Ok(buffer)
}

fn read_some<R: Read>(reader: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(chunk) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Posición justo después de la línea vacía que cierra los headers
fn find_header_end(buffer: &[u8]) -> Option<usize> {
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4);
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|p| p + 2);

    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// `Content-Length` del bloque de headers (sin distinguir mayúsculas)
fn header_content_length(headers: &[u8]) -> usize {
    String::from_utf8_lossy(headers)
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StatusCode;
    use crate::logging::{Level, MemoryLogger, NullLogger};
    use std::io::Cursor;
    use std::net::{Shutdown, TcpListener};
    use std::thread;

    fn ephemeral_listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0").expect("bind")
    }

    fn hello_router() -> Arc<Router> {
        let mut router = Router::new();
        router.get("/hello", |req, res| {
            let name = req.query_param("name").unwrap_or("World");
            res.set_text(&format!("Hello, {}!", name));
            Ok(())
        });
        router.post("/echo", |req, res| {
            res.set_body(req.body().to_vec());
            Ok(())
        });
        Arc::new(router)
    }

    /// Atiende una sola conexión en otro thread y devuelve lo que recibe el cliente
    fn exchange(router: Arc<Router>, logger: Arc<dyn Logger>, request: &[u8]) -> String {
        let listener = ephemeral_listener();
        let addr = listener.local_addr().unwrap();

        let handler = ConnectionHandler::new(router, logger, None, Some(Duration::from_secs(5)));
        let t = thread::spawn(move || {
            let (stream, peer) = listener.accept().unwrap();
            handler.handle(stream, peer);
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(request).unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        t.join().unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[test]
    fn test_handle_connection_ok() {
        let text = exchange(
            hello_router(),
            Arc::new(NullLogger),
            b"GET /hello?name=John%20Doe HTTP/1.1\r\nHost: localhost\r\n\r\n",
        );

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 16\r\n"));
        assert!(text.ends_with("\r\n\r\nHello, John Doe!"));
    }

    #[test]
    fn test_handle_connection_echoes_version() {
        let text = exchange(hello_router(), Arc::new(NullLogger), b"GET /hello HTTP/1.0\r\n\r\n");
        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
    }

    #[test]
    fn test_handle_connection_not_found() {
        let text = exchange(hello_router(), Arc::new(NullLogger), b"GET /nope HTTP/1.1\r\n\r\n");
        assert!(text.contains("404 Not Found"));
        assert!(text.ends_with("404 Not Found: /nope"));
    }

    #[test]
    fn test_handle_connection_parse_error() {
        let logger = MemoryLogger::new();
        let text = exchange(
            hello_router(),
            Arc::new(logger.clone()),
            b"\x00\x01\x02\x03garbage\r\n\r\n",
        );

        // El request inválido sigue el pipeline y termina en el not found
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(logger.contains(Level::Error, "Failed to parse request"));
    }

    #[test]
    fn test_handle_connection_post_body() {
        let text = exchange(
            hello_router(),
            Arc::new(NullLogger),
            b"POST /echo HTTP/1.1\r\nContent-Length: 11\r\n\r\n{\"key\":\"v\"}",
        );
        assert!(text.contains("200 OK"));
        assert!(text.contains("Content-Length: 11\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"key\":\"v\"}"));
    }

    #[test]
    fn test_handle_connection_peer_closed_immediately() {
        let listener = ephemeral_listener();
        let addr = listener.local_addr().unwrap();
        let logger = MemoryLogger::new();

        let handler = ConnectionHandler::new(
            hello_router(),
            Arc::new(logger.clone()),
            None,
            Some(Duration::from_secs(5)),
        );
        let t = thread::spawn(move || {
            let (stream, peer) = listener.accept().unwrap();
            handler.handle(stream, peer);
        });

        drop(TcpStream::connect(addr).unwrap());
        t.join().unwrap();

        assert!(logger.contains(Level::Debug, "closed without data"));
    }

    #[test]
    fn test_read_request_stops_at_header_end() {
        let mut input = Cursor::new(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n".to_vec());
        let raw = read_request(&mut input).unwrap();
        assert_eq!(raw, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    }

    #[test]
    fn test_read_request_waits_for_body() {
        /// Entrega los datos en pedazos de 3 bytes
        struct Trickle(Cursor<Vec<u8>>);
        impl Read for Trickle {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let n = buf.len().min(3);
                self.0.read(&mut buf[..n])
            }
        }

        let data = b"POST /echo HTTP/1.1\r\ncontent-length: 5\r\n\r\nhello".to_vec();
        let raw = read_request(&mut Trickle(Cursor::new(data.clone()))).unwrap();
        assert_eq!(raw, data);
    }

    #[test]
    fn test_read_request_is_capped() {
        let mut data = b"POST / HTTP/1.1\r\nContent-Length: 99999999\r\n\r\n".to_vec();
        data.resize(MAX_REQUEST_SIZE + 100, b'a');

        let raw = read_request(&mut Cursor::new(data)).unwrap();
        assert_eq!(raw.len(), MAX_REQUEST_SIZE);
    }

    #[test]
    fn test_read_request_huge_content_length() {
        let data = b"POST / HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\nabc".to_vec();
        let raw = read_request(&mut Cursor::new(data.clone())).unwrap();
        assert_eq!(raw, data);
    }

    #[test]
    fn test_handle_connection_huge_content_length() {
        let text = exchange(
            hello_router(),
            Arc::new(NullLogger),
            b"POST /echo HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\nabc",
        );
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.ends_with("\r\n\r\nabc"));
    }

    #[test]
    fn test_find_header_end() {
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n\r\nbody"), Some(18));
        assert_eq!(find_header_end(b"GET / HTTP/1.1\n\nbody"), Some(16));
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\nHost: x\r\n"), None);
    }

    #[test]
    fn test_header_content_length() {
        assert_eq!(header_content_length(b"POST / HTTP/1.1\r\nContent-Length: 42\r\n\r\n"), 42);
        assert_eq!(header_content_length(b"POST / HTTP/1.1\r\nCONTENT-LENGTH:7\r\n\r\n"), 7);
        assert_eq!(header_content_length(b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n"), 0);
        assert_eq!(header_content_length(b"GET / HTTP/1.1\r\n\r\n"), 0);
    }

    #[test]
    fn test_process_raw_sets_content_length() {
        let router = hello_router();
        let bytes = process_raw(&router, &NullLogger, b"GET /hello HTTP/1.1\r\n\r\n");
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Content-Length: 13\r\n"));
        assert!(text.ends_with("Hello, World!"));

        let bytes = process_raw(&router, &NullLogger, b"");
        let (_, status, _) =
            crate::http::status::parse_status_line(String::from_utf8_lossy(&bytes).lines().next().unwrap())
                .unwrap();
        assert_eq!(status, StatusCode::NotFound);
    }
}
