//! # Socket de Escucha
//! src/server/listener.rs
//!
//! Envuelve el socket TCP del servidor con un ciclo de vida explícito:
//!
//! ```text
//! new() → bind(host, port) → listen(backlog) → accept(handler) ... stop()
//! ```
//!
//! `stop()` puede llamarse desde otro thread: apaga el socket y despierta
//! al `accept` bloqueado. El error que eso produce se interpreta como
//! "parada solicitada", no como una falla.

use crate::error::{ServerError, ServerResult};
use crate::logging::{Logger, NullLogger};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Backlog por defecto para `listen`
pub const DEFAULT_BACKLOG: i32 = 128;

/// Pausa tras un `accept` fallido (por ejemplo EMFILE)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Socket de escucha TCP
pub struct Listener {
    /// Socket ligado; `None` antes del bind o después de `stop`
    socket: Mutex<Option<Arc<Socket>>>,
    local_addr: Mutex<Option<SocketAddr>>,
    running: AtomicBool,
    logger: Arc<dyn Logger>,
}

impl Default for Listener {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener {
    /// Crea un listener sin ligar
    pub fn new() -> Self {
        Self::with_logger(Arc::new(NullLogger))
    }

    pub fn with_logger(logger: Arc<dyn Logger>) -> Self {
        Self {
            socket: Mutex::new(None),
            local_addr: Mutex::new(None),
            running: AtomicBool::new(false),
            logger,
        }
    }

    /// Liga el socket a `host:port`
    ///
    /// Un host vacío o `0.0.0.0` escucha en todas las interfaces.
    /// Falla si la dirección es inválida o el puerto está en uso.
    pub fn bind(&self, host: &str, port: u16) -> ServerResult<SocketAddr> {
        let addr = resolve_addr(host, port)?;

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|source| bind_error(addr, source))?;
        socket
            .set_reuse_address(true)
            .map_err(|source| bind_error(addr, source))?;
        socket
            .bind(&addr.into())
            .map_err(|source| bind_error(addr, source))?;

        let local = socket
            .local_addr()
            .ok()
            .and_then(|a| a.as_socket())
            .unwrap_or(addr);

        *self.lock_socket() = Some(Arc::new(socket));
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = Some(local);

        Ok(local)
    }

    /// Marca el socket como listo para aceptar conexiones
    ///
    /// Falla con `NotBound` si no hubo un bind exitoso antes.
    pub fn listen(&self, backlog: i32) -> ServerResult<()> {
        let socket = self.lock_socket().clone().ok_or(ServerError::NotBound)?;
        socket.listen(backlog).map_err(ServerError::Listen)?;
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Acepta conexiones mientras el listener esté corriendo
    ///
    /// Cada conexión aceptada se pasa a `handler`. Si `stop()` ocurrió
    /// mientras se esperaba, la conexión recién aceptada se cierra y el loop
    /// termina.
    pub fn accept<F>(&self, mut handler: F)
    where
        F: FnMut(TcpStream, SocketAddr),
    {
        let socket = match self.lock_socket().clone() {
            Some(socket) if self.is_running() => socket,
            _ => return,
        };

        while self.is_running() {
            match socket.accept() {
                Ok((conn, peer)) => {
                    let stream: TcpStream = conn.into();
                    if !self.is_running() {
                        drop(stream);
                        break;
                    }
                    let peer = peer
                        .as_socket()
                        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 0)));
                    handler(stream, peer);
                }
                Err(e) => {
                    if !self.is_running() {
                        break;
                    }
                    self.logger.warning(&format!("Accept failed: {}", e));
                    thread::sleep(ACCEPT_BACKOFF);
                }
            }
        }
    }

    /// Detiene el accept loop y cierra el socket
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let socket = self.lock_socket().take();
        if let Some(socket) = socket {
            let _ = socket.shutdown(Shutdown::Both);

            // En plataformas donde shutdown no despierta a accept(),
            // una conexión propia lo hace
            if let Some(addr) = self.local_addr() {
                let _ = TcpStream::connect_timeout(&wake_addr(addr), Duration::from_millis(100));
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Dirección efectiva (útil con puerto 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_socket(&self) -> std::sync::MutexGuard<'_, Option<Arc<Socket>>> {
        self.socket.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Convierte `host:port` en una dirección de socket
///
/// Solo se aceptan IPs literales (más `localhost`).
pub fn resolve_addr(host: &str, port: u16) -> ServerResult<SocketAddr> {
    let ip = match host {
        "" | "0.0.0.0" => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        "localhost" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other
            .parse::<IpAddr>()
            .map_err(|_| ServerError::InvalidAddress(other.to_string()))?,
    };
    Ok(SocketAddr::new(ip, port))
}

fn bind_error(addr: SocketAddr, source: io::Error) -> ServerError {
    ServerError::Bind {
        addr: addr.to_string(),
        source,
    }
}

/// Dirección a la que conectarse para despertar al accept
fn wake_addr(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}
