//! # Transporte
//! src/server/transport.rs
//!
//! Flujo de bytes de una conexión, en claro o cifrado. El resto del
//! servidor solo ve `Read + Write`.

use super::tls::TlsStream;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

/// Conexión aceptada, dueña exclusiva del socket
pub enum Connection {
    Plain(TcpStream),
    Tls(Box<TlsStream>),
}

impl Connection {
    pub fn is_tls(&self) -> bool {
        matches!(self, Connection::Tls(_))
    }

    /// Socket TCP subyacente
    pub fn tcp(&self) -> &TcpStream {
        match self {
            Connection::Plain(stream) => stream,
            Connection::Tls(stream) => stream.get_ref(),
        }
    }

    /// Cierra la conexión ordenadamente
    ///
    /// En TLS envía `close_notify` antes de cerrar el socket.
    pub fn close(mut self) -> io::Result<()> {
        if let Connection::Tls(stream) = &mut self {
            stream.conn.send_close_notify();
            stream.flush()?;
        }
        self.tcp().shutdown(Shutdown::Both)
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(stream) => stream.read(buf),
            Connection::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(stream) => stream.write(buf),
            Connection::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Plain(stream) => stream.flush(),
            Connection::Tls(stream) => stream.flush(),
        }
    }
}
