//! # Tipos de Error
//! src/error.rs
//!
//! Errores del ciclo de vida del servidor (bind, listen, TLS) y de los
//! handlers. Las fallas de una conexión individual nunca llegan hasta aquí:
//! se registran en el log y la conexión se cierra.

use std::io;
use std::path::PathBuf;

/// Resultado de las operaciones del servidor
pub type ServerResult<T> = Result<T, ServerError>;

/// Errores al arrancar o detener el servidor
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// `start` se llamó con el servidor ya corriendo
    #[error("server is already running")]
    AlreadyRunning,

    /// El host no es una dirección IPv4/IPv6 válida
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// No se pudo hacer bind (puerto en uso, permisos, etc.)
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// `listen` sin un bind previo exitoso
    #[error("listen called before a successful bind")]
    NotBound,

    #[error("failed to listen: {0}")]
    Listen(#[source] io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errores de la capa TLS
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to open certificate file {path}: {source}")]
    CertificateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no certificates found in {0}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0}")]
    NoPrivateKey(PathBuf),

    /// La clave privada no corresponde al certificado
    #[error("private key does not match the certificate: {0}")]
    KeyMismatch(String),

    #[error(transparent)]
    Rustls(#[from] rustls::Error),

    #[error("TLS handshake failed: {0}")]
    Handshake(String),
}

/// Error de validación de configuración
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(pub String);

/// Falla reportada por un handler o middleware
///
/// Los pánicos dentro de un handler también se convierten en `HandlerError`
/// antes de llegar al error handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Construye el error a partir del payload de un pánico
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self::new(message)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for HandlerError {
    fn from(e: io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Resultado de un handler
pub type HandlerResult = Result<(), HandlerError>;
