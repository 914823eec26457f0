//! # Logging
//! src/logging.rs
//!
//! El núcleo del servidor no usa un logger global: recibe una
//! implementación de `Logger` y la comparte entre el accept loop y los workers.
//!
//! - `TracingLogger` reenvía a los macros de `tracing`
//! - `MemoryLogger` guarda las líneas en memoria (útil en pruebas)
//! - `NullLogger` descarta todo
//!
//! El destino y el formato (timestamps, colores) los decide quien instala
//! el subscriber, normalmente `init_tracing` desde el binario.

use std::sync::{Arc, Mutex};

/// Severidad de una línea de log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

/// Capacidad de logging inyectada en el servidor
pub trait Logger: Send + Sync {
    /// Registra un mensaje con la severidad dada
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warning(&self, message: &str) {
        self.log(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    fn fatal(&self, message: &str) {
        self.log(Level::Fatal, message);
    }
}

/// Logger que reenvía a `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!("{}", message),
            Level::Info => tracing::info!("{}", message),
            Level::Warning => tracing::warn!("{}", message),
            Level::Error => tracing::error!("{}", message),
            Level::Fatal => tracing::error!(fatal = true, "{}", message),
        }
    }
}

/// Logger que descarta todos los mensajes
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Logger que acumula las líneas en memoria
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copia de todas las líneas registradas hasta ahora
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// `true` si alguna línea con ese nivel contiene el texto
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}

/// Instala el subscriber de `tracing` para el proceso
///
/// `RUST_LOG` tiene prioridad sobre `default_level`.
/// Llamarla más de una vez no tiene efecto.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hilos_http={}", default_level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_records_levels() {
        let logger = MemoryLogger::new();
        logger.info("server started");
        logger.error("handshake failed");
        logger.fatal("boom");

        let lines = logger.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], (Level::Info, "server started".to_string()));
        assert!(logger.contains(Level::Error, "handshake"));
        assert!(!logger.contains(Level::Info, "handshake"));
        assert!(logger.contains(Level::Fatal, "boom"));
    }

    #[test]
    fn test_memory_logger_clones_share_storage() {
        let logger = MemoryLogger::new();
        let shared: Arc<dyn Logger> = Arc::new(logger.clone());
        shared.warning("low disk");

        assert!(logger.contains(Level::Warning, "low disk"));
    }

    #[test]
    fn test_null_and_tracing_loggers_do_not_panic() {
        NullLogger.debug("ignored");
        TracingLogger.info("forwarded");
        TracingLogger.fatal("forwarded");
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing("debug");
        init_tracing("info");
    }
}
