//! # Workers
//! src/workers/mod.rs
//!
//! Estrategias de ejecución para el trabajo de cada conexión:
//!
//! - `WorkerPool`: N threads consumiendo una cola compartida
//! - `Executor::Inline`: ejecuta en el thread que llama (sin sockets de por
//!   medio, útil para pruebas o entornos de un solo thread)

pub mod pool;

pub use pool::{Task, WorkerPool};

use crate::error::HandlerError;
use crate::logging::Logger;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Dónde se ejecuta el trabajo de cada conexión
#[derive(Clone)]
pub enum Executor {
    /// Encola en un pool de threads
    Pool(Arc<WorkerPool>),
    /// Ejecuta de inmediato en el thread actual; los pánicos se registran
    Inline(Arc<dyn Logger>),
}

impl Executor {
    /// Ejecuta o encola la tarea
    ///
    /// Retorna `false` si el pool la descartó por estar detenido.
    pub fn execute<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            Executor::Pool(pool) => pool.enqueue(task),
            Executor::Inline(logger) => {
                // Un pánico no debe salir del accept loop
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                    let err = HandlerError::from_panic(payload);
                    logger.error(&format!("Inline task panicked: {}", err));
                }
                true
            }
        }
    }
}
