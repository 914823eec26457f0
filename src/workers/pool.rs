//! # Pool de Workers
//! src/workers/pool.rs
//!
//! Conjunto de threads que consumen tareas de una cola compartida.
//!
//! ## Sincronización
//!
//! ```text
//! enqueue() ──push──▶ [ Mutex<QueueState> ] ◀──pop── worker-0..N
//!                          │ Condvar
//!                          └── notify_one / notify_all
//! ```
//!
//! El flag `running` vive dentro del mismo mutex que la cola, así un worker
//! nunca se pierde la señal de parada entre revisar la cola y dormir.
//!
//! La cola no tiene límite de capacidad: bajo sobrecarga sostenida crece
//! sin backpressure.

use crate::logging::{Logger, NullLogger};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Unidad de trabajo: un closure sin valor de retorno
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Estado protegido por el mutex
struct QueueState {
    tasks: VecDeque<Task>,
    running: bool,
}

/// Parte compartida con cada worker
struct Shared {
    state: Mutex<QueueState>,
    condvar: Condvar,
    logger: Arc<dyn Logger>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Las tareas corren fuera del lock, un pánico no deja la cola a medias
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pool de threads de tamaño fijo pero redimensionable
pub struct WorkerPool {
    shared: Arc<Shared>,

    /// Handles de los threads vivos; su mutex también serializa
    /// start / stop / resize
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Cantidad de threads a lanzar en el próximo `start`
    size: Mutex<usize>,
}

impl WorkerPool {
    /// Crea un pool detenido con `size` workers (mínimo 1)
    pub fn new(size: usize) -> Self {
        Self::with_logger(size, Arc::new(NullLogger))
    }

    /// Crea un pool detenido que registra los pánicos de las tareas en `logger`
    pub fn with_logger(size: usize, logger: Arc<dyn Logger>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    tasks: VecDeque::new(),
                    running: false,
                }),
                condvar: Condvar::new(),
                logger,
            }),
            workers: Mutex::new(Vec::new()),
            size: Mutex::new(size.max(1)),
        }
    }

    /// Encola una tarea si el pool está corriendo
    ///
    /// Con el pool detenido la tarea se descarta sin ejecutarse.
    /// Retorna `true` si la tarea quedó encolada.
    pub fn enqueue<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let accepted = {
            let mut state = self.shared.lock();
            if state.running {
                state.tasks.push_back(Box::new(task));
                true
            } else {
                false
            }
        };

        self.shared.condvar.notify_one();
        accepted
    }

    /// Lanza los workers; no hace nada si ya está corriendo
    pub fn start(&self) {
        let mut workers = self.lock_workers();
        self.start_locked(&mut workers);
    }

    /// Detiene y espera a todos los workers
    ///
    /// Las tareas ya tomadas terminan; las que seguían en la cola se descartan.
    ///
    /// No debe llamarse desde una tarea del mismo pool.
    pub fn stop(&self) {
        let mut workers = self.lock_workers();
        self.stop_locked(&mut workers, true);
    }

    /// Cambia la cantidad de workers (0 se convierte en 1)
    ///
    /// Si el pool corre, se detiene y se vuelve a lanzar con el tamaño nuevo;
    /// las tareas pendientes se conservan para los workers nuevos.
    pub fn resize(&self, new_size: usize) {
        let mut workers = self.lock_workers();
        let was_running = self.is_running();

        if was_running {
            self.stop_locked(&mut workers, false);
        }

        *self.size.lock().unwrap_or_else(PoisonError::into_inner) = new_size.max(1);

        if was_running {
            self.start_locked(&mut workers);
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Tamaño configurado del pool
    pub fn thread_count(&self) -> usize {
        *self.size.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cantidad de threads lanzados que siguen vivos
    pub fn live_workers(&self) -> usize {
        self.lock_workers()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Tareas esperando en la cola
    pub fn queue_size(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_locked(&self, workers: &mut Vec<JoinHandle<()>>) {
        {
            let mut state = self.shared.lock();
            if state.running {
                return;
            }
            state.running = true;
        }

        let size = self.thread_count();
        for id in 0..size {
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || worker_loop(shared));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => self
                    .shared
                    .logger
                    .error(&format!("Failed to spawn worker-{}: {}", id, e)),
            }
        }
    }

    fn stop_locked(&self, workers: &mut Vec<JoinHandle<()>>, discard_pending: bool) {
        {
            let mut state = self.shared.lock();
            if !state.running {
                return;
            }
            state.running = false;
            if discard_pending {
                state.tasks.clear();
            }
        }

        self.shared.condvar.notify_all();

        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Loop de cada worker: esperar, tomar una tarea, ejecutarla
fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut state = shared.lock();
            while state.running && state.tasks.is_empty() {
                state = shared
                    .condvar
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }

            if !state.running {
                break;
            }
            state.tasks.pop_front()
        };

        if let Some(task) = task {
            // Una tarea que entra en pánico no mata al worker
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                let err = crate::error::HandlerError::from_panic(payload);
                shared.logger.error(&format!("Worker task panicked: {}", err));
            }
        }
    }
}
