//! Tipos de evento emitidos por el `StepRunner`.
//!
//! Cada batch produce una secuencia append-only de eventos identificada por
//! su `batch_id`. Permiten reconstruir qué pasó en un batch (qué se lanzó,
//! qué se detuvo, qué validó) sin depender del reporte en memoria.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEventKind {
    /// Primer evento de todo batch.
    BatchStarted { step_count: usize },
    StepStarted { step_index: usize, step_name: String, mode: String },
    /// Un step StartAndStop quedó corriendo en segundo plano.
    ProcessStarted { step_index: usize, step_name: String, pid: Option<u32> },
    ProcessStopped {
        step_index: usize,
        step_name: String,
        exit_code: Option<i32>,
        output_digest: String,
    },
    StepFinished {
        step_index: usize,
        step_name: String,
        exit_code: Option<i32>,
        output_digest: String,
    },
    /// Fallo de ejecución (spawn, timeout, exit status).
    StepFailed { step_index: usize, step_name: String, error: String },
    ValidationPassed { step_index: usize, step_name: String, validator: String },
    ValidationFailed {
        step_index: usize,
        step_name: String,
        validator: String,
        error: String,
    },
    /// Step no ejecutado porque el batch ya había fallado.
    StepSkipped { step_index: usize, step_name: String },
    /// Hook `before_cleanup` invocado (exactamente una vez por batch).
    HookInvoked { failed: bool },
    BatchCompleted { failed: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    pub seq: u64, // orden de append dentro del batch
    pub batch_id: Uuid,
    pub kind: RunEventKind,
    pub ts: DateTime<Utc>,
}
