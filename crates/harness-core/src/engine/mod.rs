//! Step runner: secuencia steps, gestiona el ciclo de vida de los procesos e
//! invoca validadores.

mod hook;
mod report;
mod runner;

pub use hook::{BatchHook, NoopHook};
pub use report::{BatchReport, StepOutcome};
pub use runner::{RunnerConfig, StepRunner};
