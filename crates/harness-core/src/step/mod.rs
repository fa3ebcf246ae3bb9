//! Definiciones relacionadas a Steps.
//!
//! Un Step es una unidad de trabajo con nombre: un comando de shell, un modo
//! de ejecución y un validador opcional para su salida. Este módulo define:
//! - `Step` y `StepMode`: lo que el test declara.
//! - `StepStatus`: el estado que el runner reporta por step.

pub mod definition;
mod status;

pub use definition::{Step, StepMode};
pub use status::StepStatus;
