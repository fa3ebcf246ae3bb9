//! gadget-harness
//!
//! Este crate reúne la parte "de aplicación" del harness:
//! - `config`: carga `.env` y construye un `HarnessConfig` explícito.
//! - `errors`: errores de los suites y del binario.
//! - `suites`: los suites de integración (trace exec, top tcp, snapshot process).
//! - `cli` y `logger`: el binario `gadget-harness`.
//!
//! El motor (steps, runner, matcher) vive en `harness-core`; la ejecución real
//! de procesos y los tipos de eventos, en `harness-adapters`.

pub mod cli;
pub mod config;
pub mod errors;
pub mod logger;
pub mod suites;
