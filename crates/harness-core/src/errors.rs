//! Errores del core del harness.
//!
//! La taxonomía separa cuatro familias: setup, ejecución, decodificación y
//! matching. Cada variante conserva el material necesario para diagnosticar
//! un fallo (salida parcial, fragmento ofensivo, registros esperados vs.
//! actuales ya normalizados).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::process::CapturedOutput;

/// Forma esperada del texto capturado. La elige el matcher, nunca se
/// auto-detecta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeMode {
    Stream,
    Array,
    MultiArray,
}

impl fmt::Display for DecodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecodeMode::Stream => "stream",
            DecodeMode::Array => "array",
            DecodeMode::MultiArray => "multi-array",
        };
        f.write_str(s)
    }
}

/// Fallo al parsear la salida capturada.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{mode} decode failed at byte {offset}: {message} (near `{fragment}`)")]
pub struct DecodeError {
    pub mode: DecodeMode,
    /// Offset en bytes dentro del texto capturado.
    pub offset: usize,
    /// Extracto acotado alrededor del offset.
    pub fragment: String,
    pub message: String,
}

fn render_list(entries: &[String]) -> String {
    if entries.is_empty() {
        return "  (none)".to_string();
    }
    entries.iter().map(|e| format!("  {e}")).collect::<Vec<_>>().join("\n")
}

fn render_intervals(intervals: &[Vec<String>]) -> String {
    intervals.iter()
             .enumerate()
             .map(|(i, entries)| format!("interval {i}:\n{}", render_list(entries)))
             .collect::<Vec<_>>()
             .join("\n")
}

/// Diferencia entre registros esperados y actuales (ya normalizados).
///
/// Los registros se guardan como JSON canónico para que un humano pueda
/// compararlos con un diff de texto.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("expected entry not found: {expected}\nactual entries:\n{}", render_list(.actual))]
    MissingEntry { expected: String, actual: Vec<String> },
    #[error("unexpected entries:\n{}\nactual entries:\n{}", render_list(.unexpected), render_list(.actual))]
    UnexpectedEntries { unexpected: Vec<String>, actual: Vec<String> },
    #[error("expected entry never observed across {} interval(s): {expected}\n{}", .actual.len(), render_intervals(.actual))]
    NeverObserved { expected: String, actual: Vec<Vec<String>> },
}

/// Resultado negativo de un `Validator`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error("output mismatch: expected {expected:?}, got {actual:?}")]
    Output { expected: String, actual: String },
    #[error("{0}")]
    Custom(String),
}

/// Errores del puerto de ejecución de procesos.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("empty command")]
    EmptyCommand,
    #[error("failed to spawn `{program}`: {message}")]
    Spawn { program: String, message: String },
    #[error("timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64, partial: CapturedOutput },
    #[error("exited with status {0}")]
    ExitStatus(i32),
    #[error("terminated by signal")]
    Terminated,
    #[error("failed to signal process {pid}: {message}")]
    Signal { pid: u32, message: String },
    #[error("io: {0}")]
    Io(String),
}

impl From<std::io::Error> for ExecError {
    fn from(err: std::io::Error) -> Self {
        ExecError::Io(err.to_string())
    }
}

/// Error de alto nivel de un batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HarnessError {
    #[error("setup failure: {0}")]
    Setup(String),
    #[error("step `{step}` failed to execute: {source}")]
    Execution {
        step: String,
        source: ExecError,
        /// Salida capturada hasta el fallo, si la hay.
        output: Option<CapturedOutput>,
    },
    #[error("step `{step}`: {source}")]
    Decode { step: String, source: DecodeError },
    #[error("step `{step}`: {source}")]
    Match { step: String, source: MatchError },
    #[error("step `{step}`: {message}")]
    Validation { step: String, message: String },
    #[error("stop requested for unknown or not running step `{0}`")]
    UnknownStep(String),
}

impl HarnessError {
    /// Clasifica un fallo de validación manteniendo decode y match separados.
    pub fn from_validation(step: &str, err: ValidationError) -> Self {
        let step = step.to_string();
        match err {
            ValidationError::Decode(source) => HarnessError::Decode { step, source },
            ValidationError::Match(source) => HarnessError::Match { step, source },
            other => HarnessError::Validation { step,
                                                message: other.to_string() },
        }
    }

    pub fn step(&self) -> Option<&str> {
        match self {
            HarnessError::Execution { step, .. }
            | HarnessError::Decode { step, .. }
            | HarnessError::Match { step, .. }
            | HarnessError::Validation { step, .. } => Some(step),
            HarnessError::UnknownStep(step) => Some(step),
            HarnessError::Setup(_) => None,
        }
    }

    pub fn is_decode_failure(&self) -> bool {
        matches!(self, HarnessError::Decode { .. })
    }

    pub fn is_match_failure(&self) -> bool {
        matches!(self, HarnessError::Match { .. })
    }

    pub fn is_execution_failure(&self) -> bool {
        matches!(self, HarnessError::Execution { .. })
    }
}
