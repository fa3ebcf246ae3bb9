//! harness-core: motor de orquestación de steps y verificación de salida.
//!
//! Piezas, de las hojas hacia arriba:
//! - `normalize`: máscaras que anulan campos no deterministas.
//! - `decode`: parseo de la salida capturada (stream, array, multi-array).
//! - `matcher`: las tres semánticas de comparación.
//! - `validator`: la capacidad `validate(captured)` que usan los steps.
//! - `process`: puerto de ejecución de procesos (+ fake guionado).
//! - `engine`: `StepRunner`, que secuencia steps y garantiza el cleanup.
pub mod constants;
pub mod decode;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod matcher;
pub mod normalize;
pub mod process;
pub mod record;
pub mod step;
pub mod validator;

pub use engine::{BatchHook, BatchReport, NoopHook, RunnerConfig, StepOutcome, StepRunner};
pub use errors::{DecodeError, DecodeMode, ExecError, HarnessError, MatchError, ValidationError};
pub use event::{EventStore, InMemoryEventStore, RunEvent, RunEventKind};
pub use matcher::{expect_entries_in_array_to_match, expect_entries_in_multiple_array_to_match,
                  expect_entries_to_match};
pub use normalize::{FieldMask, NoopNormalizer, Normalizer};
pub use process::{CapturedOutput, ProcessExecutor, ProcessSpec, RunningProcess, ScriptedExecutor};
pub use record::Record;
pub use step::{Step, StepMode, StepStatus};
pub use validator::{ExpectArrayEntries, ExpectEntries, ExpectMultipleArrayEntries, ExpectOutput, FnValidator,
                    Validator};
