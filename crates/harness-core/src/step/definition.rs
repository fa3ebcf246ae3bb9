use std::fmt;

use crate::process::ProcessSpec;
use crate::validator::Validator;

/// Modo de ejecución de un step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepMode {
    /// Bloquea hasta que el proceso termina (o vence el timeout).
    RunToCompletion,
    /// Arranca en segundo plano; se detiene con un `Stop` o al terminar el batch.
    StartAndStop,
    /// Detiene el step StartAndStop con ese nombre y valida su salida.
    Stop(String),
}

impl fmt::Display for StepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepMode::RunToCompletion => f.write_str("run-to-completion"),
            StepMode::StartAndStop => f.write_str("start-and-stop"),
            StepMode::Stop(target) => write!(f, "stop({target})"),
        }
    }
}

/// Unidad de trabajo con nombre. Inmutable una vez construida; el runner la
/// consume exactamente una vez.
pub struct Step {
    name: String,
    command: String,
    mode: StepMode,
    validator: Option<Box<dyn Validator>>,
    cleanup: bool,
    tolerate_failure: bool,
}

impl Step {
    /// Step RunToCompletion.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self { name: name.into(),
               command: command.into(),
               mode: StepMode::RunToCompletion,
               validator: None,
               cleanup: false,
               tolerate_failure: false }
    }

    pub fn start_and_stop(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self { mode: StepMode::StartAndStop,
               ..Self::new(name, command) }
    }

    /// Sub-step explícito que detiene `target`.
    pub fn stop(target: impl Into<String>) -> Self {
        let target = target.into();
        Self { mode: StepMode::Stop(target.clone()),
               ..Self::new(format!("stop:{target}"), String::new()) }
    }

    pub fn validate_with(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Marca el step como limpieza: sólo corre en la fase de cleanup del
    /// batch, y siempre corre.
    pub fn as_cleanup(mut self) -> Self {
        self.cleanup = true;
        self
    }

    /// Un exit status distinto de cero deja de ser fallo de ejecución.
    pub fn tolerate_failure(mut self) -> Self {
        self.tolerate_failure = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn mode(&self) -> &StepMode {
        &self.mode
    }

    pub fn validator(&self) -> Option<&dyn Validator> {
        self.validator.as_deref()
    }

    pub fn is_cleanup(&self) -> bool {
        self.cleanup
    }

    pub fn tolerates_failure(&self) -> bool {
        self.tolerate_failure
    }

    /// `sh -c <command>` con el entorno explícito del runner.
    pub fn process_spec(&self, env: &[(String, String)]) -> ProcessSpec {
        env.iter()
           .fold(ProcessSpec::shell(&self.command), |spec, (k, v)| spec.with_env(k.clone(), v.clone()))
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
         .field("name", &self.name)
         .field("command", &self.command)
         .field("mode", &self.mode)
         .field("validator", &self.validator.as_ref().map(|v| v.describe()))
         .field("cleanup", &self.cleanup)
         .field("tolerate_failure", &self.tolerate_failure)
         .finish()
    }
}
