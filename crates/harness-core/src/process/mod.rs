//! Puerto de ejecución de procesos.
//!
//! El runner nunca lanza procesos directamente: lo hace a través de
//! `ProcessExecutor`. Un proceso arrancado en segundo plano se representa con
//! un `RunningProcess`; la única forma de obtener su salida es `stop`, que
//! consume el handle. Así el validador sólo ve el buffer una vez que el
//! proceso dejó de escribir.

mod scripted;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ExecError;

pub use scripted::{Invocation, InvocationKind, Script, ScriptedExecutor};

/// Invocación equivalente a argv + entorno adicional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ProcessSpec {
    pub fn new<I, S>(argv: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        Self { argv: argv.into_iter().map(Into::into).collect(),
               env: Vec::new() }
    }

    /// `sh -c <command>`: el texto se interpreta con la shell, incluida la
    /// expansión de variables como `$KUBECTL_GADGET`.
    pub fn shell(command: &str) -> Self {
        Self::new(["sh", "-c", command])
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Texto legible del comando; para `sh -c` es el propio script.
    pub fn command_line(&self) -> String {
        match self.argv.as_slice() {
            [sh, flag, script] if sh == "sh" && flag == "-c" => script.clone(),
            argv => argv.join(" "),
        }
    }
}

/// Salida capturada de un proceso. Inmutable una vez construida.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` si el proceso terminó por señal en lugar de salir.
    pub exit_code: Option<i32>,
    /// Proceso en segundo plano que ya había terminado por su cuenta cuando
    /// se pidió `stop`.
    #[serde(default)]
    pub exited_before_stop: bool,
}

impl CapturedOutput {
    pub fn exited(stdout: impl Into<String>, exit_code: i32) -> Self {
        Self { stdout: stdout.into(),
               stderr: String::new(),
               exit_code: Some(exit_code),
               exited_before_stop: false }
    }

    pub fn killed(stdout: impl Into<String>) -> Self {
        Self { stdout: stdout.into(),
               stderr: String::new(),
               exit_code: None,
               exited_before_stop: false }
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn before_stop(mut self) -> Self {
        self.exited_before_stop = true;
        self
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Lanza procesos. Implementaciones: `ScriptedExecutor` (memoria) y el
/// executor basado en tokio del crate de adapters.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Ejecuta hasta terminar o hasta `timeout`, lo que ocurra primero.
    async fn run(&self, spec: &ProcessSpec, timeout: Duration) -> Result<CapturedOutput, ExecError>;

    /// Arranca sin bloquear; la salida se acumula en segundo plano.
    async fn start(&self, spec: &ProcessSpec) -> Result<Box<dyn RunningProcess>, ExecError>;
}

/// Proceso en ejecución (estado Running). `stop` lo lleva a Stopped.
#[async_trait]
pub trait RunningProcess: Send {
    fn id(&self) -> Option<u32>;

    /// Pide terminación ordenada, espera `grace` y si hace falta fuerza el
    /// kill. Devuelve todo lo escrito durante la vida del proceso.
    async fn stop(self: Box<Self>, grace: Duration) -> Result<CapturedOutput, ExecError>;
}

#[async_trait]
impl<T: ProcessExecutor + ?Sized> ProcessExecutor for Arc<T> {
    async fn run(&self, spec: &ProcessSpec, timeout: Duration) -> Result<CapturedOutput, ExecError> {
        (**self).run(spec, timeout).await
    }

    async fn start(&self, spec: &ProcessSpec) -> Result<Box<dyn RunningProcess>, ExecError> {
        (**self).start(spec).await
    }
}
