//! Executor en memoria para tests.
//!
//! Las reglas se evalúan en orden y aplican al primer comando cuyo texto
//! contiene el patrón. Todo lo que no casa con ninguna regla "sale" con código
//! 0 y salida vacía. Cada invocación queda en un journal para poder afirmar el
//! orden observado por el runner.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{CapturedOutput, ProcessExecutor, ProcessSpec, RunningProcess};
use crate::errors::ExecError;

/// Comportamiento guionado de un comando.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// Termina con esta salida. En segundo plano, una salida con código de
    /// salida es un proceso que terminó solo antes del `stop`; una sin código
    /// (`CapturedOutput::killed`) es uno que cortó la señal.
    Output(CapturedOutput),
    /// El spawn falla.
    SpawnFailure(String),
    /// Excede el timeout habiendo escrito esta salida parcial.
    Timeout(CapturedOutput),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    Run,
    Start,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub kind: InvocationKind,
    pub command: String,
    pub env: Vec<(String, String)>,
}

#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    rules: Vec<(String, Script)>,
    journal: Arc<Mutex<Vec<Invocation>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, pattern: impl Into<String>, script: Script) -> Self {
        self.rules.push((pattern.into(), script));
        self
    }

    /// Atajo: el comando termina con código 0 y este stdout.
    pub fn on(self, pattern: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.script(pattern, Script::Output(CapturedOutput::exited(stdout, 0)))
    }

    pub fn journal(&self) -> Vec<Invocation> {
        self.journal.lock().map(|j| j.clone()).unwrap_or_default()
    }

    /// Sólo los textos de comando, en orden, con el tipo de invocación.
    pub fn commands(&self) -> Vec<(InvocationKind, String)> {
        self.journal().into_iter().map(|i| (i.kind, i.command)).collect()
    }

    fn lookup(&self, command: &str) -> Script {
        self.rules
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, script)| script.clone())
            .unwrap_or_else(|| Script::Output(CapturedOutput::exited("", 0)))
    }

    fn record(&self, kind: InvocationKind, spec: &ProcessSpec) -> String {
        let command = spec.command_line();
        push(&self.journal,
             Invocation { kind,
                          command: command.clone(),
                          env: spec.env.clone() });
        command
    }
}

fn push(journal: &Mutex<Vec<Invocation>>, invocation: Invocation) {
    if let Ok(mut j) = journal.lock() {
        j.push(invocation);
    }
}

#[async_trait]
impl ProcessExecutor for ScriptedExecutor {
    async fn run(&self, spec: &ProcessSpec, timeout: Duration) -> Result<CapturedOutput, ExecError> {
        if spec.argv.is_empty() {
            return Err(ExecError::EmptyCommand);
        }
        let command = self.record(InvocationKind::Run, spec);
        match self.lookup(&command) {
            Script::Output(output) => Ok(output),
            Script::SpawnFailure(message) => Err(ExecError::Spawn { program: command,
                                                                    message }),
            Script::Timeout(partial) => Err(ExecError::Timeout { elapsed_ms: timeout.as_millis() as u64,
                                                                 partial }),
        }
    }

    async fn start(&self, spec: &ProcessSpec) -> Result<Box<dyn RunningProcess>, ExecError> {
        if spec.argv.is_empty() {
            return Err(ExecError::EmptyCommand);
        }
        let command = self.record(InvocationKind::Start, spec);
        let output = match self.lookup(&command) {
            Script::SpawnFailure(message) => {
                return Err(ExecError::Spawn { program: command,
                                              message })
            }
            Script::Output(output) => output,
            Script::Timeout(partial) => partial,
        };
        Ok(Box::new(ScriptedProcess { command,
                                      env: spec.env.clone(),
                                      output,
                                      journal: Arc::clone(&self.journal) }))
    }
}

struct ScriptedProcess {
    command: String,
    env: Vec<(String, String)>,
    output: CapturedOutput,
    journal: Arc<Mutex<Vec<Invocation>>>,
}

#[async_trait]
impl RunningProcess for ScriptedProcess {
    fn id(&self) -> Option<u32> {
        None
    }

    async fn stop(self: Box<Self>, _grace: Duration) -> Result<CapturedOutput, ExecError> {
        push(&self.journal,
             Invocation { kind: InvocationKind::Stop,
                          command: self.command.clone(),
                          env: self.env.clone() });
        match self.output.exit_code {
            Some(_) => Ok(self.output.before_stop()),
            None => Ok(self.output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_matching_rule_wins() {
        let exec = ScriptedExecutor::new().on("snapshot process", "[]")
                                          .on("snapshot", "ignored");
        let out = exec.run(&ProcessSpec::shell("kg snapshot process -o json"), Duration::from_secs(1))
                      .await
                      .unwrap();
        assert_eq!(out.stdout, "[]");
    }

    #[tokio::test]
    async fn started_process_returns_output_on_stop() {
        let exec = ScriptedExecutor::new().script("trace exec", Script::Output(CapturedOutput::killed("{}\n")));
        let handle = exec.start(&ProcessSpec::shell("kg trace exec")).await.unwrap();
        let out = handle.stop(Duration::from_millis(10)).await.unwrap();
        assert_eq!(out.exit_code, None);
        assert!(!out.exited_before_stop);
        assert_eq!(exec.commands(),
                   vec![(InvocationKind::Start, "kg trace exec".to_string()),
                        (InvocationKind::Stop, "kg trace exec".to_string())]);
    }

    #[tokio::test]
    async fn background_exit_code_means_it_ended_on_its_own() {
        let exec = ScriptedExecutor::new().script("trace exec", Script::Output(CapturedOutput::exited("", 1)));
        let handle = exec.start(&ProcessSpec::shell("kg trace exec")).await.unwrap();
        let out = handle.stop(Duration::from_millis(10)).await.unwrap();
        assert!(out.exited_before_stop);
        assert_eq!(out.exit_code, Some(1));
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let exec = ScriptedExecutor::new().script("missing", Script::SpawnFailure("not found".into()));
        let err = exec.run(&ProcessSpec::shell("missing-binary"), Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }
}
