//! Core StepRunner implementation

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use log::{debug, info, warn};
use uuid::Uuid;

use super::hook::BatchHook;
use super::report::BatchReport;
use crate::constants::{DEFAULT_STEP_TIMEOUT_SECS, DEFAULT_STOP_GRACE_SECS};
use crate::errors::{ExecError, HarnessError, ValidationError};
use crate::event::{EventStore, InMemoryEventStore, RunEventKind};
use crate::hashing::hash_str;
use crate::process::{CapturedOutput, ProcessExecutor, RunningProcess};
use crate::step::{Step, StepMode, StepStatus};

/// Parámetros explícitos del runner. Nada se lee del entorno ambiente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Entorno adicional inyectado en cada step (p. ej. `KUBECTL_GADGET`).
    pub env: Vec<(String, String)>,
    pub step_timeout: Duration,
    pub stop_grace: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { env: Vec::new(),
               step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
               stop_grace: Duration::from_secs(DEFAULT_STOP_GRACE_SECS) }
    }
}

/// Proceso StartAndStop pendiente de detener.
struct Started {
    index: usize,
    step: Step,
    handle: Box<dyn RunningProcess>,
}

/// Ejecuta batches de steps.
///
/// Orden de fases de un batch:
/// 1. steps principales en orden de declaración; el primer fallo hace que el
///    resto se salte;
/// 2. todo proceso StartAndStop aún vivo se detiene (siempre);
/// 3. hook `before_cleanup`, exactamente una vez (siempre);
/// 4. steps de cleanup (siempre).
///
/// Trabaja con `&self`: varios batches independientes pueden correr a la vez
/// sobre el mismo runner.
#[derive(Debug)]
pub struct StepRunner<X, E>
    where X: ProcessExecutor,
          E: EventStore
{
    executor: X,
    events: E,
    config: RunnerConfig,
}

impl<X: ProcessExecutor> StepRunner<X, InMemoryEventStore> {
    /// Runner con store de eventos en memoria y configuración por defecto.
    pub fn in_memory(executor: X) -> Self {
        Self::new(executor, InMemoryEventStore::default())
    }
}

impl<X, E> StepRunner<X, E>
    where X: ProcessExecutor,
          E: EventStore
{
    pub fn new(executor: X, events: E) -> Self {
        Self { executor,
               events,
               config: RunnerConfig::default() }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub fn event_store(&self) -> &E {
        &self.events
    }

    /// Ejecuta un batch sin hook.
    pub async fn run_batch(&self, steps: Vec<Step>) -> BatchReport {
        self.run_batch_with_hook(steps, None).await
    }

    /// Ejecuta un batch; `hook` corre una vez antes de la fase de cleanup.
    pub async fn run_batch_with_hook(&self, steps: Vec<Step>, hook: Option<&dyn BatchHook>) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let mut report = BatchReport::new(batch_id, &steps);
        self.events
            .append_kind(batch_id, RunEventKind::BatchStarted { step_count: steps.len() });
        info!("batch {batch_id}: starting {} step(s)", steps.len());

        let (cleanup, main): (Vec<(usize, Step)>, Vec<(usize, Step)>) =
            steps.into_iter().enumerate().partition(|(_, s)| s.is_cleanup());

        let mut running: Vec<Started> = Vec::new();
        for (index, step) in main {
            if report.failed() {
                self.skip(batch_id, index, &step, &mut report);
                continue;
            }
            self.step_started(batch_id, index, &step);
            match step.mode().clone() {
                StepMode::RunToCompletion => self.run_step(batch_id, index, &step, &mut report).await,
                StepMode::StartAndStop => {
                    if let Some(handle) = self.start_step(batch_id, index, &step, &mut report).await {
                        running.push(Started { index, step, handle });
                    }
                }
                StepMode::Stop(target) => {
                    let found = running.iter().position(|s| s.step.name() == target);
                    match found {
                    Some(pos) => {
                        let started = running.remove(pos);
                        self.stop_step(batch_id, started, true, &mut report).await;
                        report.set_status(index, StepStatus::Passed);
                    }
                    None => self.fail(batch_id, index, &step, HarnessError::UnknownStep(target), &mut report),
                    }
                }
            }
        }

        // Ningún proceso sobrevive al batch; sólo se valida si nada falló antes.
        for started in running {
            let validate = !report.failed();
            self.stop_step(batch_id, started, validate, &mut report).await;
        }

        let failed = report.failed();
        if let Some(hook) = hook {
            self.events.append_kind(batch_id, RunEventKind::HookInvoked { failed });
            hook.before_cleanup(batch_id, failed).await;
        }

        for (index, step) in cleanup {
            self.step_started(batch_id, index, &step);
            self.run_step(batch_id, index, &step, &mut report).await;
        }

        let failed = report.failed();
        self.events.append_kind(batch_id, RunEventKind::BatchCompleted { failed });
        if failed {
            warn!("batch {batch_id}: failed");
        } else {
            info!("batch {batch_id}: passed");
        }
        report
    }

    fn step_started(&self, batch_id: Uuid, index: usize, step: &Step) {
        debug!("batch {batch_id}: step[{index}] `{}` ({}) {}",
               step.name(),
               step.mode(),
               step.command());
        self.events.append_kind(batch_id,
                                RunEventKind::StepStarted { step_index: index,
                                                            step_name: step.name().to_string(),
                                                            mode: step.mode().to_string() });
    }

    async fn run_step(&self, batch_id: Uuid, index: usize, step: &Step, report: &mut BatchReport) {
        let spec = step.process_spec(&self.config.env);
        let output = match self.executor.run(&spec, self.config.step_timeout).await {
            Ok(output) => output,
            Err(err) => {
                let partial = match &err {
                    ExecError::Timeout { partial, .. } => Some(partial.clone()),
                    _ => None,
                };
                let error = HarnessError::Execution { step: step.name().to_string(),
                                                      source: err,
                                                      output: partial };
                self.fail(batch_id, index, step, error, report);
                return;
            }
        };
        self.events.append_kind(batch_id,
                                RunEventKind::StepFinished { step_index: index,
                                                             step_name: step.name().to_string(),
                                                             exit_code: output.exit_code,
                                                             output_digest: hash_str(&output.stdout) });
        report.set_output(index, output.clone());

        if !output.success() && !step.tolerates_failure() {
            self.fail(batch_id, index, step, exit_failure(step, output), report);
            return;
        }
        self.check(batch_id, index, step, &output, report);
    }

    async fn start_step(&self,
                        batch_id: Uuid,
                        index: usize,
                        step: &Step,
                        report: &mut BatchReport)
                        -> Option<Box<dyn RunningProcess>> {
        let spec = step.process_spec(&self.config.env);
        match self.executor.start(&spec).await {
            Ok(handle) => {
                self.events.append_kind(batch_id,
                                        RunEventKind::ProcessStarted { step_index: index,
                                                                       step_name: step.name().to_string(),
                                                                       pid: handle.id() });
                report.set_status(index, StepStatus::Running);
                Some(handle)
            }
            Err(err) => {
                let error = HarnessError::Execution { step: step.name().to_string(),
                                                      source: err,
                                                      output: None };
                self.fail(batch_id, index, step, error, report);
                None
            }
        }
    }

    async fn stop_step(&self, batch_id: Uuid, started: Started, validate: bool, report: &mut BatchReport) {
        let Started { index, step, handle } = started;
        debug!("batch {batch_id}: stopping `{}`", step.name());
        match handle.stop(self.config.stop_grace).await {
            Ok(output) => {
                self.events.append_kind(batch_id,
                                        RunEventKind::ProcessStopped { step_index: index,
                                                                       step_name: step.name().to_string(),
                                                                       exit_code: output.exit_code,
                                                                       output_digest: hash_str(&output.stdout) });
                report.set_output(index, output.clone());
                // terminó solo y con error: no fue nuestra señal
                if output.exited_before_stop && !output.success() && !step.tolerates_failure() {
                    self.fail(batch_id, index, &step, exit_failure(&step, output), report);
                } else if validate {
                    self.check(batch_id, index, &step, &output, report);
                } else {
                    report.set_status(index, StepStatus::Skipped);
                }
            }
            Err(err) => {
                let error = HarnessError::Execution { step: step.name().to_string(),
                                                      source: err,
                                                      output: None };
                self.fail(batch_id, index, &step, error, report);
            }
        }
    }

    /// Invoca el validador del step sobre stdout. Un pánico del validador es
    /// un fallo de validación más: las fases de hook y cleanup siguen.
    fn check(&self, batch_id: Uuid, index: usize, step: &Step, output: &CapturedOutput, report: &mut BatchReport) {
        let Some(validator) = step.validator() else {
            report.set_status(index, StepStatus::Passed);
            return;
        };
        let verdict = panic::catch_unwind(AssertUnwindSafe(|| validator.validate(&output.stdout)))
            .unwrap_or_else(|payload| Err(ValidationError::Custom(format!("validator panicked: {}", panic_message(&*payload)))));
        match verdict {
            Ok(()) => {
                self.events.append_kind(batch_id,
                                        RunEventKind::ValidationPassed { step_index: index,
                                                                         step_name: step.name().to_string(),
                                                                         validator: validator.describe() });
                report.set_status(index, StepStatus::Passed);
            }
            Err(err) => {
                warn!("batch {batch_id}: step `{}` validation failed: {err}", step.name());
                self.events.append_kind(batch_id,
                                        RunEventKind::ValidationFailed { step_index: index,
                                                                         step_name: step.name().to_string(),
                                                                         validator: validator.describe(),
                                                                         error: err.to_string() });
                report.fail(index, HarnessError::from_validation(step.name(), err));
            }
        }
    }

    fn fail(&self, batch_id: Uuid, index: usize, step: &Step, error: HarnessError, report: &mut BatchReport) {
        warn!("batch {batch_id}: step `{}` failed: {error}", step.name());
        self.events.append_kind(batch_id,
                                RunEventKind::StepFailed { step_index: index,
                                                           step_name: step.name().to_string(),
                                                           error: error.to_string() });
        report.fail(index, error);
    }

    fn skip(&self, batch_id: Uuid, index: usize, step: &Step, report: &mut BatchReport) {
        debug!("batch {batch_id}: skipping `{}`", step.name());
        self.events.append_kind(batch_id,
                                RunEventKind::StepSkipped { step_index: index,
                                                            step_name: step.name().to_string() });
        report.set_status(index, StepStatus::Skipped);
    }
}

fn exit_failure(step: &Step, output: CapturedOutput) -> HarnessError {
    let source = match output.exit_code {
        Some(code) => ExecError::ExitStatus(code),
        None => ExecError::Terminated,
    };
    HarnessError::Execution { step: step.name().to_string(),
                              source,
                              output: Some(output) }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload.downcast_ref::<&str>()
           .map(|s| s.to_string())
           .or_else(|| payload.downcast_ref::<String>().cloned())
           .unwrap_or_else(|| "non-string panic payload".to_string())
}
