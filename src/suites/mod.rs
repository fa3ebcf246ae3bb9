//! Suites de integración.
//!
//! Cada suite crea su propio namespace, corre su setup, los comandos de la
//! herramienta bajo prueba y un teardown que se ejecuta siempre. Los suites
//! son independientes entre sí y `run_suites` los corre en paralelo.

pub mod snapshot_process;
pub mod top_tcp;
pub mod trace_exec;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use harness_adapters::{Kubectl, PrintLogs};
use harness_core::{InMemoryEventStore, ProcessExecutor, Step, StepRunner};
use indexmap::IndexMap;
use log::{info, warn};
use serde::Serialize;
use tokio::task::JoinSet;

use crate::config::HarnessConfig;
use crate::errors::SuiteError;

/// Dependencias compartidas por todos los suites de una ejecución.
#[derive(Debug)]
pub struct SuiteContext<X> {
    pub config: HarnessConfig,
    pub executor: Arc<X>,
    pub events: Arc<InMemoryEventStore>,
}

impl<X: ProcessExecutor + 'static> SuiteContext<X> {
    pub fn new(config: HarnessConfig, executor: X) -> Self {
        Self { config,
               executor: Arc::new(executor),
               events: Arc::new(InMemoryEventStore::default()) }
    }

    pub fn runner(&self) -> StepRunner<Arc<X>, Arc<InMemoryEventStore>> {
        StepRunner::new(Arc::clone(&self.executor), Arc::clone(&self.events)).with_config(self.config.runner_config())
    }

    pub fn kubectl(&self) -> Kubectl {
        self.config.kubectl()
    }

    /// Corre `steps` con el hook de logs del namespace y convierte el primer
    /// fallo en error del suite.
    pub async fn run_batch(&self, suite: &'static str, namespace: &str, steps: Vec<Step>) -> Result<(), SuiteError> {
        let hook = PrintLogs::new(self.kubectl(), Arc::clone(&self.executor), vec![namespace.to_string()]);
        self.runner()
            .run_batch_with_hook(steps, Some(&hook))
            .await
            .into_result()
            .map_err(SuiteError::harness(suite))
    }

    pub async fn is_docker_runtime(&self, suite: &'static str) -> Result<bool, SuiteError> {
        self.kubectl()
            .is_docker_runtime(self.executor.as_ref())
            .await
            .map_err(SuiteError::harness(suite))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suite {
    TraceExec,
    TopTcp,
    SnapshotProcess,
}

impl Suite {
    pub const ALL: [Suite; 3] = [Suite::TraceExec, Suite::TopTcp, Suite::SnapshotProcess];

    pub fn name(self) -> &'static str {
        match self {
            Suite::TraceExec => trace_exec::SUITE,
            Suite::TopTcp => top_tcp::SUITE,
            Suite::SnapshotProcess => snapshot_process::SUITE,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Suite::TraceExec => "exec events of a busybox workload (stream, presence)",
            Suite::TopTcp => "TCP stats of an nginx+curl workload in three modes (multi-array)",
            Suite::SnapshotProcess => "process snapshot of a pod on its node (array, set equality)",
        }
    }

    pub async fn run<X: ProcessExecutor + 'static>(self, ctx: &SuiteContext<X>) -> Result<(), SuiteError> {
        match self {
            Suite::TraceExec => trace_exec::run(ctx).await,
            Suite::TopTcp => top_tcp::run(ctx).await,
            Suite::SnapshotProcess => snapshot_process::run(ctx).await,
        }
    }
}

/// Suites registrados, en orden de ejecución y de listado.
pub fn registry() -> IndexMap<&'static str, Suite> {
    Suite::ALL.iter().map(|s| (s.name(), *s)).collect()
}

/// Traduce nombres a suites. Sin nombres, todos; los repetidos se ignoran.
pub fn resolve(names: &[String]) -> Result<Vec<Suite>, SuiteError> {
    let registry = registry();
    if names.is_empty() {
        return Ok(registry.into_values().collect());
    }
    let mut selected: Vec<Suite> = Vec::new();
    for name in names {
        let suite = *registry.get(name.as_str())
                             .ok_or_else(|| SuiteError::UnknownSuite(name.clone()))?;
        if !selected.contains(&suite) {
            selected.push(suite);
        }
    }
    Ok(selected)
}

/// Resultado de un suite para el resumen final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteSummary {
    pub suite: &'static str,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub error: Option<String>,
    #[serde(skip)]
    pub exit_code: u8,
}

impl SuiteSummary {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Corre los suites en paralelo. El resumen respeta el orden de `suites`.
pub async fn run_suites<X: ProcessExecutor + 'static>(ctx: Arc<SuiteContext<X>>, suites: &[Suite]) -> Vec<SuiteSummary> {
    let mut set = JoinSet::new();
    for (position, suite) in suites.iter().copied().enumerate() {
        let ctx = Arc::clone(&ctx);
        set.spawn(async move {
               let started_at = Utc::now();
               let clock = Instant::now();
               info!("suite {}: starting", suite.name());
               let result = suite.run(&ctx).await;
               let summary = SuiteSummary { suite: suite.name(),
                                            started_at,
                                            duration_ms: clock.elapsed().as_millis() as u64,
                                            exit_code: result.as_ref().err().map_or(0, SuiteError::exit_code),
                                            error: result.err().map(|e| e.to_string()) };
               (position, summary)
           });
    }

    let mut summaries: Vec<(usize, SuiteSummary)> = Vec::with_capacity(suites.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(entry) => summaries.push(entry),
            Err(err) => warn!("suite task aborted: {err}"),
        }
    }
    summaries.sort_by_key(|(position, _)| *position);
    summaries.into_iter().map(|(_, s)| s).collect()
}
