use std::time::Duration;

use harness_adapters::TokioExecutor;
use harness_core::{ExpectEntries, ExpectOutput, FieldMask, HarnessError, RunnerConfig, Step, StepRunner, StepStatus};
use serde_json::json;

fn runner() -> StepRunner<TokioExecutor, harness_core::InMemoryEventStore> {
    let config = RunnerConfig { env: vec![("KUBECTL_GADGET".into(), "echo".into())],
                                step_timeout: Duration::from_secs(10),
                                stop_grace: Duration::from_secs(2) };
    StepRunner::in_memory(TokioExecutor::new()).with_config(config)
}

#[tokio::test]
async fn background_tracer_is_validated_after_stop() {
    let tracer = "i=0; while true; do echo \"{\\\"comm\\\":\\\"tick\\\",\\\"pid\\\":$$,\\\"n\\\":$i}\"; i=$((i+1)); sleep 0.05; done";
    let validator = ExpectEntries::new(FieldMask::new(["/pid"]), vec![json!({"comm": "tick", "pid": 0, "n": 2})]);
    let steps = vec![Step::start_and_stop("tracer", tracer).validate_with(validator),
                     Step::new("wait", "sleep 0.5"),
                     Step::new("gadget", "$KUBECTL_GADGET hello").validate_with(ExpectOutput::new("hello")),];
    let report = runner().run_batch(steps).await;
    assert!(!report.failed(), "{:?}", report.outcomes);
    assert_eq!(report.outcome("tracer").unwrap().status, StepStatus::Passed);
}

#[tokio::test]
async fn failing_command_still_runs_cleanup() {
    let dir = std::env::temp_dir().join(format!("harness-cleanup-{}", uuid::Uuid::new_v4()));
    let marker = dir.display().to_string();
    let steps = vec![Step::new("fail", "echo boom >&2; exit 4"),
                     Step::new("skipped", format!("touch {marker}.skipped")),
                     Step::new("cleanup", format!("touch {marker}")).as_cleanup(),];
    let report = runner().run_batch(steps).await;

    assert!(dir.exists());
    assert!(!std::path::Path::new(&format!("{marker}.skipped")).exists());
    let _ = std::fs::remove_file(&dir);

    match report.into_result().unwrap_err() {
        HarnessError::Execution { step, output, .. } => {
            assert_eq!(step, "fail");
            assert_eq!(output.unwrap().stderr, "boom\n");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn tracer_that_crashes_before_stop_is_an_execution_failure() {
    let steps = vec![Step::start_and_stop("tracer", "echo 'Error: gadget not deployed' >&2; exit 1"),
                     Step::new("wait", "sleep 0.3"),];
    let report = runner().run_batch(steps).await;

    match report.into_result().unwrap_err() {
        HarnessError::Execution { step, source, output } => {
            assert_eq!(step, "tracer");
            assert_eq!(source, harness_core::ExecError::ExitStatus(1));
            assert_eq!(output.unwrap().stderr, "Error: gadget not deployed\n");
        }
        other => panic!("unexpected {other:?}"),
    }
}
