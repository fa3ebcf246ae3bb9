//! trace exec: la herramienta debe ver los `execve` de un pod busybox que
//! alterna `/date` y `/bin/sleep` con otro uid/gid.

use harness_adapters::gadget::{build_base_event_k8s, trace_exec, with_container_image_name};
use harness_adapters::{generate_namespace_name, sleep_for_seconds, Kubectl};
use harness_core::{ExpectEntries, ProcessExecutor, Step};

use super::SuiteContext;
use crate::errors::SuiteError;

pub const SUITE: &str = "trace-exec";

pub const BUSYBOX_IMAGE: &str = "docker.io/library/busybox:latest";
pub const WORKLOAD: &str = "cp /bin/date /date ; setuidgid 1000:1111 sh -c 'while true; do /date ; /bin/sleep 0.1; done'";

/// Registros que deben aparecer al menos una vez en el stream.
pub fn expected_events(namespace: &str, is_docker: bool) -> Vec<trace_exec::Event> {
    let base = build_base_event_k8s(namespace, [with_container_image_name(BUSYBOX_IMAGE, is_docker)]);
    vec![trace_exec::Event { event: base.clone(),
                             comm: "sh".into(),
                             args: vec!["/bin/sh".into(), "-c".into(), WORKLOAD.into()],
                             cwd: "/".into(),
                             ..Default::default() },
         trace_exec::Event { event: base.clone(),
                             comm: "date".into(),
                             args: vec!["/date".into()],
                             uid: 1000,
                             gid: 1111,
                             cwd: "/".into(),
                             upper_layer: true,
                             ..Default::default() },
         trace_exec::Event { event: base,
                             comm: "sleep".into(),
                             args: vec!["/bin/sleep".into(), "0.1".into()],
                             uid: 1000,
                             gid: 1111,
                             cwd: "/".into(),
                             ..Default::default() },]
}

pub fn steps(kubectl: &Kubectl, namespace: &str, is_docker: bool) -> Vec<Step> {
    let validator = ExpectEntries::new(trace_exec::normalize, expected_events(namespace, is_docker));
    vec![kubectl.create_namespace(namespace),
         Step::start_and_stop("StartTraceExecGadget",
                              format!("$KUBECTL_GADGET trace exec -n {namespace} -o json --cwd")).validate_with(validator),
         // margen para que el tracer quede instalado
         sleep_for_seconds(3),
         kubectl.busybox_pod(namespace, WORKLOAD),
         kubectl.wait_until_test_pod_ready(namespace),
         kubectl.delete_namespace(namespace),]
}

pub async fn run<X: ProcessExecutor + 'static>(ctx: &SuiteContext<X>) -> Result<(), SuiteError> {
    run_in(ctx, &generate_namespace_name("test-trace-exec")).await
}

/// Corre el suite sobre `namespace`, que no debe existir todavía.
pub async fn run_in<X: ProcessExecutor + 'static>(ctx: &SuiteContext<X>, namespace: &str) -> Result<(), SuiteError> {
    let is_docker = ctx.is_docker_runtime(SUITE).await?;
    ctx.run_batch(SUITE, namespace, steps(&ctx.kubectl(), namespace, is_docker)).await
}
