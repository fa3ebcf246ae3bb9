//! snapshot process: foto de procesos de un pod busybox con `nc` escuchando,
//! restringida al nodo donde corre el pod.

use harness_adapters::gadget::{build_base_event_k8s, snapshot_process, with_container_image_name};
use harness_adapters::generate_namespace_name;
use harness_adapters::kube::TEST_POD_NAME;
use harness_core::{ExpectArrayEntries, ProcessExecutor, Step};

use super::SuiteContext;
use crate::errors::SuiteError;

pub const SUITE: &str = "snapshot-process";

pub const BUSYBOX_IMAGE: &str = "docker.io/library/busybox:latest";
pub const WORKLOAD: &str = "nc -l -p 9090";

pub fn expected_event(namespace: &str, node: &str, is_docker: bool) -> snapshot_process::Event {
    let mut event = snapshot_process::Event { event: build_base_event_k8s(namespace,
                                                                          [with_container_image_name(BUSYBOX_IMAGE,
                                                                                                     is_docker)]),
                                              comm: "nc".into(),
                                              ..Default::default() };
    event.event.common.k8s.node = node.to_string();
    event
}

pub fn snapshot_step(namespace: &str, node: &str, is_docker: bool) -> Step {
    let validator = ExpectArrayEntries::new(snapshot_process::normalize, vec![expected_event(namespace, node, is_docker)]);
    Step::new("RunProcessCollectorGadget",
              format!("$KUBECTL_GADGET snapshot process -n {namespace} -o json --node {node}")).validate_with(validator)
}

pub async fn run<X: ProcessExecutor + 'static>(ctx: &SuiteContext<X>) -> Result<(), SuiteError> {
    run_in(ctx, &generate_namespace_name("test-snapshot-process")).await
}

/// Corre el suite sobre `namespace`, que no debe existir todavía.
pub async fn run_in<X: ProcessExecutor + 'static>(ctx: &SuiteContext<X>, namespace: &str) -> Result<(), SuiteError> {
    let is_docker = ctx.is_docker_runtime(SUITE).await?;
    let kubectl = ctx.kubectl();

    let setup = vec![kubectl.create_namespace(namespace),
                     kubectl.busybox_pod(namespace, WORKLOAD),
                     kubectl.wait_until_test_pod_ready(namespace),];
    let result = async {
        ctx.run_batch(SUITE, namespace, setup).await?;
        let node = kubectl.pod_node(ctx.executor.as_ref(), namespace, TEST_POD_NAME)
                          .await
                          .map_err(SuiteError::harness(SUITE))?;
        ctx.run_batch(SUITE, namespace, vec![snapshot_step(namespace, &node, is_docker)]).await
    }.await;

    let teardown = ctx.run_batch(SUITE, namespace, vec![kubectl.delete_namespace(namespace)]).await;
    result.and(teardown)
}
