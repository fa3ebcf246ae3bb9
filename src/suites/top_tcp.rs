//! top tcp: un pod nginx que se hace `curl` a sí mismo en bucle. El mismo
//! registro esperado se verifica en tres modos de ejecución del comando.

use harness_adapters::gadget::top_tcp::{self, L4Endpoint, Stats, AF_INET};
use harness_adapters::gadget::{build_common_data_k8s, with_container_image_name};
use harness_adapters::{generate_namespace_name, sleep_for_seconds};
use harness_adapters::kube::TEST_POD_NAME;
use harness_core::{ExpectMultipleArrayEntries, ProcessExecutor, Step};

use super::SuiteContext;
use crate::errors::SuiteError;

pub const SUITE: &str = "top-tcp";

pub const NGINX_IMAGE: &str = "docker.io/library/nginx:latest";
pub const WORKLOAD: &str = "nginx && while true; do curl 127.0.0.1; sleep 0.1; done";

/// Modos de invocación del comando `top tcp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// En segundo plano hasta el final del batch.
    StartAndStop,
    /// `--timeout`: termina solo y emite un array por intervalo.
    Timeout,
    /// `--timeout` y `--interval` iguales: un único intervalo.
    IntervalEqualsTimeout,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::StartAndStop, Variant::Timeout, Variant::IntervalEqualsTimeout];

    pub fn command(self, namespace: &str, timeout_secs: u64) -> String {
        let base = format!("$KUBECTL_GADGET top tcp -n {namespace} -o json");
        match self {
            Variant::StartAndStop => base,
            Variant::Timeout => format!("{base} -m 100 --timeout {timeout_secs}"),
            Variant::IntervalEqualsTimeout => {
                format!("{base} -m 100 --timeout {timeout_secs} --interval {timeout_secs}")
            }
        }
    }

    /// Batch de la variante. En StartAndStop el comando queda corriendo
    /// durante una ventana igual al timeout de las otras variantes.
    pub fn steps(self, namespace: &str, timeout_secs: u64, is_docker: bool) -> Vec<Step> {
        let validator = ExpectMultipleArrayEntries::new(top_tcp::normalize, vec![expected_stats(namespace, is_docker)]);
        let command = self.command(namespace, timeout_secs);
        match self {
            Variant::StartAndStop => vec![Step::start_and_stop("TopTCP", command).validate_with(validator),
                                          sleep_for_seconds(timeout_secs),],
            Variant::Timeout | Variant::IntervalEqualsTimeout => {
                vec![Step::new("TopTCP", command).validate_with(validator)]
            }
        }
    }
}

pub fn expected_stats(namespace: &str, is_docker: bool) -> Stats {
    Stats { common: build_common_data_k8s(namespace, [with_container_image_name(NGINX_IMAGE, is_docker)]),
            comm: "curl".into(),
            ip_version: AF_INET,
            src: L4Endpoint::raw_v4("127.0.0.1", 0),
            dst: L4Endpoint::raw_v4("127.0.0.1", 80),
            ..Default::default() }
}

pub async fn run<X: ProcessExecutor + 'static>(ctx: &SuiteContext<X>) -> Result<(), SuiteError> {
    run_in(ctx, &generate_namespace_name("test-top-tcp")).await
}

/// Corre el suite sobre `namespace`, que no debe existir todavía.
pub async fn run_in<X: ProcessExecutor + 'static>(ctx: &SuiteContext<X>, namespace: &str) -> Result<(), SuiteError> {
    let is_docker = ctx.is_docker_runtime(SUITE).await?;
    let kubectl = ctx.kubectl();
    let timeout_secs = ctx.config.top_timeout.as_secs();

    let setup = vec![kubectl.create_namespace(namespace),
                     kubectl.pod(TEST_POD_NAME, "nginx", namespace, &["sh", "-c"], &[WORKLOAD]),
                     kubectl.wait_until_test_pod_ready(namespace),];
    let result = match ctx.run_batch(SUITE, namespace, setup).await {
        Ok(()) => {
            let [a, b, c] = Variant::ALL.map(|v| v.steps(namespace, timeout_secs, is_docker));
            let (a, b, c) = tokio::join!(ctx.run_batch(SUITE, namespace, a),
                                         ctx.run_batch(SUITE, namespace, b),
                                         ctx.run_batch(SUITE, namespace, c));
            a.and(b).and(c)
        }
        Err(err) => Err(err),
    };

    let teardown = ctx.run_batch(SUITE, namespace, vec![kubectl.delete_namespace(namespace)]).await;
    result.and(teardown)
}
