//! Colaboradores externos: namespaces, pods y consultas al clúster.
//!
//! Todo se expresa como `Step` (para los batches) o como consultas puntuales
//! que se ejecutan a través de un `ProcessExecutor` y devuelven su valor.

use std::time::Duration;

use async_trait::async_trait;
use harness_core::errors::HarnessError;
use harness_core::process::{ProcessExecutor, ProcessSpec};
use harness_core::{BatchHook, Step};
use log::{debug, info, warn};
use uuid::Uuid;

/// Nombre (y label `run`) del pod de carga de trabajo que crean los suites.
pub const TEST_POD_NAME: &str = "test-pod";
/// Namespace donde corren los pods de la herramienta bajo prueba.
pub const GADGET_NAMESPACE: &str = "gadget";

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// `<prefix>-<sufijo aleatorio>`; dos llamadas no colisionan en la práctica.
pub fn generate_namespace_name(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &suffix[..12])
}

/// Pausa fija como step del batch.
pub fn sleep_for_seconds(seconds: u64) -> Step {
    Step::new(format!("SleepForSeconds({seconds})"), format!("sleep {seconds}"))
}

/// Constructor de steps y consultas de `kubectl`.
#[derive(Debug, Clone)]
pub struct Kubectl {
    binary: String,
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl Kubectl {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn create_namespace(&self, namespace: &str) -> Step {
        Step::new("CreateTestNamespace", format!("{} create ns {namespace}", self.binary))
    }

    /// Siempre es un step de cleanup y no falla si el namespace ya no existe.
    pub fn delete_namespace(&self, namespace: &str) -> Step {
        Step::new("DeleteTestNamespace",
                  format!("{} delete ns {namespace} --ignore-not-found", self.binary)).as_cleanup()
    }

    /// Aplica un manifiesto de pod de un único contenedor (con el mismo nombre
    /// que el pod). `command` y `args` son opcionales.
    pub fn pod(&self, name: &str, image: &str, namespace: &str, command: &[&str], args: &[&str]) -> Step {
        let mut container = format!("  - name: {name}\n    image: {image}\n");
        if !command.is_empty() {
            container.push_str("    command:\n");
            command.iter().for_each(|c| container.push_str(&format!("    - {}\n", yaml_scalar(c))));
        }
        if !args.is_empty() {
            container.push_str("    args:\n");
            args.iter().for_each(|a| container.push_str(&format!("    - {}\n", yaml_scalar(a))));
        }
        let manifest = format!("apiVersion: v1\n\
                                kind: Pod\n\
                                metadata:\n  \
                                  name: {name}\n  \
                                  namespace: {namespace}\n  \
                                  labels:\n    \
                                    run: {name}\n\
                                spec:\n  \
                                  restartPolicy: Never\n  \
                                  terminationGracePeriodSeconds: 0\n  \
                                  containers:\n\
                                {container}");
        Step::new(format!("PodCommand({name})"),
                  format!("{} apply -f - <<'EOF'\n{manifest}EOF\n", self.binary))
    }

    /// Pod busybox `test-pod` que ejecuta `script` con `sh -c`.
    pub fn busybox_pod(&self, namespace: &str, script: &str) -> Step {
        self.pod(TEST_POD_NAME, "busybox", namespace, &["/bin/sh", "-c"], &[script])
    }

    pub fn wait_until_pod_ready(&self, namespace: &str, pod: &str) -> Step {
        Step::new(format!("WaitUntilPodReady({pod})"),
                  format!("{} wait pod --for condition=ready -n {namespace} {pod} --timeout=60s",
                          self.binary))
    }

    pub fn wait_until_test_pod_ready(&self, namespace: &str) -> Step {
        self.wait_until_pod_ready(namespace, TEST_POD_NAME)
    }

    /// Nodo en el que quedó programado `pod`.
    pub async fn pod_node<X>(&self, executor: &X, namespace: &str, pod: &str) -> Result<String, HarnessError>
        where X: ProcessExecutor + ?Sized
    {
        let spec = ProcessSpec::new([self.binary.as_str(),
                                     "get",
                                     "pod",
                                     pod,
                                     "-n",
                                     namespace,
                                     "-o",
                                     "jsonpath={.spec.nodeName}"]);
        let node = self.query(executor, &spec).await?;
        if node.is_empty() {
            return Err(HarnessError::Setup(format!("pod {namespace}/{pod} is not scheduled on any node")));
        }
        Ok(node)
    }

    /// `true` si el runtime de contenedores del clúster es docker.
    pub async fn is_docker_runtime<X>(&self, executor: &X) -> Result<bool, HarnessError>
        where X: ProcessExecutor + ?Sized
    {
        let spec = ProcessSpec::new([self.binary.as_str(),
                                     "get",
                                     "node",
                                     "-o",
                                     "jsonpath={.items[0].status.nodeInfo.containerRuntimeVersion}"]);
        let version = self.query(executor, &spec).await?;
        debug!("container runtime: {version}");
        Ok(version.starts_with("docker"))
    }

    async fn query<X>(&self, executor: &X, spec: &ProcessSpec) -> Result<String, HarnessError>
        where X: ProcessExecutor + ?Sized
    {
        let output = executor.run(spec, QUERY_TIMEOUT)
                             .await
                             .map_err(|e| HarnessError::Setup(format!("`{}`: {e}", spec.command_line())))?;
        if !output.success() {
            return Err(HarnessError::Setup(format!("`{}` failed: {}",
                                                   spec.command_line(),
                                                   output.stderr.trim())));
        }
        Ok(output.stdout.trim().to_string())
    }
}

/// Los escalares se emiten como strings JSON, que YAML acepta tal cual.
fn yaml_scalar(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Hook de diagnóstico: si el batch falló, vuelca los logs de la herramienta
/// y los eventos de los namespaces indicados antes del cleanup.
#[derive(Debug)]
pub struct PrintLogs<X> {
    kubectl: Kubectl,
    executor: X,
    namespaces: Vec<String>,
}

impl<X: ProcessExecutor> PrintLogs<X> {
    pub fn new(kubectl: Kubectl, executor: X, namespaces: Vec<String>) -> Self {
        Self { kubectl,
               executor,
               namespaces }
    }

    /// Comandos de diagnóstico en el orden en que se ejecutan.
    pub fn commands(&self) -> Vec<ProcessSpec> {
        let k = self.kubectl.binary();
        let mut specs = vec![ProcessSpec::new([k, "logs", "-n", GADGET_NAMESPACE, "-l", "k8s-app=gadget",
                                               "--all-containers", "--prefix", "--tail=-1"])];
        for ns in &self.namespaces {
            specs.push(ProcessSpec::new([k, "get", "events", "-n", ns.as_str(), "-o", "wide"]));
            specs.push(ProcessSpec::new([k, "get", "pods", "-n", ns.as_str(), "-o", "wide"]));
        }
        specs
    }
}

#[async_trait]
impl<X: ProcessExecutor> BatchHook for PrintLogs<X> {
    async fn before_cleanup(&self, batch_id: Uuid, failed: bool) {
        if !failed {
            debug!("batch {batch_id}: passed, not collecting logs");
            return;
        }
        for spec in self.commands() {
            match self.executor.run(&spec, QUERY_TIMEOUT).await {
                Ok(output) => info!("batch {batch_id}: $ {}\n{}{}",
                                    spec.command_line(),
                                    output.stdout,
                                    output.stderr),
                // el namespace puede estar ya a medio borrar
                Err(err) => warn!("batch {batch_id}: `{}`: {err}", spec.command_line()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harness_core::process::InvocationKind;
    use harness_core::{CapturedOutput, ScriptedExecutor};
    use std::sync::Arc;

    #[test]
    fn namespace_names_are_prefixed_and_distinct() {
        let a = generate_namespace_name("test-trace-exec");
        let b = generate_namespace_name("test-trace-exec");
        assert!(a.starts_with("test-trace-exec-"));
        assert_eq!(a.len(), "test-trace-exec-".len() + 12);
        assert_ne!(a, b);
    }

    #[test]
    fn delete_namespace_is_cleanup() {
        let step = Kubectl::default().delete_namespace("ns1");
        assert!(step.is_cleanup());
        assert_eq!(step.command(), "kubectl delete ns ns1 --ignore-not-found");
        assert!(!Kubectl::default().create_namespace("ns1").is_cleanup());
    }

    #[test]
    fn busybox_manifest_quotes_the_script() {
        let step = Kubectl::default().busybox_pod("ns1", "while true; do echo a: b; done");
        let cmd = step.command();
        assert!(cmd.starts_with("kubectl apply -f - <<'EOF'\napiVersion: v1\nkind: Pod\n"));
        assert!(cmd.contains("  name: test-pod\n  namespace: ns1\n"));
        assert!(cmd.contains("    image: busybox\n    command:\n    - \"/bin/sh\"\n    - \"-c\"\n"));
        assert!(cmd.contains("    args:\n    - \"while true; do echo a: b; done\"\n"));
        assert!(cmd.ends_with("EOF\n"));
    }

    #[tokio::test]
    async fn pod_node_trims_query_output() {
        let exec = ScriptedExecutor::new().on("nodeName", "minikube-m02\n");
        let node = Kubectl::default().pod_node(&exec, "ns1", "test-pod").await.unwrap();
        assert_eq!(node, "minikube-m02");
    }

    #[tokio::test]
    async fn unscheduled_pod_is_a_setup_error() {
        let exec = ScriptedExecutor::new().on("nodeName", "");
        let err = Kubectl::default().pod_node(&exec, "ns1", "test-pod").await.unwrap_err();
        assert!(matches!(err, HarnessError::Setup(_)));
    }

    #[tokio::test]
    async fn docker_runtime_is_detected() {
        let exec = ScriptedExecutor::new().on("containerRuntimeVersion", "docker://20.10.7");
        assert!(Kubectl::default().is_docker_runtime(&exec).await.unwrap());
        let exec = ScriptedExecutor::new().on("containerRuntimeVersion", "containerd://1.6.4");
        assert!(!Kubectl::default().is_docker_runtime(&exec).await.unwrap());
        let exec = ScriptedExecutor::new().script("containerRuntimeVersion",
                                                  harness_core::process::Script::Output(CapturedOutput::exited("", 1)));
        assert!(Kubectl::default().is_docker_runtime(&exec).await.is_err());
    }

    #[tokio::test]
    async fn print_logs_only_runs_on_failure() {
        let exec = Arc::new(ScriptedExecutor::new());
        let hook = PrintLogs::new(Kubectl::default(), Arc::clone(&exec), vec!["ns1".into()]);
        hook.before_cleanup(Uuid::new_v4(), false).await;
        assert!(exec.journal().is_empty());

        hook.before_cleanup(Uuid::new_v4(), true).await;
        let commands = exec.commands();
        assert_eq!(commands.len(), 3);
        assert!(commands.iter().all(|(kind, _)| *kind == InvocationKind::Run));
        assert_eq!(commands[1].1, "kubectl get events -n ns1 -o wide");
    }
}
