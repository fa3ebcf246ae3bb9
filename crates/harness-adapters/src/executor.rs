//! Executor de procesos reales sobre tokio::process.
//!
//! Cada proceso se lanza en su propio grupo de procesos, de modo que la
//! terminación alcanza también a los hijos de `sh -c`. stdout y stderr se
//! leen en tareas dedicadas y se acumulan en buffers compartidos: lo leído
//! hasta el momento de un timeout o de un kill nunca se pierde.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use harness_core::errors::ExecError;
use harness_core::process::{CapturedOutput, ProcessExecutor, ProcessSpec, RunningProcess};
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Tiempo máximo para vaciar los pipes una vez que el proceso terminó.
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct TokioExecutor {
    drain_timeout: Duration,
}

impl Default for TokioExecutor {
    fn default() -> Self {
        Self { drain_timeout: DEFAULT_DRAIN_TIMEOUT }
    }
}

impl TokioExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    fn spawn(&self, spec: &ProcessSpec) -> Result<(Child, Capture), ExecError> {
        let (program, args) = spec.argv.split_first().ok_or(ExecError::EmptyCommand)?;
        let mut cmd = Command::new(program);
        cmd.args(args)
           .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
           .stdin(Stdio::null())
           .stdout(Stdio::piped())
           .stderr(Stdio::piped())
           .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| ExecError::Spawn { program: program.clone(),
                                                                   message: e.to_string() })?;
        debug!("spawned `{}` (pid {:?})", spec.command_line(), child.id());
        let capture = Capture::attach(&mut child);
        Ok((child, capture))
    }
}

#[async_trait]
impl ProcessExecutor for TokioExecutor {
    async fn run(&self, spec: &ProcessSpec, timeout: Duration) -> Result<CapturedOutput, ExecError> {
        let started = Instant::now();
        let (mut child, capture) = self.spawn(spec)?;
        let pid = child.id();

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => Ok(capture.collect(status.code(), self.drain_timeout).await),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                warn!("`{}` exceeded {timeout:?}, killing", spec.command_line());
                force_kill(&mut child, pid).await;
                let partial = capture.collect(None, self.drain_timeout).await;
                Err(ExecError::Timeout { elapsed_ms: started.elapsed().as_millis() as u64,
                                         partial })
            }
        }
    }

    async fn start(&self, spec: &ProcessSpec) -> Result<Box<dyn RunningProcess>, ExecError> {
        let (child, capture) = self.spawn(spec)?;
        let pid = child.id();
        Ok(Box::new(TokioProcess { child,
                                   capture,
                                   pid,
                                   drain_timeout: self.drain_timeout }))
    }
}

struct TokioProcess {
    child: Child,
    capture: Capture,
    pid: Option<u32>,
    drain_timeout: Duration,
}

#[async_trait]
impl RunningProcess for TokioProcess {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    async fn stop(self: Box<Self>, grace: Duration) -> Result<CapturedOutput, ExecError> {
        let TokioProcess { mut child,
                           capture,
                           pid,
                           drain_timeout, } = *self;

        // Ya terminó por su cuenta: no hay nada que señalizar.
        if let Some(status) = child.try_wait()? {
            return Ok(capture.collect(status.code(), drain_timeout).await.before_stop());
        }

        if let Some(pid) = pid {
            if let Err(err) = signal_group(pid, "INT").await {
                warn!("{err}");
            }
        }
        let exit_code = match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => status.code(),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                debug!("pid {pid:?} ignored SIGINT for {grace:?}, killing");
                force_kill(&mut child, pid).await;
                None
            }
        };
        Ok(capture.collect(exit_code, drain_timeout).await)
    }
}

async fn force_kill(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid {
        if let Err(err) = signal_group(pid, "KILL").await {
            debug!("{err}");
        }
    }
    if let Err(err) = child.kill().await {
        debug!("kill pid {pid:?}: {err}");
    }
}

/// Envía `signal` a todo el grupo de procesos liderado por `pid`.
async fn signal_group(pid: u32, signal: &str) -> Result<(), ExecError> {
    // builtin de la shell: no depende de que haya un binario `kill`
    let script = format!("kill -s {signal} -- -{pid}");
    let status = Command::new("sh").args(["-c", &script])
                                   .stdin(Stdio::null())
                                   .stdout(Stdio::null())
                                   .stderr(Stdio::null())
                                   .status()
                                   .await
                                   .map_err(|e| ExecError::Signal { pid,
                                                                    message: e.to_string() })?;
    if status.success() {
        Ok(())
    } else {
        Err(ExecError::Signal { pid,
                                message: format!("kill -s {signal} exited with {status}") })
    }
}

/// Buffer compartido entre la tarea lectora y quien recoge la salida.
#[derive(Debug, Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn append(&self, chunk: &[u8]) {
        if let Ok(mut buf) = self.0.lock() {
            buf.extend_from_slice(chunk);
        }
    }

    fn snapshot(&self) -> String {
        self.0
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

async fn pump<R: AsyncRead + Unpin>(mut reader: R, buffer: SharedBuffer) {
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer.append(&chunk[..n]),
            Err(err) => {
                debug!("pipe read error: {err}");
                break;
            }
        }
    }
}

struct Capture {
    stdout: SharedBuffer,
    stderr: SharedBuffer,
    readers: Vec<JoinHandle<()>>,
}

impl Capture {
    fn attach(child: &mut Child) -> Self {
        let stdout = SharedBuffer::default();
        let stderr = SharedBuffer::default();
        let mut readers = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            readers.push(tokio::spawn(pump(out, stdout.clone())));
        }
        if let Some(err) = child.stderr.take() {
            readers.push(tokio::spawn(pump(err, stderr.clone())));
        }
        Self { stdout, stderr, readers }
    }

    /// Espera a que los lectores lleguen a EOF (como mucho `drain_timeout`)
    /// y devuelve lo acumulado.
    async fn collect(self, exit_code: Option<i32>, drain_timeout: Duration) -> CapturedOutput {
        let Capture { stdout, stderr, readers } = self;
        let aborts: Vec<_> = readers.iter().map(JoinHandle::abort_handle).collect();
        let drained = tokio::time::timeout(drain_timeout, async {
                          for reader in readers {
                              let _ = reader.await;
                          }
                      }).await;
        if drained.is_err() {
            // algún descendiente mantiene el pipe abierto
            aborts.iter().for_each(|a| a.abort());
        }
        CapturedOutput { stdout: stdout.snapshot(),
                         stderr: stderr.snapshot(),
                         exit_code,
                         exited_before_stop: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_captures_stdout_stderr_and_code() {
        let exec = TokioExecutor::new();
        let out = exec.run(&ProcessSpec::shell("echo out; echo err >&2; exit 3"), Duration::from_secs(10))
                      .await
                      .unwrap();
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
        assert_eq!(out.exit_code, Some(3));
    }

    #[tokio::test]
    async fn env_is_injected() {
        let exec = TokioExecutor::new();
        let spec = ProcessSpec::shell("echo $KUBECTL_GADGET").with_env("KUBECTL_GADGET", "/opt/kg");
        let out = exec.run(&spec, Duration::from_secs(10)).await.unwrap();
        assert_eq!(out.stdout.trim(), "/opt/kg");
    }

    #[tokio::test]
    async fn timeout_keeps_partial_output() {
        let exec = TokioExecutor::new();
        let err = exec.run(&ProcessSpec::shell("echo early; sleep 30"), Duration::from_millis(500))
                      .await
                      .unwrap_err();
        match err {
            ExecError::Timeout { partial, elapsed_ms } => {
                assert_eq!(partial.stdout, "early\n");
                assert!(elapsed_ms >= 500);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let exec = TokioExecutor::new();
        let err = exec.run(&ProcessSpec::new(["/nonexistent/binary"]), Duration::from_secs(1))
                      .await
                      .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
        let err = exec.run(&ProcessSpec::new(Vec::<String>::new()), Duration::from_secs(1))
                      .await
                      .unwrap_err();
        assert_eq!(err, ExecError::EmptyCommand);
    }

    #[tokio::test]
    async fn stop_interrupts_and_returns_everything_written() {
        let exec = TokioExecutor::new();
        let handle = exec.start(&ProcessSpec::shell("i=0; while true; do echo \"{\\\"n\\\":$i}\"; i=$((i+1)); sleep 0.05; done"))
                         .await
                         .unwrap();
        assert!(handle.id().is_some());
        tokio::time::sleep(Duration::from_millis(300)).await;
        let out = handle.stop(Duration::from_secs(2)).await.unwrap();
        assert!(out.stdout.starts_with("{\"n\":0}\n"), "{}", out.stdout);
        assert!(!out.success());
        assert!(!out.exited_before_stop);
    }

    #[tokio::test]
    async fn stop_forces_kill_when_interrupt_is_ignored() {
        let exec = TokioExecutor::new();
        let handle = exec.start(&ProcessSpec::shell("trap '' INT; echo ready; while true; do sleep 0.05; done"))
                         .await
                         .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let out = handle.stop(Duration::from_millis(200)).await.unwrap();
        assert_eq!(out.stdout, "ready\n");
        assert_eq!(out.exit_code, None);
    }

    #[tokio::test]
    async fn stop_after_natural_exit_reports_code() {
        let exec = TokioExecutor::new();
        let handle = exec.start(&ProcessSpec::shell("echo done")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        let out = handle.stop(Duration::from_secs(1)).await.unwrap();
        assert_eq!(out.stdout, "done\n");
        assert_eq!(out.exit_code, Some(0));
        assert!(out.exited_before_stop);
    }

    #[tokio::test]
    async fn stop_after_crash_keeps_code_and_stderr() {
        let exec = TokioExecutor::new();
        let handle = exec.start(&ProcessSpec::shell("echo 'Error: gadget not deployed' >&2; exit 1"))
                         .await
                         .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        let out = handle.stop(Duration::from_secs(1)).await.unwrap();
        assert!(out.exited_before_stop);
        assert_eq!(out.exit_code, Some(1));
        assert_eq!(out.stderr, "Error: gadget not deployed\n");
    }
}
