//! Configuración del harness.
//! Carga variables de entorno (.env) una sola vez y construye un
//! `HarnessConfig` explícito que se pasa a runners y suites; nada más lee el
//! entorno ambiente.
use once_cell::sync::Lazy;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use harness_adapters::Kubectl;
use harness_core::constants::{DEFAULT_STEP_TIMEOUT_SECS, DEFAULT_STOP_GRACE_SECS, GADGET_ENV_VAR};
use harness_core::RunnerConfig;
use thiserror::Error;

/// Ventana por defecto de los comandos `top` con `--timeout`.
pub const DEFAULT_TOP_TIMEOUT_SECS: u64 = 10;

/// Ruta del `.env` cargado, si había uno. Se evalúa una sola vez.
static DOTENV: Lazy<Option<PathBuf>> = Lazy::new(|| dotenvy::dotenv().ok());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} no está definida")]
    Missing(&'static str),
    #[error("{var}={value} no resuelve a un ejecutable")]
    NotExecutable { var: &'static str, value: String },
    #[error("{var}={value} no es un número de segundos válido")]
    InvalidSeconds { var: &'static str, value: String },
}

/// Configuración de una ejecución del harness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Binario de la herramienta bajo prueba (`KUBECTL_GADGET`).
    pub kubectl_gadget: PathBuf,
    /// Binario de kubectl (`KUBECTL`).
    pub kubectl: String,
    pub step_timeout: Duration,
    pub stop_grace: Duration,
    /// Valor de `--timeout`/`--interval` de los comandos `top`.
    pub top_timeout: Duration,
}

impl HarnessConfig {
    /// Configuración con valores por defecto, sin validar la ruta.
    pub fn new(kubectl_gadget: impl Into<PathBuf>) -> Self {
        Self { kubectl_gadget: kubectl_gadget.into(),
               kubectl: "kubectl".to_string(),
               step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
               stop_grace: Duration::from_secs(DEFAULT_STOP_GRACE_SECS),
               top_timeout: Duration::from_secs(DEFAULT_TOP_TIMEOUT_SECS) }
    }

    /// Lee el proceso actual (tras cargar `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Some(path) = Lazy::force(&DOTENV) {
            log::debug!("loaded {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let raw = lookup(GADGET_ENV_VAR).filter(|v| !v.trim().is_empty())
                                        .ok_or(ConfigError::Missing(GADGET_ENV_VAR))?;
        let path_var = lookup("PATH").unwrap_or_default();
        let kubectl_gadget =
            resolve_executable(raw.trim(), &path_var).ok_or_else(|| ConfigError::NotExecutable { var: GADGET_ENV_VAR,
                                                                                                 value: raw.clone() })?;

        let mut config = Self::new(kubectl_gadget);
        if let Some(kubectl) = lookup("KUBECTL").filter(|v| !v.trim().is_empty()) {
            config.kubectl = kubectl;
        }
        config.step_timeout = seconds(&lookup, "HARNESS_STEP_TIMEOUT_SECS", config.step_timeout)?;
        config.stop_grace = seconds(&lookup, "HARNESS_STOP_GRACE_SECS", config.stop_grace)?;
        config.top_timeout = seconds(&lookup, "HARNESS_TOP_TIMEOUT_SECS", config.top_timeout)?;
        Ok(config)
    }

    /// Parámetros del runner: `KUBECTL_GADGET` se inyecta en cada step.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig { env: vec![(GADGET_ENV_VAR.to_string(), self.kubectl_gadget.display().to_string())],
                       step_timeout: self.step_timeout,
                       stop_grace: self.stop_grace }
    }

    pub fn kubectl(&self) -> Kubectl {
        Kubectl::new(self.kubectl.clone())
    }
}

fn seconds<F>(lookup: &F, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
    where F: Fn(&str) -> Option<String>
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim()
                            .parse::<u64>()
                            .ok()
                            .filter(|s| *s > 0)
                            .map(Duration::from_secs)
                            .ok_or(ConfigError::InvalidSeconds { var, value }),
    }
}

/// Rutas con `/` se comprueban tal cual; nombres sueltos se buscan en `PATH`.
fn resolve_executable(value: &str, path_var: &str) -> Option<PathBuf> {
    if value.contains('/') {
        let path = PathBuf::from(value);
        return is_executable(&path).then_some(path);
    }
    env::split_paths(path_var).map(|dir| dir.join(value))
                              .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
