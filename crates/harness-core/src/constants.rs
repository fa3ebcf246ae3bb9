//! Constantes del runner.
//!
//! Valores por defecto de `RunnerConfig`. Quien arma la configuración (el
//! crate raíz, a partir del entorno) puede sobrescribirlos.

/// Tiempo máximo de un step RunToCompletion.
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 120;

/// Espera entre la señal de terminación ordenada y el kill forzado.
pub const DEFAULT_STOP_GRACE_SECS: u64 = 5;

/// Variable de entorno que apunta al ejecutable bajo prueba.
pub const GADGET_ENV_VAR: &str = "KUBECTL_GADGET";
