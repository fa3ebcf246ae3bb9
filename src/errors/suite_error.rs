use harness_core::{HarnessError, ValidationError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errores del binario y de los suites.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("Error de configuración: {0}")]
    Config(#[from] ConfigError),
    #[error("Suite desconocida: {0}")]
    UnknownSuite(String),
    #[error("Fallo en la suite {suite}: {source}")]
    Harness {
        suite: &'static str,
        #[source]
        source: HarnessError,
    },
    #[error("Verificación fallida: {0}")]
    Check(#[from] ValidationError),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Registros esperados inválidos: {0}")]
    Expected(#[from] serde_json::Error),
}

impl SuiteError {
    pub fn harness(suite: &'static str) -> impl FnOnce(HarnessError) -> SuiteError {
        move |source| SuiteError::Harness { suite, source }
    }

    /// Código de salida del proceso: 1 para fallos de verificación o de
    /// ejecución de los suites, 2 para errores de uso o de entorno.
    pub fn exit_code(&self) -> u8 {
        match self {
            SuiteError::Harness { source: HarnessError::Setup(_), .. } => 2,
            SuiteError::Harness { .. } | SuiteError::Check(_) => 1,
            SuiteError::Config(_) | SuiteError::UnknownSuite(_) | SuiteError::Io(_) | SuiteError::Expected(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_suite_format() {
        let err = SuiteError::UnknownSuite("trace-open".into());
        assert_eq!(err.to_string(), "Suite desconocida: trace-open");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_io_variant_from() {
        let io_err = std::io::Error::other("falló IO");
        let err: SuiteError = io_err.into();
        assert_eq!(err.to_string(), "Error en IO: falló IO");
    }

    #[test]
    fn test_harness_variant_exit_codes() {
        let err = SuiteError::harness("top-tcp")(HarnessError::UnknownStep("x".into()));
        assert!(err.to_string().starts_with("Fallo en la suite top-tcp: "));
        assert_eq!(err.exit_code(), 1);
        let err = SuiteError::harness("top-tcp")(HarnessError::Setup("no cluster".into()));
        assert_eq!(err.exit_code(), 2);
    }
}
