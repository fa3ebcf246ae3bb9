use serde::{Deserialize, Serialize};

/// Estado de un Step dentro de un batch.
///
/// Las transiciones válidas son:
/// - `Pending` -> `Running` -> `Passed` | `Failed`
/// - `Pending` -> `Skipped` (el batch ya había fallado)
/// - `Running` -> `Skipped` (proceso detenido sin validar tras un fallo)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    /// Proceso StartAndStop corriendo en segundo plano.
    Running,
    Passed,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, StepStatus::Pending | StepStatus::Running)
    }
}
