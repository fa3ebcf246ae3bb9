use uuid::Uuid;

use crate::errors::HarnessError;
use crate::process::CapturedOutput;
use crate::step::{Step, StepStatus};

/// Resultado de un step dentro de un batch.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub index: usize,
    pub name: String,
    pub status: StepStatus,
    pub output: Option<CapturedOutput>,
    pub error: Option<HarnessError>,
}

/// Reporte de un batch completo, en el orden de declaración de los steps.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub outcomes: Vec<StepOutcome>,
    /// Índices de los steps fallidos, en el orden en que fallaron.
    failure_order: Vec<usize>,
}

impl BatchReport {
    pub(crate) fn new(batch_id: Uuid, steps: &[Step]) -> Self {
        let outcomes = steps.iter()
                            .enumerate()
                            .map(|(index, s)| StepOutcome { index,
                                                            name: s.name().to_string(),
                                                            status: StepStatus::Pending,
                                                            output: None,
                                                            error: None })
                            .collect();
        Self { batch_id,
               outcomes,
               failure_order: Vec::new() }
    }

    pub(crate) fn set_status(&mut self, index: usize, status: StepStatus) {
        if let Some(o) = self.outcomes.get_mut(index) {
            o.status = status;
        }
    }

    pub(crate) fn set_output(&mut self, index: usize, output: CapturedOutput) {
        if let Some(o) = self.outcomes.get_mut(index) {
            o.output = Some(output);
        }
    }

    pub(crate) fn fail(&mut self, index: usize, error: HarnessError) {
        if let Some(o) = self.outcomes.get_mut(index) {
            o.status = StepStatus::Failed;
            o.error = Some(error);
            if !self.failure_order.contains(&index) {
                self.failure_order.push(index);
            }
        }
    }

    pub fn failed(&self) -> bool {
        self.outcomes.iter().any(|o| o.status == StepStatus::Failed)
    }

    /// Errores en orden cronológico.
    pub fn failures(&self) -> impl Iterator<Item = &HarnessError> {
        self.failure_order
            .iter()
            .filter_map(|i| self.outcomes.get(*i).and_then(|o| o.error.as_ref()))
    }

    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Primer fallo del batch en el tiempo, si lo hay. Un cleanup declarado
    /// antes que un step principal no tapa la causa original.
    pub fn into_result(mut self) -> Result<(), HarnessError> {
        let first = self.failure_order.first().copied();
        match first.and_then(|i| self.outcomes.get_mut(i)).and_then(|o| o.error.take()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
