//! Validadores: la capacidad `validate(captured) -> Result`.
//!
//! Cada semántica del matcher tiene su variante concreta, de modo que un step
//! declara explícitamente cómo se compara su salida y el validador puede
//! probarse sin lanzar procesos.

use std::fmt;

use crate::errors::ValidationError;
use crate::matcher::{expect_entries_in_array_to_match, expect_entries_in_multiple_array_to_match,
                     expect_entries_to_match};
use crate::normalize::Normalizer;
use crate::record::Record;

pub trait Validator: Send + Sync {
    fn validate(&self, captured: &str) -> Result<(), ValidationError>;

    /// Nombre corto para eventos y logs.
    fn describe(&self) -> String;
}

/// Presencia de cada esperado en un stream de objetos.
pub struct ExpectEntries<T, N> {
    normalizer: N,
    expected: Vec<T>,
}

impl<T, N> ExpectEntries<T, N> {
    pub fn new(normalizer: N, expected: Vec<T>) -> Self {
        Self { normalizer, expected }
    }
}

impl<T: Record, N: Normalizer<T>> Validator for ExpectEntries<T, N> {
    fn validate(&self, captured: &str) -> Result<(), ValidationError> {
        expect_entries_to_match(captured, &self.normalizer, &self.expected)
    }

    fn describe(&self) -> String {
        format!("entries({})", self.expected.len())
    }
}

/// Igualdad de multiconjunto contra un único array.
pub struct ExpectArrayEntries<T, N> {
    normalizer: N,
    expected: Vec<T>,
}

impl<T, N> ExpectArrayEntries<T, N> {
    pub fn new(normalizer: N, expected: Vec<T>) -> Self {
        Self { normalizer, expected }
    }
}

impl<T: Record, N: Normalizer<T>> Validator for ExpectArrayEntries<T, N> {
    fn validate(&self, captured: &str) -> Result<(), ValidationError> {
        expect_entries_in_array_to_match(captured, &self.normalizer, &self.expected)
    }

    fn describe(&self) -> String {
        format!("array-entries({})", self.expected.len())
    }
}

/// Presencia de cada esperado en algún intervalo de una secuencia de arrays.
pub struct ExpectMultipleArrayEntries<T, N> {
    normalizer: N,
    expected: Vec<T>,
}

impl<T, N> ExpectMultipleArrayEntries<T, N> {
    pub fn new(normalizer: N, expected: Vec<T>) -> Self {
        Self { normalizer, expected }
    }
}

impl<T: Record, N: Normalizer<T>> Validator for ExpectMultipleArrayEntries<T, N> {
    fn validate(&self, captured: &str) -> Result<(), ValidationError> {
        expect_entries_in_multiple_array_to_match(captured, &self.normalizer, &self.expected)
    }

    fn describe(&self) -> String {
        format!("multi-array-entries({})", self.expected.len())
    }
}

/// Salida textual exacta, ignorando espacios al principio y al final.
#[derive(Debug, Clone)]
pub struct ExpectOutput {
    expected: String,
}

impl ExpectOutput {
    pub fn new(expected: impl Into<String>) -> Self {
        Self { expected: expected.into() }
    }
}

impl Validator for ExpectOutput {
    fn validate(&self, captured: &str) -> Result<(), ValidationError> {
        if captured.trim() == self.expected.trim() {
            Ok(())
        } else {
            Err(ValidationError::Output { expected: self.expected.clone(),
                                          actual: captured.to_string() })
        }
    }

    fn describe(&self) -> String {
        "output".to_string()
    }
}

/// Validador ad hoc a partir de una función.
pub struct FnValidator<F> {
    name: String,
    f: F,
}

impl<F> FnValidator<F> where F: Fn(&str) -> Result<(), ValidationError> + Send + Sync
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Validator for FnValidator<F> where F: Fn(&str) -> Result<(), ValidationError> + Send + Sync
{
    fn validate(&self, captured: &str) -> Result<(), ValidationError> {
        (self.f)(captured)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl fmt::Debug for dyn Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validator({})", self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{FieldMask, NoopNormalizer};
    use serde_json::{json, Value};

    #[test]
    fn entries_validator_uses_mask() {
        let v = ExpectEntries::new(FieldMask::new(["/pid"]), vec![json!({"comm": "sh", "pid": 0})]);
        assert!(v.validate("{\"comm\":\"sh\",\"pid\":77}\n").is_ok());
        assert_eq!(v.describe(), "entries(1)");
    }

    #[test]
    fn entries_validator_rejects_array_capture_as_decode_failure() {
        let v = ExpectEntries::new(NoopNormalizer, vec![json!({"comm": "date"})]);
        let err = v.validate("[{\"comm\":\"date\"}]").unwrap_err();
        assert!(matches!(err, ValidationError::Decode(_)), "{err:?}");
    }

    #[test]
    fn array_validator_is_strict() {
        let v = ExpectArrayEntries::new(NoopNormalizer, vec![json!({"comm": "nc"})]);
        assert!(v.validate("[{\"comm\":\"nc\"}]").is_ok());
        assert!(v.validate("[{\"comm\":\"nc\"},{\"comm\":\"sh\"}]").is_err());
    }

    #[test]
    fn multi_array_validator_accepts_warmup_intervals() {
        let v = ExpectMultipleArrayEntries::new(NoopNormalizer, vec![json!({"port": 80})]);
        assert!(v.validate("[]\n[]\n[{\"port\":80}]\n").is_ok());
    }

    #[test]
    fn output_validator_trims() {
        let v = ExpectOutput::new("namespace/ns created");
        assert!(v.validate("namespace/ns created\n").is_ok());
        assert!(matches!(v.validate("other"), Err(ValidationError::Output { .. })));
    }

    #[test]
    fn fn_validator_delegates() {
        let v = FnValidator::new("non-empty", |s: &str| {
            if s.is_empty() {
                Err(ValidationError::Custom("empty output".into()))
            } else {
                Ok(())
            }
        });
        assert!(v.validate("x").is_ok());
        assert_eq!(v.validate("").unwrap_err().to_string(), "empty output");
    }

    #[test]
    fn boxed_validators_are_debuggable() {
        let v: Box<dyn Validator> = Box::new(ExpectEntries::new(NoopNormalizer, Vec::<Value>::new()));
        assert_eq!(format!("{v:?}"), "Validator(entries(0))");
    }
}
