//! Registros observados por la herramienta bajo prueba.
//!
//! El core no conoce ningún esquema concreto: cualquier tipo `serde` con
//! igualdad estructural sirve como `Record`, incluido `serde_json::Value`.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::hashing::to_canonical_json;

/// Alias de bounds para registros comparables.
pub trait Record: DeserializeOwned + Serialize + PartialEq + Debug + Send + Sync {}

impl<T> Record for T where T: DeserializeOwned + Serialize + PartialEq + Debug + Send + Sync {}

/// Renderiza un registro como JSON canónico para reportes.
pub fn render_record<T: Serialize + Debug>(record: &T) -> String {
    match serde_json::to_value(record) {
        Ok(value) => to_canonical_json(&value),
        Err(_) => format!("{record:?}"),
    }
}

pub fn render_records<T: Serialize + Debug>(records: &[T]) -> Vec<String> {
    records.iter().map(render_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        comm: String,
        pid: u32,
    }

    #[test]
    fn renders_struct_as_sorted_json() {
        let s = Sample { comm: "nc".into(),
                         pid: 7 };
        assert_eq!(render_record(&s), "{\"comm\":\"nc\",\"pid\":7}");
    }
}
