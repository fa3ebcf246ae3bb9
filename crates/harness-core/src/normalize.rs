//! Máscaras de normalización.
//!
//! Un `Normalizer` pone a cero, en el sitio, los campos que varían entre
//! ejecuciones (pids, timestamps, ids de contenedor, nodo...). Sólo se aplica
//! sobre registros actuales; los esperados nunca se mutan. Toda máscara debe
//! ser idempotente.

use serde_json::{Map, Value};

/// Máscara in-place sobre un registro.
pub trait Normalizer<T: ?Sized>: Send + Sync {
    fn normalize(&self, record: &mut T);
}

impl<T, F> Normalizer<T> for F
    where T: ?Sized,
          F: Fn(&mut T) + Send + Sync
{
    fn normalize(&self, record: &mut T) {
        self(record)
    }
}

/// No toca nada. Útil cuando la salida ya es determinista.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNormalizer;

impl<T: ?Sized> Normalizer<T> for NoopNormalizer {
    fn normalize(&self, _record: &mut T) {}
}

/// Aplica la máscara a todos los registros.
pub fn normalize_all<T, N>(records: &mut [T], normalizer: &N)
    where N: Normalizer<T> + ?Sized
{
    for r in records.iter_mut() {
        normalizer.normalize(r);
    }
}

/// Máscara sin esquema para `serde_json::Value`, direccionada por JSON
/// pointers (`/pid`, `/k8s/node`).
///
/// Cada campo enmascarado se reemplaza por el valor cero de su tipo JSON.
/// Los pointers que no existen en el registro se ignoran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMask {
    pointers: Vec<String>,
}

impl FieldMask {
    pub fn new<I, S>(pointers: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        Self { pointers: pointers.into_iter().map(Into::into).collect() }
    }

    pub fn with(mut self, pointer: impl Into<String>) -> Self {
        self.pointers.push(pointer.into());
        self
    }

    pub fn pointers(&self) -> &[String] {
        &self.pointers
    }
}

fn zero_of(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(_) => Value::Bool(false),
        Value::Number(_) => Value::from(0),
        Value::String(_) => Value::String(String::new()),
        Value::Array(_) => Value::Array(Vec::new()),
        Value::Object(_) => Value::Object(Map::new()),
    }
}

impl Normalizer<Value> for FieldMask {
    fn normalize(&self, record: &mut Value) {
        for p in &self.pointers {
            if let Some(field) = record.pointer_mut(p) {
                *field = zero_of(field);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_mask_zeroes_by_type() {
        let mask = FieldMask::new(["/pid", "/k8s/node", "/upperlayer", "/args", "/runtime"]);
        let mut r = json!({
            "pid": 4242,
            "comm": "date",
            "upperlayer": true,
            "args": ["/date"],
            "k8s": { "node": "minikube", "namespace": "ns" },
            "runtime": { "containerId": "abc" }
        });
        mask.normalize(&mut r);
        assert_eq!(r,
                   json!({
                       "pid": 0,
                       "comm": "date",
                       "upperlayer": false,
                       "args": [],
                       "k8s": { "node": "", "namespace": "ns" },
                       "runtime": {}
                   }));
    }

    #[test]
    fn field_mask_ignores_missing_pointers() {
        let mask = FieldMask::default().with("/nope/deeper");
        let mut r = json!({ "comm": "nc" });
        mask.normalize(&mut r);
        assert_eq!(r, json!({ "comm": "nc" }));
    }

    #[test]
    fn field_mask_is_idempotent() {
        let mask = FieldMask::new(["/timestamp", "/mountnsid"]);
        let mut once = json!({ "timestamp": 1700000000, "mountnsid": 4026531840u64, "comm": "sh" });
        mask.normalize(&mut once);
        let mut twice = once.clone();
        mask.normalize(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn closures_are_normalizers() {
        let n = |r: &mut Value| {
            r["pid"] = json!(0);
        };
        let mut records = vec![json!({ "pid": 1 }), json!({ "pid": 2 })];
        normalize_all(&mut records, &n);
        assert!(records.iter().all(|r| r["pid"] == json!(0)));
    }
}
