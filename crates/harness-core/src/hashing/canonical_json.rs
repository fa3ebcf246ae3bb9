//! JSON canónico: claves ordenadas y sin espacios.
//!
//! Dos registros iguales tras normalizar producen exactamente el mismo texto,
//! lo que hace que los reportes de mismatch sean comparables línea a línea.

use serde_json::Value;
use std::collections::BTreeMap;

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let tree: BTreeMap<&String, String> = map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let items: Vec<String> = tree.into_iter()
                                         .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v))
                                         .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::to_canonical_json;
    use serde_json::json;

    #[test]
    fn test_primitives() {
        assert_eq!(to_canonical_json(&json!(null)), "null");
        assert_eq!(to_canonical_json(&json!(false)), "false");
        assert_eq!(to_canonical_json(&json!(80)), "80");
        assert_eq!(to_canonical_json(&json!("nc")), "\"nc\"");
    }

    #[test]
    fn test_object_sorted_keys() {
        let val = json!({ "pid": 0, "comm": "date" });
        assert_eq!(to_canonical_json(&val), "{\"comm\":\"date\",\"pid\":0}");
    }

    #[test]
    fn test_nested() {
        let val = json!({ "args": ["/bin/sleep", "0.1"], "k8s": { "pod": "test-pod", "namespace": "ns" } });
        assert_eq!(to_canonical_json(&val),
                   "{\"args\":[\"/bin/sleep\",\"0.1\"],\"k8s\":{\"namespace\":\"ns\",\"pod\":\"test-pod\"}}");
    }
}
