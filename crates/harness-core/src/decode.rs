//! Decodificador de la salida capturada.
//!
//! Tres formas, elegidas por quien llama:
//! - stream: objetos JSON consecutivos (típicamente uno por línea);
//! - array: exactamente un array JSON;
//! - multi-array: cero o más arrays pegados, uno por intervalo de reporte.
//!
//! Un fallo de parseo siempre es un `DecodeError` con offset y fragmento,
//! nunca un "no hubo match".

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{DecodeError, DecodeMode};

const FRAGMENT_RADIUS: usize = 32;

/// Objetos JSON consecutivos. Texto vacío (o sólo espacios) da un vector
/// vacío; un valor de nivel superior que no es objeto es error.
pub fn decode_stream<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, DecodeError> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    let mut out = Vec::new();
    loop {
        let consumed = stream.byte_offset();
        let Some(item) = stream.next() else {
            break;
        };
        let value = item.map_err(|e| decode_error(DecodeMode::Stream, text, &e))?;
        let rest = &text[consumed..];
        let start = consumed + (rest.len() - rest.trim_start().len());
        if !value.is_object() {
            return Err(error_at(DecodeMode::Stream,
                                text,
                                start,
                                format!("expected a JSON object, found {}", kind_of(&value))));
        }
        let record = serde_json::from_value::<T>(value).map_err(|e| error_at(DecodeMode::Stream, text, start, e.to_string()))?;
        out.push(record);
    }
    Ok(out)
}

/// Exactamente un array JSON; cualquier otra cosa es error.
pub fn decode_array<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, DecodeError> {
    serde_json::from_str::<Vec<T>>(text).map_err(|e| decode_error(DecodeMode::Array, text, &e))
}

/// Secuencia de arrays JSON, cada uno decodificado con la regla de `decode_array`.
pub fn decode_arrays<T: DeserializeOwned>(text: &str) -> Result<Vec<Vec<T>>, DecodeError> {
    decode_values(text, DecodeMode::MultiArray)
}

fn decode_values<V: DeserializeOwned>(text: &str, mode: DecodeMode) -> Result<Vec<V>, DecodeError> {
    let stream = serde_json::Deserializer::from_str(text).into_iter::<V>();
    let mut out = Vec::new();
    for item in stream {
        match item {
            Ok(v) => out.push(v),
            Err(e) => return Err(decode_error(mode, text, &e)),
        }
    }
    Ok(out)
}

fn decode_error(mode: DecodeMode, text: &str, err: &serde_json::Error) -> DecodeError {
    error_at(mode, text, offset_of(text, err.line(), err.column()), err.to_string())
}

fn error_at(mode: DecodeMode, text: &str, offset: usize, message: String) -> DecodeError {
    DecodeError { mode,
                  offset,
                  fragment: excerpt(text, offset),
                  message }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Convierte (línea, columna) de serde_json, ambas 1-based, en offset de bytes.
fn offset_of(text: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let line_start: usize = text.split_inclusive('\n').take(line - 1).map(str::len).sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}

fn excerpt(text: &str, offset: usize) -> String {
    let mut start = offset.saturating_sub(FRAGMENT_RADIUS);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (offset + FRAGMENT_RADIUS).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    text[start..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn stream_of_objects_tolerates_newlines() {
        let text = "{\"comm\":\"sh\"}\n{\"comm\":\"date\"}\n\n{\"comm\":\"sleep\"}\n";
        let records: Vec<Value> = decode_stream(text).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], json!({"comm": "date"}));
    }

    #[test]
    fn empty_stream_is_empty_not_error() {
        let records: Vec<Value> = decode_stream("").unwrap();
        assert!(records.is_empty());
        let records: Vec<Value> = decode_stream(" \n\n").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn stream_reports_offset_of_garbage() {
        let text = "{\"comm\":\"sh\"}\n{\"comm\": nope}\n";
        let err = decode_stream::<Value>(text).unwrap_err();
        assert_eq!(err.mode, DecodeMode::Stream);
        assert!(err.offset >= 14, "offset {} should point into second line", err.offset);
        assert!(err.fragment.contains("nope"));
    }

    #[test]
    fn stream_rejects_top_level_array() {
        let err = decode_stream::<Value>("[{\"comm\":\"date\"}]").unwrap_err();
        assert_eq!(err.mode, DecodeMode::Stream);
        assert_eq!(err.offset, 0);
        assert!(err.message.contains("found an array"), "{}", err.message);
    }

    #[test]
    fn stream_points_at_the_offending_value() {
        let text = "{\"comm\":\"sh\"}\n  42\n{\"comm\":\"date\"}";
        let err = decode_stream::<Value>(text).unwrap_err();
        assert_eq!(err.offset, 16);
        assert!(err.fragment.contains("42"));
        assert!(err.message.contains("found a number"));
    }

    #[test]
    fn stream_reports_typed_mismatch_at_record_start() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Exec {
            comm: String,
        }
        let text = "{\"comm\":\"sh\"}\n{\"pid\":3}";
        let err = decode_stream::<Exec>(text).unwrap_err();
        assert_eq!(err.offset, 14);
        assert!(err.message.contains("comm"), "{}", err.message);
    }

    #[test]
    fn single_array_rejects_non_array() {
        let err = decode_array::<Value>("{\"comm\":\"nc\"}").unwrap_err();
        assert_eq!(err.mode, DecodeMode::Array);
        assert!(err.message.contains("expected a sequence"), "{}", err.message);
    }

    #[test]
    fn single_array_rejects_empty_input() {
        assert!(decode_array::<Value>("").is_err());
    }

    #[test]
    fn single_array_rejects_trailing_array() {
        assert!(decode_array::<Value>("[] []").is_err());
    }

    #[test]
    fn single_array_accepts_surrounding_whitespace() {
        let records: Vec<Value> = decode_array("\n [ {\"comm\":\"nc\"} ]\n").unwrap();
        assert_eq!(records, vec![json!({"comm": "nc"})]);
    }

    #[test]
    fn multi_array_splits_intervals() {
        let text = "[]\n[{\"port\":80}]\n[]";
        let intervals: Vec<Vec<Value>> = decode_arrays(text).unwrap();
        assert_eq!(intervals.len(), 3);
        assert!(intervals[0].is_empty());
        assert_eq!(intervals[1], vec![json!({"port": 80})]);
    }

    #[test]
    fn multi_array_back_to_back_without_separator() {
        let intervals: Vec<Vec<Value>> = decode_arrays("[1][2,3]").unwrap();
        assert_eq!(intervals, vec![vec![json!(1)], vec![json!(2), json!(3)]]);
    }

    #[test]
    fn multi_array_rejects_object_interval() {
        let err = decode_arrays::<Value>("[]\n{\"port\":80}").unwrap_err();
        assert_eq!(err.mode, DecodeMode::MultiArray);
        assert!(err.to_string().contains("multi-array decode failed"));
    }

    #[test]
    fn offset_handles_multibyte_fragments() {
        let text = "[\"ñandú\", oops]";
        let err = decode_array::<Value>(text).unwrap_err();
        assert!(err.offset <= text.len());
        assert!(err.fragment.contains("oops"));
    }
}
