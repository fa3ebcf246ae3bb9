//! Hashing y canonicalización JSON.
//!
//! Se usan para dos cosas: renderizar registros de forma estable en los
//! reportes de mismatch y calcular el digest de la salida capturada que se
//! guarda en los eventos del runner.

pub mod canonical_json;
pub mod hash;

pub use canonical_json::to_canonical_json;
pub use hash::hash_str;
