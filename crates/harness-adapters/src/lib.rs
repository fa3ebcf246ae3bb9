//! harness-adapters: capa de adaptación core ↔ mundo real
//!
//! Este crate provee:
//! - `TokioExecutor`: implementación de `ProcessExecutor` con procesos reales
//!   del sistema operativo (tokio::process).
//! - `kube`: steps y consultas para los colaboradores externos (namespaces,
//!   pods, readiness, nodo de un pod, runtime de contenedores, logs).
//! - `gadget`: registros tipados que emite la herramienta bajo prueba, con
//!   sus máscaras de normalización.
//!
//! Nota: el core no conoce ningún esquema de evento ni cómo se lanzan los
//! procesos; todo eso vive aquí.

pub mod executor;
pub mod gadget;
pub mod kube;

pub use executor::TokioExecutor;
pub use kube::{generate_namespace_name, sleep_for_seconds, Kubectl, PrintLogs};
