//! Registros que emite la herramienta bajo prueba con `-o json`.
//!
//! Los campos comunes (metadatos de Kubernetes y del runtime) se aplanan en
//! cada registro concreto. Los campos desconocidos se ignoran y los ausentes
//! toman su valor cero, de modo que un registro esperado sólo necesita
//! rellenar lo que quiere comparar.

pub mod snapshot_process;
pub mod top_tcp;
pub mod trace_exec;

use serde::{Deserialize, Serialize};

use crate::kube::TEST_POD_NAME;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct K8sMetadata {
    #[serde(default)]
    pub node: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub pod_name: String,
    #[serde(default)]
    pub container_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeMetadata {
    #[serde(default)]
    pub runtime_name: String,
    #[serde(default)]
    pub container_id: String,
    #[serde(default)]
    pub container_name: String,
    #[serde(default)]
    pub container_image_name: String,
    #[serde(default)]
    pub container_image_digest: String,
}

impl RuntimeMetadata {
    /// Anula lo que depende del nodo y del runtime concreto. El nombre de la
    /// imagen se conserva: es parte de lo que se verifica.
    pub fn clear_volatile(&mut self) {
        self.runtime_name.clear();
        self.container_id.clear();
        self.container_name.clear();
        self.container_image_digest.clear();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonData {
    #[serde(default)]
    pub k8s: K8sMetadata,
    #[serde(default)]
    pub runtime: RuntimeMetadata,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    #[default]
    Normal,
    Debug,
    Info,
    Warn,
    Err,
}

/// Cabecera de todo evento de trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub common: CommonData,
    #[serde(default, rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default)]
    pub timestamp: u64,
}

/// Ajustes opcionales sobre los `CommonData` esperados.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonDataOption {
    ContainerImageName { image: String, is_docker: bool },
}

/// El runtime docker no informa el nombre de la imagen; con él la opción no
/// hace nada.
pub fn with_container_image_name(image: impl Into<String>, is_docker: bool) -> CommonDataOption {
    CommonDataOption::ContainerImageName { image: image.into(),
                                          is_docker }
}

impl CommonDataOption {
    fn apply(&self, common: &mut CommonData) {
        match self {
            CommonDataOption::ContainerImageName { image, is_docker } => {
                if !is_docker {
                    common.runtime.container_image_name = image.clone();
                }
            }
        }
    }
}

/// Metadatos esperados para el pod de prueba estándar en `namespace`.
pub fn build_common_data_k8s<I>(namespace: &str, options: I) -> CommonData
    where I: IntoIterator<Item = CommonDataOption>
{
    let mut common = CommonData { k8s: K8sMetadata { namespace: namespace.to_string(),
                                                     pod_name: TEST_POD_NAME.to_string(),
                                                     container_name: TEST_POD_NAME.to_string(),
                                                     ..K8sMetadata::default() },
                                  runtime: RuntimeMetadata::default() };
    for option in options {
        option.apply(&mut common);
    }
    common
}

pub fn build_base_event_k8s<I>(namespace: &str, options: I) -> Event
    where I: IntoIterator<Item = CommonDataOption>
{
    Event { common: build_common_data_k8s(namespace, options),
            ..Event::default() }
}
