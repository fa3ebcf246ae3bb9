//! `top tcp`: estadísticas de tráfico por conexión, emitidas por intervalos.

use serde::{Deserialize, Serialize};

use super::CommonData;

/// Valor de `ipversion` para IPv4.
pub const AF_INET: u16 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    #[default]
    Raw,
    Pod,
    Svc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct L3Endpoint {
    #[serde(default)]
    pub addr: String,
    #[serde(default)]
    pub version: u8,
    #[serde(default)]
    pub kind: EndpointKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct L4Endpoint {
    #[serde(flatten)]
    pub l3: L3Endpoint,
    #[serde(default)]
    pub port: u16,
}

impl L4Endpoint {
    /// Extremo IPv4 sin resolver a pod ni servicio.
    pub fn raw_v4(addr: impl Into<String>, port: u16) -> Self {
        Self { l3: L3Endpoint { addr: addr.into(),
                                version: 4,
                                kind: EndpointKind::Raw },
               port }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(flatten)]
    pub common: CommonData,
    #[serde(default, rename = "mountnsid")]
    pub mount_ns_id: u64,
    #[serde(default)]
    pub pid: i32,
    #[serde(default)]
    pub comm: String,
    #[serde(default, rename = "ipversion")]
    pub ip_version: u16,
    #[serde(default)]
    pub src: L4Endpoint,
    #[serde(default)]
    pub dst: L4Endpoint,
    #[serde(default)]
    pub sent: u64,
    #[serde(default)]
    pub received: u64,
}

/// Anula contadores, pid y el puerto efímero de origen. El puerto de destino
/// se compara.
pub fn normalize(s: &mut Stats) {
    s.common.k8s.node.clear();
    s.common.runtime.clear_volatile();
    s.mount_ns_id = 0;
    s.pid = 0;
    s.src.port = 0;
    s.sent = 0;
    s.received = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_destination_port() {
        let json = r#"{"pid":812,"comm":"curl","ipversion":2,
                       "src":{"addr":"127.0.0.1","version":4,"kind":"raw","port":51234},
                       "dst":{"addr":"127.0.0.1","version":4,"kind":"raw","port":80},
                       "sent":73,"received":853}"#;
        let mut s: Stats = serde_json::from_str(json).unwrap();
        normalize(&mut s);
        assert_eq!(s.src, L4Endpoint::raw_v4("127.0.0.1", 0));
        assert_eq!(s.dst, L4Endpoint::raw_v4("127.0.0.1", 80));
        assert_eq!((s.sent, s.received, s.pid), (0, 0, 0));
        assert_eq!(s.ip_version, AF_INET);
    }
}
