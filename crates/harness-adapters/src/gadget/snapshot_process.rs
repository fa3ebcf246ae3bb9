//! `snapshot process`: foto única de los procesos de los contenedores.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub event: super::Event,
    #[serde(default)]
    pub comm: String,
    #[serde(default)]
    pub pid: i32,
    #[serde(default)]
    pub tid: i32,
    #[serde(default)]
    pub ppid: i32,
    #[serde(default, rename = "mountnsid")]
    pub mount_ns_id: u64,
}

/// El nodo no se anula: el registro esperado lo fija al nodo del pod.
pub fn normalize(e: &mut Event) {
    e.event.common.runtime.clear_volatile();
    e.pid = 0;
    e.tid = 0;
    e.ppid = 0;
    e.mount_ns_id = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_node() {
        let mut e: Event = serde_json::from_str(r#"{"k8s":{"node":"n2"},"comm":"nc","pid":9,"tid":9,"ppid":1}"#).unwrap();
        normalize(&mut e);
        assert_eq!(e.event.common.k8s.node, "n2");
        assert_eq!((e.pid, e.tid, e.ppid), (0, 0, 0));
    }
}
