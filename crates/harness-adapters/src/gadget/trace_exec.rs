//! `trace exec`: un evento por cada `execve` observado.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub event: super::Event,
    #[serde(default)]
    pub pid: u32,
    #[serde(default)]
    pub ppid: u32,
    #[serde(default)]
    pub uid: u32,
    #[serde(default)]
    pub gid: u32,
    #[serde(default, rename = "loginuid")]
    pub login_uid: u32,
    #[serde(default, rename = "sessionid")]
    pub session_id: u32,
    #[serde(default)]
    pub retval: i32,
    #[serde(default)]
    pub comm: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: String,
    #[serde(default, rename = "upperlayer")]
    pub upper_layer: bool,
    #[serde(default, rename = "mountnsid")]
    pub mount_ns_id: u64,
}

/// Anula lo que cambia de una ejecución a otra.
pub fn normalize(e: &mut Event) {
    e.event.timestamp = 0;
    e.event.common.k8s.node.clear();
    e.event.common.runtime.clear_volatile();
    e.pid = 0;
    e.ppid = 0;
    e.login_uid = 0;
    e.session_id = 0;
    e.retval = 0;
    e.mount_ns_id = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_identity_fields() {
        let line = r#"{"k8s":{"node":"n1","namespace":"ns","podName":"test-pod","containerName":"test-pod"},
                       "timestamp":123,"pid":41,"ppid":1,"uid":1000,"gid":1111,"loginuid":4294967295,
                       "sessionid":7,"retval":0,"comm":"date","args":["/date"],"cwd":"/",
                       "upperlayer":true,"mountnsid":4026532281}"#;
        let mut e: Event = serde_json::from_str(line).unwrap();
        normalize(&mut e);
        assert_eq!(e.pid, 0);
        assert_eq!(e.mount_ns_id, 0);
        assert_eq!(e.event.timestamp, 0);
        assert!(e.event.common.k8s.node.is_empty());
        assert_eq!((e.uid, e.gid), (1000, 1111));
        assert_eq!(e.args, vec!["/date"]);
        assert!(e.upper_layer);
    }
}
