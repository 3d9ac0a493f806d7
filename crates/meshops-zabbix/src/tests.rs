use crate::client::{MonitoringApi, NewHost};
use crate::enroll::{self, Enrollment, MESH_NODE, RADIO};
use crate::error::{Result, ZabbixError};
use async_trait::async_trait;
use meshops_common::types::LinkCountMap;
use meshops_snmp::{DeviceDiscovery, SnmpError};
use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Mutex;

/// Recorded `create_host` call.
#[derive(Debug, Clone)]
struct CreatedHost {
    ip: Ipv4Addr,
    name: String,
    group_id: String,
    template_id: String,
    snmp_version: u8,
}

#[derive(Default)]
struct FakeApiState {
    existing_hosts: HashSet<String>,
    group_id: Option<String>,
    created_hosts: Vec<CreatedHost>,
    created_groups: Vec<String>,
    host_get_calls: usize,
}

/// In-memory monitoring API recording every call.
#[derive(Default)]
struct FakeApi {
    state: Mutex<FakeApiState>,
}

impl FakeApi {
    fn with_group(group_id: &str) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().group_id = Some(group_id.to_string());
        fake
    }

    fn with_existing_host(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .existing_hosts
            .insert(name.to_string());
        self
    }
}

#[async_trait]
impl MonitoringApi for FakeApi {
    async fn get_group_id(&self, _name: &str) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().group_id.clone())
    }

    async fn create_group(&self, name: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.created_groups.push(name.to_string());
        state.group_id = Some("9".to_string());
        Ok("9".to_string())
    }

    async fn get_template_id(&self, name: &str) -> Result<String> {
        if name == MESH_NODE.template || name == RADIO.template {
            Ok("10248".to_string())
        } else {
            Err(ZabbixError::TemplateNotFound(name.to_string()))
        }
    }

    async fn host_exists(&self, name: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.host_get_calls += 1;
        Ok(state.existing_hosts.contains(name))
    }

    async fn create_host(&self, host: &NewHost<'_>) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.created_hosts.push(CreatedHost {
            ip: host.ip,
            name: host.name.to_string(),
            group_id: host.group_id.to_string(),
            template_id: host.template_id.to_string(),
            snmp_version: host.snmp_version,
        });
        Ok(format!("host-{}", state.created_hosts.len()))
    }
}

/// Discovery fake answering from a fixed table.
#[derive(Default)]
struct FakeDiscovery {
    names: BTreeMap<Ipv4Addr, String>,
    calls: Mutex<usize>,
}

impl FakeDiscovery {
    fn with(entries: &[(&str, &str)]) -> Self {
        Self {
            names: entries
                .iter()
                .map(|(ip, name)| (ip.parse().unwrap(), name.to_string()))
                .collect(),
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl DeviceDiscovery for FakeDiscovery {
    async fn hostname(&self, ip: Ipv4Addr) -> std::result::Result<String, SnmpError> {
        *self.calls.lock().unwrap() += 1;
        self.names
            .get(&ip)
            .cloned()
            .ok_or(SnmpError::UnexpectedValue { ip })
    }
}

fn counts(entries: &[(&str, usize)]) -> LinkCountMap {
    entries
        .iter()
        .map(|(ip, ct)| (ip.to_string(), *ct))
        .collect()
}

#[tokio::test]
async fn enroll_skips_existing_host_without_create_call() {
    let api = FakeApi::with_group("2").with_existing_host("popular-node");
    let ip: Ipv4Addr = "10.69.0.3".parse().unwrap();

    let outcome = enroll::enroll_host(&api, ip, "popular-node", "2", "10248", 2)
        .await
        .unwrap();

    assert_eq!(outcome, Enrollment::Skipped);
    let state = api.state.lock().unwrap();
    assert!(state.created_hosts.is_empty());
}

#[tokio::test]
async fn enroll_creates_host_with_class_parameters() {
    let api = FakeApi::with_group("2");
    let discovery = FakeDiscovery::with(&[("10.69.0.3", "sn3-omni")]);
    let ip: Ipv4Addr = "10.69.0.3".parse().unwrap();

    let outcome = enroll::enroll_single(&api, &discovery, ip, &MESH_NODE)
        .await
        .unwrap();

    assert!(matches!(outcome, Enrollment::Created(_)));
    let state = api.state.lock().unwrap();
    assert_eq!(state.created_hosts.len(), 1);
    let created = &state.created_hosts[0];
    assert_eq!(created.name, "sn3-omni");
    assert_eq!(created.ip, ip);
    assert_eq!(created.group_id, "2");
    assert_eq!(created.template_id, "10248");
    assert_eq!(created.snmp_version, 2);
}

#[tokio::test]
async fn radio_enrollment_uses_snmp_v1() {
    let api = FakeApi::with_group("7");
    let discovery = FakeDiscovery::with(&[("10.70.1.1", "gs-radio")]);
    let ip: Ipv4Addr = "10.70.1.1".parse().unwrap();

    enroll::enroll_single(&api, &discovery, ip, &RADIO)
        .await
        .unwrap();

    let state = api.state.lock().unwrap();
    assert_eq!(state.created_hosts[0].snmp_version, 1);
}

#[tokio::test]
async fn missing_group_is_created_once() {
    let api = FakeApi::default();
    let id = enroll::get_or_create_group(&api, MESH_NODE.hostgroup)
        .await
        .unwrap();

    assert_eq!(id, "9");
    let state = api.state.lock().unwrap();
    assert_eq!(state.created_groups, vec![MESH_NODE.hostgroup.to_string()]);
}

#[tokio::test]
async fn popular_enrollment_respects_link_floor() {
    let api = FakeApi::with_group("2");
    let discovery = FakeDiscovery::with(&[
        ("10.69.0.1", "quiet-node"),
        ("10.69.0.2", "hub-node"),
        ("10.69.0.3", "busy-node"),
    ]);
    let counts = counts(&[("10.69.0.1", 3), ("10.69.0.2", 10), ("10.69.0.3", 25)]);

    let summary = enroll::enroll_routers(&api, &discovery, &counts, &MESH_NODE, 10)
        .await
        .unwrap();

    assert_eq!(summary.created, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 0);

    let state = api.state.lock().unwrap();
    let names: Vec<&str> = state.created_hosts.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["hub-node", "busy-node"]);
    // Below-floor routers get no host lookups either.
    assert_eq!(state.host_get_calls, 2);
    assert_eq!(*discovery.calls.lock().unwrap(), 2);
}

#[tokio::test]
async fn popular_enrollment_survives_per_router_failures() {
    let api = FakeApi::with_group("2").with_existing_host("already-there");
    // 10.69.0.9 is missing from the discovery table, so its hostname
    // resolution fails; the others must still be processed.
    let discovery = FakeDiscovery::with(&[
        ("10.69.0.2", "already-there"),
        ("10.69.0.3", "fresh-node"),
    ]);
    let counts = counts(&[("10.69.0.2", 12), ("10.69.0.3", 12), ("10.69.0.9", 12)]);

    let summary = enroll::enroll_routers(&api, &discovery, &counts, &MESH_NODE, 10)
        .await
        .unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);

    let state = api.state.lock().unwrap();
    assert_eq!(state.created_hosts.len(), 1);
    assert_eq!(state.created_hosts[0].name, "fresh-node");
}

#[tokio::test]
async fn require_group_never_creates_the_group() {
    let api = FakeApi::default();

    let err = enroll::require_group(&api, "NYCMeshNodes").await.unwrap_err();

    assert!(matches!(err, ZabbixError::GroupNotFound(ref name) if name == "NYCMeshNodes"));
    assert!(api.state.lock().unwrap().created_groups.is_empty());
}

#[tokio::test]
async fn require_group_returns_the_existing_id() {
    let api = FakeApi::with_group("2");

    let id = enroll::require_group(&api, "NYCMeshNodes").await.unwrap();

    assert_eq!(id, "2");
    assert!(api.state.lock().unwrap().created_groups.is_empty());
}

#[test]
fn rpc_fault_maps_to_a_typed_error() {
    let body = r#"{
        "jsonrpc": "2.0",
        "error": {
            "code": -32602,
            "message": "Invalid params.",
            "data": "Incorrect API \"hostgroup\"."
        },
        "id": 1
    }"#;
    let response: crate::client::RpcResponse = serde_json::from_str(body).unwrap();

    let err = crate::client::rpc_result("hostgroup.get", response).unwrap_err();

    match err {
        ZabbixError::Rpc { code, message, data } => {
            assert_eq!(code, -32602);
            assert_eq!(message, "Invalid params.");
            assert_eq!(data, "Incorrect API \"hostgroup\".");
        }
        other => panic!("expected Rpc error, got {other:?}"),
    }
}

#[test]
fn rpc_result_passes_the_payload_through() {
    let body = r#"{"jsonrpc": "2.0", "result": [{"groupid": "2"}], "id": 1}"#;
    let response: crate::client::RpcResponse = serde_json::from_str(body).unwrap();

    let result = crate::client::rpc_result("hostgroup.get", response).unwrap();

    assert_eq!(result[0]["groupid"], "2");
}

#[test]
fn rpc_envelope_without_result_or_error_is_rejected() {
    let body = r#"{"jsonrpc": "2.0", "id": 1}"#;
    let response: crate::client::RpcResponse = serde_json::from_str(body).unwrap();

    let err = crate::client::rpc_result("host.get", response).unwrap_err();

    assert!(matches!(err, ZabbixError::Shape(ref msg) if msg.contains("host.get")));
}
