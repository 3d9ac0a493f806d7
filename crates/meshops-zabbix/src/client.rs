use crate::error::{Result, ZabbixError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::Ipv4Addr;

/// Parameters for creating one SNMP-monitored host.
#[derive(Debug, Clone)]
pub struct NewHost<'a> {
    pub ip: Ipv4Addr,
    pub name: &'a str,
    pub group_id: &'a str,
    pub template_id: &'a str,
    /// SNMP interface version: 2 for mesh nodes, 1 for AirOS radios.
    pub snmp_version: u8,
}

/// Capability seam over the monitoring platform's RPC API.
///
/// The production implementation is [`ZabbixClient`]; the enrollment
/// pipelines only see this trait so they can be tested against fakes with
/// zero network access.
#[async_trait]
pub trait MonitoringApi: Send + Sync {
    /// Looks up a host group by exact name; `Ok(None)` when absent.
    async fn get_group_id(&self, name: &str) -> Result<Option<String>>;

    /// Creates a host group and returns its new id.
    async fn create_group(&self, name: &str) -> Result<String>;

    /// Looks up a template by exact name.
    ///
    /// # Errors
    ///
    /// [`ZabbixError::TemplateNotFound`] when the lookup comes back empty;
    /// there is no creation fallback for templates.
    async fn get_template_id(&self, name: &str) -> Result<String>;

    /// True if a host lookup by exact name returns at least one result.
    async fn host_exists(&self, name: &str) -> Result<bool>;

    /// Creates a host with one SNMP interface, attached to the given group
    /// and template. Returns the new host id.
    async fn create_host(&self, host: &NewHost<'_>) -> Result<String>;
}

#[derive(Deserialize)]
pub(crate) struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcFault>,
}

#[derive(Deserialize)]
pub(crate) struct RpcFault {
    code: i64,
    message: String,
    #[serde(default)]
    data: Value,
}

/// Turns a decoded JSON-RPC envelope into `result` or a typed fault.
pub(crate) fn rpc_result(method: &str, parsed: RpcResponse) -> Result<Value> {
    if let Some(fault) = parsed.error {
        return Err(ZabbixError::Rpc {
            code: fault.code,
            message: fault.message,
            data: fault
                .data
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| fault.data.to_string()),
        });
    }
    parsed
        .result
        .ok_or_else(|| ZabbixError::Shape(format!("{method} response had neither result nor error")))
}

/// JSON-RPC 2.0 client for the Zabbix frontend API (`api_jsonrpc.php`).
///
/// Logs in once at construction; the session token rides along in the `auth`
/// field of every subsequent request.
pub struct ZabbixClient {
    client: reqwest::Client,
    endpoint: String,
    auth: String,
}

impl ZabbixClient {
    /// Connects to `{url}/api_jsonrpc.php` and performs `user.login`.
    pub async fn login(url: &str, username: &str, password: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let endpoint = format!("{}/api_jsonrpc.php", url.trim_end_matches('/'));

        tracing::info!(url = %url, "logging into Zabbix");
        let result = call(
            &client,
            &endpoint,
            "user.login",
            json!({ "username": username, "password": password }),
            None,
        )
        .await?;
        let auth = result
            .as_str()
            .ok_or_else(|| ZabbixError::Shape("user.login result was not a string".into()))?
            .to_string();
        tracing::info!(url = %url, "logged into Zabbix");

        Ok(Self {
            client,
            endpoint,
            auth,
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        call(&self.client, &self.endpoint, method, params, Some(&self.auth)).await
    }
}

async fn call(
    client: &reqwest::Client,
    endpoint: &str,
    method: &str,
    params: Value,
    auth: Option<&str>,
) -> Result<Value> {
    let mut request = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });
    // user.login is the one unauthenticated call; it must not carry `auth`.
    if let Some(token) = auth {
        request["auth"] = json!(token);
    }

    tracing::debug!(method, "Zabbix RPC call");
    let response = client
        .post(endpoint)
        .header("Content-Type", "application/json-rpc")
        .json(&request)
        .send()
        .await?
        .error_for_status()?;
    let parsed: RpcResponse = response.json().await?;
    rpc_result(method, parsed)
}

/// Pulls `field` out of the first element of an object array result.
fn first_field(result: &Value, field: &str) -> Option<String> {
    result
        .as_array()?
        .first()?
        .get(field)?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl MonitoringApi for ZabbixClient {
    async fn get_group_id(&self, name: &str) -> Result<Option<String>> {
        let result = self
            .call("hostgroup.get", json!({ "filter": { "name": [name] } }))
            .await?;
        Ok(first_field(&result, "groupid"))
    }

    async fn create_group(&self, name: &str) -> Result<String> {
        let result = self.call("hostgroup.create", json!({ "name": name })).await?;
        result
            .get("groupids")
            .and_then(Value::as_array)
            .and_then(|ids| ids.first())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ZabbixError::Shape("hostgroup.create returned no groupids".into()))
    }

    async fn get_template_id(&self, name: &str) -> Result<String> {
        let result = self
            .call("template.get", json!({ "filter": { "name": [name] } }))
            .await?;
        first_field(&result, "templateid").ok_or_else(|| ZabbixError::TemplateNotFound(name.to_string()))
    }

    async fn host_exists(&self, name: &str) -> Result<bool> {
        let result = self
            .call("host.get", json!({ "filter": { "host": [name] } }))
            .await?;
        Ok(result.as_array().is_some_and(|hosts| !hosts.is_empty()))
    }

    async fn create_host(&self, host: &NewHost<'_>) -> Result<String> {
        let result = self
            .call(
                "host.create",
                json!({
                    "host": host.name,
                    "interfaces": [{
                        "type": 2,
                        "main": 1,
                        "useip": 1,
                        "ip": host.ip.to_string(),
                        "dns": "",
                        "port": 161,
                        "details": {
                            "version": host.snmp_version,
                            "bulk": 1,
                            "community": "public",
                        },
                    }],
                    "groups": [{ "groupid": host.group_id }],
                    "templates": [{ "templateid": host.template_id }],
                }),
            )
            .await?;
        result
            .get("hostids")
            .and_then(Value::as_array)
            .and_then(|ids| ids.first())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ZabbixError::Shape("host.create returned no hostids".into()))
    }
}
