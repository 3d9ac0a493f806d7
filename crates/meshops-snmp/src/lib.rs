//! Device discovery over SNMP.
//!
//! Mesh routers expose their human-readable node name as sysName
//! (1.3.6.1.2.1.1.5.0). Enrollment reads that one value with the fixed
//! read-only `public` community; nothing else is queried over SNMP.

use async_trait::async_trait;
use csnmp::{ObjectValue, Snmp2cClient};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const SYS_NAME_OID: &str = "1.3.6.1.2.1.1.5.0";
const SNMP_PORT: u16 = 161;
const READ_COMMUNITY: &[u8] = b"public";

/// Errors from a device-discovery lookup.
#[derive(Debug, thiserror::Error)]
pub enum SnmpError {
    /// The SNMP request failed (transport error, timeout, or an error
    /// status from the agent).
    #[error("SNMP request to {ip} failed: {source}")]
    Request {
        ip: Ipv4Addr,
        #[source]
        source: csnmp::SnmpClientError,
    },

    /// The agent answered, but not with an octet-string sysName.
    #[error("device {ip} returned a non-string sysName")]
    UnexpectedValue { ip: Ipv4Addr },

    /// The well-known OID constant failed to parse. Indicates a bug, not a
    /// device problem.
    #[error("invalid OID {0:?}")]
    BadOid(String),
}

/// Capability seam for resolving a router's advertised name from its address.
///
/// The production implementation is [`SnmpDiscovery`]; enrollment pipelines
/// take `&dyn DeviceDiscovery` so tests can answer from a table instead of
/// the network.
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// Resolves the device's self-reported system name.
    ///
    /// # Errors
    ///
    /// Returns [`SnmpError`] if the device errors, times out, or returns an
    /// unusable binding. No retries.
    async fn hostname(&self, ip: Ipv4Addr) -> Result<String, SnmpError>;
}

/// sysName reader speaking SNMP v2c on the standard port.
#[derive(Debug, Default)]
pub struct SnmpDiscovery;

impl SnmpDiscovery {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeviceDiscovery for SnmpDiscovery {
    async fn hostname(&self, ip: Ipv4Addr) -> Result<String, SnmpError> {
        let oid = SYS_NAME_OID
            .parse()
            .map_err(|_| SnmpError::BadOid(SYS_NAME_OID.to_string()))?;
        let target = SocketAddr::new(IpAddr::V4(ip), SNMP_PORT);

        let client = Snmp2cClient::new(target, READ_COMMUNITY.to_vec(), None, None)
            .await
            .map_err(|source| SnmpError::Request { ip, source })?;
        let value = client
            .get(oid)
            .await
            .map_err(|source| SnmpError::Request { ip, source })?;

        match value {
            ObjectValue::String(bytes) => {
                let name = String::from_utf8_lossy(&bytes).into_owned();
                tracing::debug!(%ip, name = %name, "resolved sysName");
                Ok(name)
            }
            other => {
                tracing::warn!(%ip, value = ?other, "sysName was not an octet string");
                Err(SnmpError::UnexpectedValue { ip })
            }
        }
    }
}
