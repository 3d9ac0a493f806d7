//! Zabbix monitoring-platform client and device enrollment.
//!
//! Talks to the Zabbix frontend JSON-RPC API for host-group, template, and
//! host management, and drives the enrollment pipelines that register mesh
//! routers as SNMP-monitored hosts.

pub mod client;
pub mod enroll;
pub mod error;

#[cfg(test)]
mod tests;

pub use client::{MonitoringApi, NewHost, ZabbixClient};
pub use enroll::{
    enroll_host, enroll_popular, enroll_routers, enroll_single, get_or_create_group,
    require_group, DeviceClass, Enrollment, EnrollSummary, MESH_NODE, RADIO,
};
pub use error::ZabbixError;
