//! Enrollment pipelines: single device and bulk "popular router" enrollment.

use crate::client::{MonitoringApi, NewHost};
use crate::error::{Result, ZabbixError};
use anyhow::Context;
use meshops_common::types::LinkCountMap;
use meshops_snmp::DeviceDiscovery;
use meshops_topology::{extract_link_counts, TopologyClient};
use std::net::Ipv4Addr;

/// Monitoring parameters for one class of mesh device.
#[derive(Debug, Clone, Copy)]
pub struct DeviceClass {
    pub hostgroup: &'static str,
    pub template: &'static str,
    pub snmp_version: u8,
}

/// Mesh routers (Mikrotik Omnitik): generic SNMP template, SNMP v2.
pub const MESH_NODE: DeviceClass = DeviceClass {
    hostgroup: "NYCMeshNodes",
    template: "Network Generic Device by SNMP",
    snmp_version: 2,
};

/// Point-to-point radios (Ubiquiti AirOS): vendor template, SNMP v1.
pub const RADIO: DeviceClass = DeviceClass {
    hostgroup: "Radios",
    template: "Ubiquiti AirOS by SNMP",
    snmp_version: 1,
};

/// Outcome of one enrollment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrollment {
    /// Host created; carries the new host id.
    Created(String),
    /// Host already existed; no create call was made.
    Skipped,
}

/// Totals for a bulk enrollment run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnrollSummary {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Looks up a host group by name, creating it when the lookup errors or
/// comes back empty.
///
/// Check-then-create is not atomic: two concurrent runs can both decide "not
/// found" and both create. The monitoring platform is the authority here, so
/// no client-side locking is attempted.
pub async fn get_or_create_group(api: &dyn MonitoringApi, name: &str) -> Result<String> {
    match api.get_group_id(name).await {
        Ok(Some(id)) => Ok(id),
        Ok(None) => {
            tracing::warn!(group = name, "did not find host group, creating it");
            api.create_group(name).await
        }
        Err(e) => {
            tracing::warn!(group = name, error = %e, "host group lookup failed, creating it");
            api.create_group(name).await
        }
    }
}

/// Looks up a host group by name without ever creating it. Reporting paths
/// are read-only and a missing group there means the enrollment side has
/// never run, which deserves a loud error rather than a silent fix-up.
pub async fn require_group(api: &dyn MonitoringApi, name: &str) -> Result<String> {
    match api.get_group_id(name).await? {
        Some(id) => Ok(id),
        None => Err(ZabbixError::GroupNotFound(name.to_string())),
    }
}

/// Enrolls one named host, skipping without a create call if the monitoring
/// platform already knows the name.
pub async fn enroll_host(
    api: &dyn MonitoringApi,
    ip: Ipv4Addr,
    name: &str,
    group_id: &str,
    template_id: &str,
    snmp_version: u8,
) -> Result<Enrollment> {
    // TODO: a --force option that overwrites an existing host.
    if api.host_exists(name).await? {
        tracing::warn!(host = name, %ip, "already exists, skipping");
        return Ok(Enrollment::Skipped);
    }

    let host_id = api
        .create_host(&NewHost {
            ip,
            name,
            group_id,
            template_id,
            snmp_version,
        })
        .await?;
    Ok(Enrollment::Created(host_id))
}

/// Enrolls a single device: resolve group and template, read its sysName
/// over SNMP, then attempt enrollment. Any failure propagates.
pub async fn enroll_single(
    api: &dyn MonitoringApi,
    discovery: &dyn DeviceDiscovery,
    ip: Ipv4Addr,
    class: &DeviceClass,
) -> anyhow::Result<Enrollment> {
    let group_id = get_or_create_group(api, class.hostgroup).await?;
    let template_id = api.get_template_id(class.template).await?;
    let name = discovery.hostname(ip).await?;

    let outcome = enroll_host(api, ip, &name, &group_id, &template_id, class.snmp_version).await?;
    if let Enrollment::Created(ref host_id) = outcome {
        tracing::info!(host = %name, %ip, host_id = %host_id, "enrolled");
    }
    Ok(outcome)
}

/// Enrolls every router in `counts` whose link count is at least
/// `link_floor`. Routers below the floor get no monitoring-API calls at all.
///
/// Hostname-resolution or enrollment failures for one router are logged and
/// counted but never abort the rest of the run. Group/template resolution
/// happens once up front; failure there aborts.
pub async fn enroll_routers(
    api: &dyn MonitoringApi,
    discovery: &dyn DeviceDiscovery,
    counts: &LinkCountMap,
    class: &DeviceClass,
    link_floor: usize,
) -> Result<EnrollSummary> {
    let group_id = get_or_create_group(api, class.hostgroup).await?;
    let template_id = api.get_template_id(class.template).await?;

    let mut summary = EnrollSummary::default();
    for (router_ip, link_count) in counts {
        if *link_count < link_floor {
            continue;
        }

        let ip: Ipv4Addr = match router_ip.parse() {
            Ok(ip) => ip,
            Err(_) => {
                tracing::warn!(router = %router_ip, "topology returned a non-IPv4 router id, skipping");
                summary.failed += 1;
                continue;
            }
        };
        let name = match discovery.hostname(ip).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(router = %router_ip, error = %e, "could not resolve SNMP hostname");
                summary.failed += 1;
                continue;
            }
        };

        tracing::info!(host = %name, router = %router_ip, links = link_count, "enrolling");
        match enroll_host(api, ip, &name, &group_id, &template_id, class.snmp_version).await {
            Ok(Enrollment::Created(host_id)) => {
                tracing::info!(host = %name, host_id = %host_id, "enrolled");
                summary.created += 1;
            }
            Ok(Enrollment::Skipped) => summary.skipped += 1,
            Err(e) => {
                tracing::warn!(host = %name, error = %e, "enrollment failed");
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

/// The full popular-router pipeline: fetch topology, extract link counts,
/// enroll everything at or above the floor as a mesh node.
pub async fn enroll_popular(
    api: &dyn MonitoringApi,
    discovery: &dyn DeviceDiscovery,
    topology: &TopologyClient,
    link_floor: usize,
) -> anyhow::Result<EnrollSummary> {
    let doc = topology.fetch().await.context("fetching OSPF topology")?;
    let counts = extract_link_counts(&doc);
    tracing::info!(routers = counts.len(), link_floor, "extracted link counts");
    Ok(enroll_routers(api, discovery, &counts, &MESH_NODE, link_floor).await?)
}
