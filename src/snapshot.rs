//! Recorded-inventory backend for [`ManagementApi`].
//!
//! A [`Snapshot`] is a JSON document holding what the management API would
//! return for one tenancy: identity data at the top level, everything else
//! grouped per region. [`SnapshotApi`] serves it back through the regular
//! list/get operations, applying the same scoping (region, compartment,
//! availability domain) a live API would.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::harvest::records::{
    Announcement, AutonomousContainerDb, AutonomousDb, AutonomousExadata, BlockVolume, BootVolume,
    BootVolumeAttachment, Database, DbHome, DbSystem, DedicatedVmHost, Image, Instance,
    LimitValue, MetricSeries, PatchHistoryEntry, ResourceAvailability, ServiceSummary,
    VolumeAttachment,
};
use crate::model::{AvailabilityDomain, Compartment, Region, TenancyInfo};
use crate::traits::{ApiError, ManagementApi, MetricQuery, RequestContext};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid snapshot document: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Document
// ============================================================================

/// Recorded inventory of one tenancy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub tenancy: TenancyInfo,
    pub regions: Vec<Region>,
    pub compartments: Vec<Compartment>,
    pub announcements: Vec<Announcement>,
    /// Keyed by region name
    pub inventory: BTreeMap<String, RegionInventory>,
}

/// Everything recorded for a single region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionInventory {
    pub availability_domains: Vec<AvailabilityDomain>,
    pub services: Vec<ServiceSummary>,
    /// Limit values keyed by service name
    pub limits: BTreeMap<String, Vec<LimitValue>>,
    pub usage: Vec<RecordedUsage>,
    pub dedicated_vm_hosts: Vec<DedicatedVmHost>,
    pub instances: Vec<Instance>,
    pub volume_attachments: Vec<VolumeAttachment>,
    pub boot_volume_attachments: Vec<BootVolumeAttachment>,
    pub images: Vec<Image>,
    pub volumes: Vec<BlockVolume>,
    pub boot_volumes: Vec<BootVolume>,
    pub db_systems: Vec<DbSystem>,
    /// Keyed by DB system id
    pub db_system_patch_history: BTreeMap<String, Vec<PatchHistoryEntry>>,
    pub db_homes: Vec<DbHome>,
    pub databases: Vec<Database>,
    /// Keyed by DB home id
    pub db_home_patch_history: BTreeMap<String, Vec<PatchHistoryEntry>>,
    pub autonomous_exadata_infrastructures: Vec<AutonomousExadata>,
    pub autonomous_container_databases: Vec<AutonomousContainerDb>,
    pub autonomous_databases: Vec<AutonomousDb>,
    pub metrics: Vec<MetricSeries>,
}

/// Usage of one limit, optionally for a single availability domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordedUsage {
    pub service_name: String,
    pub limit_name: String,
    pub availability_domain: Option<String>,
    pub used: Option<i64>,
    pub available: Option<i64>,
}

impl Snapshot {
    /// Reads a snapshot document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] if the file cannot be read and
    /// [`SnapshotError::Json`] if it is not a valid snapshot.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path)
            .await
            .map_err(|source| SnapshotError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let snapshot: Snapshot = serde_json::from_slice(&raw)?;
        info!(
            path = %path.display(),
            tenancy = %snapshot.tenancy.id,
            regions = snapshot.regions.len(),
            "Loaded inventory snapshot"
        );
        Ok(snapshot)
    }

    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(raw)?)
    }
}

// ============================================================================
// API
// ============================================================================

/// Serves a [`Snapshot`] through [`ManagementApi`].
///
/// Requests for a tenancy other than the recorded one, or for a region with
/// no inventory, fail with `404 NotAuthorizedOrNotFound` like the live API.
#[derive(Debug, Clone)]
pub struct SnapshotApi {
    snapshot: Snapshot,
}

impl SnapshotApi {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    fn check_tenancy(&self, tenancy_id: &str) -> Result<(), ApiError> {
        if tenancy_id == self.snapshot.tenancy.id {
            Ok(())
        } else {
            Err(not_found(format!("tenancy {tenancy_id}")))
        }
    }

    fn region(&self, ctx: &RequestContext) -> Result<&RegionInventory, ApiError> {
        self.snapshot
            .inventory
            .get(&ctx.region)
            .ok_or_else(|| not_found(format!("region {}", ctx.region)))
    }

    fn in_compartment<T, F>(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
        select: F,
    ) -> Result<Vec<T>, ApiError>
    where
        T: Clone,
        F: Fn(&RegionInventory) -> &Vec<T>,
        T: InCompartment,
    {
        let inventory = self.region(ctx)?;
        let items: Vec<T> = select(inventory)
            .iter()
            .filter(|item| item.compartment_id() == Some(compartment_id))
            .cloned()
            .collect();
        debug!(
            region = %ctx.region,
            compartment = compartment_id,
            count = items.len(),
            "Served listing"
        );
        Ok(items)
    }
}

fn not_found(what: String) -> ApiError {
    ApiError::service(
        404,
        "NotAuthorizedOrNotFound",
        format!("{what} not found in snapshot"),
    )
}

/// Records scoped to a compartment.
trait InCompartment {
    fn compartment_id(&self) -> Option<&str>;
}

macro_rules! in_compartment {
    ($($ty:ty),* $(,)?) => {
        $(impl InCompartment for $ty {
            fn compartment_id(&self) -> Option<&str> {
                Some(&self.compartment_id)
            }
        })*
    };
}

in_compartment!(
    DedicatedVmHost,
    Instance,
    VolumeAttachment,
    BootVolumeAttachment,
    BlockVolume,
    BootVolume,
    DbSystem,
    DbHome,
    Database,
    AutonomousExadata,
    AutonomousContainerDb,
    AutonomousDb,
);

impl InCompartment for Image {
    fn compartment_id(&self) -> Option<&str> {
        self.compartment_id.as_deref()
    }
}

#[async_trait]
impl ManagementApi for SnapshotApi {
    async fn get_tenancy(
        &self,
        _ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<TenancyInfo, ApiError> {
        self.check_tenancy(tenancy_id)?;
        Ok(self.snapshot.tenancy.clone())
    }

    async fn list_region_subscriptions(
        &self,
        _ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<Vec<Region>, ApiError> {
        self.check_tenancy(tenancy_id)?;
        Ok(self.snapshot.regions.clone())
    }

    async fn list_compartments(
        &self,
        _ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<Vec<Compartment>, ApiError> {
        self.check_tenancy(tenancy_id)?;
        Ok(self.snapshot.compartments.clone())
    }

    async fn list_availability_domains(
        &self,
        ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<Vec<AvailabilityDomain>, ApiError> {
        self.check_tenancy(tenancy_id)?;
        Ok(self.region(ctx)?.availability_domains.clone())
    }

    async fn list_announcements(
        &self,
        _ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<Vec<Announcement>, ApiError> {
        self.check_tenancy(tenancy_id)?;
        let mut announcements = self.snapshot.announcements.clone();
        announcements.sort_by_key(|a| a.time_created);
        Ok(announcements)
    }

    async fn list_services(
        &self,
        ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<Vec<ServiceSummary>, ApiError> {
        self.check_tenancy(tenancy_id)?;
        Ok(self.region(ctx)?.services.clone())
    }

    async fn list_limit_values(
        &self,
        ctx: &RequestContext,
        tenancy_id: &str,
        service_name: &str,
    ) -> Result<Vec<LimitValue>, ApiError> {
        self.check_tenancy(tenancy_id)?;
        Ok(self
            .region(ctx)?
            .limits
            .get(service_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_resource_availability(
        &self,
        ctx: &RequestContext,
        tenancy_id: &str,
        service_name: &str,
        limit_name: &str,
        availability_domain: Option<&str>,
    ) -> Result<ResourceAvailability, ApiError> {
        self.check_tenancy(tenancy_id)?;
        self.region(ctx)?
            .usage
            .iter()
            .find(|u| {
                u.service_name == service_name
                    && u.limit_name == limit_name
                    && u.availability_domain.as_deref() == availability_domain
            })
            .map(|u| ResourceAvailability {
                used: u.used,
                available: u.available,
            })
            .ok_or_else(|| not_found(format!("usage of {service_name}/{limit_name}")))
    }

    async fn list_dedicated_vm_hosts(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<DedicatedVmHost>, ApiError> {
        self.in_compartment(ctx, compartment_id, |r| &r.dedicated_vm_hosts)
    }

    async fn list_instances(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<Instance>, ApiError> {
        self.in_compartment(ctx, compartment_id, |r| &r.instances)
    }

    async fn list_volume_attachments(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<VolumeAttachment>, ApiError> {
        self.in_compartment(ctx, compartment_id, |r| &r.volume_attachments)
    }

    async fn list_boot_volume_attachments(
        &self,
        ctx: &RequestContext,
        availability_domain: &str,
        compartment_id: &str,
    ) -> Result<Vec<BootVolumeAttachment>, ApiError> {
        let mut attachments =
            self.in_compartment(ctx, compartment_id, |r| &r.boot_volume_attachments)?;
        attachments.retain(|a| a.availability_domain == availability_domain);
        Ok(attachments)
    }

    async fn list_images(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<Image>, ApiError> {
        self.in_compartment(ctx, compartment_id, |r| &r.images)
    }

    async fn list_volumes(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<BlockVolume>, ApiError> {
        self.in_compartment(ctx, compartment_id, |r| &r.volumes)
    }

    async fn list_boot_volumes(
        &self,
        ctx: &RequestContext,
        availability_domain: &str,
        compartment_id: &str,
    ) -> Result<Vec<BootVolume>, ApiError> {
        let mut volumes = self.in_compartment(ctx, compartment_id, |r| &r.boot_volumes)?;
        volumes.retain(|v| v.availability_domain == availability_domain);
        Ok(volumes)
    }

    async fn list_db_systems(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<DbSystem>, ApiError> {
        self.in_compartment(ctx, compartment_id, |r| &r.db_systems)
    }

    async fn list_db_system_patch_history(
        &self,
        ctx: &RequestContext,
        db_system_id: &str,
    ) -> Result<Vec<PatchHistoryEntry>, ApiError> {
        Ok(self
            .region(ctx)?
            .db_system_patch_history
            .get(db_system_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_db_homes(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<DbHome>, ApiError> {
        self.in_compartment(ctx, compartment_id, |r| &r.db_homes)
    }

    async fn list_databases(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
        db_home_id: &str,
    ) -> Result<Vec<Database>, ApiError> {
        let mut databases = self.in_compartment(ctx, compartment_id, |r| &r.databases)?;
        databases.retain(|d| d.db_home_id.as_deref() == Some(db_home_id));
        Ok(databases)
    }

    async fn list_db_home_patch_history(
        &self,
        ctx: &RequestContext,
        db_home_id: &str,
    ) -> Result<Vec<PatchHistoryEntry>, ApiError> {
        Ok(self
            .region(ctx)?
            .db_home_patch_history
            .get(db_home_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_autonomous_exadata_infrastructures(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<AutonomousExadata>, ApiError> {
        self.in_compartment(ctx, compartment_id, |r| &r.autonomous_exadata_infrastructures)
    }

    async fn list_autonomous_container_databases(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<AutonomousContainerDb>, ApiError> {
        self.in_compartment(ctx, compartment_id, |r| &r.autonomous_container_databases)
    }

    async fn list_autonomous_databases(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<AutonomousDb>, ApiError> {
        self.in_compartment(ctx, compartment_id, |r| &r.autonomous_databases)
    }

    async fn summarize_metrics_data(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
        query: &MetricQuery,
    ) -> Result<Vec<MetricSeries>, ApiError> {
        self.check_tenancy(compartment_id)?;
        let window = query.start_time..query.end_time;
        Ok(self
            .region(ctx)?
            .metrics
            .iter()
            .filter(|s| s.namespace == query.namespace && s.name == query.metric_name())
            .map(|s| MetricSeries {
                aggregated_datapoints: s
                    .aggregated_datapoints
                    .iter()
                    .filter(|p| window.contains(&p.timestamp))
                    .cloned()
                    .collect(),
                ..s.clone()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "tenancy": { "id": "ocid1.tenancy.oc1..t", "name": "acme" },
        "regions": [
            { "key": "FRA", "name": "eu-frankfurt-1", "is_home_region": true }
        ],
        "compartments": [
            {
                "id": "ocid1.compartment.oc1..a",
                "name": "apps",
                "description": null,
                "compartment_id": "ocid1.tenancy.oc1..t",
                "lifecycle_state": "ACTIVE"
            }
        ],
        "inventory": {
            "eu-frankfurt-1": {
                "boot_volumes": [
                    {
                        "id": "bv1",
                        "availability_domain": "Uocm:EU-FRANKFURT-1-AD-1",
                        "compartment_id": "ocid1.compartment.oc1..a",
                        "display_name": null,
                        "image_id": null,
                        "is_hydrated": true,
                        "kms_key_id": null,
                        "lifecycle_state": "AVAILABLE",
                        "size_in_gbs": 50,
                        "size_in_mbs": null,
                        "volume_group_id": null,
                        "vpus_per_gb": 10
                    },
                    {
                        "id": "bv2",
                        "availability_domain": "Uocm:EU-FRANKFURT-1-AD-2",
                        "compartment_id": "ocid1.compartment.oc1..a",
                        "display_name": null,
                        "image_id": null,
                        "is_hydrated": true,
                        "kms_key_id": null,
                        "lifecycle_state": "AVAILABLE",
                        "size_in_gbs": 50,
                        "size_in_mbs": null,
                        "volume_group_id": null,
                        "vpus_per_gb": 10
                    }
                ]
            }
        }
    }"#;

    fn api() -> SnapshotApi {
        SnapshotApi::new(Snapshot::from_json(DOCUMENT).unwrap())
    }

    #[tokio::test]
    async fn test_scoping_by_compartment_and_ad() {
        let api = api();
        let ctx = RequestContext::new("ocid1.tenancy.oc1..t", "eu-frankfurt-1");

        let volumes = api
            .list_boot_volumes(&ctx, "Uocm:EU-FRANKFURT-1-AD-2", "ocid1.compartment.oc1..a")
            .await
            .unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].id, "bv2");

        let none = api
            .list_boot_volumes(&ctx, "Uocm:EU-FRANKFURT-1-AD-1", "ocid1.compartment.oc1..other")
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_region_and_tenancy_are_not_found() {
        let api = api();

        let ctx = RequestContext::new("ocid1.tenancy.oc1..t", "us-ashburn-1");
        let err = api.list_instances(&ctx, "ocid1.compartment.oc1..a").await.unwrap_err();
        assert_eq!(err.status(), Some(404));

        let ctx = RequestContext::new("ocid1.tenancy.oc1..t", "eu-frankfurt-1");
        let err = api.get_tenancy(&ctx, "ocid1.tenancy.oc1..other").await.unwrap_err();
        assert_eq!(err.code(), Some("NotAuthorizedOrNotFound"));
    }

    #[tokio::test]
    async fn test_missing_sections_default_to_empty() {
        let api = api();
        let ctx = RequestContext::new("ocid1.tenancy.oc1..t", "eu-frankfurt-1");

        assert!(api.list_services(&ctx, "ocid1.tenancy.oc1..t").await.unwrap().is_empty());
        assert!(api
            .list_db_system_patch_history(&ctx, "ocid1.dbsystem.oc1..x")
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(
            Snapshot::from_json("{\"regions\": 3}"),
            Err(SnapshotError::Json(_))
        ));
    }
}
