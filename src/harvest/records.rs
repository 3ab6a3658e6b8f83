//! Typed resource records and their export layouts.
//!
//! Each struct mirrors what the management API returns for one resource
//! kind. Fields the API may omit are `Option`s; they export as empty cells.
//! The `report_no` column is appended by the export stage, not here.

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::harvest::traits::ExportRecord;
use crate::model::{AvailabilityDomain, Compartment, Region};

fn opt<T: Display>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn time(value: &Option<DateTime<Utc>>) -> String {
    value.map(|t| t.to_rfc3339()).unwrap_or_default()
}

fn list(values: &[String], separator: &str) -> String {
    values.join(separator)
}

// ============================================================================
// Tenancy tables
// ============================================================================

/// One row per cycle identifying the harvested tenancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenancyReport {
    pub tenancy_id: String,
}

impl ExportRecord for TenancyReport {
    const HEADERS: &'static [&'static str] = &["tenancy_id"];

    fn fields(&self) -> Vec<String> {
        vec![self.tenancy_id.clone()]
    }
}

/// A subscribed region, tagged with its tenancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSubscription {
    pub tenancy_id: String,
    pub region: Region,
}

impl ExportRecord for RegionSubscription {
    const HEADERS: &'static [&'static str] =
        &["tenancy_id", "region_key", "region_name", "is_home_region"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.tenancy_id.clone(),
            self.region.key.clone(),
            self.region.name.clone(),
            self.region.is_home_region.to_string(),
        ]
    }
}

impl ExportRecord for Compartment {
    const HEADERS: &'static [&'static str] =
        &["compartment_id", "name", "description", "tenancy_id", "lifecycle_state"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            opt(&self.description),
            self.compartment_id.clone(),
            self.lifecycle_state.to_string(),
        ]
    }
}

impl ExportRecord for AvailabilityDomain {
    const HEADERS: &'static [&'static str] = &["ad_id", "ad_name", "tenancy_id", "region_name"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.compartment_id.clone(),
            self.region_name().unwrap_or_default(),
        ]
    }
}

// ============================================================================
// Announcements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: String,
    pub announcement_type: Option<String>,
    pub reference_ticket_number: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub affected_regions: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
    pub time_created: Option<DateTime<Utc>>,
    pub time_one_title: Option<String>,
    pub time_one_value: Option<DateTime<Utc>>,
    pub time_two_title: Option<String>,
    pub time_two_value: Option<DateTime<Utc>>,
    pub time_updated: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Stamped by the collector
    #[serde(default)]
    pub tenancy_id: String,
}

impl ExportRecord for Announcement {
    const HEADERS: &'static [&'static str] = &[
        "affected_regions",
        "announcement_type",
        "announcement_id",
        "reference_ticket_number",
        "services",
        "summary",
        "time_created",
        "time_one_title",
        "time_one_value",
        "time_two_title",
        "time_two_value",
        "time_updated",
        "type",
        "tenancy_id",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            list(&self.affected_regions, "/"),
            opt(&self.announcement_type),
            self.id.clone(),
            opt(&self.reference_ticket_number),
            list(&self.services, "/"),
            opt(&self.summary),
            time(&self.time_created),
            opt(&self.time_one_title),
            time(&self.time_one_value),
            opt(&self.time_two_title),
            time(&self.time_two_value),
            time(&self.time_updated),
            opt(&self.kind),
            self.tenancy_id.clone(),
        ]
    }
}

// ============================================================================
// Limits
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitValue {
    pub name: String,
    /// `GLOBAL`, `REGION` or `AD`
    pub scope_type: String,
    pub availability_domain: Option<String>,
    /// Configured value; `None` when the service does not report one
    pub value: Option<i64>,
}

impl LimitValue {
    pub fn is_ad_scoped(&self) -> bool {
        self.scope_type.eq_ignore_ascii_case("AD")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceAvailability {
    pub used: Option<i64>,
    pub available: Option<i64>,
}

/// A service limit joined with its current usage in one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitUsage {
    pub region_name: String,
    pub service_name: String,
    pub service_description: Option<String>,
    pub limit_name: String,
    pub availability_domain: Option<String>,
    pub scope_type: String,
    pub value: Option<i64>,
    pub used: Option<i64>,
    pub available: Option<i64>,
    pub tenancy_id: String,
}

impl ExportRecord for LimitUsage {
    const HEADERS: &'static [&'static str] = &[
        "region_name",
        "service_name",
        "service_description",
        "limit_name",
        "availability_domain",
        "scope_type",
        "value",
        "used",
        "available",
        "tenancy_id",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.region_name.clone(),
            self.service_name.clone(),
            opt(&self.service_description),
            self.limit_name.clone(),
            opt(&self.availability_domain),
            self.scope_type.clone(),
            opt(&self.value),
            opt(&self.used),
            opt(&self.available),
            self.tenancy_id.clone(),
        ]
    }
}

// ============================================================================
// Compute
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedicatedVmHost {
    pub id: String,
    pub availability_domain: String,
    pub compartment_id: String,
    pub dedicated_vm_host_shape: String,
    pub display_name: Option<String>,
    pub fault_domain: Option<String>,
    pub lifecycle_state: String,
    pub remaining_ocpus: Option<f64>,
    pub total_ocpus: Option<f64>,
}

impl ExportRecord for DedicatedVmHost {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "availability_domain",
        "compartment_id",
        "dedicated_vm_host_shape",
        "display_name",
        "fault_domain",
        "lifecycle_state",
        "remaining_ocpus",
        "total_ocpus",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.availability_domain.clone(),
            self.compartment_id.clone(),
            self.dedicated_vm_host_shape.clone(),
            opt(&self.display_name),
            opt(&self.fault_domain),
            self.lifecycle_state.clone(),
            opt(&self.remaining_ocpus),
            opt(&self.total_ocpus),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub availability_domain: String,
    pub compartment_id: String,
    pub dedicated_vm_host_id: Option<String>,
    pub display_name: Option<String>,
    pub fault_domain: Option<String>,
    pub lifecycle_state: String,
    pub region: String,
    pub shape: String,
    /// Stamped by the collector
    #[serde(default)]
    pub tenancy_id: String,
}

impl ExportRecord for Instance {
    const HEADERS: &'static [&'static str] = &[
        "instance_id",
        "availability_domain",
        "compartment_id",
        "dedicated_vm_host_id",
        "display_name",
        "fault_domain",
        "lifecycle_state",
        "region",
        "shape",
        "tenancy_id",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.availability_domain.clone(),
            self.compartment_id.clone(),
            opt(&self.dedicated_vm_host_id),
            opt(&self.display_name),
            opt(&self.fault_domain),
            self.lifecycle_state.clone(),
            self.region.clone(),
            self.shape.clone(),
            self.tenancy_id.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootVolumeAttachment {
    pub id: String,
    pub availability_domain: String,
    pub boot_volume_id: String,
    pub compartment_id: String,
    pub display_name: Option<String>,
    pub instance_id: String,
    pub is_pv_encryption_in_transit_enabled: Option<bool>,
    pub lifecycle_state: String,
}

impl ExportRecord for BootVolumeAttachment {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "availability_domain",
        "boot_volume_id",
        "compartment_id",
        "display_name",
        "instance_id",
        "is_pv_encryption_in_transit_enabled",
        "lifecycle_state",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.availability_domain.clone(),
            self.boot_volume_id.clone(),
            self.compartment_id.clone(),
            opt(&self.display_name),
            self.instance_id.clone(),
            opt(&self.is_pv_encryption_in_transit_enabled),
            self.lifecycle_state.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAttachment {
    pub id: String,
    pub attachment_type: String,
    pub availability_domain: String,
    pub compartment_id: String,
    pub device: Option<String>,
    pub display_name: Option<String>,
    pub instance_id: String,
    pub is_pv_encryption_in_transit_enabled: Option<bool>,
    pub is_read_only: Option<bool>,
    pub is_shareable: Option<bool>,
    pub lifecycle_state: String,
    pub volume_id: String,
}

impl ExportRecord for VolumeAttachment {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "attachment_type",
        "availability_domain",
        "compartment_id",
        "device",
        "display_name",
        "instance_id",
        "is_pv_encryption_in_transit_enabled",
        "is_read_only",
        "is_shareable",
        "lifecycle_state",
        "volume_id",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.attachment_type.clone(),
            self.availability_domain.clone(),
            self.compartment_id.clone(),
            opt(&self.device),
            opt(&self.display_name),
            self.instance_id.clone(),
            opt(&self.is_pv_encryption_in_transit_enabled),
            opt(&self.is_read_only),
            opt(&self.is_shareable),
            self.lifecycle_state.clone(),
            self.volume_id.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchOptions {
    pub boot_volume_type: Option<String>,
    pub firmware: Option<String>,
    pub network_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub agent_features: Option<String>,
    pub base_image_id: Option<String>,
    /// Absent for platform images
    pub compartment_id: Option<String>,
    pub display_name: Option<String>,
    pub launch_mode: Option<String>,
    pub launch_options: Option<LaunchOptions>,
    pub operating_system: String,
    pub operating_system_version: String,
    pub size_in_mbs: Option<i64>,
    pub time_created: Option<DateTime<Utc>>,
}

impl ExportRecord for Image {
    const HEADERS: &'static [&'static str] = &[
        "agent_features",
        "base_image_id",
        "compartment_id",
        "display_name",
        "id",
        "launch_mode",
        "boot_volume_type",
        "firmware",
        "network_type",
        "operating_system",
        "operating_system_version",
        "size_in_mbs",
        "time_created",
    ];

    fn fields(&self) -> Vec<String> {
        let launch = self.launch_options.as_ref();
        vec![
            opt(&self.agent_features),
            opt(&self.base_image_id),
            opt(&self.compartment_id),
            opt(&self.display_name),
            self.id.clone(),
            opt(&self.launch_mode),
            launch.map(|l| opt(&l.boot_volume_type)).unwrap_or_default(),
            launch.map(|l| opt(&l.firmware)).unwrap_or_default(),
            launch.map(|l| opt(&l.network_type)).unwrap_or_default(),
            self.operating_system.clone(),
            self.operating_system_version.clone(),
            opt(&self.size_in_mbs),
            time(&self.time_created),
        ]
    }
}

// ============================================================================
// Block storage
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootVolume {
    pub id: String,
    pub availability_domain: String,
    pub compartment_id: String,
    pub display_name: Option<String>,
    pub image_id: Option<String>,
    pub is_hydrated: Option<bool>,
    pub kms_key_id: Option<String>,
    pub lifecycle_state: String,
    pub size_in_gbs: Option<i64>,
    pub size_in_mbs: Option<i64>,
    pub volume_group_id: Option<String>,
    pub vpus_per_gb: Option<i64>,
}

impl ExportRecord for BootVolume {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "availability_domain",
        "compartment_id",
        "display_name",
        "image_id",
        "is_hydrated",
        "kms_key_id",
        "lifecycle_state",
        "size_in_gbs",
        "size_in_mbs",
        "volume_group_id",
        "vpus_per_gb",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.availability_domain.clone(),
            self.compartment_id.clone(),
            opt(&self.display_name),
            opt(&self.image_id),
            opt(&self.is_hydrated),
            opt(&self.kms_key_id),
            self.lifecycle_state.clone(),
            opt(&self.size_in_gbs),
            opt(&self.size_in_mbs),
            opt(&self.volume_group_id),
            opt(&self.vpus_per_gb),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockVolume {
    pub id: String,
    pub availability_domain: String,
    pub compartment_id: String,
    pub display_name: Option<String>,
    pub is_hydrated: Option<bool>,
    pub kms_key_id: Option<String>,
    pub lifecycle_state: String,
    pub size_in_gbs: Option<i64>,
    pub size_in_mbs: Option<i64>,
    pub volume_group_id: Option<String>,
    pub vpus_per_gb: Option<i64>,
}

impl ExportRecord for BlockVolume {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "availability_domain",
        "compartment_id",
        "display_name",
        "is_hydrated",
        "kms_key_id",
        "lifecycle_state",
        "size_in_gbs",
        "size_in_mbs",
        "volume_group_id",
        "vpus_per_gb",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.availability_domain.clone(),
            self.compartment_id.clone(),
            opt(&self.display_name),
            opt(&self.is_hydrated),
            opt(&self.kms_key_id),
            self.lifecycle_state.clone(),
            opt(&self.size_in_gbs),
            opt(&self.size_in_mbs),
            opt(&self.volume_group_id),
            opt(&self.vpus_per_gb),
        ]
    }
}

// ============================================================================
// Database
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbSystem {
    pub id: String,
    pub availability_domain: String,
    pub cluster_name: Option<String>,
    pub compartment_id: String,
    pub cpu_core_count: Option<i64>,
    pub data_storage_percentage: Option<i64>,
    pub data_storage_size_in_gbs: Option<i64>,
    pub database_edition: Option<String>,
    pub disk_redundancy: Option<String>,
    pub display_name: Option<String>,
    pub domain: Option<String>,
    pub hostname: Option<String>,
    pub last_patch_history_entry_id: Option<String>,
    pub lifecycle_state: String,
    pub node_count: Option<i64>,
    pub reco_storage_size_in_gb: Option<i64>,
    pub shape: Option<String>,
    pub sparse_diskgroup: Option<bool>,
    pub version: Option<String>,
    /// Stamped by the collector
    #[serde(default)]
    pub tenancy_id: String,
}

impl DbSystem {
    /// Region token embedded in the OCID (`ocid1.dbsystem.oc1.<region>.<id>`).
    pub fn region_token(&self) -> Option<&str> {
        self.id.split('.').nth(3).filter(|s| !s.is_empty())
    }
}

impl ExportRecord for DbSystem {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "availability_domain",
        "cluster_name",
        "compartment_id",
        "cpu_core_count",
        "data_storage_percentage",
        "data_storage_size_in_gbs",
        "database_edition",
        "disk_redundancy",
        "display_name",
        "domain",
        "hostname",
        "last_patch_history_entry_id",
        "lifecycle_state",
        "node_count",
        "reco_storage_size_in_gb",
        "shape",
        "sparse_diskgroup",
        "version",
        "region_id",
        "tenancy_id",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.availability_domain.clone(),
            opt(&self.cluster_name),
            self.compartment_id.clone(),
            opt(&self.cpu_core_count),
            opt(&self.data_storage_percentage),
            opt(&self.data_storage_size_in_gbs),
            opt(&self.database_edition),
            opt(&self.disk_redundancy),
            opt(&self.display_name),
            opt(&self.domain),
            opt(&self.hostname),
            opt(&self.last_patch_history_entry_id),
            self.lifecycle_state.clone(),
            opt(&self.node_count),
            opt(&self.reco_storage_size_in_gb),
            opt(&self.shape),
            opt(&self.sparse_diskgroup),
            opt(&self.version),
            self.region_token().unwrap_or_default().to_string(),
            self.tenancy_id.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbHome {
    pub id: String,
    pub compartment_id: String,
    pub db_system_id: Option<String>,
    pub db_version: Option<String>,
    pub display_name: Option<String>,
    pub last_patch_history_entry_id: Option<String>,
    pub lifecycle_state: String,
}

impl ExportRecord for DbHome {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "compartment_id",
        "db_system_id",
        "db_version",
        "display_name",
        "last_patch_history_entry_id",
        "lifecycle_state",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.compartment_id.clone(),
            opt(&self.db_system_id),
            opt(&self.db_version),
            opt(&self.display_name),
            opt(&self.last_patch_history_entry_id),
            self.lifecycle_state.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbBackupConfig {
    pub auto_backup_enabled: Option<bool>,
    pub auto_backup_window: Option<String>,
    pub backup_destination_details: Option<String>,
    pub recovery_window_in_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub id: String,
    pub compartment_id: String,
    pub db_backup_config: Option<DbBackupConfig>,
    pub db_home_id: Option<String>,
    pub db_name: String,
    pub db_unique_name: Option<String>,
    pub db_workload: Option<String>,
    pub lifecycle_state: String,
    pub pdb_name: Option<String>,
}

impl ExportRecord for Database {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "compartment_id",
        "auto_backup_enabled",
        "auto_backup_window",
        "backup_destination_details",
        "recovery_window_in_days",
        "db_home_id",
        "db_name",
        "db_unique_name",
        "db_workload",
        "lifecycle_state",
        "pdb_name",
    ];

    fn fields(&self) -> Vec<String> {
        let backup = self.db_backup_config.as_ref();
        vec![
            self.id.clone(),
            self.compartment_id.clone(),
            // no backup configuration means backups are off
            backup
                .and_then(|b| b.auto_backup_enabled)
                .unwrap_or(false)
                .to_string(),
            backup.map(|b| opt(&b.auto_backup_window)).unwrap_or_default(),
            backup
                .map(|b| opt(&b.backup_destination_details))
                .unwrap_or_default(),
            backup
                .map(|b| opt(&b.recovery_window_in_days))
                .unwrap_or_default(),
            opt(&self.db_home_id),
            self.db_name.clone(),
            opt(&self.db_unique_name),
            opt(&self.db_workload),
            self.lifecycle_state.clone(),
            opt(&self.pdb_name),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutonomousExadata {
    pub id: String,
    pub availability_domain: String,
    pub compartment_id: String,
    pub display_name: Option<String>,
    pub domain: Option<String>,
    pub hostname: Option<String>,
    pub last_maintenance_run_id: Option<String>,
    pub license_model: Option<String>,
    pub lifecycle_state: String,
    pub maintenance_window: Option<String>,
    pub next_maintenance_run_id: Option<String>,
    pub shape: Option<String>,
}

impl ExportRecord for AutonomousExadata {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "availability_domain",
        "compartment_id",
        "display_name",
        "domain",
        "hostname",
        "last_maintenance_run_id",
        "license_model",
        "lifecycle_state",
        "maintenance_window",
        "next_maintenance_run_id",
        "shape",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.availability_domain.clone(),
            self.compartment_id.clone(),
            opt(&self.display_name),
            opt(&self.domain),
            opt(&self.hostname),
            opt(&self.last_maintenance_run_id),
            opt(&self.license_model),
            self.lifecycle_state.clone(),
            opt(&self.maintenance_window),
            opt(&self.next_maintenance_run_id),
            opt(&self.shape),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutonomousContainerDb {
    pub id: String,
    pub autonomous_exadata_infrastructure_id: Option<String>,
    pub availability_domain: Option<String>,
    pub backup_config: Option<String>,
    pub compartment_id: String,
    pub display_name: Option<String>,
    pub last_maintenance_run_id: Option<String>,
    pub lifecycle_state: String,
    pub maintenance_window: Option<String>,
    pub next_maintenance_run_id: Option<String>,
    pub patch_model: Option<String>,
    pub service_level_agreement_type: Option<String>,
}

impl ExportRecord for AutonomousContainerDb {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "autonomous_exadata_infrastructure_id",
        "availability_domain",
        "backup_config",
        "compartment_id",
        "display_name",
        "last_maintenance_run_id",
        "lifecycle_state",
        "maintenance_window",
        "next_maintenance_run_id",
        "patch_model",
        "service_level_agreement_type",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            opt(&self.autonomous_exadata_infrastructure_id),
            opt(&self.availability_domain),
            opt(&self.backup_config),
            self.compartment_id.clone(),
            opt(&self.display_name),
            opt(&self.last_maintenance_run_id),
            self.lifecycle_state.clone(),
            opt(&self.maintenance_window),
            opt(&self.next_maintenance_run_id),
            opt(&self.patch_model),
            opt(&self.service_level_agreement_type),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutonomousDb {
    pub id: String,
    pub autonomous_container_database_id: Option<String>,
    pub compartment_id: String,
    pub cpu_core_count: Option<i64>,
    pub data_safe_status: Option<String>,
    pub data_storage_size_in_tbs: Option<i64>,
    pub db_name: Option<String>,
    pub db_version: Option<String>,
    pub db_workload: Option<String>,
    pub display_name: Option<String>,
    pub is_auto_scaling_enabled: Option<bool>,
    pub is_dedicated: Option<bool>,
    pub is_free_tier: Option<bool>,
    pub lifecycle_state: String,
    #[serde(default)]
    pub whitelisted_ips: Vec<String>,
}

impl ExportRecord for AutonomousDb {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "autonomous_container_database_id",
        "compartment_id",
        "cpu_core_count",
        "data_safe_status",
        "data_storage_size_in_tbs",
        "db_name",
        "db_version",
        "db_workload",
        "display_name",
        "is_auto_scaling_enabled",
        "is_dedicated",
        "is_free_tier",
        "lifecycle_state",
        "whitelisted_ips",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            opt(&self.autonomous_container_database_id),
            self.compartment_id.clone(),
            opt(&self.cpu_core_count),
            opt(&self.data_safe_status),
            opt(&self.data_storage_size_in_tbs),
            opt(&self.db_name),
            opt(&self.db_version),
            opt(&self.db_workload),
            opt(&self.display_name),
            opt(&self.is_auto_scaling_enabled),
            opt(&self.is_dedicated),
            opt(&self.is_free_tier),
            self.lifecycle_state.clone(),
            list(&self.whitelisted_ips, " "),
        ]
    }
}

/// Patch operation applied to a DB system or DB home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchHistoryEntry {
    pub id: String,
    pub action: Option<String>,
    pub lifecycle_details: Option<String>,
    pub lifecycle_state: String,
    pub patch_id: String,
    pub time_ended: Option<DateTime<Utc>>,
    pub time_started: Option<DateTime<Utc>>,
}

impl ExportRecord for PatchHistoryEntry {
    const HEADERS: &'static [&'static str] = &[
        "action",
        "id",
        "lifecycle_details",
        "lifecycle_state",
        "patch_id",
        "time_ended",
        "time_started",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            opt(&self.action),
            self.id.clone(),
            opt(&self.lifecycle_details),
            self.lifecycle_state.clone(),
            self.patch_id.clone(),
            time(&self.time_ended),
            time(&self.time_started),
        ]
    }
}

// ============================================================================
// Monitoring
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// One aggregated series returned by a summarize call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
    #[serde(default)]
    pub aggregated_datapoints: Vec<Datapoint>,
}

/// A single flattened datapoint of a metric series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub metric_name: String,
    pub resource_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub tenancy_id: String,
}

impl MetricPoint {
    /// Flattens a series into one point per aggregated datapoint.
    pub fn from_series(series: &MetricSeries, tenancy_id: &str) -> Vec<MetricPoint> {
        let resource_id = series.dimensions.get("resourceId").cloned();
        series
            .aggregated_datapoints
            .iter()
            .map(|point| MetricPoint {
                metric_name: series.name.clone(),
                resource_id: resource_id.clone(),
                timestamp: point.timestamp,
                value: point.value,
                tenancy_id: tenancy_id.to_string(),
            })
            .collect()
    }
}

impl ExportRecord for MetricPoint {
    const HEADERS: &'static [&'static str] =
        &["metric_name", "resource_id", "timestamp", "value", "tenancy_id"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.metric_name.clone(),
            opt(&self.resource_id),
            self.timestamp.to_rfc3339(),
            self.value.to_string(),
            self.tenancy_id.clone(),
        ]
    }
}
