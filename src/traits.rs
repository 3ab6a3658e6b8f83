use crate::harvest::records::{
    Announcement, AutonomousContainerDb, AutonomousDb, AutonomousExadata, BlockVolume, BootVolume,
    BootVolumeAttachment, Database, DbHome, DbSystem, DedicatedVmHost, Image, Instance,
    LimitValue, MetricSeries, PatchHistoryEntry, ResourceAvailability, ServiceSummary,
    VolumeAttachment,
};
use crate::model::{AvailabilityDomain, Compartment, Region, TenancyInfo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure of a single remote call, as reported by the API collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("service error {status} ({code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn service(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Service {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// HTTP status, `None` for transport failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Service { status, .. } => Some(*status),
            ApiError::Transport(_) => None,
        }
    }

    /// Provider-specific error code, e.g. `NotAuthorizedOrNotFound`.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Service { code, .. } => Some(code),
            ApiError::Transport(_) => None,
        }
    }
}

/// Immutable per-request scope: which tenancy and region a call targets.
///
/// Every work unit builds its own context before it starts, so no signer or
/// client state is shared between concurrent tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestContext {
    pub tenancy_id: String,
    pub region: String,
}

impl RequestContext {
    pub fn new(tenancy_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            tenancy_id: tenancy_id.into(),
            region: region.into(),
        }
    }
}

/// Parameters of a monitoring summarize call.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub namespace: String,
    /// MQL expression, e.g. `CpuUtilization[1m].mean()`
    pub query: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl MetricQuery {
    /// Metric name the query selects (the text before the interval).
    pub fn metric_name(&self) -> &str {
        self.query.split('[').next().unwrap_or_default()
    }
}

/// Typed list/get operations of the remote management API.
///
/// Implementations own transport, signing, and pagination; every list
/// operation returns the complete listing for its scope. List operations
/// default to an empty listing so a backend only implements the domains it
/// serves.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    // Identity

    async fn get_tenancy(
        &self,
        ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<TenancyInfo, ApiError>;

    async fn list_region_subscriptions(
        &self,
        ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<Vec<Region>, ApiError>;

    /// Every compartment in the tenancy subtree, regardless of state.
    async fn list_compartments(
        &self,
        ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<Vec<Compartment>, ApiError>;

    /// Availability domains of the context's region.
    async fn list_availability_domains(
        &self,
        ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<Vec<AvailabilityDomain>, ApiError>;

    // Announcements

    /// Active announcements, oldest first.
    async fn list_announcements(
        &self,
        _ctx: &RequestContext,
        _tenancy_id: &str,
    ) -> Result<Vec<Announcement>, ApiError> {
        Ok(Vec::new())
    }

    // Limits

    async fn list_services(
        &self,
        _ctx: &RequestContext,
        _tenancy_id: &str,
    ) -> Result<Vec<ServiceSummary>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_limit_values(
        &self,
        _ctx: &RequestContext,
        _tenancy_id: &str,
        _service_name: &str,
    ) -> Result<Vec<LimitValue>, ApiError> {
        Ok(Vec::new())
    }

    async fn get_resource_availability(
        &self,
        _ctx: &RequestContext,
        _tenancy_id: &str,
        _service_name: &str,
        _limit_name: &str,
        _availability_domain: Option<&str>,
    ) -> Result<ResourceAvailability, ApiError> {
        Ok(ResourceAvailability::default())
    }

    // Compute

    async fn list_dedicated_vm_hosts(
        &self,
        _ctx: &RequestContext,
        _compartment_id: &str,
    ) -> Result<Vec<DedicatedVmHost>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_instances(
        &self,
        _ctx: &RequestContext,
        _compartment_id: &str,
    ) -> Result<Vec<Instance>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_volume_attachments(
        &self,
        _ctx: &RequestContext,
        _compartment_id: &str,
    ) -> Result<Vec<VolumeAttachment>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_boot_volume_attachments(
        &self,
        _ctx: &RequestContext,
        _availability_domain: &str,
        _compartment_id: &str,
    ) -> Result<Vec<BootVolumeAttachment>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_images(
        &self,
        _ctx: &RequestContext,
        _compartment_id: &str,
    ) -> Result<Vec<Image>, ApiError> {
        Ok(Vec::new())
    }

    // Block storage

    async fn list_volumes(
        &self,
        _ctx: &RequestContext,
        _compartment_id: &str,
    ) -> Result<Vec<BlockVolume>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_boot_volumes(
        &self,
        _ctx: &RequestContext,
        _availability_domain: &str,
        _compartment_id: &str,
    ) -> Result<Vec<BootVolume>, ApiError> {
        Ok(Vec::new())
    }

    // Database

    async fn list_db_systems(
        &self,
        _ctx: &RequestContext,
        _compartment_id: &str,
    ) -> Result<Vec<DbSystem>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_db_system_patch_history(
        &self,
        _ctx: &RequestContext,
        _db_system_id: &str,
    ) -> Result<Vec<PatchHistoryEntry>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_db_homes(
        &self,
        _ctx: &RequestContext,
        _compartment_id: &str,
    ) -> Result<Vec<DbHome>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_databases(
        &self,
        _ctx: &RequestContext,
        _compartment_id: &str,
        _db_home_id: &str,
    ) -> Result<Vec<Database>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_db_home_patch_history(
        &self,
        _ctx: &RequestContext,
        _db_home_id: &str,
    ) -> Result<Vec<PatchHistoryEntry>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_autonomous_exadata_infrastructures(
        &self,
        _ctx: &RequestContext,
        _compartment_id: &str,
    ) -> Result<Vec<AutonomousExadata>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_autonomous_container_databases(
        &self,
        _ctx: &RequestContext,
        _compartment_id: &str,
    ) -> Result<Vec<AutonomousContainerDb>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_autonomous_databases(
        &self,
        _ctx: &RequestContext,
        _compartment_id: &str,
    ) -> Result<Vec<AutonomousDb>, ApiError> {
        Ok(Vec::new())
    }

    // Monitoring

    /// Aggregated metric series for the whole compartment subtree.
    async fn summarize_metrics_data(
        &self,
        _ctx: &RequestContext,
        _compartment_id: &str,
        _query: &MetricQuery,
    ) -> Result<Vec<MetricSeries>, ApiError> {
        Ok(Vec::new())
    }
}
