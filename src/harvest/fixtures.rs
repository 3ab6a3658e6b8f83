//! Shared builders for collector and coordinator tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::executor::CallExecutor;
use crate::harvest::records::{
    AutonomousContainerDb, AutonomousDb, AutonomousExadata, BlockVolume, Database, DbHome,
    DbSystem, Instance, MetricSeries, PatchHistoryEntry,
};
use crate::harvest::traits::{HarvestContext, Scope};
use crate::model::{
    AvailabilityDomain, Compartment, LifecycleState, Region, Tenancy, TenancyInfo,
};
use crate::retry::RetryPolicy;
use crate::snapshot::{RegionInventory, Snapshot, SnapshotApi};
use crate::traits::{ApiError, ManagementApi, MetricQuery, RequestContext};

pub const TENANCY_ID: &str = "ocid1.tenancy.oc1..acme";

pub fn tenancy_info() -> TenancyInfo {
    TenancyInfo {
        id: TENANCY_ID.to_string(),
        name: "acme".to_string(),
        description: Some("Acme tenancy".to_string()),
        home_region_key: Some("FRA".to_string()),
    }
}

pub fn region(key: &str, name: &str, home: bool) -> Region {
    Region {
        key: key.to_string(),
        name: name.to_string(),
        is_home_region: home,
    }
}

pub fn compartment(id: &str, name: &str, state: LifecycleState) -> Compartment {
    Compartment {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        compartment_id: TENANCY_ID.to_string(),
        lifecycle_state: state,
    }
}

pub fn availability_domain(name: &str) -> AvailabilityDomain {
    AvailabilityDomain {
        id: format!("ocid1.availabilitydomain.oc1..{}", name.to_lowercase()),
        name: name.to_string(),
        compartment_id: TENANCY_ID.to_string(),
    }
}

/// Frankfurt (home, two ADs) and Ashburn (one AD), with `apps` active and
/// `retired` deleted.
pub fn tenancy() -> Tenancy {
    Tenancy::new(
        tenancy_info(),
        vec![
            region("FRA", "eu-frankfurt-1", true),
            region("IAD", "us-ashburn-1", false),
        ],
        vec![
            compartment("ocid1.compartment.oc1..apps", "apps", LifecycleState::Active),
            compartment("ocid1.compartment.oc1..retired", "retired", LifecycleState::Deleted),
        ],
        vec![
            availability_domain("Uocm:EU-FRANKFURT-1-AD-1"),
            availability_domain("Uocm:EU-FRANKFURT-1-AD-2"),
            availability_domain("Uocm:US-ASHBURN-AD-1"),
        ],
    )
}

pub fn context(api: Arc<dyn ManagementApi>) -> HarvestContext {
    HarvestContext {
        api,
        calls: CallExecutor::new(RetryPolicy::for_testing()),
        tenancy: Arc::new(tenancy()),
    }
}

/// Compartment scope in `region`, with that region's availability domains.
pub fn compartment_scope(cx: &HarvestContext, region: &str, compartment_id: &str) -> Scope {
    let compartment = cx
        .tenancy
        .compartments
        .iter()
        .find(|c| c.id == compartment_id)
        .cloned();
    Scope {
        request: RequestContext::new(TENANCY_ID, region),
        compartment,
        availability_domains: cx.tenancy.availability_domains_in(region),
    }
}

/// Snapshot of [`tenancy`] with recorded inventory for the given regions.
pub fn snapshot(inventory: Vec<(&str, RegionInventory)>) -> Snapshot {
    let tenancy = tenancy();
    Snapshot {
        tenancy: tenancy_info(),
        regions: tenancy.regions.clone(),
        compartments: tenancy.compartments[1..].to_vec(),
        announcements: Vec::new(),
        inventory: inventory
            .into_iter()
            .map(|(region, inventory)| (region.to_string(), inventory))
            .collect(),
    }
}

pub fn region_scope(region: &str) -> Scope {
    Scope {
        request: RequestContext::new(TENANCY_ID, region),
        compartment: None,
        availability_domains: Vec::new(),
    }
}

/// Wraps a [`SnapshotApi`] and fails selected operations.
///
/// Every issued operation is recorded, including failing ones.
pub struct FaultyApi {
    inner: SnapshotApi,
    faults: Mutex<HashMap<&'static str, Fault>>,
    issued: Mutex<Vec<&'static str>>,
}

struct Fault {
    error: ApiError,
    /// Failures left before the operation recovers; `None` never recovers
    remaining: Option<usize>,
}

impl FaultyApi {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: SnapshotApi::new(snapshot),
            faults: Mutex::new(HashMap::new()),
            issued: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(self, operation: &'static str, error: ApiError) -> Self {
        self.faults.lock().insert(operation, Fault { error, remaining: None });
        self
    }

    /// Fails the first `times` calls of `operation`, across all callers.
    pub fn failing_times(self, operation: &'static str, error: ApiError, times: usize) -> Self {
        self.faults.lock().insert(
            operation,
            Fault {
                error,
                remaining: Some(times),
            },
        );
        self
    }

    pub fn issued(&self, operation: &str) -> usize {
        self.issued.lock().iter().filter(|op| **op == operation).count()
    }

    fn check(&self, operation: &'static str) -> Result<(), ApiError> {
        self.issued.lock().push(operation);
        let mut faults = self.faults.lock();
        let Some(fault) = faults.get_mut(operation) else {
            return Ok(());
        };
        match &mut fault.remaining {
            None => Err(fault.error.clone()),
            Some(0) => Ok(()),
            Some(left) => {
                *left -= 1;
                Err(fault.error.clone())
            }
        }
    }
}

#[async_trait]
impl ManagementApi for FaultyApi {
    async fn get_tenancy(
        &self,
        ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<TenancyInfo, ApiError> {
        self.check("get_tenancy")?;
        self.inner.get_tenancy(ctx, tenancy_id).await
    }

    async fn list_region_subscriptions(
        &self,
        ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<Vec<Region>, ApiError> {
        self.check("list_region_subscriptions")?;
        self.inner.list_region_subscriptions(ctx, tenancy_id).await
    }

    async fn list_compartments(
        &self,
        ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<Vec<Compartment>, ApiError> {
        self.check("list_compartments")?;
        self.inner.list_compartments(ctx, tenancy_id).await
    }

    async fn list_availability_domains(
        &self,
        ctx: &RequestContext,
        tenancy_id: &str,
    ) -> Result<Vec<AvailabilityDomain>, ApiError> {
        self.check("list_availability_domains")?;
        self.inner.list_availability_domains(ctx, tenancy_id).await
    }

    async fn list_instances(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<Instance>, ApiError> {
        self.check("list_instances")?;
        self.inner.list_instances(ctx, compartment_id).await
    }

    async fn list_volumes(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<BlockVolume>, ApiError> {
        self.check("list_volumes")?;
        self.inner.list_volumes(ctx, compartment_id).await
    }

    async fn list_db_systems(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<DbSystem>, ApiError> {
        self.check("list_db_systems")?;
        self.inner.list_db_systems(ctx, compartment_id).await
    }

    async fn list_db_system_patch_history(
        &self,
        ctx: &RequestContext,
        db_system_id: &str,
    ) -> Result<Vec<PatchHistoryEntry>, ApiError> {
        self.check("list_db_system_patch_history")?;
        self.inner.list_db_system_patch_history(ctx, db_system_id).await
    }

    async fn list_db_homes(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<DbHome>, ApiError> {
        self.check("list_db_homes")?;
        self.inner.list_db_homes(ctx, compartment_id).await
    }

    async fn list_databases(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
        db_home_id: &str,
    ) -> Result<Vec<Database>, ApiError> {
        self.check("list_databases")?;
        self.inner.list_databases(ctx, compartment_id, db_home_id).await
    }

    async fn list_db_home_patch_history(
        &self,
        ctx: &RequestContext,
        db_home_id: &str,
    ) -> Result<Vec<PatchHistoryEntry>, ApiError> {
        self.check("list_db_home_patch_history")?;
        self.inner.list_db_home_patch_history(ctx, db_home_id).await
    }

    async fn list_autonomous_exadata_infrastructures(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<AutonomousExadata>, ApiError> {
        self.check("list_autonomous_exadata_infrastructures")?;
        self.inner.list_autonomous_exadata_infrastructures(ctx, compartment_id).await
    }

    async fn list_autonomous_container_databases(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<AutonomousContainerDb>, ApiError> {
        self.check("list_autonomous_container_databases")?;
        self.inner.list_autonomous_container_databases(ctx, compartment_id).await
    }

    async fn list_autonomous_databases(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
    ) -> Result<Vec<AutonomousDb>, ApiError> {
        self.check("list_autonomous_databases")?;
        self.inner.list_autonomous_databases(ctx, compartment_id).await
    }

    async fn summarize_metrics_data(
        &self,
        ctx: &RequestContext,
        compartment_id: &str,
        query: &MetricQuery,
    ) -> Result<Vec<MetricSeries>, ApiError> {
        self.check("summarize_metrics_data")?;
        self.inner.summarize_metrics_data(ctx, compartment_id, query).await
    }
}
