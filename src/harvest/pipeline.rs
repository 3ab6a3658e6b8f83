//! Concurrent fan-out of collectors over a tenancy.
//!
//! This module provides the [`HarvestCoordinator`] that expands a tenancy into
//! a work grid and runs it:
//! - One `tokio` task per [`WorkUnit`], all on a single `JoinSet`
//! - Per-unit failure isolation: errors and panics are logged and counted
//! - A join barrier: [`CompletedHarvest`], the only way to reach the
//!   accumulated tables, exists only once every task has finished

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, warn};

use crate::executor::{CallExecutor, DiagnosticsSnapshot};
use crate::harvest::traits::{
    ExportTable, Granularity, HarvestContext, ResourceCollector, Scope, WorkUnit,
};
use crate::model::Tenancy;
use crate::traits::{ManagementApi, RequestContext};

/// Compartment names excluded unless configured otherwise.
pub const DEFAULT_EXCLUDED_COMPARTMENTS: &[&str] = &["ManagedCompartmentForPaaS"];

// ============================================================================
// Harvest Results
// ============================================================================

/// Statistics about one collection run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct HarvestStats {
    /// Work units scheduled
    pub units_total: usize,

    /// Work units that returned `Ok`
    pub units_succeeded: usize,

    /// Work units that returned an error or panicked
    pub units_failed: usize,

    /// Labels (`collector@region/compartment`) of the failed units, sorted
    pub failed_units: Vec<String>,

    /// Wall time from first spawn to join barrier (milliseconds)
    pub duration_ms: u64,

    /// Remote call counters at the barrier
    pub calls: DiagnosticsSnapshot,
}

/// Every table of a run, readable once all work units have finished.
pub struct CompletedHarvest {
    tables: Vec<Box<dyn ExportTable>>,
    stats: HarvestStats,
}

impl CompletedHarvest {
    pub fn tables(&self) -> &[Box<dyn ExportTable>] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&dyn ExportTable> {
        self.tables
            .iter()
            .find(|t| t.table_name() == name)
            .map(|t| t.as_ref())
    }

    pub fn stats(&self) -> &HarvestStats {
        &self.stats
    }
}

impl fmt::Debug for CompletedHarvest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables: Vec<_> = self
            .tables
            .iter()
            .map(|t| (t.table_name(), t.len()))
            .collect();
        f.debug_struct("CompletedHarvest")
            .field("tables", &tables)
            .field("stats", &self.stats)
            .finish()
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Builds the work grid of a tenancy and runs it concurrently.
///
/// Grid shape per collector [`Granularity`]:
/// - `Tenancy`: one unit against the home region
/// - `Region`: one unit per subscribed region
/// - `Compartment`: one unit per region and harvestable compartment, scoped
///   with that region's availability domains
///
/// Fan-out is unbounded; the only throttle is the optional in-flight limit
/// of the [`CallExecutor`].
///
/// # Example
///
/// ```ignore
/// let harvest = HarvestCoordinator::new(api, CallExecutor::new(RetryPolicy::default()))
///     .with_collectors(default_collectors(Utc::now()))
///     .with_excluded_compartments(["ManagedCompartmentForPaaS"])
///     .run(Arc::new(tenancy))
///     .await;
/// println!("{} units failed", harvest.stats().units_failed);
/// ```
pub struct HarvestCoordinator {
    api: Arc<dyn ManagementApi>,
    calls: CallExecutor,
    collectors: Vec<Arc<dyn ResourceCollector>>,
    excluded_compartments: HashSet<String>,
}

impl HarvestCoordinator {
    /// Creates a coordinator with no collectors and the default exclusion
    /// list.
    pub fn new(api: Arc<dyn ManagementApi>, calls: CallExecutor) -> Self {
        Self {
            api,
            calls,
            collectors: Vec::new(),
            excluded_compartments: DEFAULT_EXCLUDED_COMPARTMENTS
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }

    pub fn with_collector(mut self, collector: Arc<dyn ResourceCollector>) -> Self {
        self.collectors.push(collector);
        self
    }

    pub fn with_collectors<I>(mut self, collectors: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ResourceCollector>>,
    {
        self.collectors.extend(collectors);
        self
    }

    /// Replaces the compartment names kept out of the work grid.
    pub fn with_excluded_compartments<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_compartments = names.into_iter().map(Into::into).collect();
        self
    }

    /// Expands the tenancy into one [`WorkUnit`] per collector and scope.
    pub fn work_grid(&self, tenancy: &Tenancy) -> Vec<WorkUnit> {
        let compartments: Vec<_> = tenancy
            .harvestable_compartments(&self.excluded_compartments)
            .cloned()
            .collect();
        let mut grid = Vec::new();

        for collector in &self.collectors {
            match collector.granularity() {
                Granularity::Tenancy => match tenancy.home_region() {
                    Some(home) => grid.push(WorkUnit {
                        collector: Arc::clone(collector),
                        scope: Scope {
                            request: RequestContext::new(&tenancy.id, &home.name),
                            compartment: None,
                            availability_domains: Vec::new(),
                        },
                    }),
                    None => warn!(
                        collector = collector.name(),
                        "No home region, skipping collector"
                    ),
                },
                Granularity::Region => {
                    for region in &tenancy.regions {
                        grid.push(WorkUnit {
                            collector: Arc::clone(collector),
                            scope: Scope {
                                request: RequestContext::new(&tenancy.id, &region.name),
                                compartment: None,
                                availability_domains: Vec::new(),
                            },
                        });
                    }
                }
                Granularity::Compartment => {
                    for region in &tenancy.regions {
                        let ads = tenancy.availability_domains_in(&region.name);
                        for compartment in &compartments {
                            grid.push(WorkUnit {
                                collector: Arc::clone(collector),
                                scope: Scope {
                                    request: RequestContext::new(&tenancy.id, &region.name),
                                    compartment: Some(compartment.clone()),
                                    availability_domains: ads.clone(),
                                },
                            });
                        }
                    }
                }
            }
        }

        grid
    }

    /// Runs every work unit of the tenancy and waits for all of them.
    ///
    /// Never fails: a unit that errors or panics is logged with its
    /// collector, region and compartment, then counted in
    /// [`HarvestStats::units_failed`].
    pub async fn run(self, tenancy: Arc<Tenancy>) -> CompletedHarvest {
        let start = Instant::now();
        let grid = self.work_grid(&tenancy);
        let mut stats = HarvestStats {
            units_total: grid.len(),
            ..HarvestStats::default()
        };
        info!(
            units = stats.units_total,
            collectors = self.collectors.len(),
            regions = tenancy.regions.len(),
            "Starting collection"
        );

        let cx = HarvestContext {
            api: Arc::clone(&self.api),
            calls: self.calls.clone(),
            tenancy: Arc::clone(&tenancy),
        };

        let mut tasks = JoinSet::new();
        let mut labels = HashMap::with_capacity(stats.units_total);
        for unit in grid {
            let cx = cx.clone();
            let label = UnitLabel::of(&unit);
            let handle = tasks.spawn(async move { unit.collector.collect(&unit.scope, &cx).await });
            labels.insert(handle.id(), label);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, result)) => (id, Ok(result)),
                Err(e) => (e.id(), Err(e)),
            };
            let label = labels.remove(&id).unwrap_or_else(|| UnitLabel::unknown(id));

            match outcome {
                Ok(Ok(())) => {
                    stats.units_succeeded += 1;
                    debug!(unit = %label.unit, "Work unit finished");
                }
                Ok(Err(e)) => {
                    stats.units_failed += 1;
                    error!(
                        collector = label.collector,
                        region = %label.region,
                        compartment = %label.compartment,
                        error = %e,
                        "Work unit failed"
                    );
                    stats.failed_units.push(label.unit);
                }
                Err(e) => {
                    stats.units_failed += 1;
                    error!(
                        collector = label.collector,
                        region = %label.region,
                        compartment = %label.compartment,
                        error = %e,
                        "Work unit panicked or was cancelled"
                    );
                    stats.failed_units.push(label.unit);
                }
            }
        }
        stats.failed_units.sort();

        // Barrier passed: no task holds an accumulator handle any more.
        let tables = self.collectors.iter().flat_map(|c| c.tables()).collect();
        stats.duration_ms = start.elapsed().as_millis() as u64;
        stats.calls = self.calls.diagnostics();

        info!(
            succeeded = stats.units_succeeded,
            failed = stats.units_failed,
            duration_ms = stats.duration_ms,
            calls = stats.calls.calls,
            attempts = stats.calls.attempts,
            "Collection completed"
        );

        CompletedHarvest { tables, stats }
    }
}

/// Log context of a spawned work unit, kept outside the task so a panic
/// can still be attributed.
struct UnitLabel {
    unit: String,
    collector: &'static str,
    region: String,
    compartment: String,
}

impl UnitLabel {
    fn of(unit: &WorkUnit) -> Self {
        Self {
            unit: unit.to_string(),
            collector: unit.collector_name(),
            region: unit.scope.region().to_string(),
            compartment: unit
                .scope
                .compartment
                .as_ref()
                .map_or_else(|| "-".to_string(), |c| c.name.clone()),
        }
    }

    fn unknown(id: task::Id) -> Self {
        Self {
            unit: format!("task {id}"),
            collector: "-",
            region: "-".to_string(),
            compartment: "-".to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::collectors::{
        BlockStorageCollector, ComputeCollector, LimitCollector, TenancyCollector,
    };
    use crate::harvest::fixtures::{self, FaultyApi, TENANCY_ID};
    use crate::harvest::records::{BlockVolume, Instance};
    use crate::harvest::traits::CollectError;
    use crate::model::LifecycleState;
    use crate::retry::RetryPolicy;
    use crate::snapshot::{RegionInventory, Snapshot};
    use crate::traits::ApiError;
    use async_trait::async_trait;

    const APPS: &str = "ocid1.compartment.oc1..apps";
    const SANDBOX: &str = "ocid1.compartment.oc1..sandbox";

    fn instance(id: &str, compartment_id: &str, region: &str) -> Instance {
        Instance {
            id: id.to_string(),
            availability_domain: format!("Uocm:{}-AD-1", region.to_uppercase()),
            compartment_id: compartment_id.to_string(),
            dedicated_vm_host_id: None,
            display_name: None,
            fault_domain: None,
            lifecycle_state: "RUNNING".to_string(),
            region: region.to_string(),
            shape: "VM.Standard.E4.Flex".to_string(),
            tenancy_id: String::new(),
        }
    }

    fn volume(id: &str, compartment_id: &str) -> BlockVolume {
        BlockVolume {
            id: id.to_string(),
            availability_domain: "Uocm:EU-FRANKFURT-1-AD-1".to_string(),
            compartment_id: compartment_id.to_string(),
            display_name: None,
            is_hydrated: None,
            kms_key_id: None,
            lifecycle_state: "AVAILABLE".to_string(),
            size_in_gbs: Some(50),
            size_in_mbs: None,
            volume_group_id: None,
            vpus_per_gb: None,
        }
    }

    /// Two regions; root, `apps` and `sandbox` active, `retired` deleted.
    /// Every active compartment holds one instance per region.
    fn snapshot() -> Snapshot {
        let mut snapshot = fixtures::snapshot(Vec::new());
        snapshot.compartments.push(fixtures::compartment(
            SANDBOX,
            "sandbox",
            LifecycleState::Active,
        ));

        for region in ["eu-frankfurt-1", "us-ashburn-1"] {
            let instances = [TENANCY_ID, APPS, SANDBOX]
                .iter()
                .map(|c| instance(&format!("{c}-{region}"), c, region))
                .collect();
            snapshot.inventory.insert(
                region.to_string(),
                RegionInventory {
                    instances,
                    volumes: vec![volume(&format!("vol-{region}"), APPS)],
                    ..Default::default()
                },
            );
        }
        snapshot
    }

    fn coordinator(api: Arc<dyn ManagementApi>) -> HarvestCoordinator {
        HarvestCoordinator::new(api, CallExecutor::new(RetryPolicy::for_testing()))
            .with_excluded_compartments(["sandbox"])
    }

    fn tenancy(snapshot: &Snapshot) -> Arc<Tenancy> {
        let base = fixtures::tenancy();
        Arc::new(Tenancy::new(
            fixtures::tenancy_info(),
            base.regions.clone(),
            snapshot.compartments.clone(),
            base.availability_domains.clone(),
        ))
    }

    #[test]
    fn test_work_grid_shape() {
        let snapshot = snapshot();
        let coordinator = coordinator(Arc::new(FaultyApi::new(snapshot.clone())))
            .with_collector(Arc::new(TenancyCollector::new()))
            .with_collector(Arc::new(LimitCollector::new()))
            .with_collector(Arc::new(ComputeCollector::new()));

        let grid = coordinator.work_grid(&tenancy(&snapshot));

        let count = |name: &str| grid.iter().filter(|u| u.collector_name() == name).count();
        assert_eq!(count("tenancy"), 1);
        assert_eq!(count("limits"), 2);
        // 2 regions x (root, apps); sandbox is excluded
        assert_eq!(count("compute"), 4);

        let tenancy_unit = grid.iter().find(|u| u.collector_name() == "tenancy").unwrap();
        assert_eq!(tenancy_unit.scope.region(), "eu-frankfurt-1");

        for unit in grid.iter().filter(|u| u.collector_name() == "compute") {
            let compartment = unit.scope.compartment.as_ref().unwrap();
            assert!(compartment.lifecycle_state.is_active());
            assert_ne!(compartment.name, "sandbox");
            assert_ne!(compartment.name, "retired");
            let ads = &unit.scope.availability_domains;
            assert!(!ads.is_empty());
            assert!(ads
                .iter()
                .all(|ad| ad.is_in_region(unit.scope.region())));
        }
    }

    #[tokio::test]
    async fn test_fan_out_collects_every_unit() {
        let snapshot = snapshot();
        let harvest = coordinator(Arc::new(FaultyApi::new(snapshot.clone())))
            .with_collector(Arc::new(ComputeCollector::new()))
            .run(tenancy(&snapshot))
            .await;

        assert_eq!(harvest.stats().units_total, 4);
        assert_eq!(harvest.stats().units_succeeded, 4);
        assert_eq!(harvest.stats().units_failed, 0);

        let instances = harvest.table("instance").unwrap();
        assert_eq!(instances.len(), 4);
        assert!(instances
            .rows()
            .iter()
            .all(|row| !row[0].starts_with(SANDBOX)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_unit_does_not_affect_siblings() {
        let snapshot = snapshot();
        let api = FaultyApi::new(snapshot.clone())
            .failing("list_instances", ApiError::service(500, "InternalServerError", ""));
        let harvest = coordinator(Arc::new(api))
            .with_collector(Arc::new(ComputeCollector::new()))
            .with_collector(Arc::new(BlockStorageCollector::new()))
            .run(tenancy(&snapshot))
            .await;

        let stats = harvest.stats();
        assert_eq!(stats.units_total, 8);
        assert_eq!(stats.units_failed, 4);
        assert_eq!(stats.calls.fatal, 4);
        assert!(stats.failed_units.iter().all(|u| u.starts_with("compute@")));
        assert!(stats
            .failed_units
            .contains(&"compute@us-ashburn-1/apps".to_string()));
        assert_eq!(harvest.table("block_volume").unwrap().len(), 2);
        assert!(harvest.table("instance").unwrap().is_empty());
    }

    struct PanickingCollector;

    #[async_trait]
    impl ResourceCollector for PanickingCollector {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn granularity(&self) -> Granularity {
            Granularity::Region
        }

        async fn collect(&self, _: &Scope, _: &HarvestContext) -> Result<(), CollectError> {
            panic!("collector bug");
        }

        fn tables(&self) -> Vec<Box<dyn ExportTable>> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn test_panicking_unit_is_counted() {
        let snapshot = snapshot();
        let harvest = coordinator(Arc::new(FaultyApi::new(snapshot.clone())))
            .with_collector(Arc::new(PanickingCollector))
            .with_collector(Arc::new(TenancyCollector::new()))
            .run(tenancy(&snapshot))
            .await;

        assert_eq!(harvest.stats().units_failed, 2);
        assert_eq!(harvest.stats().units_succeeded, 1);
        assert_eq!(
            harvest.stats().failed_units,
            vec!["panicking@eu-frankfurt-1", "panicking@us-ashburn-1"]
        );
        assert_eq!(harvest.table("compartment").unwrap().len(), 4);
    }
}
