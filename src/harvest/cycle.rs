//! One complete harvest run: discovery, collection, export.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::executor::CallExecutor;
use crate::harvest::collectors::default_collectors;
use crate::harvest::discovery::{discover_tenancy, DiscoveryError};
use crate::harvest::export::{ExportStage, ExportSummary};
use crate::harvest::pipeline::{HarvestCoordinator, HarvestStats, DEFAULT_EXCLUDED_COMPARTMENTS};
use crate::harvest::traits::ResourceCollector;
use crate::model::ReportNumber;
use crate::store::ObjectStore;
use crate::traits::ManagementApi;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// What a finished cycle produced.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub report: ReportNumber,
    pub harvest: HarvestStats,
    pub export: ExportSummary,
}

/// Sequences discovery, collection and export under one report number.
///
/// The report number and the metrics window both derive from the cycle's
/// start time, so every table of a cycle shares them.
pub struct HarvestCycle<S: ObjectStore> {
    api: Arc<dyn ManagementApi>,
    calls: CallExecutor,
    store: S,
    tenancy_id: String,
    home_region: String,
    excluded_compartments: Vec<String>,
    collectors: Option<Vec<Arc<dyn ResourceCollector>>>,
    /// Resolved when `run` starts unless pinned
    started_at: Option<DateTime<Utc>>,
}

impl<S: ObjectStore> HarvestCycle<S> {
    pub fn new(
        api: Arc<dyn ManagementApi>,
        calls: CallExecutor,
        store: S,
        tenancy_id: impl Into<String>,
        home_region: impl Into<String>,
    ) -> Self {
        Self {
            api,
            calls,
            store,
            tenancy_id: tenancy_id.into(),
            home_region: home_region.into(),
            excluded_compartments: DEFAULT_EXCLUDED_COMPARTMENTS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            collectors: None,
            started_at: None,
        }
    }

    pub fn with_excluded_compartments(mut self, names: Vec<String>) -> Self {
        self.excluded_compartments = names;
        self
    }

    /// Replaces the default collector set.
    pub fn with_collectors(mut self, collectors: Vec<Arc<dyn ResourceCollector>>) -> Self {
        self.collectors = Some(collectors);
        self
    }

    /// Pins the cycle start time.
    pub fn started_at(mut self, time: DateTime<Utc>) -> Self {
        self.started_at = Some(time);
        self
    }

    /// Runs the cycle to completion.
    ///
    /// Collection and export failures are absorbed and reported in the
    /// returned [`CycleReport`].
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Discovery`] if the tenancy cannot be
    /// discovered; nothing is collected or exported in that case.
    #[instrument(skip(self), fields(tenancy = %self.tenancy_id))]
    pub async fn run(self) -> Result<CycleReport, HarvestError> {
        let started_at = self.started_at.unwrap_or_else(Utc::now);
        let report = ReportNumber::at(started_at);
        info!(report = %report, "Starting harvest cycle");

        let tenancy = discover_tenancy(
            self.api.as_ref(),
            &self.calls,
            &self.tenancy_id,
            &self.home_region,
        )
        .await?;

        let collectors = self
            .collectors
            .unwrap_or_else(|| default_collectors(started_at));
        let harvest = HarvestCoordinator::new(Arc::clone(&self.api), self.calls.clone())
            .with_collectors(collectors)
            .with_excluded_compartments(self.excluded_compartments)
            .run(Arc::new(tenancy))
            .await;

        let export = ExportStage::new(self.store, report.clone())
            .export(&harvest)
            .await;
        if !export.is_complete() {
            warn!(failed = export.failed.len(), "Some tables were not exported");
        }

        Ok(CycleReport {
            report,
            harvest: harvest.stats().clone(),
            export,
        })
    }
}
