//! Identity tables: report, regions, compartments, availability domains.

use async_trait::async_trait;

use crate::harvest::accumulator::Accumulator;
use crate::harvest::records::{RegionSubscription, TenancyReport};
use crate::harvest::traits::{
    CollectError, ExportTable, Granularity, HarvestContext, ResourceCollector, Scope,
};
use crate::model::{AvailabilityDomain, Compartment};

/// Exports the tenancy built by discovery. Issues no remote calls.
#[derive(Debug, Clone)]
pub struct TenancyCollector {
    reports: Accumulator<TenancyReport>,
    regions: Accumulator<RegionSubscription>,
    compartments: Accumulator<Compartment>,
    availability_domains: Accumulator<AvailabilityDomain>,
}

impl TenancyCollector {
    pub fn new() -> Self {
        Self {
            reports: Accumulator::new("report"),
            regions: Accumulator::new("region"),
            compartments: Accumulator::new("compartment"),
            availability_domains: Accumulator::new("availability_domain"),
        }
    }
}

impl Default for TenancyCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceCollector for TenancyCollector {
    fn name(&self) -> &'static str {
        "tenancy"
    }

    fn granularity(&self) -> Granularity {
        Granularity::Tenancy
    }

    async fn collect(&self, _scope: &Scope, cx: &HarvestContext) -> Result<(), CollectError> {
        let tenancy = &cx.tenancy;

        self.reports.push(TenancyReport {
            tenancy_id: tenancy.id.clone(),
        });
        self.regions
            .extend(tenancy.regions.iter().map(|region| RegionSubscription {
                tenancy_id: tenancy.id.clone(),
                region: region.clone(),
            }));
        // every compartment, not only the harvestable ones
        self.compartments.extend(tenancy.compartments.iter().cloned());
        self.availability_domains
            .extend(tenancy.availability_domains.iter().cloned());

        Ok(())
    }

    fn tables(&self) -> Vec<Box<dyn ExportTable>> {
        vec![
            Box::new(self.reports.clone()),
            Box::new(self.regions.clone()),
            Box::new(self.compartments.clone()),
            Box::new(self.availability_domains.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::fixtures;
    use crate::snapshot::SnapshotApi;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_exports_discovered_tenancy_without_calls() {
        let cx = fixtures::context(Arc::new(SnapshotApi::new(fixtures::snapshot(Vec::new()))));
        let collector = TenancyCollector::new();

        collector
            .collect(&fixtures::region_scope("eu-frankfurt-1"), &cx)
            .await
            .unwrap();

        assert_eq!(collector.reports.len(), 1);
        assert_eq!(collector.regions.len(), 2);
        // root, apps and the deleted compartment
        assert_eq!(collector.compartments.len(), 3);
        assert_eq!(collector.availability_domains.len(), 3);
        assert_eq!(cx.calls.diagnostics().calls, 0);

        let names: Vec<_> = collector.tables().iter().map(|t| t.table_name()).collect();
        assert_eq!(names, ["report", "region", "compartment", "availability_domain"]);
    }
}
