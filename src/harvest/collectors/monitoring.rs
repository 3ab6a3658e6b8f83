use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::harvest::accumulator::Accumulator;
use crate::harvest::records::MetricPoint;
use crate::harvest::traits::{
    CollectError, ExportTable, Granularity, HarvestContext, ResourceCollector, Scope,
};
use crate::traits::MetricQuery;

pub const COMPUTE_NAMESPACE: &str = "oci_computeagent";
pub const AUTONOMOUS_DB_NAMESPACE: &str = "oci_autonomous_database";

/// (metric, aggregation) pairs summarized at one-minute resolution.
pub const COMPUTE_METRICS: &[(&str, &str)] = &[
    ("CpuUtilization", "mean"),
    ("MemoryUtilization", "mean"),
    ("DiskBytesRead", "rate"),
    ("DiskBytesWritten", "rate"),
    ("NetworksBytesIn", "rate"),
    ("NetworksBytesOut", "rate"),
];

pub const AUTONOMOUS_DB_METRICS: &[(&str, &str)] = &[
    ("CpuUtilization", "mean"),
    ("StorageUtilization", "mean"),
    ("CurrentLogons", "sum"),
];

/// Half-open time range a cycle summarizes metrics over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MetricWindow {
    /// The whole UTC day before `now`: yesterday 00:00 to today 00:00.
    pub fn previous_day(now: DateTime<Utc>) -> Self {
        let end = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self {
            start: end - Duration::days(1),
            end,
        }
    }

    fn query(&self, namespace: &str, metric: &str, statistic: &str) -> MetricQuery {
        MetricQuery {
            namespace: namespace.to_string(),
            query: format!("{metric}[1m].{statistic}()"),
            start_time: self.start,
            end_time: self.end,
        }
    }
}

/// Per-region metric summaries for the whole tenancy subtree.
#[derive(Debug, Clone)]
pub struct MonitoringCollector {
    window: MetricWindow,
    compute: Accumulator<MetricPoint>,
    autonomous_db: Accumulator<MetricPoint>,
}

impl MonitoringCollector {
    pub fn new(window: MetricWindow) -> Self {
        Self {
            window,
            compute: Accumulator::new("metrics_compute"),
            autonomous_db: Accumulator::new("metrics_autonomous_db"),
        }
    }

    pub fn window(&self) -> MetricWindow {
        self.window
    }

    async fn summarize(
        &self,
        scope: &Scope,
        cx: &HarvestContext,
        namespace: &str,
        metrics: &[(&str, &str)],
        into: &Accumulator<MetricPoint>,
    ) -> Result<(), CollectError> {
        let ctx = &scope.request;
        let tenancy_id = ctx.tenancy_id.as_str();

        for (metric, statistic) in metrics {
            let query = self.window.query(namespace, metric, statistic);
            let series = cx
                .calls
                .call_list(ctx, "summarize_metrics_data", || {
                    cx.api.summarize_metrics_data(ctx, tenancy_id, &query)
                })
                .await?;
            into.extend(
                series
                    .iter()
                    .flat_map(|s| MetricPoint::from_series(s, tenancy_id)),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceCollector for MonitoringCollector {
    fn name(&self) -> &'static str {
        "monitoring"
    }

    fn granularity(&self) -> Granularity {
        Granularity::Region
    }

    async fn collect(&self, scope: &Scope, cx: &HarvestContext) -> Result<(), CollectError> {
        self.summarize(scope, cx, COMPUTE_NAMESPACE, COMPUTE_METRICS, &self.compute)
            .await?;
        self.summarize(
            scope,
            cx,
            AUTONOMOUS_DB_NAMESPACE,
            AUTONOMOUS_DB_METRICS,
            &self.autonomous_db,
        )
        .await
    }

    fn tables(&self) -> Vec<Box<dyn ExportTable>> {
        vec![
            Box::new(self.compute.clone()),
            Box::new(self.autonomous_db.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::fixtures::{self, FaultyApi};
    use crate::harvest::records::{Datapoint, MetricSeries};
    use crate::snapshot::RegionInventory;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn series(namespace: &str, name: &str, points: &[DateTime<Utc>]) -> MetricSeries {
        MetricSeries {
            name: name.to_string(),
            namespace: namespace.to_string(),
            dimensions: [("resourceId".to_string(), format!("ocid1.{name}.oc1..r"))].into(),
            aggregated_datapoints: points
                .iter()
                .map(|t| Datapoint {
                    timestamp: *t,
                    value: 1.5,
                })
                .collect(),
        }
    }

    #[test]
    fn test_previous_day_window() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 12).unwrap();
        let window = MetricWindow::previous_day(now);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());

        let query = window.query(COMPUTE_NAMESPACE, "DiskBytesRead", "rate");
        assert_eq!(query.query, "DiskBytesRead[1m].rate()");
        assert_eq!(query.metric_name(), "DiskBytesRead");
    }

    #[tokio::test]
    async fn test_points_within_window_per_namespace() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        let inside = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap();

        let inventory = RegionInventory {
            metrics: vec![
                series(COMPUTE_NAMESPACE, "CpuUtilization", &[inside, outside]),
                series(COMPUTE_NAMESPACE, "NetworksBytesOut", &[inside]),
                series(AUTONOMOUS_DB_NAMESPACE, "CurrentLogons", &[inside, inside]),
                series("oci_vcn", "VnicToNetworkBytes", &[inside]),
            ],
            ..Default::default()
        };
        let api = Arc::new(FaultyApi::new(fixtures::snapshot(vec![(
            "eu-frankfurt-1",
            inventory,
        )])));
        let cx = fixtures::context(api.clone());
        let collector = MonitoringCollector::new(MetricWindow::previous_day(now));

        collector
            .collect(&fixtures::region_scope("eu-frankfurt-1"), &cx)
            .await
            .unwrap();

        assert_eq!(
            api.issued("summarize_metrics_data"),
            COMPUTE_METRICS.len() + AUTONOMOUS_DB_METRICS.len()
        );
        let compute = collector.compute.snapshot();
        assert_eq!(compute.len(), 2);
        assert!(compute.iter().all(|p| p.timestamp == inside));
        assert_eq!(collector.autonomous_db.len(), 2);
        assert_eq!(collector.autonomous_db.snapshot()[0].metric_name, "CurrentLogons");
    }
}
