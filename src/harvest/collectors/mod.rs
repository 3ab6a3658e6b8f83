//! Resource collectors, one per inventory domain.

pub mod announcement;
pub mod block_storage;
pub mod compute;
pub mod database;
pub mod limits;
pub mod monitoring;
pub mod tenancy;

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use announcement::AnnouncementCollector;
pub use block_storage::BlockStorageCollector;
pub use compute::{ComputeCollector, ImageCollector};
pub use database::DatabaseCollector;
pub use limits::LimitCollector;
pub use monitoring::{MetricWindow, MonitoringCollector};
pub use tenancy::TenancyCollector;

use crate::harvest::traits::ResourceCollector;

/// Every collector of a full harvest, with metrics summarized for the UTC
/// day before `now`.
pub fn default_collectors(now: DateTime<Utc>) -> Vec<Arc<dyn ResourceCollector>> {
    vec![
        Arc::new(TenancyCollector::new()),
        Arc::new(AnnouncementCollector::new()),
        Arc::new(LimitCollector::new()),
        Arc::new(ComputeCollector::new()),
        Arc::new(ImageCollector::new()),
        Arc::new(BlockStorageCollector::new()),
        Arc::new(DatabaseCollector::new()),
        Arc::new(MonitoringCollector::new(MetricWindow::previous_day(now))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_names_are_unique() {
        let collectors = default_collectors(Utc::now());
        let names: Vec<_> = collectors
            .iter()
            .flat_map(|c| c.tables())
            .map(|t| t.table_name())
            .collect();

        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert_eq!(names.len(), 23);
    }
}
