//! Tenancy-wide service announcements.

use async_trait::async_trait;

use crate::harvest::accumulator::Accumulator;
use crate::harvest::records::Announcement;
use crate::harvest::traits::{
    CollectError, ExportTable, Granularity, HarvestContext, ResourceCollector, Scope,
};

/// Active service announcements of the tenancy.
#[derive(Debug, Clone)]
pub struct AnnouncementCollector {
    announcements: Accumulator<Announcement>,
}

impl AnnouncementCollector {
    pub fn new() -> Self {
        Self {
            announcements: Accumulator::new("announcement"),
        }
    }
}

impl Default for AnnouncementCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceCollector for AnnouncementCollector {
    fn name(&self) -> &'static str {
        "announcements"
    }

    fn granularity(&self) -> Granularity {
        Granularity::Tenancy
    }

    async fn collect(&self, scope: &Scope, cx: &HarvestContext) -> Result<(), CollectError> {
        let ctx = &scope.request;
        let announcements = cx
            .calls
            .call_list(ctx, "list_announcements", || {
                cx.api.list_announcements(ctx, &ctx.tenancy_id)
            })
            .await?;

        self.announcements
            .extend(announcements.into_iter().map(|mut announcement| {
                announcement.tenancy_id = ctx.tenancy_id.clone();
                announcement
            }));
        Ok(())
    }

    fn tables(&self) -> Vec<Box<dyn ExportTable>> {
        vec![Box::new(self.announcements.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::fixtures::{self, TENANCY_ID};
    use crate::snapshot::SnapshotApi;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn announcement(id: &str, day: u32) -> Announcement {
        Announcement {
            id: id.to_string(),
            announcement_type: Some("SCHEDULED_MAINTENANCE".to_string()),
            reference_ticket_number: None,
            summary: Some(format!("maintenance {id}")),
            affected_regions: vec!["eu-frankfurt-1".to_string()],
            services: vec!["Compute".to_string()],
            time_created: Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).single(),
            time_one_title: None,
            time_one_value: None,
            time_two_title: None,
            time_two_value: None,
            time_updated: None,
            kind: Some("AnnouncementSummary".to_string()),
            tenancy_id: String::new(),
        }
    }

    #[tokio::test]
    async fn test_announcements_are_stamped_in_creation_order() {
        let mut snapshot = fixtures::snapshot(Vec::new());
        snapshot.announcements = vec![announcement("late", 20), announcement("early", 2)];
        let cx = fixtures::context(Arc::new(SnapshotApi::new(snapshot)));
        let collector = AnnouncementCollector::new();

        collector
            .collect(&fixtures::region_scope("eu-frankfurt-1"), &cx)
            .await
            .unwrap();

        let rows = collector.announcements.snapshot();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "early");
        assert!(rows.iter().all(|a| a.tenancy_id == TENANCY_ID));
    }
}
