//! Database family: DB systems, homes, databases, patch history and the
//! autonomous database stack.

use async_trait::async_trait;
use tracing::debug;

use crate::harvest::accumulator::Accumulator;
use crate::harvest::records::{
    AutonomousContainerDb, AutonomousDb, AutonomousExadata, Database, DbHome, DbSystem,
    PatchHistoryEntry,
};
use crate::harvest::traits::{
    CollectError, ExportTable, Granularity, HarvestContext, ResourceCollector, Scope,
};

#[derive(Debug, Clone)]
pub struct DatabaseCollector {
    db_systems: Accumulator<DbSystem>,
    db_system_patches: Accumulator<PatchHistoryEntry>,
    db_homes: Accumulator<DbHome>,
    databases: Accumulator<Database>,
    db_home_patches: Accumulator<PatchHistoryEntry>,
    autonomous_exadata: Accumulator<AutonomousExadata>,
    autonomous_container_dbs: Accumulator<AutonomousContainerDb>,
    autonomous_dbs: Accumulator<AutonomousDb>,
}

impl DatabaseCollector {
    pub fn new() -> Self {
        Self {
            db_systems: Accumulator::new("db_system"),
            db_system_patches: Accumulator::new("db_sys_patch_history"),
            db_homes: Accumulator::new("db_home"),
            databases: Accumulator::new("database"),
            db_home_patches: Accumulator::new("db_home_patch_history"),
            autonomous_exadata: Accumulator::new("autonomous_exadata"),
            autonomous_container_dbs: Accumulator::new("autonomous_cdb"),
            autonomous_dbs: Accumulator::new("autonomous_db"),
        }
    }

    async fn collect_db_systems(
        &self,
        scope: &Scope,
        cx: &HarvestContext,
        compartment_id: &str,
    ) -> Result<(), CollectError> {
        let ctx = &scope.request;
        let systems = cx
            .calls
            .call_list(ctx, "list_db_systems", || cx.api.list_db_systems(ctx, compartment_id))
            .await?;

        for system in &systems {
            // patch history is only served by the system's own region
            if system.region_token().is_some_and(|region| region != ctx.region) {
                debug!(
                    db_system = %system.id,
                    region = %ctx.region,
                    "Skipping patch history of a foreign DB system"
                );
                continue;
            }
            let patches = cx
                .calls
                .call_list(ctx, "list_db_system_patch_history", || {
                    cx.api.list_db_system_patch_history(ctx, &system.id)
                })
                .await?;
            self.db_system_patches.extend(patches);
        }

        self.db_systems
            .extend(systems.into_iter().map(|mut system| {
                system.tenancy_id = ctx.tenancy_id.clone();
                system
            }));
        Ok(())
    }

    async fn collect_db_homes(
        &self,
        scope: &Scope,
        cx: &HarvestContext,
        compartment_id: &str,
    ) -> Result<(), CollectError> {
        let ctx = &scope.request;
        let homes = cx
            .calls
            .call_list(ctx, "list_db_homes", || cx.api.list_db_homes(ctx, compartment_id))
            .await?;

        for home in &homes {
            let databases = cx
                .calls
                .call_list(ctx, "list_databases", || {
                    cx.api.list_databases(ctx, compartment_id, &home.id)
                })
                .await?;
            self.databases.extend(databases);

            let patches = cx
                .calls
                .call_list(ctx, "list_db_home_patch_history", || {
                    cx.api.list_db_home_patch_history(ctx, &home.id)
                })
                .await?;
            self.db_home_patches.extend(patches);
        }

        self.db_homes.extend(homes);
        Ok(())
    }

    async fn collect_autonomous(
        &self,
        scope: &Scope,
        cx: &HarvestContext,
        compartment_id: &str,
    ) -> Result<(), CollectError> {
        let ctx = &scope.request;

        let exadata = cx
            .calls
            .call_list(ctx, "list_autonomous_exadata_infrastructures", || {
                cx.api.list_autonomous_exadata_infrastructures(ctx, compartment_id)
            })
            .await?;
        self.autonomous_exadata.extend(exadata);

        let container_dbs = cx
            .calls
            .call_list(ctx, "list_autonomous_container_databases", || {
                cx.api.list_autonomous_container_databases(ctx, compartment_id)
            })
            .await?;
        self.autonomous_container_dbs.extend(container_dbs);

        let dbs = cx
            .calls
            .call_list(ctx, "list_autonomous_databases", || {
                cx.api.list_autonomous_databases(ctx, compartment_id)
            })
            .await?;
        self.autonomous_dbs.extend(dbs);

        Ok(())
    }
}

impl Default for DatabaseCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceCollector for DatabaseCollector {
    fn name(&self) -> &'static str {
        "database"
    }

    fn granularity(&self) -> Granularity {
        Granularity::Compartment
    }

    async fn collect(&self, scope: &Scope, cx: &HarvestContext) -> Result<(), CollectError> {
        let compartment_id = scope.compartment()?.id.as_str();

        self.collect_db_systems(scope, cx, compartment_id).await?;
        self.collect_db_homes(scope, cx, compartment_id).await?;
        self.collect_autonomous(scope, cx, compartment_id).await
    }

    fn tables(&self) -> Vec<Box<dyn ExportTable>> {
        vec![
            Box::new(self.db_systems.clone()),
            Box::new(self.db_homes.clone()),
            Box::new(self.databases.clone()),
            Box::new(self.autonomous_exadata.clone()),
            Box::new(self.autonomous_container_dbs.clone()),
            Box::new(self.autonomous_dbs.clone()),
            Box::new(self.db_home_patches.clone()),
            Box::new(self.db_system_patches.clone()),
        ]
    }
}
