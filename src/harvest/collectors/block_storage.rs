use async_trait::async_trait;

use crate::harvest::accumulator::Accumulator;
use crate::harvest::records::{BlockVolume, BootVolume};
use crate::harvest::traits::{
    CollectError, ExportTable, Granularity, HarvestContext, ResourceCollector, Scope,
};

/// Block volumes per compartment and boot volumes per availability domain.
#[derive(Debug, Clone)]
pub struct BlockStorageCollector {
    block_volumes: Accumulator<BlockVolume>,
    boot_volumes: Accumulator<BootVolume>,
}

impl BlockStorageCollector {
    pub fn new() -> Self {
        Self {
            block_volumes: Accumulator::new("block_volume"),
            boot_volumes: Accumulator::new("boot_volume"),
        }
    }
}

impl Default for BlockStorageCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceCollector for BlockStorageCollector {
    fn name(&self) -> &'static str {
        "block_storage"
    }

    fn granularity(&self) -> Granularity {
        Granularity::Compartment
    }

    async fn collect(&self, scope: &Scope, cx: &HarvestContext) -> Result<(), CollectError> {
        let ctx = &scope.request;
        let compartment_id = scope.compartment()?.id.as_str();

        for ad in &scope.availability_domains {
            let volumes = cx
                .calls
                .call_list(ctx, "list_boot_volumes", || {
                    cx.api.list_boot_volumes(ctx, &ad.name, compartment_id)
                })
                .await?;
            self.boot_volumes.extend(volumes);
        }

        let volumes = cx
            .calls
            .call_list(ctx, "list_volumes", || cx.api.list_volumes(ctx, compartment_id))
            .await?;
        self.block_volumes.extend(volumes);

        Ok(())
    }

    fn tables(&self) -> Vec<Box<dyn ExportTable>> {
        vec![
            Box::new(self.boot_volumes.clone()),
            Box::new(self.block_volumes.clone()),
        ]
    }
}
