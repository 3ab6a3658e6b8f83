use async_trait::async_trait;
use tracing::debug;

use crate::harvest::accumulator::Accumulator;
use crate::harvest::records::{
    BootVolumeAttachment, DedicatedVmHost, Image, Instance, VolumeAttachment,
};
use crate::harvest::traits::{
    CollectError, ExportTable, Granularity, HarvestContext, ResourceCollector, Scope,
};

/// Instances, dedicated hosts and their volume attachments.
///
/// Boot volume attachments can only be listed per availability domain, so
/// that call runs once for each AD of the scope's region.
#[derive(Debug, Clone)]
pub struct ComputeCollector {
    hosts: Accumulator<DedicatedVmHost>,
    instances: Accumulator<Instance>,
    volume_attachments: Accumulator<VolumeAttachment>,
    boot_volume_attachments: Accumulator<BootVolumeAttachment>,
}

impl ComputeCollector {
    pub fn new() -> Self {
        Self {
            hosts: Accumulator::new("dedicated_vm_host"),
            instances: Accumulator::new("instance"),
            volume_attachments: Accumulator::new("vol_attachment"),
            boot_volume_attachments: Accumulator::new("bv_attachment"),
        }
    }

    pub fn instances(&self) -> &Accumulator<Instance> {
        &self.instances
    }
}

impl Default for ComputeCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceCollector for ComputeCollector {
    fn name(&self) -> &'static str {
        "compute"
    }

    fn granularity(&self) -> Granularity {
        Granularity::Compartment
    }

    async fn collect(&self, scope: &Scope, cx: &HarvestContext) -> Result<(), CollectError> {
        let ctx = &scope.request;
        let compartment = scope.compartment()?;
        let compartment_id = compartment.id.as_str();

        let hosts = cx
            .calls
            .call_list(ctx, "list_dedicated_vm_hosts", || {
                cx.api.list_dedicated_vm_hosts(ctx, compartment_id)
            })
            .await?;
        self.hosts.extend(hosts);

        let instances = cx
            .calls
            .call_list(ctx, "list_instances", || cx.api.list_instances(ctx, compartment_id))
            .await?;
        debug!(compartment = %compartment.name, count = instances.len(), "Listed instances");
        self.instances
            .extend(instances.into_iter().map(|mut instance| {
                instance.tenancy_id = ctx.tenancy_id.clone();
                instance
            }));

        let attachments = cx
            .calls
            .call_list(ctx, "list_volume_attachments", || {
                cx.api.list_volume_attachments(ctx, compartment_id)
            })
            .await?;
        self.volume_attachments.extend(attachments);

        for ad in &scope.availability_domains {
            let attachments = cx
                .calls
                .call_list(ctx, "list_boot_volume_attachments", || {
                    cx.api
                        .list_boot_volume_attachments(ctx, &ad.name, compartment_id)
                })
                .await?;
            self.boot_volume_attachments.extend(attachments);
        }

        Ok(())
    }

    fn tables(&self) -> Vec<Box<dyn ExportTable>> {
        vec![
            Box::new(self.hosts.clone()),
            Box::new(self.instances.clone()),
            Box::new(self.boot_volume_attachments.clone()),
            Box::new(self.volume_attachments.clone()),
        ]
    }
}

/// Custom images owned by each compartment.
#[derive(Debug, Clone)]
pub struct ImageCollector {
    images: Accumulator<Image>,
}

impl ImageCollector {
    pub fn new() -> Self {
        Self {
            images: Accumulator::new("image"),
        }
    }
}

impl Default for ImageCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceCollector for ImageCollector {
    fn name(&self) -> &'static str {
        "images"
    }

    fn granularity(&self) -> Granularity {
        Granularity::Compartment
    }

    async fn collect(&self, scope: &Scope, cx: &HarvestContext) -> Result<(), CollectError> {
        let ctx = &scope.request;
        let compartment = scope.compartment()?;
        let images = cx
            .calls
            .call_list(ctx, "list_images", || cx.api.list_images(ctx, &compartment.id))
            .await?;
        self.images.extend(images);
        Ok(())
    }

    fn tables(&self) -> Vec<Box<dyn ExportTable>> {
        vec![Box::new(self.images.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::fixtures::{self, TENANCY_ID};
    use crate::snapshot::{RegionInventory, Snapshot, SnapshotApi};
    use std::sync::Arc;

    const APPS: &str = "ocid1.compartment.oc1..apps";

    fn instance(id: &str, compartment_id: &str) -> Instance {
        Instance {
            id: id.to_string(),
            availability_domain: "Uocm:EU-FRANKFURT-1-AD-1".to_string(),
            compartment_id: compartment_id.to_string(),
            dedicated_vm_host_id: None,
            display_name: Some(id.to_string()),
            fault_domain: Some("FAULT-DOMAIN-1".to_string()),
            lifecycle_state: "RUNNING".to_string(),
            region: "eu-frankfurt-1".to_string(),
            shape: "VM.Standard.E4.Flex".to_string(),
            tenancy_id: String::new(),
        }
    }

    fn boot_attachment(id: &str, ad: &str) -> BootVolumeAttachment {
        BootVolumeAttachment {
            id: id.to_string(),
            availability_domain: ad.to_string(),
            boot_volume_id: format!("{id}-bv"),
            compartment_id: APPS.to_string(),
            display_name: None,
            instance_id: "i1".to_string(),
            is_pv_encryption_in_transit_enabled: Some(false),
            lifecycle_state: "ATTACHED".to_string(),
        }
    }

    fn api() -> Arc<SnapshotApi> {
        let inventory = RegionInventory {
            instances: vec![instance("i1", APPS), instance("i2", "ocid1.compartment.oc1..other")],
            boot_volume_attachments: vec![
                boot_attachment("bva1", "Uocm:EU-FRANKFURT-1-AD-1"),
                boot_attachment("bva2", "Uocm:EU-FRANKFURT-1-AD-2"),
                boot_attachment("bva3", "Uocm:US-ASHBURN-AD-1"),
            ],
            ..Default::default()
        };
        Arc::new(SnapshotApi::new(Snapshot {
            tenancy: fixtures::tenancy_info(),
            inventory: [("eu-frankfurt-1".to_string(), inventory)].into(),
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn test_instances_are_stamped_with_tenancy() {
        let cx = fixtures::context(api());
        let scope = fixtures::compartment_scope(&cx, "eu-frankfurt-1", APPS);
        let collector = ComputeCollector::new();

        collector.collect(&scope, &cx).await.unwrap();

        let instances = collector.instances().snapshot();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].id, "i1");
        assert_eq!(instances[0].tenancy_id, TENANCY_ID);
    }

    #[tokio::test]
    async fn test_boot_attachments_listed_per_ad() {
        let cx = fixtures::context(api());
        let scope = fixtures::compartment_scope(&cx, "eu-frankfurt-1", APPS);
        assert_eq!(scope.availability_domains.len(), 2);
        let collector = ComputeCollector::new();

        collector.collect(&scope, &cx).await.unwrap();

        let ids: Vec<_> = collector
            .boot_volume_attachments
            .snapshot()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["bva1", "bva2"]);
        // bva3 sits in an AD outside the scope region
        assert_eq!(cx.calls.diagnostics().calls, 5);
    }

    #[tokio::test]
    async fn test_region_without_inventory_is_absorbed() {
        let cx = fixtures::context(api());
        let scope = fixtures::compartment_scope(&cx, "us-ashburn-1", APPS);
        let collector = ComputeCollector::new();

        collector.collect(&scope, &cx).await.unwrap();

        assert!(collector.instances().is_empty());
        assert_eq!(cx.calls.diagnostics().not_found, 4);
    }

    #[tokio::test]
    async fn test_region_scope_is_rejected() {
        let cx = fixtures::context(api());
        let collector = ImageCollector::new();

        let err = collector
            .collect(&fixtures::region_scope("eu-frankfurt-1"), &cx)
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::MissingCompartment { .. }));
    }
}
