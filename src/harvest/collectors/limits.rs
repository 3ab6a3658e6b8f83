use async_trait::async_trait;
use tracing::{debug, warn};

use crate::harvest::accumulator::Accumulator;
use crate::harvest::records::{LimitUsage, ResourceAvailability};
use crate::retry::Disposition;
use crate::harvest::traits::{
    CollectError, ExportTable, Granularity, HarvestContext, ResourceCollector, Scope,
};

/// Service limits of a region joined with their current usage.
///
/// Limits configured to `0` are skipped entirely; there is nothing to use.
/// Limits that report no value at all are still looked up. A limit whose
/// usage lookup ends not found is dropped; a stale or throttled lookup keeps
/// the limit with blank usage.
#[derive(Debug, Clone)]
pub struct LimitCollector {
    limits: Accumulator<LimitUsage>,
}

impl LimitCollector {
    pub fn new() -> Self {
        Self {
            limits: Accumulator::new("limit"),
        }
    }
}

impl Default for LimitCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceCollector for LimitCollector {
    fn name(&self) -> &'static str {
        "limits"
    }

    fn granularity(&self) -> Granularity {
        Granularity::Region
    }

    async fn collect(&self, scope: &Scope, cx: &HarvestContext) -> Result<(), CollectError> {
        let ctx = &scope.request;
        let tenancy_id = ctx.tenancy_id.as_str();

        let services = cx
            .calls
            .call_list(ctx, "list_services", || cx.api.list_services(ctx, tenancy_id))
            .await?;

        for service in services {
            let limits = cx
                .calls
                .call_list(ctx, "list_limit_values", || {
                    cx.api.list_limit_values(ctx, tenancy_id, &service.name)
                })
                .await?;

            let mut rows = Vec::with_capacity(limits.len());
            for limit in limits {
                if limit.value == Some(0) {
                    debug!(
                        service = %service.name,
                        limit = %limit.name,
                        "Skipping zero-valued limit"
                    );
                    continue;
                }

                let availability_domain = if limit.is_ad_scoped() {
                    limit.availability_domain.as_deref()
                } else {
                    None
                };
                let lookup = cx
                    .calls
                    .call_required(ctx, "get_resource_availability", || {
                        cx.api.get_resource_availability(
                            ctx,
                            tenancy_id,
                            &service.name,
                            &limit.name,
                            availability_domain,
                        )
                    })
                    .await;
                let usage = match lookup {
                    Ok(usage) => usage,
                    Err(failed) => match failed.disposition {
                        Disposition::NotFound => {
                            warn!(
                                service = %service.name,
                                limit = %limit.name,
                                "No usage for limit, dropping it"
                            );
                            continue;
                        }
                        Disposition::StaleCache | Disposition::Throttled => {
                            warn!(
                                service = %service.name,
                                limit = %limit.name,
                                error = %failed,
                                "Usage unavailable, keeping limit without it"
                            );
                            ResourceAvailability::default()
                        }
                        Disposition::Fatal => return Err(failed.into()),
                    },
                };

                rows.push(LimitUsage {
                    region_name: ctx.region.clone(),
                    service_name: service.name.clone(),
                    service_description: service.description.clone(),
                    limit_name: limit.name.clone(),
                    availability_domain: limit.availability_domain.clone(),
                    scope_type: limit.scope_type.clone(),
                    value: limit.value,
                    used: usage.used,
                    available: usage.available,
                    tenancy_id: tenancy_id.to_string(),
                });
            }
            self.limits.extend(rows);
        }

        Ok(())
    }

    fn tables(&self) -> Vec<Box<dyn ExportTable>> {
        vec![Box::new(self.limits.clone())]
    }
}
