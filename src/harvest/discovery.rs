//! Builds the immutable [`Tenancy`] a harvest cycle runs against.
//!
//! Discovery is the one stage whose failures are not absorbed: without the
//! region and compartment lists there is no work grid to run.

use thiserror::Error;
use tracing::{info, instrument};

use crate::executor::{CallExecutor, CallFailed};
use crate::model::Tenancy;
use crate::traits::{ManagementApi, RequestContext};

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("tenancy discovery failed: {0}")]
    Call(#[from] CallFailed),

    #[error("tenancy {tenancy_id} has no subscribed regions")]
    NoRegions { tenancy_id: String },
}

/// Reads the tenancy, its region subscriptions, compartment subtree and the
/// availability domains of every subscribed region.
///
/// Identity calls go to `home_region`; availability domains are listed with
/// a context for their own region.
///
/// # Errors
///
/// Returns [`DiscoveryError::Call`] if any identity call fails terminally,
/// whatever its classification, and [`DiscoveryError::NoRegions`] if the
/// tenancy has no region subscriptions.
#[instrument(skip(api, calls))]
pub async fn discover_tenancy(
    api: &dyn ManagementApi,
    calls: &CallExecutor,
    tenancy_id: &str,
    home_region: &str,
) -> Result<Tenancy, DiscoveryError> {
    let home = RequestContext::new(tenancy_id, home_region);

    let info = calls
        .call_required(&home, "get_tenancy", || api.get_tenancy(&home, tenancy_id))
        .await?;
    let regions = calls
        .call_required(&home, "list_region_subscriptions", || {
            api.list_region_subscriptions(&home, tenancy_id)
        })
        .await?;
    if regions.is_empty() {
        return Err(DiscoveryError::NoRegions {
            tenancy_id: tenancy_id.to_string(),
        });
    }
    let compartments = calls
        .call_required(&home, "list_compartments", || {
            api.list_compartments(&home, tenancy_id)
        })
        .await?;

    let mut availability_domains = Vec::new();
    for region in &regions {
        let ctx = RequestContext::new(tenancy_id, region.name.as_str());
        let ads = calls
            .call_required(&ctx, "list_availability_domains", || {
                api.list_availability_domains(&ctx, tenancy_id)
            })
            .await?;
        availability_domains.extend(ads);
    }

    let tenancy = Tenancy::new(info, regions, compartments, availability_domains);
    info!(
        tenancy = %tenancy.name,
        regions = tenancy.regions.len(),
        compartments = tenancy.compartments.len(),
        availability_domains = tenancy.availability_domains.len(),
        "Tenancy discovered"
    );
    Ok(tenancy)
}
