use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Tenancy details as returned by the identity API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenancyInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub home_region_key: Option<String>,
}

/// The root scope of one harvest cycle.
///
/// Built once by discovery and shared read-only (behind an `Arc`) by every
/// work unit of the cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenancy {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub home_region_key: Option<String>,
    pub regions: Vec<Region>,
    /// Root compartment first, followed by every compartment in the subtree.
    pub compartments: Vec<Compartment>,
    pub availability_domains: Vec<AvailabilityDomain>,
}

impl Tenancy {
    /// Assembles a tenancy, synthesizing its root compartment.
    ///
    /// Any compartment in `compartments` that carries the tenancy id is
    /// dropped so that exactly one root exists.
    pub fn new(
        info: TenancyInfo,
        regions: Vec<Region>,
        compartments: Vec<Compartment>,
        availability_domains: Vec<AvailabilityDomain>,
    ) -> Self {
        let root = Compartment::root(&info);
        let mut all = Vec::with_capacity(compartments.len() + 1);
        all.push(root);
        all.extend(compartments.into_iter().filter(|c| c.id != info.id));

        Self {
            id: info.id,
            name: info.name,
            description: info.description,
            home_region_key: info.home_region_key,
            regions,
            compartments: all,
            availability_domains,
        }
    }

    /// Compartments eligible for the work grid: ACTIVE and not excluded by name.
    pub fn harvestable_compartments<'a>(
        &'a self,
        excluded: &'a HashSet<String>,
    ) -> impl Iterator<Item = &'a Compartment> + 'a {
        self.compartments
            .iter()
            .filter(move |c| c.lifecycle_state.is_active() && !excluded.contains(&c.name))
    }

    /// Availability domains that belong to `region_name`.
    pub fn availability_domains_in(&self, region_name: &str) -> Vec<AvailabilityDomain> {
        self.availability_domains
            .iter()
            .filter(|ad| ad.is_in_region(region_name))
            .cloned()
            .collect()
    }

    /// The region tenancy-wide calls are issued against.
    ///
    /// Falls back to the first subscribed region when none is flagged home.
    pub fn home_region(&self) -> Option<&Region> {
        self.regions
            .iter()
            .find(|r| r.is_home_region)
            .or_else(|| self.regions.first())
    }
}

/// A subscribed region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Short key, e.g. `FRA`
    pub key: String,
    /// Full name, e.g. `eu-frankfurt-1`
    pub name: String,
    #[serde(default)]
    pub is_home_region: bool,
}

/// Lifecycle state shared by identity resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Creating,
    Active,
    Inactive,
    Deleting,
    Deleted,
    #[serde(other)]
    Unknown,
}

impl LifecycleState {
    pub fn is_active(self) -> bool {
        matches!(self, LifecycleState::Active)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Creating => "CREATING",
            LifecycleState::Active => "ACTIVE",
            LifecycleState::Inactive => "INACTIVE",
            LifecycleState::Deleting => "DELETING",
            LifecycleState::Deleted => "DELETED",
            LifecycleState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// A logical grouping of resources inside the tenancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compartment {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Parent id (the tenancy id for top-level compartments)
    pub compartment_id: String,
    pub lifecycle_state: LifecycleState,
}

impl Compartment {
    /// The synthetic root compartment of a tenancy.
    pub fn root(info: &TenancyInfo) -> Self {
        Self {
            id: info.id.clone(),
            name: format!("{} (root)", info.name),
            description: info.description.clone(),
            compartment_id: info.id.clone(),
            lifecycle_state: LifecycleState::Active,
        }
    }
}

/// A fault-isolation zone. The owning region is encoded in the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityDomain {
    pub id: String,
    /// Structured name, e.g. `Uocm:EU-FRANKFURT-1-AD-1`
    pub name: String,
    pub compartment_id: String,
}

impl AvailabilityDomain {
    /// Region name parsed out of the domain name.
    ///
    /// `Uocm:EU-FRANKFURT-1-AD-1` yields `eu-frankfurt-1`. Returns `None` when
    /// the name has no `-AD-` token.
    pub fn region_name(&self) -> Option<String> {
        let unprefixed = match self.name.split_once(':') {
            Some((_, rest)) => rest,
            None => self.name.as_str(),
        };
        let upper = unprefixed.to_uppercase();
        let (region, _) = upper.rsplit_once("-AD-")?;
        if region.is_empty() {
            return None;
        }
        Some(region.to_lowercase())
    }

    /// Whether the domain belongs to `region_name`.
    ///
    /// Domains of the oldest regions carry no region number
    /// (`Uocm:US-ASHBURN-AD-1`), so a parsed `us-ashburn` also matches
    /// `us-ashburn-1`.
    pub fn is_in_region(&self, region_name: &str) -> bool {
        let Some(parsed) = self.region_name() else {
            return false;
        };
        let region_name = region_name.to_lowercase();
        match region_name.strip_prefix(parsed.as_str()) {
            Some("") => true,
            Some(rest) => rest
                .strip_prefix('-')
                .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())),
            None => false,
        }
    }
}

/// Per-cycle correlation key stamped on every exported row.
///
/// Formatted as `YYYY-MM-DDTHH-MM-SSZ` (UTC, colons replaced by hyphens).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportNumber(String);

impl ReportNumber {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(time: DateTime<Utc>) -> Self {
        Self(time.format("%Y-%m-%dT%H-%M-%SZ").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
