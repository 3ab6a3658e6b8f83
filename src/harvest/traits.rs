//! Core traits and types for the collection engine.
//!
//! This module defines the seams of a harvest cycle:
//! - Domain collectors via [`ResourceCollector`]
//! - The unit of concurrent work via [`WorkUnit`] and its [`Scope`]
//! - Export layouts via [`ExportRecord`] and type-erased [`ExportTable`]s

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::executor::{CallExecutor, CallFailed};
use crate::model::{AvailabilityDomain, Compartment, Tenancy};
use crate::traits::{ManagementApi, RequestContext};

// ============================================================================
// Collector Trait
// ============================================================================

/// How often a collector runs within one harvest cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Once per cycle, against the home region
    Tenancy,
    /// Once per subscribed region
    Region,
    /// Once per region and harvestable compartment
    Compartment,
}

/// Collects one resource domain (compute, database, ...) for a scope.
///
/// A collector owns the accumulators for the tables of its domain. The
/// coordinator runs one task per work unit, all sharing the same collector,
/// so `collect` must only ever append to those accumulators.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; work units of the same collector
/// run in parallel.
///
/// # Examples
///
/// ```ignore
/// struct VolumeCollector { volumes: Accumulator<BlockVolume> }
///
/// #[async_trait]
/// impl ResourceCollector for VolumeCollector {
///     fn name(&self) -> &'static str { "volumes" }
///     fn granularity(&self) -> Granularity { Granularity::Compartment }
///
///     async fn collect(&self, scope: &Scope, cx: &HarvestContext) -> Result<(), CollectError> {
///         let compartment = scope.compartment()?;
///         let volumes = cx.calls.call_list(&scope.request, "list_volumes", || {
///             cx.api.list_volumes(&scope.request, &compartment.id)
///         }).await?;
///         self.volumes.extend(volumes);
///         Ok(())
///     }
///
///     fn tables(&self) -> Vec<Box<dyn ExportTable>> {
///         vec![Box::new(self.volumes.clone())]
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceCollector: Send + Sync {
    /// Short identifier used in logs and work unit labels.
    fn name(&self) -> &'static str;

    /// Determines how many work units the collector gets.
    fn granularity(&self) -> Granularity;

    /// Collects the records of one scope into the collector's accumulators.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError`] when a fatal failure stops this scope. Records
    /// appended before the failure are kept.
    async fn collect(&self, scope: &Scope, cx: &HarvestContext) -> Result<(), CollectError>;

    /// Handles to the collector's tables, read by the export stage.
    fn tables(&self) -> Vec<Box<dyn ExportTable>>;
}

/// Shared, read-only collaborators handed to every work unit.
#[derive(Clone)]
pub struct HarvestContext {
    pub api: Arc<dyn ManagementApi>,
    pub calls: CallExecutor,
    pub tenancy: Arc<Tenancy>,
}

// ============================================================================
// Work Units
// ============================================================================

/// Where a work unit collects: request context plus optional compartment.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Per-unit request context (tenancy and region)
    pub request: RequestContext,

    /// Set for compartment-granular collectors
    pub compartment: Option<Compartment>,

    /// Availability domains of the scope's region
    pub availability_domains: Vec<AvailabilityDomain>,
}

impl Scope {
    pub fn region(&self) -> &str {
        &self.request.region
    }

    /// The compartment of a compartment-granular scope.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::MissingCompartment`] for region or tenancy scopes.
    pub fn compartment(&self) -> Result<&Compartment, CollectError> {
        self.compartment
            .as_ref()
            .ok_or_else(|| CollectError::MissingCompartment {
                region: self.request.region.clone(),
            })
    }
}

/// One (collector, region, compartment) job of the work grid.
#[derive(Clone)]
pub struct WorkUnit {
    pub collector: Arc<dyn ResourceCollector>,
    pub scope: Scope,
}

impl WorkUnit {
    pub fn collector_name(&self) -> &'static str {
        self.collector.name()
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.collector.name(), self.scope.region())?;
        if let Some(compartment) = &self.scope.compartment {
            write!(f, "/{}", compartment.name)?;
        }
        Ok(())
    }
}

impl fmt::Debug for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkUnit")
            .field("collector", &self.collector.name())
            .field("scope", &self.scope)
            .finish()
    }
}

// ============================================================================
// Export Layouts
// ============================================================================

/// A record kind with a fixed tabular layout.
pub trait ExportRecord: Send + Sync + 'static {
    /// Column names, in order. The export stage appends `report_no`.
    const HEADERS: &'static [&'static str];

    /// Cell values in [`ExportRecord::HEADERS`] order.
    fn fields(&self) -> Vec<String>;
}

/// A named table of rows, independent of its record type.
pub trait ExportTable: Send + Sync {
    /// Table name, used as the export key prefix (e.g. `instance`).
    fn table_name(&self) -> &'static str;

    fn headers(&self) -> &'static [&'static str];

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows in accumulation order.
    fn rows(&self) -> Vec<Vec<String>>;
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that stop a single work unit.
#[derive(Error, Debug)]
pub enum CollectError {
    /// A remote call failed fatally
    #[error(transparent)]
    Call(#[from] CallFailed),

    /// A compartment-granular collector ran without a compartment
    #[error("no compartment in scope for region {region}")]
    MissingCompartment { region: String },
}
