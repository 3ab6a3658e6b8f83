//! Harvest module - concurrent tenancy inventory collection and export.
//!
//! - **Discovery**: [`discover_tenancy`] resolves regions, compartments and
//!   availability domains before any collection starts
//! - **Collectors**: one [`ResourceCollector`] per inventory domain, each
//!   appending to its own [`Accumulator`] tables
//! - **Pipeline**: [`HarvestCoordinator`] fans every (collector, scope) unit
//!   out onto the runtime and waits for all of them
//! - **Export**: [`ExportStage`] writes each table as one CSV object
//! - **Cycle**: [`HarvestCycle`] runs the three phases under one report number

pub mod accumulator;
pub mod collectors;
pub mod cycle;
pub mod discovery;
pub mod export;
pub mod pipeline;
pub mod records;
pub mod traits;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export commonly used types
pub use accumulator::Accumulator;
pub use collectors::default_collectors;
pub use cycle::{CycleReport, HarvestCycle, HarvestError};
pub use discovery::{discover_tenancy, DiscoveryError};
pub use export::{ExportError, ExportStage, ExportSummary};
pub use pipeline::{CompletedHarvest, HarvestCoordinator, HarvestStats};
pub use traits::{
    CollectError, ExportRecord, ExportTable, Granularity, HarvestContext, ResourceCollector,
    Scope, WorkUnit,
};
