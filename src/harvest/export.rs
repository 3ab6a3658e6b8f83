//! CSV serialization of completed tables and upload to an object store.

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::harvest::pipeline::CompletedHarvest;
use crate::harvest::traits::ExportTable;
use crate::model::ReportNumber;
use crate::store::{ObjectStore, StoreError};

/// Column appended to every table, holding the cycle's report number.
pub const REPORT_COLUMN: &str = "report_no";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV rendering failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer could not be flushed: {0}")]
    Encode(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A table that could not be exported.
#[derive(Debug, Clone, Serialize)]
pub struct ExportFailure {
    pub key: String,
    pub reason: String,
}

/// Outcome of exporting every table of a harvest.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    /// Keys written, in export order
    pub uploaded: Vec<String>,
    pub failed: Vec<ExportFailure>,
}

impl ExportSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Object key of a table: `<table>_<report-number>.csv`.
pub fn object_key(table: &str, report: &ReportNumber) -> String {
    format!("{table}_{report}.csv")
}

/// Renders a table as CSV: header row plus `report_no`, then one row per
/// record in accumulation order, each tagged with `report`.
///
/// # Errors
///
/// Returns [`ExportError::Csv`] or [`ExportError::Encode`] if the writer
/// fails.
pub fn render_table(
    table: &dyn ExportTable,
    report: &ReportNumber,
) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(table.headers().iter().copied().chain([REPORT_COLUMN]))?;
    for row in table.rows() {
        writer.write_record(row.iter().map(String::as_str).chain([report.as_str()]))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Encode(e.to_string()))
}

/// Writes every table of a completed harvest to an object store.
///
/// Tables are exported one after another. A table that fails to render or
/// upload is logged and recorded in the [`ExportSummary`]; the remaining
/// tables are still exported.
pub struct ExportStage<S: ObjectStore> {
    store: S,
    report: ReportNumber,
}

impl<S: ObjectStore> ExportStage<S> {
    pub fn new(store: S, report: ReportNumber) -> Self {
        Self { store, report }
    }

    pub fn report(&self) -> &ReportNumber {
        &self.report
    }

    pub async fn export(&self, harvest: &CompletedHarvest) -> ExportSummary {
        self.export_tables(harvest.tables()).await
    }

    pub async fn export_tables(&self, tables: &[Box<dyn ExportTable>]) -> ExportSummary {
        let mut summary = ExportSummary::default();

        for table in tables {
            let key = object_key(table.table_name(), &self.report);
            match self.export_table(table.as_ref(), &key).await {
                Ok(()) => {
                    info!(key = %key, rows = table.len(), "Exported table");
                    summary.uploaded.push(key);
                }
                Err(e) => {
                    error!(key = %key, error = %e, "Table export failed");
                    summary.failed.push(ExportFailure {
                        key,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            report = %self.report,
            uploaded = summary.uploaded.len(),
            failed = summary.failed.len(),
            "Export finished"
        );
        summary
    }

    async fn export_table(&self, table: &dyn ExportTable, key: &str) -> Result<(), ExportError> {
        let body = render_table(table, &self.report)?;
        self.store.put(key, body).await?;
        Ok(())
    }
}
