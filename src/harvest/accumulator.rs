//! Concurrency-safe, append-only record collections.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::harvest::traits::{ExportRecord, ExportTable};

/// Per-table record collection shared by every work unit of a collector.
///
/// Clones share the same storage. Appends are serialized by a mutex and a
/// batch is appended under a single lock, so concurrent writers never lose
/// or interleave each other's records.
pub struct Accumulator<T> {
    table: &'static str,
    records: Arc<Mutex<Vec<T>>>,
}

impl<T> Accumulator<T> {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn push(&self, record: T) {
        self.records.lock().push(record);
    }

    /// Appends a batch atomically with respect to other writers.
    pub fn extend<I>(&self, records: I)
    where
        I: IntoIterator<Item = T>,
    {
        let batch: Vec<T> = records.into_iter().collect();
        if batch.is_empty() {
            return;
        }
        self.records.lock().extend(batch);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Accumulator<T> {
    /// Copy of the records in accumulation order.
    pub fn snapshot(&self) -> Vec<T> {
        self.records.lock().clone()
    }
}

impl<T> Clone for Accumulator<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table,
            records: Arc::clone(&self.records),
        }
    }
}

impl<T> fmt::Debug for Accumulator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accumulator")
            .field("table", &self.table)
            .field("len", &self.len())
            .finish()
    }
}

impl<T: ExportRecord> ExportTable for Accumulator<T> {
    fn table_name(&self) -> &'static str {
        self.table
    }

    fn headers(&self) -> &'static [&'static str] {
        T::HEADERS
    }

    fn len(&self) -> usize {
        Accumulator::len(self)
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.records.lock().iter().map(ExportRecord::fields).collect()
    }
}
