//! Sequential scan executor implementation.
//!
//! Yields the caller's records one at a time, in the order given.

use crate::access::Record;
use crate::error::{ODataError, Result};
use crate::executor::Executor;

/// Executor that scans a slice of records
pub struct SeqScanExecutor<'a> {
    /// Records to scan
    records: Vec<&'a dyn Record>,
    /// Index of the next record to return
    position: usize,
    /// Whether the executor has been initialized
    initialized: bool,
}

impl<'a> SeqScanExecutor<'a> {
    pub fn new(records: Vec<&'a dyn Record>) -> Self {
        Self {
            records,
            position: 0,
            initialized: false,
        }
    }

    /// Scan a slice of concrete records
    pub fn over<R: Record + 'a>(records: &'a [R]) -> Self {
        Self::new(records.iter().map(|r| r as &dyn Record).collect())
    }
}

impl<'a> Executor for SeqScanExecutor<'a> {
    type Item = &'a dyn Record;

    fn init(&mut self) -> Result<()> {
        self.position = 0;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Self::Item>> {
        if !self.initialized {
            return Err(ODataError::usage(
                "Executor not initialized. Call init() first.",
                None,
            ));
        }

        let record = self.records.get(self.position).copied();
        if record.is_some() {
            self.position += 1;
        }
        Ok(record)
    }
}
