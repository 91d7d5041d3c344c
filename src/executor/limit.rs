//! Limit executor implementation.
//!
//! This executor applies `$skip` and `$top` to the records of a child executor.

use crate::access::Record;
use crate::error::{ODataError, Result};
use crate::executor::{Executor, RecordExecutor};

/// Executor that pages through the records of its child
pub struct LimitExecutor<'a> {
    /// Child executor that produces records
    child: RecordExecutor<'a>,
    /// Maximum number of records to return, unbounded when `None`
    top: Option<usize>,
    /// Number of records to skip before returning
    skip: usize,
    /// Number of records skipped so far
    skipped: usize,
    /// Number of records returned so far
    returned: usize,
    /// Whether the executor has been initialized
    initialized: bool,
}

impl<'a> LimitExecutor<'a> {
    pub fn new(child: RecordExecutor<'a>, skip: usize, top: Option<usize>) -> Self {
        Self {
            child,
            top,
            skip,
            skipped: 0,
            returned: 0,
            initialized: false,
        }
    }
}

impl<'a> Executor for LimitExecutor<'a> {
    type Item = &'a dyn Record;

    fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.child.init()?;

        self.skipped = 0;
        self.returned = 0;
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

        if self.top.is_some_and(|top| self.returned >= top) {
            return Ok(None);
        }

        while self.skipped < self.skip {
            if self.child.next()?.is_none() {
                return Ok(None);
            }
            self.skipped += 1;
        }

        let record = self.child.next()?;
        if record.is_some() {
            self.returned += 1;
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Value;
    use crate::demo;
    use crate::executor::SeqScanExecutor;

    fn page(skip: usize, top: Option<usize>) -> Result<Vec<Value>> {
        let products = demo::products();
        let mut executor =
            LimitExecutor::new(Box::new(SeqScanExecutor::over(&products)), skip, top);
        executor.init()?;

        let mut ids = Vec::new();
        while let Some(record) = executor.next()? {
            ids.push(record.field("Id"));
        }
        Ok(ids)
    }

    #[test]
    fn test_skip_and_top() -> Result<()> {
        assert_eq!(page(0, Some(2))?, vec![Value::Int32(1), Value::Int32(2)]);
        assert_eq!(page(3, None)?, vec![Value::Int32(4), Value::Int32(5)]);
        assert_eq!(page(4, Some(5))?, vec![Value::Int32(5)]);
        assert!(page(10, Some(1))?.is_empty());
        assert!(page(0, Some(0))?.is_empty());
        Ok(())
    }
}
