//! Filter executor implementation.
//!
//! This executor passes on the records of a child executor for which the
//! `$filter` predicate evaluates to `true`.

use crate::access::Record;
use crate::error::{ODataError, Result};
use crate::executor::{Executor, RecordExecutor};
use crate::expression::{ExpressionEvaluator, QueryNode};

/// Executor that filters records based on an expression
pub struct FilterExecutor<'a> {
    /// Child executor that produces records
    child: RecordExecutor<'a>,
    /// Type checked predicate
    predicate: &'a QueryNode,
    /// Whether the executor has been initialized
    initialized: bool,
}

impl<'a> FilterExecutor<'a> {
    pub fn new(child: RecordExecutor<'a>, predicate: &'a QueryNode) -> Self {
        Self {
            child,
            predicate,
            initialized: false,
        }
    }
}

impl<'a> Executor for FilterExecutor<'a> {
    type Item = &'a dyn Record;

    fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.child.init()?;
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

        while let Some(record) = self.child.next()? {
            if ExpressionEvaluator::new(record).evaluate_predicate(self.predicate)? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}
