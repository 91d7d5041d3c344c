//! Sort executor implementation.
//!
//! This executor sorts records from a child executor by the `$orderby` items.
//! It materializes all records from the child before sorting, then returns
//! them in the sorted order.
//!
//! Supports:
//! - Multi-key sorting (`$orderby=Category/Name, Price desc`)
//! - Null handling (nulls first ascending, last descending)
//! - Stable ordering of equal keys

use crate::access::{Record, Value};
use crate::edm::PropertyPath;
use crate::error::{ODataError, Result};
use crate::executor::{Executor, RecordExecutor};
use crate::expression::{evaluate_expression, QueryNode};
use crate::query_options::{OrderByDirection, OrderByProperty};
use std::cmp::Ordering;
use std::sync::Arc;

/// Null ordering preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrder {
    First,
    Last,
}

/// Sort criteria for a single key
#[derive(Debug, Clone)]
pub struct SortCriteria {
    /// Property path the key is read from
    pub path: Arc<PropertyPath>,
    pub direction: OrderByDirection,
    pub null_order: NullOrder,
}

impl SortCriteria {
    /// Create new sort criteria with default null ordering
    /// (nulls first ascending, nulls last descending)
    pub fn new(path: Arc<PropertyPath>, direction: OrderByDirection) -> Self {
        let null_order = match direction {
            OrderByDirection::Ascending => NullOrder::First,
            OrderByDirection::Descending => NullOrder::Last,
        };
        Self {
            path,
            direction,
            null_order,
        }
    }
}

impl From<&OrderByProperty> for SortCriteria {
    fn from(item: &OrderByProperty) -> Self {
        SortCriteria::new(item.path().clone(), item.direction())
    }
}

/// Executor that sorts records
pub struct SortExecutor<'a> {
    /// Child executor that produces records
    child: RecordExecutor<'a>,
    criteria: Vec<SortCriteria>,
    /// Materialized records in sorted order
    sorted: Vec<&'a dyn Record>,
    /// Index of the next record to return
    position: usize,
    /// Whether the executor has been initialized
    initialized: bool,
}

impl<'a> SortExecutor<'a> {
    pub fn new(child: RecordExecutor<'a>, criteria: Vec<SortCriteria>) -> Self {
        Self {
            child,
            criteria,
            sorted: Vec::new(),
            position: 0,
            initialized: false,
        }
    }

    /// Compare two values according to direction and null handling
    fn compare_values(v1: &Value, v2: &Value, criteria: &SortCriteria) -> Ordering {
        match (v1, v2) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => match criteria.null_order {
                NullOrder::First => Ordering::Less,
                NullOrder::Last => Ordering::Greater,
            },
            (_, Value::Null) => match criteria.null_order {
                NullOrder::First => Ordering::Greater,
                NullOrder::Last => Ordering::Less,
            },
            (v1, v2) => {
                // Keys of one path share a type; anything else ties
                let cmp = v1.compare(v2).unwrap_or(Ordering::Equal);
                match criteria.direction {
                    OrderByDirection::Ascending => cmp,
                    OrderByDirection::Descending => cmp.reverse(),
                }
            }
        }
    }

    fn sort_records(&mut self, records: Vec<&'a dyn Record>) -> Result<()> {
        let nodes: Vec<QueryNode> = self
            .criteria
            .iter()
            .map(|c| QueryNode::property(c.path.clone()))
            .collect();

        let mut keyed = Vec::with_capacity(records.len());
        for record in records {
            let keys = nodes
                .iter()
                .map(|node| evaluate_expression(node, record))
                .collect::<Result<Vec<Value>>>()?;
            keyed.push((record, keys));
        }

        // sort_by is stable, so equal keys keep their input order
        keyed.sort_by(|a, b| {
            for (i, criteria) in self.criteria.iter().enumerate() {
                let cmp = Self::compare_values(&a.1[i], &b.1[i], criteria);
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        });

        self.sorted = keyed.into_iter().map(|(record, _)| record).collect();
        Ok(())
    }
}

impl<'a> Executor for SortExecutor<'a> {
    type Item = &'a dyn Record;

    fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.child.init()?;

        let mut records = Vec::new();
        while let Some(record) = self.child.next()? {
            records.push(record);
        }
        self.sort_records(records)?;

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

        let record = self.sorted.get(self.position).copied();
        if record.is_some() {
            self.position += 1;
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{self, Product};
    use crate::edm::TypeKey;
    use crate::executor::SeqScanExecutor;
    use crate::query_options::parse_order_by;

    fn sorted_ids(order_by: &str) -> Result<Vec<Value>> {
        let model = demo::model()?;
        let products = demo::products();
        let items = parse_order_by(order_by, &model, TypeKey::of::<Product>())?;

        let mut executor = SortExecutor::new(
            Box::new(SeqScanExecutor::over(&products)),
            items.iter().map(SortCriteria::from).collect(),
        );
        executor.init()?;

        let mut ids = Vec::new();
        while let Some(record) = executor.next()? {
            ids.push(record.field("Id"));
        }
        Ok(ids)
    }

    fn ids(ids: &[i32]) -> Vec<Value> {
        ids.iter().map(|id| Value::Int32(*id)).collect()
    }

    #[test]
    fn test_sort_single_key() -> Result<()> {
        assert_eq!(sorted_ids("Price")?, ids(&[5, 2, 4, 1, 3]));
        assert_eq!(sorted_ids("Price desc")?, ids(&[3, 1, 4, 2, 5]));
        Ok(())
    }

    #[test]
    fn test_sort_nulls() -> Result<()> {
        // The Pixel has no rating
        assert_eq!(sorted_ids("Rating")?, ids(&[4, 5, 2, 3, 1]));
        assert_eq!(sorted_ids("Rating desc")?, ids(&[1, 3, 2, 5, 4]));
        Ok(())
    }

    #[test]
    fn test_sort_multi_key_is_stable() -> Result<()> {
        assert_eq!(sorted_ids("Name, Price desc")?, ids(&[3, 4, 5, 1, 2]));
        assert_eq!(sorted_ids("Category/Name desc")?, ids(&[5, 1, 2, 3, 4]));
        Ok(())
    }

    #[test]
    fn test_next_before_init() {
        let products = demo::products();
        let mut executor = SortExecutor::new(Box::new(SeqScanExecutor::over(&products)), Vec::new());
        assert!(executor.next().is_err());
    }
}
