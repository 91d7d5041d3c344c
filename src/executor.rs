//! Executor layer for query execution.
//!
//! This module implements the Volcano-style iterator model over in-memory
//! records. Each executor produces one item at a time via `next()`, and a query
//! runs as scan, filter, sort, limit and projection stacked in that order.

use crate::access::Record;
use crate::edm::{HostType, TypeKey};
use crate::error::{ODataError, Result};
use crate::query_options::QueryOptions;

pub mod filter;
pub mod limit;
pub mod projection;
pub mod seq_scan;
pub mod sort;

// Re-export executors
pub use filter::FilterExecutor;
pub use limit::LimitExecutor;
pub use projection::{ProjectedRecord, ProjectedValue, ProjectionExecutor, Projector};
pub use seq_scan::SeqScanExecutor;
pub use sort::{NullOrder, SortCriteria, SortExecutor};

/// Trait for all query executors
pub trait Executor {
    type Item;

    /// Initialize the executor. This must be called before `next()`.
    fn init(&mut self) -> Result<()>;

    /// Get the next item from the executor.
    /// Returns None when there are no more items.
    fn next(&mut self) -> Result<Option<Self::Item>>;
}

/// An executor yielding borrowed records
pub type RecordExecutor<'a> = Box<dyn Executor<Item = &'a dyn Record> + 'a>;

/// Outcome of running a query over a set of records
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// The projected page
    pub records: Vec<ProjectedRecord>,
    /// Matching records before paging, when `$count=true`
    pub count: Option<usize>,
    /// Where the next page starts, when `$top` cut the result short
    pub next_skip: Option<usize>,
}

/// Drain an executor into a vector
fn collect<E: Executor + ?Sized>(executor: &mut E) -> Result<Vec<E::Item>> {
    executor.init()?;
    let mut items = Vec::new();
    while let Some(item) = executor.next()? {
        items.push(item);
    }
    Ok(items)
}

/// Run `options` over `records`.
///
/// The record type must be the entity type of the options' entity set. Every
/// option is parsed before any record is read, so an invalid option fails the
/// query even when there is nothing to return.
pub fn execute<R: HostType + Record>(records: &[R], options: &QueryOptions) -> Result<QueryResult> {
    let entity_set = options.entity_set();
    let type_key = TypeKey::of::<R>();
    if entity_set.entity_type() != type_key {
        return Err(ODataError::usage(
            format!(
                "The records are of type '{}' but the entity set '{}' holds '{}'",
                type_key.host_name(),
                entity_set.name(),
                entity_set.entity_type().host_name()
            ),
            Some(entity_set.name()),
        ));
    }

    let filter = options.filter()?;
    let order_by = options.order_by()?;
    let paths = options.select_expand()?;
    let skip = options.skip()?.unwrap_or(0);
    let top = options.top()?;
    let count = options.count()?;
    options.format()?;

    let mut executor: RecordExecutor<'_> = Box::new(SeqScanExecutor::over(records));
    if let Some(predicate) = filter {
        executor = Box::new(FilterExecutor::new(executor, predicate));
    }
    if !order_by.is_empty() {
        executor = Box::new(SortExecutor::new(
            executor,
            order_by.iter().map(SortCriteria::from).collect(),
        ));
    }
    let matched = collect(executor.as_mut())?;
    let total = matched.len();

    let next_skip = top
        .map(|top| skip.saturating_add(top))
        .filter(|next| *next < total);

    let page: RecordExecutor<'_> = Box::new(LimitExecutor::new(
        Box::new(SeqScanExecutor::new(matched)),
        skip,
        top,
    ));
    let mut projection = ProjectionExecutor::new(page, options.model(), type_key, paths);
    let projected = collect(&mut projection)?;

    log::debug!(
        "'{}': {} of {} records matched, returning {}",
        entity_set.name(),
        total,
        records.len(),
        projected.len()
    );

    Ok(QueryResult {
        records: projected,
        count: count.then_some(total),
        next_skip,
    })
}

/// Run `options` over `records`, keeping only the projected records
pub fn apply<R: HostType + Record>(
    records: &[R],
    options: &QueryOptions,
) -> Result<Vec<ProjectedRecord>> {
    execute(records, options).map(|result| result.records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Value;
    use crate::demo::{self, Category, Product};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn options(query: &str, entity_set: &str) -> Result<QueryOptions> {
        QueryOptions::parse(query, entity_set, Arc::new(demo::model()?))
    }

    fn ids(records: &[ProjectedRecord]) -> Vec<Value> {
        records
            .iter()
            .filter_map(|record| record.value("Id").cloned())
            .collect()
    }

    #[test]
    fn test_execute_pipeline() -> Result<()> {
        let options = options(
            "$filter=Category/Name eq 'Phones'&$orderby=Price desc&$skip=1&$top=2&$count=true",
            "Products",
        )?;
        let result = execute(&demo::products(), &options)?;

        assert_eq!(ids(&result.records), vec![Value::Int32(1), Value::Int32(4)]);
        assert_eq!(result.count, Some(4));
        assert_eq!(result.next_skip, Some(3));
        Ok(())
    }

    #[test]
    fn test_last_page_has_no_next_skip() -> Result<()> {
        let options = options("$skip=3&$top=2", "Products")?;
        let result = execute(&demo::products(), &options)?;
        assert_eq!(ids(&result.records), vec![Value::Int32(4), Value::Int32(5)]);
        assert_eq!(result.count, None);
        assert_eq!(result.next_skip, None);
        Ok(())
    }

    #[test]
    fn test_apply_without_options_returns_everything() -> Result<()> {
        let records = apply(&demo::categories(), &options("", "Categories")?)?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field_names(), vec!["Description", "Id", "Name"]);
        Ok(())
    }

    #[test]
    fn test_record_type_must_match_entity_set() -> Result<()> {
        let products = options("$filter=Id eq 1", "Products")?;
        let err = execute(&demo::categories(), &products).unwrap_err();
        assert!(matches!(err, ODataError::Usage { .. }));
        assert_eq!(err.target(), Some("Products"));

        let categories = options("$top=1", "Categories")?;
        assert!(execute::<Category>(&[], &categories)?.records.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_option_fails_on_empty_input() -> Result<()> {
        let options = options("$top=many", "Products")?;
        let err = execute::<Product>(&[], &options).unwrap_err();
        assert_eq!(err.target(), Some("$top"));
        Ok(())
    }
}
