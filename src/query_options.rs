//! Query options container.
//!
//! [`RawQueryOptions`] splits a query string into per-option clauses. [`QueryOptions`]
//! binds them to an entity set and parses each structured option the first time it is
//! asked for, caching the result.

pub mod order_by;
pub mod raw;
pub mod select_expand;

pub use order_by::{parse_order_by, OrderByDirection, OrderByProperty};
pub use raw::{RawQueryOptions, SystemQueryOption};
pub use select_expand::{parse_select_expand, ExpandItem, PropertyPathList, Selection};

use crate::edm::{EdmModel, EntitySet};
use crate::error::{ODataError, Result};
use crate::expression::QueryNode;
use crate::filter::parse_filter;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Query options bound to one entity set, parsed lazily
#[derive(Debug)]
pub struct QueryOptions {
    raw: RawQueryOptions,
    model: Arc<EdmModel>,
    entity_set: EntitySet,
    filter: OnceCell<Option<QueryNode>>,
    order_by: OnceCell<Vec<OrderByProperty>>,
    select_expand: OnceCell<PropertyPathList>,
    skip: OnceCell<Option<usize>>,
    top: OnceCell<Option<usize>>,
    count: OnceCell<bool>,
    format: OnceCell<Option<String>>,
}

impl QueryOptions {
    /// Split `raw_query` and bind it to the named entity set.
    ///
    /// Only the option split and the entity set lookup happen here; each structured
    /// option is parsed on first access.
    pub fn parse(raw_query: &str, entity_set_name: &str, model: Arc<EdmModel>) -> Result<Self> {
        let raw = RawQueryOptions::parse(raw_query)?;
        let entity_set = model.entity_set(entity_set_name)?.clone();
        log::debug!(
            "query options for '{}': {:?}",
            entity_set.name(),
            raw.options().map(|o| o.name()).collect::<Vec<_>>()
        );
        Ok(Self::new(raw, entity_set, model))
    }

    pub fn new(raw: RawQueryOptions, entity_set: EntitySet, model: Arc<EdmModel>) -> Self {
        Self {
            raw,
            model,
            entity_set,
            filter: OnceCell::new(),
            order_by: OnceCell::new(),
            select_expand: OnceCell::new(),
            skip: OnceCell::new(),
            top: OnceCell::new(),
            count: OnceCell::new(),
            format: OnceCell::new(),
        }
    }

    pub fn raw(&self) -> &RawQueryOptions {
        &self.raw
    }

    pub fn model(&self) -> &Arc<EdmModel> {
        &self.model
    }

    pub fn entity_set(&self) -> &EntitySet {
        &self.entity_set
    }

    /// The `$filter` tree, type checked against the entity type
    pub fn filter(&self) -> Result<Option<&QueryNode>> {
        self.filter
            .get_or_try_init(|| {
                self.raw
                    .value(SystemQueryOption::Filter)
                    .map(|value| parse_filter(value, &self.model, self.entity_set.entity_type()))
                    .transpose()
            })
            .map(Option::as_ref)
    }

    pub fn order_by(&self) -> Result<&[OrderByProperty]> {
        self.order_by
            .get_or_try_init(|| match self.raw.value(SystemQueryOption::OrderBy) {
                Some(value) => parse_order_by(value, &self.model, self.entity_set.entity_type()),
                None => Ok(Vec::new()),
            })
            .map(Vec::as_slice)
    }

    pub fn select_expand(&self) -> Result<&PropertyPathList> {
        self.select_expand.get_or_try_init(|| {
            parse_select_expand(&self.raw, &self.model, self.entity_set.entity_type())
        })
    }

    pub fn skip(&self) -> Result<Option<usize>> {
        self.skip
            .get_or_try_init(|| self.parse_non_negative(SystemQueryOption::Skip))
            .copied()
    }

    pub fn top(&self) -> Result<Option<usize>> {
        self.top
            .get_or_try_init(|| self.parse_non_negative(SystemQueryOption::Top))
            .copied()
    }

    /// Whether `$count=true` was given
    pub fn count(&self) -> Result<bool> {
        self.count
            .get_or_try_init(|| match self.raw.value(SystemQueryOption::Count) {
                None | Some("false") => Ok(false),
                Some("true") => Ok(true),
                Some(other) => Err(ODataError::syntax(format!(
                    "$count must be 'true' or 'false', found '{}'",
                    other
                ))
                .with_target("$count")),
            })
            .copied()
    }

    /// The requested media type; `json` and `xml` are shorthands
    pub fn format(&self) -> Result<Option<&str>> {
        self.format
            .get_or_try_init(|| {
                self.raw
                    .value(SystemQueryOption::Format)
                    .map(|value| match value {
                        "json" => Ok("application/json".to_string()),
                        "xml" => Ok("application/xml".to_string()),
                        media_type if media_type.contains('/') => Ok(media_type.to_string()),
                        other => Err(ODataError::syntax(format!(
                            "$format must be 'json', 'xml' or a media type, found '{}'",
                            other
                        ))
                        .with_target("$format")),
                    })
                    .transpose()
            })
            .map(Option::as_deref)
    }

    /// The `$search` text as supplied; it is not evaluated
    pub fn search(&self) -> Option<&str> {
        self.raw.value(SystemQueryOption::Search)
    }

    /// Link to the page starting at `skip`
    pub fn next_link(&self, resource_path: &str, skip: usize) -> String {
        self.raw.next_link(resource_path, skip)
    }

    fn parse_non_negative(&self, option: SystemQueryOption) -> Result<Option<usize>> {
        self.raw
            .value(option)
            .map(|value| {
                value.trim().parse::<usize>().map_err(|_| {
                    ODataError::syntax(format!(
                        "{} must be a non-negative integer, found '{}'",
                        option, value
                    ))
                    .with_target(option.name())
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;

    fn options(query: &str) -> Result<QueryOptions> {
        QueryOptions::parse(query, "products", Arc::new(demo::model()?))
    }

    #[test]
    fn test_structured_options() -> Result<()> {
        let options = options(
            "$filter=Price gt 400M&$orderby=Name desc&$skip=1&$top=2&$count=true&$format=json&$search=blue",
        )?;
        assert_eq!(options.entity_set().name(), "Products");
        assert_eq!(
            options.filter()?.map(ToString::to_string),
            Some("(Price gt 400M)".to_string())
        );
        assert_eq!(options.order_by()?.len(), 1);
        assert_eq!(options.skip()?, Some(1));
        assert_eq!(options.top()?, Some(2));
        assert!(options.count()?);
        assert_eq!(options.format()?, Some("application/json"));
        assert_eq!(options.search(), Some("blue"));
        assert!(options.select_expand()?.is_default());
        Ok(())
    }

    #[test]
    fn test_options_are_parsed_once() -> Result<()> {
        let options = options("$filter=Id eq 1")?;
        let first = options.filter()?.map(|node| node as *const QueryNode);
        let second = options.filter()?.map(|node| node as *const QueryNode);
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_absent_options() -> Result<()> {
        let options = options("")?;
        assert!(options.filter()?.is_none());
        assert!(options.order_by()?.is_empty());
        assert_eq!(options.skip()?, None);
        assert!(!options.count()?);
        assert_eq!(options.format()?, None);
        Ok(())
    }

    #[test]
    fn test_invalid_values_fail_on_access() -> Result<()> {
        let options = options("$top=-1&$count=yes&$format=csv&$filter=Id eq")?;
        assert_eq!(options.top().unwrap_err().target(), Some("$top"));
        assert_eq!(options.count().unwrap_err().target(), Some("$count"));
        assert_eq!(options.format().unwrap_err().target(), Some("$format"));
        assert!(options.filter().is_err());
        assert_eq!(options.skip()?, None);
        Ok(())
    }

    #[test]
    fn test_unknown_entity_set() -> Result<()> {
        let err = QueryOptions::parse("", "Widgets", Arc::new(demo::model()?)).unwrap_err();
        assert!(matches!(err, ODataError::Resolution { .. }));
        assert_eq!(err.target(), Some("Widgets"));
        Ok(())
    }
}
