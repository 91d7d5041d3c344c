//! `$orderby` parsing.

use crate::edm::{EdmModel, EdmType, PropertyPath, TypeKey};
use crate::error::{ODataError, Result};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderByDirection {
    #[default]
    Ascending,
    Descending,
}

/// One `path [asc|desc]` item of `$orderby`
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByProperty {
    path: Arc<PropertyPath>,
    direction: OrderByDirection,
}

impl OrderByProperty {
    pub fn new(path: Arc<PropertyPath>, direction: OrderByDirection) -> Self {
        Self { path, direction }
    }

    pub fn path(&self) -> &Arc<PropertyPath> {
        &self.path
    }

    pub fn direction(&self) -> OrderByDirection {
        self.direction
    }
}

impl fmt::Display for OrderByProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            OrderByDirection::Ascending => write!(f, "{} asc", self.path),
            OrderByDirection::Descending => write!(f, "{} desc", self.path),
        }
    }
}

/// Parse the value of `$orderby`, e.g. `Category/Name asc, Price desc`
pub fn parse_order_by(raw: &str, model: &EdmModel, type_key: TypeKey) -> Result<Vec<OrderByProperty>> {
    let mut properties = Vec::new();

    for item in raw.split(',') {
        let mut words = item.split_whitespace();
        let path_text = words.next().ok_or_else(|| {
            ODataError::syntax(format!("The $orderby value '{}' contains an empty item", raw))
                .with_target("$orderby")
        })?;
        let direction = match words.next() {
            None | Some("asc") => OrderByDirection::Ascending,
            Some("desc") => OrderByDirection::Descending,
            Some(other) => {
                return Err(ODataError::syntax(format!(
                    "Expected 'asc' or 'desc' after '{}' in $orderby, found '{}'",
                    path_text, other
                ))
                .with_target(other))
            }
        };
        if let Some(extra) = words.next() {
            return Err(ODataError::syntax(format!(
                "Unexpected '{}' after '{}' in $orderby",
                extra,
                item.trim()
            ))
            .with_target(extra));
        }

        let path = model.resolve_path(type_key, path_text)?;
        if matches!(
            path.terminal().property_type(),
            EdmType::Complex(_) | EdmType::Collection(_)
        ) {
            return Err(ODataError::syntax(format!(
                "Cannot order by '{}': only primitive and enum properties are orderable",
                path_text
            ))
            .with_target(path_text));
        }
        properties.push(OrderByProperty::new(path, direction));
    }

    log::debug!(
        "parsed $orderby '{}' as [{}]",
        raw,
        properties
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{self, Product};

    #[test]
    fn test_parse_order_by() -> Result<()> {
        let model = demo::model()?;
        let items = parse_order_by("Category/Name, Price desc,Id asc", &model, TypeKey::of::<Product>())?;
        let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["Category/Name asc", "Price desc", "Id asc"]);
        assert_eq!(items[1].direction(), OrderByDirection::Descending);
        Ok(())
    }

    #[test]
    fn test_order_by_errors() -> Result<()> {
        let model = demo::model()?;
        let key = TypeKey::of::<Product>();

        let err = parse_order_by("Price sideways", &model, key).unwrap_err();
        assert_eq!(err.target(), Some("sideways"));

        let err = parse_order_by("Price,", &model, key).unwrap_err();
        assert!(err.to_string().contains("empty item"));

        let err = parse_order_by("Tags", &model, key).unwrap_err();
        assert!(err.to_string().contains("Cannot order by 'Tags'"));

        let err = parse_order_by("Weight desc", &model, key).unwrap_err();
        assert!(matches!(err, ODataError::Resolution { .. }));
        Ok(())
    }
}
