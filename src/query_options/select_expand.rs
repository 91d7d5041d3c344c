//! `$select` and `$expand` parsing.

use crate::edm::{EdmModel, EdmProperty, PropertyPath, Segments, TypeKey};
use crate::error::{ODataError, Result};
use crate::query_options::raw::{RawQueryOptions, SystemQueryOption};
use std::sync::Arc;

/// Which fields a projected record carries
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// No `$select`: every non-navigable property
    Default,
    /// `$select=*`
    All,
    /// The listed properties, in the order given
    Properties(Vec<Arc<PropertyPath>>),
}

/// A navigation property to expand and what to expand beneath it
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandItem {
    property: Arc<EdmProperty>,
    children: Vec<ExpandItem>,
}

impl ExpandItem {
    pub fn property(&self) -> &Arc<EdmProperty> {
        &self.property
    }

    pub fn children(&self) -> &[ExpandItem] {
        &self.children
    }

    fn insert(items: &mut Vec<ExpandItem>, mut segments: Segments<'_>) {
        let property = match segments.next() {
            Some(property) => property,
            None => return,
        };
        let index = match items.iter().position(|item| item.property.name() == property.name()) {
            Some(index) => index,
            None => {
                items.push(ExpandItem {
                    property: property.clone(),
                    children: Vec::new(),
                });
                items.len() - 1
            }
        };
        Self::insert(&mut items[index].children, segments);
    }
}

/// Parsed `$select` and `$expand`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPathList {
    selection: Selection,
    expand: Vec<Arc<PropertyPath>>,
    expand_tree: Vec<ExpandItem>,
}

impl Default for PropertyPathList {
    fn default() -> Self {
        Self {
            selection: Selection::Default,
            expand: Vec::new(),
            expand_tree: Vec::new(),
        }
    }
}

impl PropertyPathList {
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Expanded paths as supplied
    pub fn expand(&self) -> &[Arc<PropertyPath>] {
        &self.expand
    }

    /// Expanded paths merged by shared prefix, in first-seen order
    pub fn expand_items(&self) -> &[ExpandItem] {
        &self.expand_tree
    }

    pub fn is_default(&self) -> bool {
        self.selection == Selection::Default && self.expand.is_empty()
    }
}

/// Parse the `$select` and `$expand` options of `raw` against a type
pub fn parse_select_expand(
    raw: &RawQueryOptions,
    model: &EdmModel,
    type_key: TypeKey,
) -> Result<PropertyPathList> {
    let selection = match raw.value(SystemQueryOption::Select) {
        None => Selection::Default,
        Some(value) => parse_select(value, model, type_key)?,
    };
    let expand = match raw.value(SystemQueryOption::Expand) {
        None => Vec::new(),
        Some(value) => parse_expand(value, model, type_key)?,
    };

    let mut expand_tree = Vec::new();
    for path in &expand {
        ExpandItem::insert(&mut expand_tree, path.segments());
    }

    log::debug!(
        "parsed $select/$expand: {:?}, expanding {}",
        selection,
        expand
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(PropertyPathList {
        selection,
        expand,
        expand_tree,
    })
}

fn items(value: &str, option: SystemQueryOption) -> Result<Vec<&str>> {
    value
        .split(',')
        .map(|item| {
            let item = item.trim();
            if item.is_empty() {
                Err(ODataError::syntax(format!(
                    "The {} value '{}' contains an empty item",
                    option, value
                ))
                .with_target(option.name()))
            } else {
                Ok(item)
            }
        })
        .collect()
}

fn parse_select(value: &str, model: &EdmModel, type_key: TypeKey) -> Result<Selection> {
    let items = items(value, SystemQueryOption::Select)?;
    if items.contains(&"*") {
        return Ok(Selection::All);
    }

    let mut paths: Vec<Arc<PropertyPath>> = Vec::with_capacity(items.len());
    for item in items {
        if item.contains('/') {
            return Err(ODataError::syntax(format!(
                "$select accepts single properties only, found '{}'",
                item
            ))
            .with_target(item));
        }
        let path = model.resolve_property(type_key, item)?;
        if !paths.iter().any(|p| Arc::ptr_eq(p, &path)) {
            paths.push(path);
        }
    }
    Ok(Selection::Properties(paths))
}

fn parse_expand(value: &str, model: &EdmModel, type_key: TypeKey) -> Result<Vec<Arc<PropertyPath>>> {
    let items = items(value, SystemQueryOption::Expand)?;

    if items.contains(&"*") {
        let complex_type = model.require_complex_type(type_key)?;
        return complex_type
            .properties()
            .iter()
            .filter(|property| property.is_navigable())
            .map(|property| model.resolve_property(type_key, property.name()))
            .collect();
    }

    let mut paths: Vec<Arc<PropertyPath>> = Vec::with_capacity(items.len());
    for item in items {
        let path = model.resolve_path(type_key, item)?;
        let terminal = path.terminal();
        if !terminal.is_navigable() {
            return Err(ODataError::resolution(
                format!(
                    "The property '{}' in the path '{}' is not navigable and cannot be expanded",
                    terminal.name(),
                    item
                ),
                terminal.name(),
            ));
        }
        if !paths.iter().any(|p| Arc::ptr_eq(p, &path)) {
            paths.push(path);
        }
    }
    Ok(paths)
}
