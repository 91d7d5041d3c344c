//! Projection executor implementation.
//!
//! This executor reshapes each record of a child executor into an ordered field
//! map following `$select` and `$expand`. Navigation properties only appear when
//! expanded; other complex values become nested maps and enum values are written
//! by member name.

use crate::access::{Record, Value};
use crate::edm::{EdmModel, EdmProperty, EdmType, TypeKey};
use crate::error::{ODataError, Result};
use crate::executor::{Executor, RecordExecutor};
use crate::query_options::{ExpandItem, PropertyPathList, Selection};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

/// A projected field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProjectedValue {
    Value(Value),
    Record(ProjectedRecord),
    Records(Vec<ProjectedRecord>),
}

impl ProjectedValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ProjectedValue::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&ProjectedRecord> {
        match self {
            ProjectedValue::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_records(&self) -> Option<&[ProjectedRecord]> {
        match self {
            ProjectedValue::Records(records) => Some(records),
            _ => None,
        }
    }
}

/// A reshaped record: field name to value, in output order
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ProjectedRecord {
    fields: IndexMap<String, ProjectedValue>,
}

impl ProjectedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ProjectedValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ProjectedValue> {
        self.fields.get(name)
    }

    /// The plain value of a field, if it holds one
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(ProjectedValue::as_value)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProjectedValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Shapes records of one complex type
pub struct Projector<'a> {
    model: &'a EdmModel,
}

impl<'a> Projector<'a> {
    pub fn new(model: &'a EdmModel) -> Self {
        Self { model }
    }

    /// Project `record`, read as an instance of `type_key`
    pub fn project(
        &self,
        record: &dyn Record,
        type_key: TypeKey,
        selection: &Selection,
        expand: &[ExpandItem],
    ) -> Result<ProjectedRecord> {
        let complex_type = self.model.require_complex_type(type_key)?;
        let properties: Vec<&Arc<EdmProperty>> = match selection {
            Selection::Default | Selection::All => complex_type
                .properties()
                .iter()
                .filter(|p| !p.is_navigable())
                .collect(),
            Selection::Properties(paths) => paths
                .iter()
                .map(|path| path.property())
                .filter(|p| !p.is_navigable())
                .collect(),
        };

        let mut projected = ProjectedRecord::new();
        for property in properties {
            let value = self.project_value(record.field(property.name()), property.property_type())?;
            projected.insert(property.name(), value);
        }

        for item in expand {
            let property = item.property();
            let element = property.property_type().complex_key().ok_or_else(|| {
                ODataError::evaluation(format!(
                    "The expanded property '{}' does not hold records",
                    property.name()
                ))
            })?;
            let value = match record.field(property.name()) {
                Value::Null => ProjectedValue::Value(Value::Null),
                Value::Record(nested) => ProjectedValue::Record(self.project(
                    nested.as_ref(),
                    element,
                    &Selection::Default,
                    item.children(),
                )?),
                Value::Collection(items) => ProjectedValue::Records(
                    items
                        .iter()
                        .filter(|value| !value.is_null())
                        .map(|value| self.expect_record(value, property))
                        .map(|nested| {
                            self.project(nested?, element, &Selection::Default, item.children())
                        })
                        .collect::<Result<Vec<_>>>()?,
                ),
                other => {
                    return Err(ODataError::evaluation(format!(
                        "The expanded property '{}' holds {:?} instead of records",
                        property.name(),
                        other
                    )))
                }
            };
            projected.insert(property.name(), value);
        }

        Ok(projected)
    }

    fn expect_record<'v>(&self, value: &'v Value, property: &EdmProperty) -> Result<&'v dyn Record> {
        match value {
            Value::Record(record) => Ok(record.as_ref()),
            other => Err(ODataError::evaluation(format!(
                "The property '{}' holds {:?} where a record was expected",
                property.name(),
                other
            ))),
        }
    }

    fn project_value(&self, value: Value, edm_type: &EdmType) -> Result<ProjectedValue> {
        Ok(match (value, edm_type) {
            (Value::Enum(e), EdmType::Enum(key)) => {
                ProjectedValue::Value(self.enum_name(e.value, *key))
            }
            (Value::Record(record), EdmType::Complex(key)) => ProjectedValue::Record(self.project(
                record.as_ref(),
                *key,
                &Selection::Default,
                &[],
            )?),
            (Value::Collection(items), EdmType::Collection(inner)) => match inner.as_ref() {
                EdmType::Complex(key) => ProjectedValue::Records(
                    items
                        .iter()
                        .filter_map(|item| match item {
                            Value::Record(record) => Some(record),
                            _ => None,
                        })
                        .map(|record| self.project(record.as_ref(), *key, &Selection::Default, &[]))
                        .collect::<Result<Vec<_>>>()?,
                ),
                EdmType::Enum(key) => ProjectedValue::Value(Value::Collection(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::Enum(e) => self.enum_name(e.value, *key),
                            other => other,
                        })
                        .collect(),
                )),
                _ => ProjectedValue::Value(Value::Collection(items)),
            },
            (value, _) => ProjectedValue::Value(value),
        })
    }

    /// Member name of an enum value; unnamed values keep their number
    fn enum_name(&self, value: i64, key: TypeKey) -> Value {
        self.model
            .enum_type(key)
            .and_then(|enum_type| enum_type.format_value(value))
            .map_or(Value::Int64(value), Value::String)
    }
}

/// Executor that projects the records of its child
pub struct ProjectionExecutor<'a> {
    /// Child executor that produces records
    child: RecordExecutor<'a>,
    projector: Projector<'a>,
    /// Type the records are read as
    type_key: TypeKey,
    paths: &'a PropertyPathList,
    /// Whether the executor has been initialized
    initialized: bool,
}

impl<'a> ProjectionExecutor<'a> {
    pub fn new(
        child: RecordExecutor<'a>,
        model: &'a EdmModel,
        type_key: TypeKey,
        paths: &'a PropertyPathList,
    ) -> Self {
        Self {
            child,
            projector: Projector::new(model),
            type_key,
            paths,
            initialized: false,
        }
    }
}

impl<'a> Executor for ProjectionExecutor<'a> {
    type Item = ProjectedRecord;

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

        match self.child.next()? {
            Some(record) => Ok(Some(self.projector.project(
                record,
                self.type_key,
                self.paths.selection(),
                self.paths.expand_items(),
            )?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{self, Customer, Employee, Product};
    use crate::executor::SeqScanExecutor;
    use crate::query_options::{parse_select_expand, RawQueryOptions};
    use pretty_assertions::assert_eq;

    fn project<R: Record + 'static>(
        records: &[R],
        type_key: TypeKey,
        query: &str,
    ) -> Result<Vec<ProjectedRecord>> {
        let model = demo::model()?;
        let paths = parse_select_expand(&RawQueryOptions::parse(query)?, &model, type_key)?;
        let mut executor = ProjectionExecutor::new(
            Box::new(SeqScanExecutor::over(records)),
            &model,
            type_key,
            &paths,
        );
        executor.init()?;

        let mut projected = Vec::new();
        while let Some(record) = executor.next()? {
            projected.push(record);
        }
        Ok(projected)
    }

    #[test]
    fn test_default_projection() -> Result<()> {
        let products = demo::products();
        let projected = project(&products, TypeKey::of::<Product>(), "")?;
        assert_eq!(
            projected[0].field_names(),
            vec!["Colour", "Description", "Id", "Name", "Price", "Rating", "ReleaseDate", "Sku", "Tags"]
        );
        assert_eq!(
            projected[0].value("Colour"),
            Some(&Value::String("Blue,Black".to_string()))
        );
        assert_eq!(projected[4].value("Colour"), Some(&Value::String("None".to_string())));
        Ok(())
    }

    #[test]
    fn test_select_keeps_order_and_skips_navigation() -> Result<()> {
        let products = demo::products();
        let projected = project(
            &products,
            TypeKey::of::<Product>(),
            "$select=Price,Category,Name",
        )?;
        assert_eq!(projected[0].field_names(), vec!["Price", "Name"]);

        let projected = project(&products, TypeKey::of::<Product>(), "$select=*")?;
        assert_eq!(projected[0].len(), 9);
        Ok(())
    }

    #[test]
    fn test_expand() -> Result<()> {
        let customers = demo::customers();
        let projected = project(
            &customers,
            TypeKey::of::<Customer>(),
            "$select=Name&$expand=Orders",
        )?;
        assert_eq!(projected[0].field_names(), vec!["Name", "Orders"]);
        let orders = projected[0].get("Orders").and_then(ProjectedValue::as_records).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].field_names(), vec!["Id", "Placed", "Total"]);
        Ok(())
    }

    #[test]
    fn test_nested_expand_and_inheritance() -> Result<()> {
        let employees = demo::employees();
        let projected = project(&employees, TypeKey::of::<Employee>(), "$expand=Manager")?;

        assert_eq!(projected[0].get("Manager"), Some(&ProjectedValue::Value(Value::Null)));
        let manager = projected[1].get("Manager").and_then(ProjectedValue::as_record).unwrap();
        assert_eq!(
            manager.field_names(),
            vec!["Forename", "Id", "Level", "Shift", "StartTime", "Surname", "Title"]
        );
        assert_eq!(manager.value("Level"), Some(&Value::String("Principal".to_string())));
        Ok(())
    }

    #[test]
    fn test_complex_values_become_nested_records() -> Result<()> {
        let customers = demo::customers();
        let projected = project(&customers, TypeKey::of::<Customer>(), "")?;
        assert_eq!(projected[0].field_names(), vec!["Address", "Id", "Name"]);
        let address = projected[0].get("Address").and_then(ProjectedValue::as_record).unwrap();
        assert_eq!(address.value("City"), Some(&Value::String("London".to_string())));
        Ok(())
    }
}
