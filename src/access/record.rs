use crate::access::value::Value;
use crate::edm::TypeKey;
use std::fmt::Debug;

/// A host record whose fields can be read by name.
///
/// `field` returns `Value::Null` for absent values. Navigation properties return
/// `Value::Record` or a `Value::Collection` of records.
pub trait Record: Debug + Send + Sync {
    /// Identity of the host type, matching the key the model registered it under
    fn type_key(&self) -> TypeKey;

    fn field(&self, name: &str) -> Value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Point {
        x: i32,
        label: Option<String>,
    }

    impl Record for Point {
        fn type_key(&self) -> TypeKey {
            TypeKey::of::<Point>()
        }

        fn field(&self, name: &str) -> Value {
            match name {
                "X" => self.x.into(),
                "Label" => self.label.clone().into(),
                _ => Value::Null,
            }
        }
    }

    #[test]
    fn test_record_as_value() {
        let point = Arc::new(Point { x: 3, label: None });
        let value = Value::from(point.clone());
        let Value::Record(record) = &value else {
            panic!("expected record value");
        };
        assert_eq!(record.type_key(), TypeKey::of::<Point>());
        assert_eq!(record.field("X"), Value::Int32(3));
        assert_eq!(record.field("Label"), Value::Null);
        assert_eq!(value, Value::Record(point));
    }
}
