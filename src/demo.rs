//! Sample catalog used by the binary and the tests.
//!
//! Products belong to categories, customers place orders that point back at them,
//! and employees extend people. The entity sets are `Products`, `Categories`,
//! `Customers`, `Orders` and `Employees`.

use crate::access::{EnumValue, Record, Value};
use crate::edm::{
    Capabilities, EdmModel, EdmModelBuilder, EnumShape, HostType, RecordShape, TypeKey,
    TypeShape,
};
use crate::error::{ODataError, Result};
use crate::executor::{self, QueryResult};
use crate::query_options::QueryOptions;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

pub const NAMESPACE: &str = "Sample.Model";

/// Product colours; a product may come in several
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colour(pub i64);

impl Colour {
    pub const NONE: Colour = Colour(0);
    pub const RED: Colour = Colour(1);
    pub const GREEN: Colour = Colour(2);
    pub const BLUE: Colour = Colour(4);
    pub const BLACK: Colour = Colour(8);

    pub fn with(self, other: Colour) -> Colour {
        Colour(self.0 | other.0)
    }
}

impl HostType for Colour {
    fn shape() -> TypeShape {
        EnumShape::new(NAMESPACE, "Colour")
            .flags()
            .member("None", 0)
            .member("Red", 1)
            .member("Green", 2)
            .member("Blue", 4)
            .member("Black", 8)
            .into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Junior,
    Senior,
    Principal,
}

impl HostType for Level {
    fn shape() -> TypeShape {
        EnumShape::new(NAMESPACE, "Level")
            .member("Junior", 0)
            .member("Senior", 1)
            .member("Principal", 2)
            .into()
    }
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub products: Vec<Arc<Product>>,
}

impl HostType for Category {
    fn shape() -> TypeShape {
        RecordShape::new(NAMESPACE, "Category")
            .required::<i32>("Id")
            .required::<String>("Name")
            .field::<Option<String>>("Description")
            .field::<Vec<Product>>("Products")
            .into()
    }
}

impl Record for Category {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<Category>()
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "Id" => self.id.into(),
            "Name" => self.name.as_str().into(),
            "Description" => self.description.clone().into(),
            "Products" => self.products.clone().into(),
            _ => Value::Null,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<Arc<Category>>,
    pub colour: Colour,
    pub release_date: NaiveDate,
    pub rating: Option<f64>,
    pub sku: Uuid,
    pub tags: Vec<String>,
}

impl HostType for Product {
    fn shape() -> TypeShape {
        RecordShape::new(NAMESPACE, "Product")
            .required::<i32>("Id")
            .required::<String>("Name")
            .field::<Option<String>>("Description")
            .field::<Decimal>("Price")
            .field::<Category>("Category")
            .field::<Colour>("Colour")
            .field::<NaiveDate>("ReleaseDate")
            .field::<Option<f64>>("Rating")
            .field::<Uuid>("Sku")
            .field::<Vec<String>>("Tags")
            .into()
    }
}

impl Record for Product {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<Product>()
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "Id" => self.id.into(),
            "Name" => self.name.as_str().into(),
            "Description" => self.description.clone().into(),
            "Price" => self.price.into(),
            "Category" => self.category.clone().into(),
            "Colour" => EnumValue::new(TypeKey::of::<Colour>(), self.colour.0).into(),
            "ReleaseDate" => self.release_date.into(),
            "Rating" => self.rating.into(),
            "Sku" => self.sku.into(),
            "Tags" => self.tags.clone().into(),
            _ => Value::Null,
        }
    }
}

/// A postal address; not an entity set, so never navigable
#[derive(Debug, Clone)]
pub struct Address {
    pub street: String,
    pub city: String,
}

impl HostType for Address {
    fn shape() -> TypeShape {
        RecordShape::new(NAMESPACE, "Address")
            .field::<String>("Street")
            .field::<String>("City")
            .into()
    }
}

impl Record for Address {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<Address>()
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "Street" => self.street.as_str().into(),
            "City" => self.city.as_str().into(),
            _ => Value::Null,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Customer {
    pub id: i32,
    pub name: String,
    pub address: Arc<Address>,
    pub orders: Vec<Arc<Order>>,
}

impl HostType for Customer {
    fn shape() -> TypeShape {
        RecordShape::new(NAMESPACE, "Customer")
            .required::<i32>("Id")
            .required::<String>("Name")
            .field::<Address>("Address")
            .field::<Vec<Order>>("Orders")
            .into()
    }
}

impl Record for Customer {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<Customer>()
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "Id" => self.id.into(),
            "Name" => self.name.as_str().into(),
            "Address" => self.address.clone().into(),
            "Orders" => self.orders.clone().into(),
            _ => Value::Null,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: i32,
    pub placed: DateTime<FixedOffset>,
    pub total: Decimal,
    pub customer: Option<Arc<Customer>>,
}

impl HostType for Order {
    fn shape() -> TypeShape {
        RecordShape::new(NAMESPACE, "Order")
            .required::<i32>("Id")
            .field::<DateTime<FixedOffset>>("Placed")
            .field::<Decimal>("Total")
            .field::<Customer>("Customer")
            .into()
    }
}

impl Record for Order {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<Order>()
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "Id" => self.id.into(),
            "Placed" => self.placed.into(),
            "Total" => self.total.into(),
            "Customer" => self.customer.clone().into(),
            _ => Value::Null,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Person {
    pub id: i32,
    pub forename: String,
    pub surname: Option<String>,
}

impl HostType for Person {
    fn shape() -> TypeShape {
        RecordShape::new(NAMESPACE, "Person")
            .required::<i32>("Id")
            .required::<String>("Forename")
            .field::<Option<String>>("Surname")
            .into()
    }
}

#[derive(Debug, Clone)]
pub struct Employee {
    pub person: Person,
    pub title: String,
    pub level: Level,
    pub start_time: NaiveTime,
    pub shift: chrono::Duration,
    pub manager: Option<Arc<Employee>>,
}

impl HostType for Employee {
    fn shape() -> TypeShape {
        RecordShape::new(NAMESPACE, "Employee")
            .extends::<Person>()
            .field::<String>("Title")
            .field::<Level>("Level")
            .field::<NaiveTime>("StartTime")
            .field::<chrono::Duration>("Shift")
            .field::<Option<Employee>>("Manager")
            .into()
    }
}

impl Record for Employee {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<Employee>()
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "Id" => self.person.id.into(),
            "Forename" => self.person.forename.as_str().into(),
            "Surname" => self.person.surname.clone().into(),
            "Title" => self.title.as_str().into(),
            "Level" => EnumValue::new(TypeKey::of::<Level>(), self.level as i64).into(),
            "StartTime" => self.start_time.into(),
            "Shift" => self.shift.into(),
            "Manager" => self.manager.clone().into(),
            _ => Value::Null,
        }
    }
}

/// Build the model over every sample entity set
pub fn model() -> Result<EdmModel> {
    let mut builder = EdmModelBuilder::new();
    builder
        .register::<Product>("Products", Some("Id"), Capabilities::ALL)?
        .register::<Category>("Categories", Some("Id"), Capabilities::NONE)?
        .register::<Customer>("Customers", Some("Id"), Capabilities::INSERTABLE)?
        .register::<Order>("Orders", Some("Id"), Capabilities::NONE)?
        .register::<Employee>("Employees", Some("Id"), Capabilities::UPDATABLE)?;
    builder.build()
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

fn timestamp(year: i32, month: u32, day: u32, hour: u32) -> DateTime<FixedOffset> {
    date(year, month, day)
        .and_hms_opt(hour, 0, 0)
        .unwrap_or_default()
        .and_utc()
        .fixed_offset()
}

fn base_categories() -> Vec<Arc<Category>> {
    vec![
        Arc::new(Category {
            id: 1,
            name: "Phones".to_string(),
            description: Some("Mobile phones".to_string()),
            products: Vec::new(),
        }),
        Arc::new(Category {
            id: 2,
            name: "Tablets".to_string(),
            description: None,
            products: Vec::new(),
        }),
    ]
}

/// Five products across two categories.
///
/// Each product's category is a copy without its product list, since records are
/// shared through `Arc` and cannot form reference cycles.
pub fn products() -> Vec<Product> {
    let categories = base_categories();
    let phones = categories[0].clone();
    let tablets = categories[1].clone();

    vec![
        Product {
            id: 1,
            name: "iPhone".to_string(),
            description: Some("Flagship phone".to_string()),
            price: Decimal::new(49900, 2),
            category: Some(phones.clone()),
            colour: Colour::BLACK.with(Colour::BLUE),
            release_date: date(2023, 9, 22),
            rating: Some(4.5),
            sku: Uuid::from_u128(0x0f8fad5b_d9cb_469f_a165_70867728950e),
            tags: vec!["5G".to_string(), "OLED".to_string()],
        },
        Product {
            id: 2,
            name: "iPhone".to_string(),
            description: Some("Previous generation".to_string()),
            price: Decimal::new(39900, 2),
            category: Some(phones.clone()),
            colour: Colour::RED,
            release_date: date(2022, 9, 16),
            rating: Some(4.1),
            sku: Uuid::from_u128(0x7c9e6679_7425_40de_944b_e07fc1f90ae7),
            tags: vec!["5G".to_string()],
        },
        Product {
            id: 3,
            name: "Galaxy".to_string(),
            description: None,
            price: Decimal::new(54900, 2),
            category: Some(phones.clone()),
            colour: Colour::GREEN.with(Colour::BLACK),
            release_date: date(2024, 1, 31),
            rating: Some(4.3),
            sku: Uuid::from_u128(0x1b4e28ba_2fa1_11d2_883f_0016d3cca427),
            tags: vec!["5G".to_string(), "AMOLED".to_string()],
        },
        Product {
            id: 4,
            name: "Pixel".to_string(),
            description: Some("Camera phone".to_string()),
            price: Decimal::new(46900, 2),
            category: Some(phones),
            colour: Colour::BLUE,
            release_date: date(2023, 10, 12),
            rating: None,
            sku: Uuid::from_u128(0x6fa459ea_ee8a_3ca4_894e_db77e160355e),
            tags: Vec::new(),
        },
        Product {
            id: 5,
            name: "iPad".to_string(),
            description: Some("Tablet".to_string()),
            price: Decimal::new(32900, 2),
            category: Some(tablets),
            colour: Colour::NONE,
            release_date: date(2021, 9, 24),
            rating: Some(3.9),
            sku: Uuid::from_u128(0x886313e1_3b8a_5372_9b90_0c9aee199e5d),
            tags: vec!["WiFi".to_string()],
        },
    ]
}

/// Categories with their products attached
pub fn categories() -> Vec<Category> {
    let products: Vec<Arc<Product>> = products().into_iter().map(Arc::new).collect();
    base_categories()
        .into_iter()
        .map(|category| Category {
            products: products
                .iter()
                .filter(|p| p.category.as_ref().is_some_and(|c| c.id == category.id))
                .cloned()
                .collect(),
            ..(*category).clone()
        })
        .collect()
}

fn base_customers() -> Vec<Arc<Customer>> {
    vec![
        Arc::new(Customer {
            id: 1,
            name: "Ada".to_string(),
            address: Arc::new(Address {
                street: "12 Analytical Way".to_string(),
                city: "London".to_string(),
            }),
            orders: Vec::new(),
        }),
        Arc::new(Customer {
            id: 2,
            name: "Grace".to_string(),
            address: Arc::new(Address {
                street: "1 Compiler Court".to_string(),
                city: "Arlington".to_string(),
            }),
            orders: Vec::new(),
        }),
    ]
}

pub fn orders() -> Vec<Order> {
    let customers = base_customers();
    vec![
        Order {
            id: 10,
            placed: timestamp(2024, 3, 1, 9),
            total: Decimal::new(49900, 2),
            customer: Some(customers[0].clone()),
        },
        Order {
            id: 11,
            placed: timestamp(2024, 3, 2, 14),
            total: Decimal::new(3250, 2),
            customer: Some(customers[0].clone()),
        },
        Order {
            id: 12,
            placed: timestamp(2024, 4, 18, 11),
            total: Decimal::new(87800, 2),
            customer: Some(customers[1].clone()),
        },
    ]
}

/// Customers with their orders attached
pub fn customers() -> Vec<Customer> {
    let orders: Vec<Arc<Order>> = orders().into_iter().map(Arc::new).collect();
    base_customers()
        .into_iter()
        .map(|customer| Customer {
            orders: orders
                .iter()
                .filter(|o| o.customer.as_ref().is_some_and(|c| c.id == customer.id))
                .cloned()
                .collect(),
            ..(*customer).clone()
        })
        .collect()
}

pub fn employees() -> Vec<Employee> {
    let lead = Arc::new(Employee {
        person: Person {
            id: 1,
            forename: "Margaret".to_string(),
            surname: Some("Hamilton".to_string()),
        },
        title: "Director".to_string(),
        level: Level::Principal,
        start_time: time(8, 0),
        shift: chrono::Duration::hours(8),
        manager: None,
    });
    vec![
        (*lead).clone(),
        Employee {
            person: Person {
                id: 2,
                forename: "Linus".to_string(),
                surname: None,
            },
            title: "Engineer".to_string(),
            level: Level::Senior,
            start_time: time(9, 30),
            shift: chrono::Duration::hours(7) + chrono::Duration::minutes(30),
            manager: Some(lead.clone()),
        },
        Employee {
            person: Person {
                id: 3,
                forename: "Barbara".to_string(),
                surname: Some("Liskov".to_string()),
            },
            title: "Engineer".to_string(),
            level: Level::Junior,
            start_time: time(10, 0),
            shift: chrono::Duration::hours(6),
            manager: Some(lead),
        },
    ]
}

/// Run parsed options against the sample data for their entity set
pub fn execute(options: &QueryOptions) -> Result<QueryResult> {
    match options.entity_set().name() {
        "Products" => executor::execute(&products(), options),
        "Categories" => executor::execute(&categories(), options),
        "Customers" => executor::execute(&customers(), options),
        "Orders" => executor::execute(&orders(), options),
        "Employees" => executor::execute(&employees(), options),
        other => Err(ODataError::usage(
            format!("No sample data for the entity set '{}'", other),
            Some(other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_registers_every_set() -> Result<()> {
        let model = model()?;
        let names: Vec<&str> = model.entity_sets().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["Categories", "Customers", "Employees", "Orders", "Products"]
        );

        let product = model.require_complex_type(TypeKey::of::<Product>())?;
        assert!(product.property("Category").unwrap().is_navigable());
        assert!(!product.property("Tags").unwrap().is_navigable());
        let customer = model.require_complex_type(TypeKey::of::<Customer>())?;
        assert!(!customer.property("Address").unwrap().is_navigable());
        assert!(customer.property("Orders").unwrap().is_navigable());
        Ok(())
    }

    #[test]
    fn test_sample_data_links() {
        let categories = categories();
        assert_eq!(categories[0].products.len(), 4);
        assert_eq!(categories[1].products.len(), 1);

        let customers = customers();
        assert_eq!(customers[0].orders.len(), 2);
        assert_eq!(customers[1].orders.len(), 1);

        let employees = employees();
        assert!(!employees[1].field("Manager").is_null());
        assert_eq!(employees[0].field("Forename"), Value::from("Margaret"));
    }
}
