pub mod access;
pub mod demo;
pub mod edm;
pub mod error;
pub mod executor;
pub mod expression;
pub mod filter;
pub mod query_options;
pub mod validation;

pub use error::{ODataError, Result};
pub use filter::parse_filter;
pub use query_options::{parse_order_by, parse_select_expand, QueryOptions, RawQueryOptions};
