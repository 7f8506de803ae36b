pub mod apply;
pub mod error;
pub mod query;

pub use apply::{apply_daterange, apply_filters};
pub use error::QueryError;
pub use query::{InPredicate, SelectQuery, WhereIn};
