pub mod builder;
pub mod error;
pub mod page;
pub mod specification;
pub mod types;

pub use builder::FilterSpecificationBuilder;
pub use error::FilterError;
pub use page::{Page, PageRequest};
pub use specification::{Predicate, Specification};
pub use types::*;
