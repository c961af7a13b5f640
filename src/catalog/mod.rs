pub mod catalog;
pub mod document_map;
pub mod query;
pub mod results;

pub use catalog::{Catalog, CatalogSnapshot};
pub use document_map::{DocumentMap, Metadata};
pub use query::{CatalogQuery, QueryOptions, QuerySource};
pub use results::ResultSet;
