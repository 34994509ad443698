//! Catalog ingestion and cross-referencing.
//!
//! Loads catalog source files into normalized [`CatalogRecord`]s, groups them
//! by category, and picks related records for each item page.
//!
//! [`CatalogRecord`]: routegen_shared::CatalogRecord

pub mod index;
pub mod loader;
pub mod similarity;

pub use index::CategoryIndex;
pub use loader::{LoaderOptions, load_catalog, parse_source};
pub use similarity::{DEFAULT_LIMIT, SimilarityResolver};
