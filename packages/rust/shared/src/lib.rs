//! Shared types, error model, and configuration for routegen.
//!
//! This crate is the foundation depended on by all other routegen crates.
//! It provides:
//! - [`RoutegenError`]: the unified error type
//! - Domain types ([`CatalogRecord`], [`Category`], [`RouteDescriptor`], [`RouteManifest`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, MAX_SIMILAR, RoutesConfig, SimilarityConfig, SourceConfig,
    init_config, load_config, load_config_from,
};
pub use error::{Result, RoutegenError};
pub use types::{
    CURRENT_SCHEMA_VERSION, CatalogRecord, Category, ManifestEntry, PageKind, RecordSummary,
    RouteDescriptor, RouteManifest,
};
