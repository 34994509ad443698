//! Core domain types for the catalog route graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the route manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// A record's category, kept in the shape the source used.
///
/// Sources disagree on whether `category` is a string or a list of strings,
/// so both are accepted. Comparisons go through [`Category::labels`] and never
/// compare the two shapes directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Single(String),
    Multiple(Vec<String>),
}

impl Category {
    /// Normalize a raw JSON value into a category.
    ///
    /// Labels are trimmed; blank labels and repeats are dropped. Returns `None`
    /// when nothing usable remains, or when the value is neither a string nor
    /// an array.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => {
                let label = s.trim();
                (!label.is_empty()).then(|| Self::Single(label.to_string()))
            }
            serde_json::Value::Array(items) => {
                let mut labels: Vec<String> = Vec::new();
                for label in items.iter().filter_map(|v| v.as_str()).map(str::trim) {
                    if !label.is_empty() && !labels.iter().any(|l| l == label) {
                        labels.push(label.to_string());
                    }
                }
                (!labels.is_empty()).then_some(Self::Multiple(labels))
            }
            _ => None,
        }
    }

    /// All labels carried, in source order.
    pub fn labels(&self) -> Vec<&str> {
        match self {
            Self::Single(label) => vec![label.as_str()],
            Self::Multiple(labels) => labels.iter().map(String::as_str).collect(),
        }
    }

    /// True when the two categories share at least one label.
    pub fn intersects(&self, other: &Category) -> bool {
        let theirs = other.labels();
        self.labels().iter().any(|l| theirs.contains(l))
    }
}

// ---------------------------------------------------------------------------
// CatalogRecord
// ---------------------------------------------------------------------------

/// One normalized catalog entry. Immutable once the loader has built it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    /// Unique across the catalog; generated when the source has none.
    pub id: String,
    /// Item route segment. Records without one get no item page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Opaque asset reference resolved by the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_key: Option<String>,
    /// The untouched source object.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CatalogRecord {
    /// Fresh identifier for records whose source omits `id`.
    pub fn generated_id() -> String {
        Uuid::now_v7().to_string()
    }

    /// Usable slug, if any (trimmed of whitespace and slashes).
    pub fn route_slug(&self) -> Option<&str> {
        self.slug
            .as_deref()
            .map(|s| s.trim().trim_matches('/'))
            .filter(|s| !s.is_empty())
    }

    /// Labels this record is indexed under. Empty when uncategorized.
    pub fn labels(&self) -> Vec<&str> {
        self.category.as_ref().map(Category::labels).unwrap_or_default()
    }

    /// True when both records carry categories that share a label.
    pub fn shares_category_with(&self, other: &CatalogRecord) -> bool {
        match (&self.category, &other.category) {
            (Some(a), Some(b)) => a.intersects(b),
            _ => false,
        }
    }

    /// Listing metadata, without the raw payload.
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            id: self.id.clone(),
            slug: self.slug.clone(),
            title: self.title.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            short_description: self.short_description.clone(),
            category: self.category.clone(),
            logo_key: self.logo_key.clone(),
        }
    }
}

/// The metadata subset of a record used by listing pages and related-item panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub title: String,
    pub name: String,
    pub description: String,
    pub short_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// What a route renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Item,
    List,
    CategoriesIndex,
    CategoryList,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::Item => "item",
            PageKind::List => "list",
            PageKind::CategoriesIndex => "categories_index",
            PageKind::CategoryList => "category_list",
        }
    }
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated page address plus the artifact holding its data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    /// Site path, unique across the build.
    pub path: String,
    pub page_kind: PageKind,
    /// Artifact location relative to the output directory.
    pub data_ref: String,
}

/// The `routes.json` structure written at the root of the output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Tool version that produced the build.
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    pub route_count: usize,
    pub routes: Vec<ManifestEntry>,
}

/// One route in the manifest, with its artifact checksum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub page_kind: PageKind,
    pub data_ref: String,
    pub sha256: String,
    pub size_bytes: usize,
}
