//! Route emitter.
//!
//! Plans the full route graph (one page per slugged record, the full listing,
//! the categories index, one page per category) and writes each route's data
//! artifact plus a `routes.json` manifest.
//!
//! Output layout:
//! ```text
//! <output_dir>/
//! ├── routes.json
//! └── data/
//!     ├── item-<hash>.json
//!     ├── list-<hash>.json
//!     ├── categories_index-<hash>.json
//!     └── category_list-<hash>.json
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use chrono::Utc;
use rand::Rng;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use routegen_catalog::{CategoryIndex, SimilarityResolver};
use routegen_shared::{
    CURRENT_SCHEMA_VERSION, CatalogRecord, ManifestEntry, PageKind, RecordSummary, Result,
    RouteDescriptor, RouteManifest, RoutegenError,
};

/// Manifest file name inside the output directory.
pub const MANIFEST_FILE: &str = "routes.json";

/// Artifact directory inside the output directory.
pub const DATA_DIR: &str = "data";

/// Where a build's artifacts are written before they replace `data/`.
const STAGING_DIR: &str = "data.tmp";

/// A route and the data its artifact will hold.
#[derive(Debug, Clone)]
pub struct PlannedRoute {
    pub descriptor: RouteDescriptor,
    pub data: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Artifact payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemData<'a> {
    #[serde(flatten)]
    record: RecordSummary,
    payload: &'a serde_json::Value,
    similar: Vec<RecordSummary>,
}

#[derive(Debug, Serialize)]
struct ListData {
    total: usize,
    records: Vec<RecordSummary>,
}

#[derive(Debug, Serialize)]
struct CategoriesIndexData {
    categories: Vec<CategoryData>,
}

#[derive(Debug, Serialize)]
struct CategoryData {
    label: String,
    count: usize,
    path: String,
    members: Vec<RecordSummary>,
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Derives route paths under a base path and assembles route payloads.
#[derive(Debug, Clone)]
pub struct RouteEmitter {
    base_path: String,
}

impl RouteEmitter {
    /// `base_path` like `/catalog`; a trailing slash is ignored.
    pub fn new(base_path: &str) -> Self {
        let trimmed = base_path.trim_end_matches('/');
        Self {
            base_path: if trimmed.is_empty() {
                String::new()
            } else {
                trimmed.to_string()
            },
        }
    }

    /// `/catalog/{slug}`
    pub fn item_path(&self, slug: &str) -> String {
        format!("{}/{slug}", self.base_path)
    }

    /// `/catalog`
    pub fn list_path(&self) -> String {
        if self.base_path.is_empty() {
            "/".to_string()
        } else {
            self.base_path.clone()
        }
    }

    /// `/catalog/categories/`
    pub fn categories_path(&self) -> String {
        format!("{}/categories/", self.base_path)
    }

    /// `/catalog/categories/{segment}/`, see [`category_segment`].
    pub fn category_path(&self, label: &str) -> String {
        format!("{}/categories/{}/", self.base_path, category_segment(label))
    }

    /// Plan every route for the catalog.
    ///
    /// Fails with [`RoutegenError::RouteCollision`] when two routes resolve to
    /// the same path (shared slugs, or labels that normalize identically).
    #[instrument(skip_all, fields(records = records.len(), categories = index.len()))]
    pub fn plan<R: Rng>(
        &self,
        records: &[CatalogRecord],
        index: &CategoryIndex,
        resolver: &mut SimilarityResolver<R>,
    ) -> Result<Vec<PlannedRoute>> {
        debug!(similar_limit = resolver.limit(), "planning routes");
        let mut registry = PathRegistry::default();
        let mut routes = Vec::new();

        let list_path = self.list_path();
        registry.claim(&list_path, "catalog listing".to_string())?;
        let categories_path = self.categories_path();
        registry.claim(&categories_path, "categories index".to_string())?;

        // Item pages
        let mut skipped = 0usize;
        for record in records {
            let Some(slug) = record.route_slug() else {
                debug!(id = %record.id, "record has no slug, no item page");
                skipped += 1;
                continue;
            };
            let path = self.item_path(slug);
            registry.claim(&path, format!("record `{}`", record.id))?;

            let similar = resolver
                .resolve(record, records)
                .into_iter()
                .map(CatalogRecord::summary)
                .collect();
            let data = to_data(&ItemData {
                record: record.summary(),
                payload: &record.payload,
                similar,
            })?;
            routes.push(planned(path, PageKind::Item, data));
        }

        // Full listing
        let data = to_data(&ListData {
            total: records.len(),
            records: records.iter().map(CatalogRecord::summary).collect(),
        })?;
        routes.push(planned(list_path, PageKind::List, data));

        // Per-category pages, then the index that links them
        let mut categories = Vec::with_capacity(index.len());
        for (label, members) in index.iter() {
            if members.is_empty() {
                continue;
            }
            let path = self.category_path(label);
            registry.claim(&path, format!("category `{label}`"))?;

            let entry = CategoryData {
                label: label.to_string(),
                count: members.len(),
                path: path.clone(),
                members: members.iter().map(CatalogRecord::summary).collect(),
            };
            routes.push(planned(path, PageKind::CategoryList, to_data(&entry)?));
            categories.push(entry);
        }

        let data = to_data(&CategoriesIndexData { categories })?;
        routes.push(planned(categories_path, PageKind::CategoriesIndex, data));

        info!(
            routes = routes.len(),
            records_without_slug = skipped,
            "route graph planned"
        );
        Ok(routes)
    }
}

/// Case-folded, URL-safe form of a category label.
///
/// Runs of anything other than ASCII letters and digits collapse to a single
/// `-`; leading and trailing dashes are dropped.
pub fn normalize_label(label: &str) -> String {
    static NON_SLUG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

    let lowered = label.trim().to_lowercase();
    NON_SLUG_RE
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Route segment for a category label.
///
/// The normalized label when it has any ASCII letters or digits left, else
/// `category-` plus the first 8 hex digits of the label's sha256.
pub fn category_segment(label: &str) -> String {
    let segment = normalize_label(label);
    if !segment.is_empty() {
        return segment;
    }
    let digest = format!("{:x}", Sha256::digest(label.trim().as_bytes()));
    format!("category-{}", &digest[..8])
}

/// Artifact location for a route path, stable across builds.
pub fn data_ref_for(kind: PageKind, path: &str) -> String {
    let digest = Sha256::digest(path.as_bytes());
    let hex = format!("{digest:x}");
    format!("{DATA_DIR}/{kind}-{}.json", &hex[..16])
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write every route's artifact and the route manifest into `output_dir`.
///
/// Artifacts are written into a staging directory, one task per route. Only
/// when every task has succeeded does the staging directory replace `data/`
/// and the manifest get written. On failure the staging directory is removed
/// and a previous build's `routes.json` and `data/` are left as they were.
#[instrument(skip_all, fields(output_dir = %output_dir.display(), routes = routes.len()))]
pub async fn write_routes(
    output_dir: &Path,
    routes: &[PlannedRoute],
    tool_version: &str,
) -> Result<RouteManifest> {
    let staging_dir = output_dir.join(STAGING_DIR);
    remove_dir_if_exists(&staging_dir).await?;
    tokio::fs::create_dir_all(&staging_dir)
        .await
        .map_err(|e| RoutegenError::io(&staging_dir, e))?;

    let entries = match write_artifacts(&staging_dir, routes).await {
        Ok(entries) => entries,
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&staging_dir).await {
                warn!(dir = %staging_dir.display(), error = %cleanup, "failed to remove staging directory");
            }
            return Err(e);
        }
    };

    // Swap the finished artifacts in. The old manifest goes first so a
    // crash mid-swap never leaves it pointing at missing files.
    let manifest_path = output_dir.join(MANIFEST_FILE);
    if tokio::fs::try_exists(&manifest_path).await.unwrap_or(false) {
        tokio::fs::remove_file(&manifest_path)
            .await
            .map_err(|e| RoutegenError::io(&manifest_path, e))?;
    }
    let data_dir = output_dir.join(DATA_DIR);
    remove_dir_if_exists(&data_dir).await?;
    tokio::fs::rename(&staging_dir, &data_dir)
        .await
        .map_err(|e| RoutegenError::io(&data_dir, e))?;

    let manifest = RouteManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        tool_version: tool_version.to_string(),
        generated_at: Utc::now(),
        route_count: entries.len(),
        routes: entries,
    };
    write_atomic(&manifest_path, &to_bytes(&manifest)?).await?;

    info!(routes = manifest.route_count, "route artifacts written");
    Ok(manifest)
}

/// Write every artifact under `staging_dir`, one task per route.
///
/// All tasks are awaited even after one fails; the first error wins.
async fn write_artifacts(
    staging_dir: &Path,
    routes: &[PlannedRoute],
) -> Result<Vec<ManifestEntry>> {
    let mut handles = Vec::with_capacity(routes.len());
    for route in routes {
        let bytes = to_bytes(&route.data)?;
        let relative = route
            .descriptor
            .data_ref
            .strip_prefix(&format!("{DATA_DIR}/"))
            .unwrap_or(&route.descriptor.data_ref)
            .to_string();
        let target = staging_dir.join(relative);
        let descriptor = route.descriptor.clone();
        handles.push(tokio::spawn(async move {
            write_atomic(&target, &bytes).await?;
            debug!(path = %descriptor.path, file = %target.display(), "wrote route artifact");
            Ok::<_, RoutegenError>(ManifestEntry {
                sha256: format!("{:x}", Sha256::digest(&bytes)),
                size_bytes: bytes.len(),
                path: descriptor.path,
                page_kind: descriptor.page_kind,
                data_ref: descriptor.data_ref,
            })
        }));
    }

    let mut entries = Vec::with_capacity(handles.len());
    let mut first_err = None;
    for handle in handles {
        let outcome = handle
            .await
            .map_err(|e| RoutegenError::validation(format!("artifact write task failed: {e}")))
            .and_then(|r| r);
        match outcome {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(error = %e, "route artifact not written");
                first_err.get_or_insert(e);
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(entries),
    }
}

async fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    if tokio::fs::try_exists(dir).await.unwrap_or(false) {
        tokio::fs::remove_dir_all(dir)
            .await
            .map_err(|e| RoutegenError::io(dir, e))?;
    }
    Ok(())
}

/// Read back a `routes.json` and check that every artifact it lists exists.
pub async fn validate_output(output_dir: &Path) -> Result<RouteManifest> {
    let manifest_path = output_dir.join(MANIFEST_FILE);
    let content = tokio::fs::read_to_string(&manifest_path)
        .await
        .map_err(|e| RoutegenError::io(&manifest_path, e))?;
    let manifest: RouteManifest = serde_json::from_str(&content)
        .map_err(|e| RoutegenError::validation(format!("invalid {MANIFEST_FILE}: {e}")))?;

    if manifest.schema_version != CURRENT_SCHEMA_VERSION {
        return Err(RoutegenError::validation(format!(
            "unsupported schema_version: {} (expected {})",
            manifest.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }

    for entry in &manifest.routes {
        let artifact = output_dir.join(&entry.data_ref);
        if !tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
            return Err(RoutegenError::validation(format!(
                "route {} is missing its artifact {}",
                entry.path, entry.data_ref
            )));
        }
    }

    Ok(manifest)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Tracks claimed paths so a second claimant fails the build instead of
/// overwriting the first. Trailing slashes do not distinguish paths.
#[derive(Default)]
struct PathRegistry {
    owners: HashMap<String, String>,
}

impl PathRegistry {
    fn claim(&mut self, path: &str, owner: String) -> Result<()> {
        let key = path.trim_end_matches('/').to_string();
        if let Some(first) = self.owners.get(&key) {
            return Err(RoutegenError::RouteCollision {
                path: path.to_string(),
                first: first.clone(),
                second: owner,
            });
        }
        self.owners.insert(key, owner);
        Ok(())
    }
}

fn planned(path: String, page_kind: PageKind, data: serde_json::Value) -> PlannedRoute {
    PlannedRoute {
        descriptor: RouteDescriptor {
            data_ref: data_ref_for(page_kind, &path),
            path,
            page_kind,
        },
        data,
    }
}

fn to_data<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| RoutegenError::validation(format!("JSON serialization failed: {e}")))
}

fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value)
        .map_err(|e| RoutegenError::validation(format!("JSON serialization failed: {e}")))
}

/// Write to a dot-prefixed temp file beside `target`, then rename over it.
async fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("artifact");
    let temp = target.with_file_name(format!(".{file_name}.tmp"));

    tokio::fs::write(&temp, bytes)
        .await
        .map_err(|e| RoutegenError::io(&temp, e))?;
    tokio::fs::rename(&temp, target)
        .await
        .map_err(|e| RoutegenError::io(target, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
