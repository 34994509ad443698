//! Catalog loader.
//!
//! Reads every source file in the data directory and normalizes its contents
//! into [`CatalogRecord`]s. A file is either a JSON array of records or a
//! single aggregate object (recognized by a marker field) that becomes exactly
//! one record keyed by the file name.
//!
//! A broken file only costs the records it would have contributed: it is
//! logged and skipped. Failing to list the directory itself is fatal.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use routegen_shared::{CatalogRecord, Category, Result, RoutegenError, SourceConfig};

/// Which files to read and how to recognize aggregate objects.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Extensions (without the dot) treated as catalog sources.
    pub extensions: Vec<String>,
    /// Field names marking a single object as an aggregate record.
    pub aggregate_markers: Vec<String>,
}

impl From<&SourceConfig> for LoaderOptions {
    fn from(config: &SourceConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            aggregate_markers: config.aggregate_markers.clone(),
        }
    }
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self::from(&SourceConfig::default())
    }
}

/// Load every catalog record found in `dir`.
///
/// Files are read concurrently, but records come back in file-path order and,
/// within a file, in source order.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub async fn load_catalog(dir: &Path, options: &LoaderOptions) -> Result<Vec<CatalogRecord>> {
    let paths = source_files(dir, &options.extensions).await?;
    debug!(files = paths.len(), "found catalog source files");

    let mut handles = Vec::with_capacity(paths.len());
    for path in paths {
        let markers = options.aggregate_markers.clone();
        let task_path = path.clone();
        handles.push((
            path,
            tokio::spawn(async move { load_file(&task_path, &markers).await }),
        ));
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (path, handle) in handles {
        match handle.await {
            Ok(Ok(mut file_records)) => {
                debug!(path = %path.display(), count = file_records.len(), "loaded catalog file");
                records.append(&mut file_records);
            }
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "skipping catalog file");
                skipped += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "catalog load task failed");
                skipped += 1;
            }
        }
    }

    for id in duplicate_ids(&records) {
        warn!(id, "duplicate record id; related-item selection treats these as one record");
    }

    info!(records = records.len(), skipped_files = skipped, "catalog loaded");
    Ok(records)
}

/// Parse the contents of one source file.
///
/// `stem` is the file's base name, used as the identity of aggregate objects.
pub fn parse_source(content: &str, stem: &str, markers: &[String]) -> Result<Vec<CatalogRecord>> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| RoutegenError::parse(format!("invalid JSON: {e}")))?;

    match value {
        Value::Array(items) => {
            let mut records = Vec::with_capacity(items.len());
            for (idx, item) in items.into_iter().enumerate() {
                match item {
                    Value::Object(obj) => records.push(record_from_entry(obj)),
                    other => {
                        warn!(file = stem, index = idx, kind = json_kind(&other), "ignoring non-object entry");
                    }
                }
            }
            Ok(records)
        }
        Value::Object(obj) if markers.iter().any(|m| obj.contains_key(m)) => {
            Ok(vec![record_from_aggregate(obj, stem)])
        }
        Value::Object(_) => Err(RoutegenError::parse(
            "object has no aggregate marker field",
        )),
        other => Err(RoutegenError::parse(format!(
            "expected an array or object, found {}",
            json_kind(&other)
        ))),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// List regular files in `dir` with a recognized extension, sorted by path.
async fn source_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| RoutegenError::io(dir, e))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| RoutegenError::io(dir, e))?
    {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let recognized = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
        if recognized {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

async fn load_file(path: &Path, markers: &[String]) -> Result<Vec<CatalogRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RoutegenError::io(path, e))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    parse_source(&content, stem, markers)
}

/// One element of a record list.
fn record_from_entry(obj: Map<String, Value>) -> CatalogRecord {
    let id = id_field(&obj).unwrap_or_else(CatalogRecord::generated_id);
    let category = obj.get("category").and_then(Category::from_value);
    let logo_key = logo_field(&obj);
    build_record(id, category, logo_key, obj)
}

/// A whole file treated as a single record.
fn record_from_aggregate(obj: Map<String, Value>, stem: &str) -> CatalogRecord {
    let category = obj
        .get("category")
        .and_then(Category::from_value)
        .or_else(|| Category::from_value(&Value::String(stem.to_string())));
    let logo_key = logo_field(&obj).or_else(|| (!stem.is_empty()).then(|| stem.to_string()));
    let id = if stem.is_empty() {
        CatalogRecord::generated_id()
    } else {
        stem.to_string()
    };
    build_record(id, category, logo_key, obj)
}

fn build_record(
    id: String,
    category: Option<Category>,
    logo_key: Option<String>,
    obj: Map<String, Value>,
) -> CatalogRecord {
    CatalogRecord {
        id,
        slug: str_field(&obj, &["slug"]),
        title: str_field(&obj, &["title"]).unwrap_or_default(),
        name: str_field(&obj, &["name"]).unwrap_or_default(),
        description: str_field(&obj, &["description"]).unwrap_or_default(),
        short_description: str_field(&obj, &["short_description", "shortDescription"])
            .unwrap_or_default(),
        category,
        logo_key,
        payload: Value::Object(obj),
    }
}

/// Ids that appear on more than one record, each once, in first-seen order.
fn duplicate_ids(records: &[CatalogRecord]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    records
        .iter()
        .map(|r| r.id.as_str())
        .filter(|id| !seen.insert(*id) && reported.insert(*id))
        .collect()
}

/// First present string value among `keys`.
fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

/// Ids may be strings or numbers in the source; blanks count as missing.
fn id_field(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn logo_field(obj: &Map<String, Value>) -> Option<String> {
    str_field(obj, &["logoKey", "logo_key"]).filter(|s| !s.trim().is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
