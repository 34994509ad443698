//! End-to-end `build` pipeline: source files → catalog → category index → routes → artifacts.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument, warn};

use routegen_catalog::{CategoryIndex, LoaderOptions, SimilarityResolver, load_catalog};
use routegen_shared::{AppConfig, Result, RouteManifest, SimilarityConfig};

use crate::emitter::{self, RouteEmitter};

/// Configuration for the `build_site` pipeline.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory holding catalog source files.
    pub data_dir: PathBuf,
    /// Directory receiving `routes.json` and `data/`.
    pub output_dir: PathBuf,
    /// URL prefix for every catalog route.
    pub base_path: String,
    /// Source file recognition.
    pub loader: LoaderOptions,
    /// Related-items selection.
    pub similarity: SimilarityConfig,
    /// Tool version string.
    pub tool_version: String,
}

impl BuildConfig {
    pub fn from_app_config(config: &AppConfig, tool_version: &str) -> Self {
        Self {
            data_dir: config.source.data_dir.clone(),
            output_dir: config.routes.output_dir.clone(),
            base_path: config.routes.base_path.clone(),
            loader: LoaderOptions::from(&config.source),
            similarity: config.similarity.clone(),
            tool_version: tool_version.to_string(),
        }
    }
}

/// Result of the `build_site` pipeline.
#[derive(Debug)]
pub struct BuildResult {
    pub output_dir: PathBuf,
    /// Records loaded from the source directory.
    pub record_count: usize,
    /// Distinct category labels.
    pub category_count: usize,
    /// The manifest that was written.
    pub manifest: RouteManifest,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// One row of the category overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub label: String,
    /// Route segment under `categories/`.
    pub segment: String,
    pub count: usize,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &BuildResult) {}
}

/// Run the full build.
///
/// 1. Load catalog records
/// 2. Build the category index
/// 3. Plan routes (related items resolved here)
/// 4. Write artifacts and the route manifest
///
/// Nothing is written when planning fails, so a route collision leaves the
/// previous build output untouched.
#[instrument(skip_all, fields(data_dir = %config.data_dir.display(), output_dir = %config.output_dir.display()))]
pub async fn build_site(
    config: &BuildConfig,
    progress: &dyn ProgressReporter,
) -> Result<BuildResult> {
    let start = Instant::now();

    progress.phase("Loading catalog");
    let records = load_catalog(&config.data_dir, &config.loader).await?;

    progress.phase("Indexing categories");
    let index = CategoryIndex::build(&records);
    if index.is_empty() {
        warn!("no record carries a category; the categories index will be empty");
    }

    progress.phase("Planning routes");
    let mut resolver = SimilarityResolver::from_config(&config.similarity);
    let routes = RouteEmitter::new(&config.base_path).plan(&records, &index, &mut resolver)?;

    progress.phase("Writing route artifacts");
    let manifest = emitter::write_routes(&config.output_dir, &routes, &config.tool_version).await?;

    let result = BuildResult {
        output_dir: config.output_dir.clone(),
        record_count: records.len(),
        category_count: index.len(),
        manifest,
        elapsed: start.elapsed(),
    };

    info!(
        records = result.record_count,
        categories = result.category_count,
        routes = result.manifest.route_count,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "build complete"
    );

    progress.done(&result);
    Ok(result)
}

/// Load and index the catalog without writing anything.
#[instrument(skip_all, fields(data_dir = %config.data_dir.display()))]
pub async fn summarize_categories(config: &BuildConfig) -> Result<Vec<CategorySummary>> {
    let records = load_catalog(&config.data_dir, &config.loader).await?;
    let index = CategoryIndex::build(&records);

    Ok(index
        .labels()
        .map(|label| CategorySummary {
            label: label.to_string(),
            segment: emitter::category_segment(label),
            count: index.members(label).len(),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::Path;

    use routegen_shared::{PageKind, RoutegenError};

    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rg-pipeline-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn make_config(root: &Path, seed: Option<u64>) -> BuildConfig {
        let mut app = AppConfig::default();
        app.source.data_dir = root.join("src");
        app.routes.output_dir = root.join("out");
        app.similarity.seed = seed;
        BuildConfig::from_app_config(&app, "0.1.0-test")
    }

    /// A, B, C, D in "Search" across two files; E in "Database" as an aggregate file.
    fn write_scenario(root: &Path) {
        let src = root.join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(
            src.join("search.json"),
            r#"[
                {"id": "A", "slug": "a", "title": "A", "category": "Search"},
                {"id": "B", "slug": "b", "title": "B", "category": "Search"}
            ]"#,
        )
        .unwrap();
        std::fs::write(
            src.join("search-more.json"),
            r#"[
                {"id": "C", "slug": "c", "title": "C", "category": "Search"},
                {"id": "D", "slug": "d", "title": "D", "category": "Search"}
            ]"#,
        )
        .unwrap();
        std::fs::write(
            src.join("E.json"),
            r#"{"tool_count": 4, "slug": "e", "title": "E", "category": "Database"}"#,
        )
        .unwrap();
    }

    fn read_artifact(config: &BuildConfig, manifest: &RouteManifest, path: &str) -> serde_json::Value {
        let entry = manifest
            .routes
            .iter()
            .find(|r| r.path == path)
            .unwrap_or_else(|| panic!("no route at {path}"));
        let bytes = std::fs::read(config.output_dir.join(&entry.data_ref)).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn member_ids(value: &serde_json::Value) -> HashSet<String> {
        value["members"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap().to_string())
            .collect()
    }

    fn similar_ids(value: &serde_json::Value) -> Vec<String> {
        value["similar"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn search_and_database_scenario() {
        let tmp = temp_dir();
        write_scenario(&tmp);
        let config = make_config(&tmp, None);

        let result = build_site(&config, &SilentProgress).await.unwrap();
        assert_eq!(result.record_count, 5);
        assert_eq!(result.category_count, 2);
        // 5 items + list + categories index + 2 category pages
        assert_eq!(result.manifest.route_count, 9);

        let manifest = &result.manifest;
        let search = read_artifact(&config, manifest, "/catalog/categories/search/");
        let expected: HashSet<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        assert_eq!(member_ids(&search), expected);

        let database = read_artifact(&config, manifest, "/catalog/categories/database/");
        assert_eq!(member_ids(&database), HashSet::from(["E".to_string()]));

        let a = read_artifact(&config, manifest, "/catalog/a");
        let mut similar_a = similar_ids(&a);
        similar_a.sort();
        assert_eq!(similar_a, vec!["B", "C", "D"]);

        let e = read_artifact(&config, manifest, "/catalog/e");
        let similar_e = similar_ids(&e);
        assert_eq!(similar_e.len(), 3);
        let unique: HashSet<&String> = similar_e.iter().collect();
        assert_eq!(unique.len(), 3);
        assert!(similar_e.iter().all(|id| expected.contains(id)));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn corrupt_file_only_drops_its_records() {
        let tmp = temp_dir();
        write_scenario(&tmp);
        std::fs::write(tmp.join("src/broken.json"), "[{\"id\": \"X\", ").unwrap();
        let config = make_config(&tmp, Some(3));

        let result = build_site(&config, &SilentProgress).await.unwrap();
        assert_eq!(result.record_count, 5);

        let list = read_artifact(&config, &result.manifest, "/catalog");
        let ids: Vec<&str> = list["records"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap())
            .collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), 5);
        assert_eq!(unique.len(), 5);
        assert!(!unique.contains("X"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn repeated_builds_emit_same_paths() {
        let tmp = temp_dir();
        write_scenario(&tmp);
        let config = make_config(&tmp, None);

        let first = build_site(&config, &SilentProgress).await.unwrap();
        let second = build_site(&config, &SilentProgress).await.unwrap();

        let paths = |m: &RouteManifest| -> Vec<(String, PageKind, String)> {
            m.routes
                .iter()
                .map(|r| (r.path.clone(), r.page_kind, r.data_ref.clone()))
                .collect()
        };
        assert_eq!(paths(&first.manifest), paths(&second.manifest));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn seeded_builds_are_byte_identical_except_timestamp() {
        let tmp = temp_dir();
        write_scenario(&tmp);
        let config = make_config(&tmp, Some(99));

        let first = build_site(&config, &SilentProgress).await.unwrap();
        let second = build_site(&config, &SilentProgress).await.unwrap();

        let hashes = |m: &RouteManifest| -> Vec<String> {
            m.routes.iter().map(|r| r.sha256.clone()).collect()
        };
        assert_eq!(hashes(&first.manifest), hashes(&second.manifest));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn collision_writes_nothing() {
        let tmp = temp_dir();
        write_scenario(&tmp);
        std::fs::write(
            tmp.join("src/dupes.json"),
            r#"[{"id": "Z", "slug": "a", "category": "Search"}]"#,
        )
        .unwrap();
        let config = make_config(&tmp, None);

        let err = build_site(&config, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, RoutegenError::RouteCollision { .. }));
        assert!(!config.output_dir.join(emitter::MANIFEST_FILE).exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn missing_source_dir_fails_build() {
        let tmp = temp_dir();
        let config = make_config(&tmp, None);

        let err = build_site(&config, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, RoutegenError::Io { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn category_summary_reports_segments() {
        let tmp = temp_dir();
        write_scenario(&tmp);
        let config = make_config(&tmp, None);

        let summary = summarize_categories(&config).await.unwrap();
        assert_eq!(
            summary,
            vec![
                CategorySummary {
                    label: "Database".into(),
                    segment: "database".into(),
                    count: 1,
                },
                CategorySummary {
                    label: "Search".into(),
                    segment: "search".into(),
                    count: 4,
                },
            ]
        );
        assert!(!config.output_dir.exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn non_ascii_category_builds_with_hashed_segment() {
        let tmp = temp_dir();
        std::fs::create_dir_all(tmp.join("src")).unwrap();
        std::fs::write(
            tmp.join("src/mixed.json"),
            r#"[
                {"id": "A", "slug": "a", "category": "Search"},
                {"id": "B", "slug": "b", "category": "数据库"}
            ]"#,
        )
        .unwrap();
        let config = make_config(&tmp, Some(3));

        let result = build_site(&config, &SilentProgress).await.unwrap();
        let segment = emitter::category_segment("数据库");
        assert!(segment.starts_with("category-"));
        let path = format!("/catalog/categories/{segment}/");
        assert!(result.manifest.routes.iter().any(|r| r.path == path));

        let summary = summarize_categories(&config).await.unwrap();
        assert!(summary.iter().any(|c| c.label == "数据库" && c.segment == segment));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
