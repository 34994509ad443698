//! Related-record selection for item pages.
//!
//! Same-category records are preferred. When a category has more candidates
//! than the limit, a random subset is shown; when it has fewer, the panel is
//! topped up with random records from other categories. Selection is random
//! per build unless the resolver is seeded.

use std::collections::HashSet;

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use tracing::{trace, warn};

use routegen_shared::{CatalogRecord, MAX_SIMILAR, SimilarityConfig};

/// Related records shown per item when nothing else is configured.
pub const DEFAULT_LIMIT: usize = MAX_SIMILAR;

/// Picks up to `limit` related records for a target record.
///
/// `limit` never exceeds [`MAX_SIMILAR`]; larger values are clamped.
#[derive(Debug)]
pub struct SimilarityResolver<R = StdRng> {
    rng: R,
    limit: usize,
}

impl SimilarityResolver<StdRng> {
    /// Reproducible selection.
    pub fn seeded(seed: u64, limit: usize) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), limit)
    }

    /// Fresh selection every run.
    pub fn from_entropy(limit: usize) -> Self {
        Self::with_rng(StdRng::from_os_rng(), limit)
    }

    pub fn from_config(config: &SimilarityConfig) -> Self {
        match config.seed {
            Some(seed) => Self::seeded(seed, config.limit),
            None => Self::from_entropy(config.limit),
        }
    }
}

impl<R: Rng> SimilarityResolver<R> {
    pub fn with_rng(rng: R, limit: usize) -> Self {
        if limit > MAX_SIMILAR {
            warn!(requested = limit, max = MAX_SIMILAR, "similarity limit clamped");
        }
        Self {
            rng,
            limit: limit.min(MAX_SIMILAR),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Related records for `target`, drawn from `catalog`.
    ///
    /// The result never contains `target` (matched by id), never repeats a
    /// record, and holds at most `limit` entries.
    pub fn resolve<'a>(
        &mut self,
        target: &CatalogRecord,
        catalog: &'a [CatalogRecord],
    ) -> Vec<&'a CatalogRecord> {
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(target.id.as_str());

        let mut same: Vec<&CatalogRecord> = Vec::new();
        let mut other: Vec<&CatalogRecord> = Vec::new();
        for candidate in catalog {
            if !seen.insert(candidate.id.as_str()) {
                continue;
            }
            if target.shares_category_with(candidate) {
                same.push(candidate);
            } else {
                other.push(candidate);
            }
        }

        if same.len() > self.limit {
            same.shuffle(&mut self.rng);
            same.truncate(self.limit);
            trace!(record = %target.id, "related records drawn from own category");
            return same;
        }

        let fill = self.limit - same.len();
        other.shuffle(&mut self.rng);
        other.truncate(fill);

        trace!(
            record = %target.id,
            same_category = same.len(),
            filled = other.len(),
            "related records resolved"
        );

        same.extend(other);
        same
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routegen_shared::Category;
    use serde_json::json;

    fn record(id: &str, category: Option<Category>) -> CatalogRecord {
        CatalogRecord {
            id: id.into(),
            slug: Some(id.to_lowercase()),
            title: id.into(),
            name: id.into(),
            description: String::new(),
            short_description: String::new(),
            category,
            logo_key: None,
            payload: json!({}),
        }
    }

    fn single(label: &str) -> Option<Category> {
        Some(Category::Single(label.into()))
    }

    fn ids<'a>(records: &[&'a CatalogRecord]) -> Vec<&'a str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    fn assert_invariants(target: &CatalogRecord, result: &[&CatalogRecord], limit: usize) {
        assert!(result.len() <= limit);
        assert!(result.iter().all(|r| r.id != target.id));
        let unique: HashSet<&str> = result.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(unique.len(), result.len(), "duplicate in {:?}", ids(result));
    }

    fn scenario() -> Vec<CatalogRecord> {
        vec![
            record("A", single("Search")),
            record("B", single("Search")),
            record("C", single("Search")),
            record("D", single("Search")),
            record("E", single("Database")),
        ]
    }

    #[test]
    fn crowded_category_uses_only_own_category() {
        let mut catalog = scenario();
        catalog.push(record("F", single("Search")));
        let mut resolver = SimilarityResolver::from_entropy(DEFAULT_LIMIT);

        for _ in 0..50 {
            let result = resolver.resolve(&catalog[0], &catalog);
            assert_eq!(result.len(), 3);
            assert_invariants(&catalog[0], &result, 3);
            assert!(result.iter().all(|r| r.labels() == vec!["Search"]));
        }
    }

    #[test]
    fn exactly_full_category_is_a_permutation_of_peers() {
        let catalog = scenario();
        let mut resolver = SimilarityResolver::from_entropy(DEFAULT_LIMIT);

        let result = resolver.resolve(&catalog[0], &catalog);
        let mut got = ids(&result);
        got.sort();
        assert_eq!(got, vec!["B", "C", "D"]);
    }

    #[test]
    fn lonely_category_fills_from_others() {
        let catalog = scenario();
        let mut resolver = SimilarityResolver::from_entropy(DEFAULT_LIMIT);

        for _ in 0..50 {
            let result = resolver.resolve(&catalog[4], &catalog);
            assert_eq!(result.len(), 3);
            assert_invariants(&catalog[4], &result, 3);
            assert!(result.iter().all(|r| ["A", "B", "C", "D"].contains(&r.id.as_str())));
        }
    }

    #[test]
    fn partial_category_keeps_peers_then_fills_without_repeats() {
        let catalog = vec![
            record("A", single("Search")),
            record("B", single("Search")),
            record("C", single("Database")),
            record("D", single("Database")),
            record("E", None),
        ];
        let mut resolver = SimilarityResolver::from_entropy(DEFAULT_LIMIT);

        for _ in 0..50 {
            let result = resolver.resolve(&catalog[0], &catalog);
            assert_eq!(result.len(), 3);
            assert_invariants(&catalog[0], &result, 3);
            assert_eq!(result[0].id, "B");
            assert_ne!(result[2].id, "B");
        }
    }

    #[test]
    fn small_catalog_returns_what_exists() {
        let catalog = vec![record("A", single("Search")), record("B", None)];
        let mut resolver = SimilarityResolver::from_entropy(DEFAULT_LIMIT);

        assert_eq!(ids(&resolver.resolve(&catalog[0], &catalog)), vec!["B"]);
        assert!(resolver.resolve(&catalog[0], &catalog[..1]).is_empty());
    }

    #[test]
    fn multi_label_target_matches_on_any_label() {
        let catalog = vec![
            record("A", Some(Category::Multiple(vec!["Search".into(), "AI".into()]))),
            record("B", Some(Category::Multiple(vec!["AI".into()]))),
            record("C", single("Database")),
            record("D", single("Database")),
        ];
        let mut resolver = SimilarityResolver::seeded(7, DEFAULT_LIMIT);

        let result = resolver.resolve(&catalog[0], &catalog);
        assert_eq!(result[0].id, "B");
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn duplicate_ids_in_catalog_are_collapsed() {
        let catalog = vec![
            record("A", single("Search")),
            record("B", single("Search")),
            record("B", single("Search")),
            record("A", single("Search")),
        ];
        let mut resolver = SimilarityResolver::from_entropy(DEFAULT_LIMIT);

        let result = resolver.resolve(&catalog[0], &catalog);
        assert_eq!(ids(&result), vec!["B"]);
    }

    #[test]
    fn same_seed_same_selection() {
        let mut catalog = scenario();
        for id in ["F", "G", "H"] {
            catalog.push(record(id, single("Search")));
        }

        let mut a = SimilarityResolver::seeded(42, DEFAULT_LIMIT);
        let mut b = SimilarityResolver::seeded(42, DEFAULT_LIMIT);
        for target in &catalog {
            assert_eq!(
                ids(&a.resolve(target, &catalog)),
                ids(&b.resolve(target, &catalog))
            );
        }
    }

    #[test]
    fn oversized_limit_is_clamped() {
        let catalog: Vec<CatalogRecord> = ["A", "B", "C", "D", "E", "F"]
            .iter()
            .map(|id| record(id, single("S")))
            .collect();
        let mut resolver = SimilarityResolver::seeded(5, 5);
        assert_eq!(resolver.limit(), MAX_SIMILAR);

        let result = resolver.resolve(&catalog[0], &catalog);
        assert_eq!(result.len(), MAX_SIMILAR);
        assert_invariants(&catalog[0], &result, MAX_SIMILAR);
    }

    #[test]
    fn zero_limit_yields_nothing() {
        let catalog = scenario();
        let mut resolver = SimilarityResolver::seeded(1, 0);
        assert!(resolver.resolve(&catalog[0], &catalog).is_empty());
    }
}
