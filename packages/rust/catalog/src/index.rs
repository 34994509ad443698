//! Category index builder.
//!
//! Groups records by category label. A record carrying several labels is
//! indexed under each of them; a record with no category is in no bucket and
//! only shows up on the full listing.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use routegen_shared::CatalogRecord;

/// Category label → records bearing that label, in load order.
///
/// Labels iterate in sorted order so repeated builds enumerate categories
/// identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryIndex {
    buckets: BTreeMap<String, Vec<CatalogRecord>>,
}

impl CategoryIndex {
    #[instrument(skip_all, fields(records = records.len()))]
    pub fn build(records: &[CatalogRecord]) -> Self {
        let mut buckets: BTreeMap<String, Vec<CatalogRecord>> = BTreeMap::new();

        for record in records {
            let mut seen: Vec<&str> = Vec::new();
            for label in record.labels() {
                if seen.contains(&label) {
                    continue;
                }
                seen.push(label);
                buckets
                    .entry(label.to_string())
                    .or_default()
                    .push(record.clone());
            }
        }

        debug!(categories = buckets.len(), "category index built");
        Self { buckets }
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// Records under `label`; empty for unknown labels.
    pub fn members(&self, label: &str) -> &[CatalogRecord] {
        self.buckets.get(label).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CatalogRecord])> {
        self.buckets
            .iter()
            .map(|(label, records)| (label.as_str(), records.as_slice()))
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

    fn ids(records: &[CatalogRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn groups_in_load_order() {
        let records = vec![
            record("B", single("Search")),
            record("E", single("Database")),
            record("A", single("Search")),
        ];
        let index = CategoryIndex::build(&records);

        assert_eq!(index.len(), 2);
        assert_eq!(index.labels().collect::<Vec<_>>(), vec!["Database", "Search"]);
        assert_eq!(ids(index.members("Search")), vec!["B", "A"]);
        assert_eq!(ids(index.members("Database")), vec!["E"]);
    }

    #[test]
    fn multi_label_record_lands_in_every_bucket() {
        let records = vec![
            record("A", Some(Category::Multiple(vec!["Search".into(), "AI".into()]))),
            record("B", single("AI")),
        ];
        let index = CategoryIndex::build(&records);

        assert_eq!(ids(index.members("Search")), vec!["A"]);
        assert_eq!(ids(index.members("AI")), vec!["A", "B"]);
    }

    #[test]
    fn repeated_label_indexes_once() {
        let records = vec![record(
            "A",
            Some(Category::Multiple(vec!["AI".into(), "AI".into()])),
        )];
        let index = CategoryIndex::build(&records);
        assert_eq!(index.members("AI").len(), 1);
    }

    #[test]
    fn uncategorized_records_are_not_indexed() {
        let records = vec![record("A", None), record("B", single("Search"))];
        let index = CategoryIndex::build(&records);
        assert_eq!(index.len(), 1);
        assert!(index.iter().all(|(_, members)| members.iter().all(|r| r.id != "A")));
        assert!(index.members("missing").is_empty());
    }

    #[test]
    fn rebuild_is_identical() {
        let records = vec![
            record("A", single("Search")),
            record("B", single("Database")),
            record("C", Some(Category::Multiple(vec!["Search".into(), "Web".into()]))),
        ];
        assert_eq!(CategoryIndex::build(&records), CategoryIndex::build(&records));
    }
}
