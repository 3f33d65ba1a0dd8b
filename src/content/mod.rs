//! Lab catalog
//!
//! Reads the stored catalog, seeding it from the loaded content pack the
//! first time, and appends labs created through authoring.
//!
//! Authored labs have no steps. Creating steps is not supported, so such a
//! lab shows up in the catalog but cannot be played to completion.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::schema::{Difficulty, Lab, LabType};
use crate::error::StoreError;
use crate::store::{KeyValueStore, read_json, write_json};

/// Thumbnail image base; a number is appended.
pub const THUMBNAIL_BASE: &str = "https://picsum.photos/400/225?random=";

/// Module label for labs that do not name one.
pub const DEFAULT_MODULE: &str = "Extra Labs";

const LABS_KEY: &str = "labs";

/// Fields an author supplies for a new lab.
#[derive(Debug, Clone, Default)]
pub struct LabDraft {
    /// Display title
    pub title: String,
    /// Short description
    pub description: String,
    /// Track grouping label
    pub module: String,
    /// Points awarded on completion
    pub points: u64,
    /// Difficulty rating
    pub difficulty: Difficulty,
    /// Lab format
    pub lab_type: LabType,
    /// Free-form tags
    pub tags: Vec<String>,
}

/// Catalog service over a [`KeyValueStore`].
#[derive(Debug)]
pub struct ContentStore {
    store: Arc<dyn KeyValueStore>,
    seed: Vec<Lab>,
}

impl ContentStore {
    /// Creates a catalog that seeds itself with `seed` when storage is empty.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, seed: Vec<Lab>) -> Self {
        Self {
            store,
            seed,
        }
    }

    /// Returns all labs in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if storage fails.
    pub async fn get_labs(&self) -> Result<Vec<Lab>, StoreError> {
        if let Some(labs) = read_json(self.store.as_ref(), LABS_KEY).await? {
            return Ok(labs);
        }
        let _held = self.store.lock(LABS_KEY).await?;
        self.load_or_seed().await
    }

    /// Looks up one lab.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if storage fails.
    pub async fn get_lab_by_id(&self, id: u64) -> Result<Option<Lab>, StoreError> {
        Ok(self.get_labs().await?.into_iter().find(|l| l.id == id))
    }

    /// Appends a step-less lab built from `draft`.
    ///
    /// The id is one more than the largest existing id, the slug comes from
    /// the title, and the thumbnail number is the catalog size plus 5.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if storage fails.
    pub async fn create_lab(&self, draft: LabDraft) -> Result<Lab, StoreError> {
        let _held = self.store.lock(LABS_KEY).await?;
        let mut labs = self.load_or_seed().await?;

        let lab = Lab {
            id: labs.iter().map(|l| l.id).max().unwrap_or(0) + 1,
            slug: slugify(&draft.title),
            thumbnail: format!("{THUMBNAIL_BASE}{}", labs.len() + 5),
            title: draft.title,
            description: draft.description,
            module: draft.module,
            steps: Vec::new(),
            points: draft.points,
            difficulty: draft.difficulty,
            lab_type: draft.lab_type,
            tags: draft.tags,
        };
        labs.push(lab.clone());
        write_json(self.store.as_ref(), LABS_KEY, &labs).await?;

        tracing::info!(lab_id = lab.id, slug = %lab.slug, "lab created");
        Ok(lab)
    }

    // Caller holds the `labs` lock.
    async fn load_or_seed(&self) -> Result<Vec<Lab>, StoreError> {
        if let Some(labs) = read_json(self.store.as_ref(), LABS_KEY).await? {
            return Ok(labs);
        }
        write_json(self.store.as_ref(), LABS_KEY, &self.seed).await?;
        tracing::info!(labs = self.seed.len(), "catalog seeded");
        Ok(self.seed.clone())
    }
}

/// Lowercases `title` and replaces whitespace runs with `-`.
///
/// A blank title yields `"untitled"`.
#[must_use]
pub fn slugify(title: &str) -> String {
    let slug = title
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Groups labs by module, keeping first-appearance order.
#[must_use]
pub fn group_by_module(labs: &[Lab]) -> IndexMap<&str, Vec<&Lab>> {
    let mut groups: IndexMap<&str, Vec<&Lab>> = IndexMap::new();
    for lab in labs {
        let module = if lab.module.trim().is_empty() {
            DEFAULT_MODULE
        } else {
            lab.module.as_str()
        };
        groups.entry(module).or_default().push(lab);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentLoader;
    use crate::store::MemoryStore;

    fn seed() -> Vec<Lab> {
        ContentLoader::with_defaults().load_builtin().unwrap().pack.labs
    }

    fn catalog() -> (ContentStore, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ContentStore::new(store.clone(), seed()), store)
    }

    #[tokio::test]
    async fn first_read_seeds_storage() {
        let (content, store) = catalog();
        assert!(store.is_empty());
        let labs = content.get_labs().await.unwrap();
        assert_eq!(labs.len(), 30);
        assert!(store.read("labs").await.unwrap().is_some());
        assert_eq!(content.get_lab_by_id(7).await.unwrap().unwrap().points, 100);
        assert!(content.get_lab_by_id(31).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_lab_assigns_id_slug_and_thumbnail() {
        let (content, _) = catalog();
        let lab = content
            .create_lab(LabDraft {
                title: "Buffer  Overflow\tBasics".to_string(),
                points: 250,
                ..LabDraft::default()
            })
            .await
            .unwrap();
        assert_eq!(lab.id, 31);
        assert_eq!(lab.slug, "buffer-overflow-basics");
        assert_eq!(lab.thumbnail, "https://picsum.photos/400/225?random=35");
        assert!(lab.steps.is_empty());

        let again = content.create_lab(LabDraft::default()).await.unwrap();
        assert_eq!(again.id, 32);
        assert_eq!(again.slug, "untitled");
        assert_eq!(content.get_labs().await.unwrap().len(), 32);
    }

    #[tokio::test]
    async fn stored_catalog_wins_over_seed() {
        let store = Arc::new(MemoryStore::new());
        let first = ContentStore::new(store.clone(), seed());
        first
            .create_lab(LabDraft {
                title: "Extra".into(),
                ..LabDraft::default()
            })
            .await
            .unwrap();

        let second = ContentStore::new(store, Vec::new());
        assert_eq!(second.get_labs().await.unwrap().len(), 31);
    }

    #[test]
    fn slug_rules() {
        assert_eq!(slugify("Linux I: Navigation"), "linux-i:-navigation");
        assert_eq!(slugify("  "), "untitled");
        assert_eq!(slugify(""), "untitled");
        assert_eq!(slugify("SQLi"), "sqli");
    }

    #[test]
    fn grouping_keeps_order_and_defaults() {
        let mut labs = seed();
        labs.truncate(8);
        labs[7].module = String::new();
        let groups = group_by_module(&labs);
        let names: Vec<&str> = groups.keys().copied().collect();
        assert_eq!(
            names,
            vec!["Module 1: Fundamentals", "Module 2: Reconnaissance", DEFAULT_MODULE]
        );
        assert_eq!(groups["Module 1: Fundamentals"].len(), 6);
    }
}
