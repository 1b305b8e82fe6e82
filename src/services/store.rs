use crate::core::filters::CategoryTree;
use crate::models::CandidateRecords;
use serde::Deserialize;
use std::future::Future;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading candidate records
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid fixture: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Source of raw candidate records for the search engine
pub trait ProfileStore: Send + Sync {
    /// Profiles, listings, reviews and media as stored
    fn load_candidates(&self) -> impl Future<Output = Result<CandidateRecords, StoreError>> + Send;

    /// Category hierarchy for subcategory expansion, when the store has one
    fn load_category_tree(
        &self,
    ) -> impl Future<Output = Result<Option<CategoryTree>, StoreError>> + Send {
        async { Ok(None) }
    }
}

/// `(id, parent_id)` row of the category table
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CategoryLink {
    pub id: u64,
    pub parent_id: u64,
}

#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(flatten)]
    records: CandidateRecords,
    #[serde(default)]
    categories: Vec<CategoryLink>,
}

/// Store backed by records held in memory (tests, JSON fixtures)
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: CandidateRecords,
    categories: Vec<CategoryLink>,
}

impl InMemoryStore {
    pub fn new(records: CandidateRecords) -> Self {
        Self {
            records,
            categories: Vec::new(),
        }
    }

    pub fn with_categories(mut self, categories: Vec<CategoryLink>) -> Self {
        self.categories = categories;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        let fixture: Fixture = serde_json::from_str(json)?;
        Ok(Self::new(fixture.records).with_categories(fixture.categories))
    }

    /// Load a fixture file shaped like `{"profiles": [...], "listings": [...], ...}`
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let store = Self::from_json_str(&contents)?;
        tracing::info!(
            "Loaded fixture {}: {} profiles, {} listings, {} reviews",
            path.display(),
            store.records.profiles.len(),
            store.records.listings.len(),
            store.records.reviews.len()
        );
        Ok(store)
    }

    pub fn records(&self) -> &CandidateRecords {
        &self.records
    }
}

impl ProfileStore for InMemoryStore {
    async fn load_candidates(&self) -> Result<CandidateRecords, StoreError> {
        Ok(self.records.clone())
    }

    async fn load_category_tree(&self) -> Result<Option<CategoryTree>, StoreError> {
        if self.categories.is_empty() {
            return Ok(None);
        }
        let pairs = self.categories.iter().map(|c| (c.parent_id, c.id));
        Ok(Some(CategoryTree::from_pairs(pairs)))
    }
}
