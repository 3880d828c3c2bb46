use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::meals::gl::NutritionFacts;

/// How many candidates `similar` returns unless asked otherwise.
pub const DEFAULT_SIMILAR_LIMIT: usize = 3;

const STOP_WORDS: [&str; 8] = ["with", "and", "in", "of", "the", "a", "an", "or"];

/// One row of the food table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodRecord {
    pub name: String,
    pub category: String,
    #[serde(rename = "gi", alias = "glycemic_index")]
    pub glycemic_index: f64,
    pub carbs_per_unit: f64,
    pub fiber_per_unit: f64,
    pub unit: String,
    #[serde(rename = "unit_desc", alias = "unit_description")]
    pub unit_description: String,
}

impl FoodRecord {
    pub fn facts(&self) -> NutritionFacts {
        NutritionFacts {
            glycemic_index: self.glycemic_index,
            carbs_per_unit: self.carbs_per_unit,
            fiber_per_unit: self.fiber_per_unit,
        }
    }
}

/// A catalog entry sharing words with a queried name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarFood {
    pub name: String,
    pub unit_description: String,
    pub overlap: usize,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("food database file not found: {path}")]
    NotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read food database {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed food database: {0}")]
    Json(#[from] serde_json::Error),
}

/// Food table keyed by normalized name. Never mutated after construction.
#[derive(Debug, Default)]
pub struct FoodCatalog {
    records: Vec<FoodRecord>,
    index: HashMap<String, usize>,
}

pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl FoodCatalog {
    pub fn new(records: Vec<FoodRecord>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (i, r) in records.iter().enumerate() {
            // later duplicates win
            index.insert(normalize(&r.name), i);
        }
        Self { records, index }
    }

    /// Parses a JSON array of records. Any bad record fails the whole document.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let records: Vec<FoodRecord> = serde_json::from_str(raw)?;
        Ok(Self::new(records))
    }

    pub fn read(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| {
            let path = path.display().to_string();
            if source.kind() == std::io::ErrorKind::NotFound {
                CatalogError::NotFound { path, source }
            } else {
                CatalogError::Io { path, source }
            }
        })?;
        Self::from_json(&raw)
    }

    /// Loads the catalog from disk, falling back to an empty one on any error.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::read(path) {
            Ok(catalog) => {
                info!(count = catalog.len(), path = %path.display(), "food database loaded");
                catalog
            }
            Err(e) => {
                error!(error = %e, path = %path.display(), "food database unavailable; using empty catalog");
                Self::default()
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&FoodRecord> {
        self.index.get(&normalize(name)).map(|&i| &self.records[i])
    }

    pub fn all(&self) -> &[FoodRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ranks records by how many non-stop-words they share with `name`.
    pub fn similar(&self, name: &str, limit: usize) -> Vec<SimilarFood> {
        let query = content_words(name);
        if query.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SimilarFood> = self
            .records
            .iter()
            .filter_map(|r| {
                let overlap = content_words(&r.name).intersection(&query).count();
                (overlap > 0).then(|| SimilarFood {
                    name: r.name.clone(),
                    unit_description: r.unit_description.clone(),
                    overlap,
                })
            })
            .collect();

        // stable: ties keep catalog order
        hits.sort_by(|a, b| b.overlap.cmp(&a.overlap));
        hits.truncate(limit);
        hits
    }
}

fn content_words(name: &str) -> HashSet<String> {
    name.to_lowercase()
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .map(str::to_owned)
        .collect()
}
