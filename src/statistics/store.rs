//! Shared store of column histograms.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::StatisticsResult;
use super::histogram::Histogram;

/// Identifies one column of one table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnKey {
    pub table: String,
    pub column: String,
}

impl ColumnKey {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    #[serde(flatten)]
    key: ColumnKey,
    histogram: Histogram,
}

/// Thread-safe map from columns to their histograms.
#[derive(Debug, Default)]
pub struct StatisticsStore {
    histograms: RwLock<HashMap<ColumnKey, Histogram>>,
}

impl StatisticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the histogram of a column, returning the old one.
    pub fn put(&self, key: ColumnKey, histogram: Histogram) -> Option<Histogram> {
        self.histograms.write().insert(key, histogram)
    }

    pub fn get(&self, key: &ColumnKey) -> Option<Histogram> {
        self.histograms.read().get(key).cloned()
    }

    pub fn remove(&self, key: &ColumnKey) -> Option<Histogram> {
        self.histograms.write().remove(key)
    }

    /// Estimated row count of a column, if a histogram is known.
    pub fn row_count(&self, key: &ColumnKey) -> Option<u64> {
        self.histograms.read().get(key).map(Histogram::size)
    }

    pub fn len(&self) -> usize {
        self.histograms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.read().is_empty()
    }

    /// Load a store previously written by [`StatisticsStore::save`].
    pub fn load(path: impl AsRef<Path>) -> StatisticsResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let entries: Vec<StoredEntry> = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), histograms = entries.len(), "loaded statistics");

        let histograms = entries
            .into_iter()
            .map(|entry| (entry.key, entry.histogram))
            .collect();
        Ok(Self {
            histograms: RwLock::new(histograms),
        })
    }

    /// Write every histogram to `path` as JSON, sorted by column.
    pub fn save(&self, path: impl AsRef<Path>) -> StatisticsResult<()> {
        let path = path.as_ref();
        let mut entries: Vec<StoredEntry> = self
            .histograms
            .read()
            .iter()
            .map(|(key, histogram)| StoredEntry {
                key: key.clone(),
                histogram: histogram.clone(),
            })
            .collect();
        entries.sort_by(|a, b| {
            (&a.key.table, &a.key.column).cmp(&(&b.key.table, &b.key.column))
        });

        let json = serde_json::to_string_pretty(&entries)?;
        fs::write(path, json)?;
        debug!(path = %path.display(), histograms = entries.len(), "saved statistics");
        Ok(())
    }
}
