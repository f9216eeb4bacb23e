//! Equi-height column histograms.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{StatisticsError, StatisticsResult};
use crate::expr::Literal;

/// Column data types a histogram can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    Integer,
    Float,
    Text,
    Timestamp,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Integer => "INTEGER",
            DataType::Float => "REAL",
            DataType::Text => "TEXT",
            DataType::Timestamp => "TIMESTAMP",
        };
        write!(f, "{}", name)
    }
}

/// One histogram bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub lower: Literal,
    pub upper: Literal,
    /// Rows falling in this bucket.
    pub count: u64,
    /// Rows in all previous buckets.
    pub pre_sum: u64,
    /// Distinct values in this bucket.
    pub ndv: u64,
}

impl Bucket {
    /// A bucket whose `pre_sum` is filled in by [`Histogram::new`].
    pub fn new(lower: Literal, upper: Literal, count: u64, ndv: u64) -> Self {
        Self {
            lower,
            upper,
            count,
            pre_sum: 0,
            ndv,
        }
    }
}

/// Histogram of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistogramDocument", into = "HistogramDocument")]
pub struct Histogram {
    pub data_type: DataType,
    pub sample_rate: f64,
    pub buckets: Vec<Bucket>,
    pub collected_at: Option<DateTime<Utc>>,
}

/// Stored JSON layout.
#[derive(Serialize, Deserialize)]
struct HistogramDocument {
    data_type: DataType,
    sample_rate: f64,
    num_buckets: usize,
    buckets: Vec<Bucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    collected_at: Option<DateTime<Utc>>,
}

impl Histogram {
    /// Build a histogram, computing each bucket's `pre_sum` from the counts
    /// before it.
    pub fn new(data_type: DataType, sample_rate: f64, mut buckets: Vec<Bucket>) -> Self {
        let mut running = 0;
        for bucket in &mut buckets {
            bucket.pre_sum = running;
            running = running.saturating_add(bucket.count);
        }
        Self {
            data_type,
            sample_rate,
            buckets,
            collected_at: None,
        }
    }

    /// Stamp the collection time.
    pub fn collected_at(mut self, at: DateTime<Utc>) -> Self {
        self.collected_at = Some(at);
        self
    }

    /// Total rows covered by the histogram. Saturates at `u64::MAX`.
    pub fn size(&self) -> u64 {
        self.buckets
            .last()
            .map(|last| last.pre_sum.saturating_add(last.count))
            .unwrap_or(0)
    }

    pub fn validate(&self) -> StatisticsResult<()> {
        if !(self.sample_rate > 0.0 && self.sample_rate <= 1.0) {
            return Err(StatisticsError::InvalidHistogram(format!(
                "sample rate {} outside (0, 1]",
                self.sample_rate
            )));
        }
        let mut expected: u64 = 0;
        for (i, bucket) in self.buckets.iter().enumerate() {
            if bucket.pre_sum != expected {
                return Err(StatisticsError::InvalidHistogram(format!(
                    "bucket {} has pre_sum {}, expected {}",
                    i, bucket.pre_sum, expected
                )));
            }
            expected = expected.checked_add(bucket.count).ok_or_else(|| {
                StatisticsError::InvalidHistogram(format!("row count overflows at bucket {}", i))
            })?;
        }
        Ok(())
    }

    /// Parse the stored JSON form.
    pub fn from_json(json: &str) -> StatisticsResult<Self> {
        if json.trim().is_empty() {
            return Err(StatisticsError::Empty);
        }
        let doc: HistogramDocument = serde_json::from_str(json)?;
        Self::try_from(doc)
    }

    /// Render the stored JSON form.
    pub fn to_json(&self) -> StatisticsResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl TryFrom<HistogramDocument> for Histogram {
    type Error = StatisticsError;

    fn try_from(doc: HistogramDocument) -> StatisticsResult<Self> {
        if doc.num_buckets != doc.buckets.len() {
            return Err(StatisticsError::InvalidHistogram(format!(
                "num_buckets is {} but {} buckets are present",
                doc.num_buckets,
                doc.buckets.len()
            )));
        }
        let histogram = Self {
            data_type: doc.data_type,
            sample_rate: doc.sample_rate,
            buckets: doc.buckets,
            collected_at: doc.collected_at,
        };
        histogram.validate()?;
        Ok(histogram)
    }
}

impl From<Histogram> for HistogramDocument {
    fn from(histogram: Histogram) -> Self {
        Self {
            data_type: histogram.data_type,
            sample_rate: histogram.sample_rate,
            num_buckets: histogram.buckets.len(),
            buckets: histogram.buckets,
            collected_at: histogram.collected_at,
        }
    }
}
