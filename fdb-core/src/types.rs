//! Shared types, error enum, and track types for fdb-core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type returned by consumers handed assembled flights.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// All errors produced by fdb-core.
#[derive(Debug, Error)]
pub enum FdbError {
    #[error("row {row}: header/value mismatch (expected {expected} fields, got {actual})")]
    MalformedRow {
        row: u64,
        expected: usize,
        actual: usize,
    },
    #[error("CSV decode error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("consumer failed: {0}")]
    Consumer(#[source] BoxError),
    #[error("ingestion cancelled")]
    Cancelled,
    #[error("cannot assemble a flight from an empty buffer")]
    EmptyBuffer,
}

pub type Result<T> = std::result::Result<T, FdbError>;

// ---------------------------------------------------------------------------
// Trackpoints
// ---------------------------------------------------------------------------

/// A single timestamped position report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trackpoint {
    /// Where this point came from, e.g. `EB-FOIA`.
    pub data_source: String,
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    /// Pressure altitude in feet.
    pub altitude_ft: f64,
    pub squawk: String,
}

/// An ordered run of trackpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track(pub Vec<Trackpoint>);

impl Track {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn points(&self) -> &[Trackpoint] {
        &self.0
    }

    /// Sort ascending by timestamp. Stable: equal timestamps keep row order.
    pub fn sort_by_time(&mut self) {
        self.0.sort_by_key(|tp| tp.timestamp);
    }

    /// First and last timestamps, assuming the track is sorted.
    pub fn times(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.0.first()?;
        let last = self.0.last()?;
        Some((first.timestamp, last.timestamp))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tp(secs: i64, squawk: &str) -> Trackpoint {
        Trackpoint {
            data_source: "EB-FOIA".into(),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            lat: 37.0,
            lon: -122.0,
            altitude_ft: 300.0,
            squawk: squawk.into(),
        }
    }

    #[test]
    fn test_sort_by_time() {
        let mut track = Track(vec![tp(30, "a"), tp(10, "b"), tp(20, "c")]);
        track.sort_by_time();
        let order: Vec<_> = track.points().iter().map(|p| p.squawk.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut track = Track(vec![tp(20, "first"), tp(10, "x"), tp(20, "second")]);
        track.sort_by_time();
        let order: Vec<_> = track.points().iter().map(|p| p.squawk.as_str()).collect();
        assert_eq!(order, vec!["x", "first", "second"]);
    }

    #[test]
    fn test_times() {
        assert!(Track::default().times().is_none());
        let track = Track(vec![tp(10, "a"), tp(40, "b")]);
        let (s, e) = track.times().unwrap();
        assert_eq!(s.timestamp(), 10);
        assert_eq!(e.timestamp(), 40);
    }

    #[test]
    fn test_malformed_row_message() {
        let err = FdbError::MalformedRow {
            row: 3,
            expected: 13,
            actual: 12,
        };
        assert_eq!(
            err.to_string(),
            "row 3: header/value mismatch (expected 13 fields, got 12)"
        );
    }
}
