//! Flight segmentation: group contiguous same-flight rows into buffers.
//!
//! Continuity is always tested against the buffer's *first* row, never the
//! previous one. Pure state machine: feed rows with `push()`, get back
//! completed buffers to assemble.

use std::time::Instant;

use crate::record::Record;
use crate::row::same_flight;

/// A completed run of rows believed to be one flight.
#[derive(Debug)]
pub struct FlightBuffer {
    pub records: Vec<Record>,
    /// When the first row of this buffer was read.
    pub started: Instant,
}

impl FlightBuffer {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Data-row numbers of the first and last rows, inclusive.
    pub fn row_range(&self) -> (u64, u64) {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => (first.row(), last.row()),
            _ => (0, 0),
        }
    }

    /// Byte offsets of the first and last rows.
    pub fn byte_range(&self) -> (u64, u64) {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => (first.byte_offset(), last.byte_offset()),
            _ => (0, 0),
        }
    }

    /// `name:first-last`, used in summaries and debug logs.
    pub fn label(&self, name: &str) -> String {
        let (first, last) = self.row_range();
        format!("{name}:{first}-{last}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    Empty,
    /// Holding this many rows.
    Accumulating(usize),
}

/// Splits a row sequence into per-flight buffers.
pub struct Segmenter {
    records: Vec<Record>,
    started: Instant,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter {
    pub fn new() -> Self {
        Segmenter {
            records: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> SegmenterState {
        if self.records.is_empty() {
            SegmenterState::Empty
        } else {
            SegmenterState::Accumulating(self.records.len())
        }
    }

    /// Add a row. Returns the previous buffer if this row starts a new flight.
    pub fn push(&mut self, record: Record) -> Option<FlightBuffer> {
        let new_flight = self
            .records
            .first()
            .is_some_and(|seed| !same_flight(seed, &record));
        let flushed = if new_flight { self.take() } else { None };
        if self.records.is_empty() {
            self.started = Instant::now();
        }
        self.records.push(record);
        flushed
    }

    /// End of input: hand over whatever is buffered.
    pub fn finish(&mut self) -> Option<FlightBuffer> {
        self.take()
    }

    /// Drop the partial buffer without flushing it.
    pub fn discard(&mut self) -> usize {
        let n = self.records.len();
        self.records.clear();
        n
    }

    fn take(&mut self) -> Option<FlightBuffer> {
        if self.records.is_empty() {
            return None;
        }
        Some(FlightBuffer {
            records: std::mem::take(&mut self.records),
            started: self.started,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordReader;

    fn records(data: &str) -> Vec<Record> {
        RecordReader::new(data.as_bytes())
            .collect::<crate::types::Result<Vec<_>>>()
            .unwrap()
    }

    fn sizes(data: &str) -> Vec<usize> {
        let mut seg = Segmenter::new();
        let mut out = Vec::new();
        for r in records(data) {
            if let Some(buf) = seg.push(r) {
                out.push(buf.len());
            }
        }
        if let Some(buf) = seg.finish() {
            out.push(buf.len());
        }
        out
    }

    #[test]
    fn test_state_transitions() {
        let rows = records("AIRCRAFT_ID,FLIGHT_INDEX\nA,1\nA,1\nB,2\n");
        let mut seg = Segmenter::new();
        assert_eq!(seg.state(), SegmenterState::Empty);

        let mut it = rows.into_iter();
        assert!(seg.push(it.next().unwrap()).is_none());
        assert_eq!(seg.state(), SegmenterState::Accumulating(1));
        assert!(seg.push(it.next().unwrap()).is_none());
        assert_eq!(seg.state(), SegmenterState::Accumulating(2));

        let flushed = seg.push(it.next().unwrap()).expect("key change flushes");
        assert_eq!(flushed.len(), 2);
        assert_eq!(flushed.row_range(), (1, 2));
        // Triggering row seeds the next buffer
        assert_eq!(seg.state(), SegmenterState::Accumulating(1));

        let last = seg.finish().unwrap();
        assert_eq!(last.row_range(), (3, 3));
        assert_eq!(seg.state(), SegmenterState::Empty);
        assert!(seg.finish().is_none());
    }

    #[test]
    fn test_run_then_key_change() {
        let data = "AIRCRAFT_ID,FLIGHT_INDEX\nA,1\nA,1\nA,1\nA,1\nB,1\n";
        assert_eq!(sizes(data), vec![4, 1]);
    }

    #[test]
    fn test_same_callsign_new_index() {
        let data = "AIRCRAFT_ID,FLIGHT_INDEX\nQXE17,100\nQXE17,200\n";
        assert_eq!(sizes(data), vec![1, 1]);
    }

    #[test]
    fn test_non_contiguous_key_is_two_flights() {
        let data = "AIRCRAFT_ID,FLIGHT_INDEX\nA,1\nB,1\nA,1\n";
        assert_eq!(sizes(data), vec![1, 1, 1]);
    }

    #[test]
    fn test_compares_against_first_row_only() {
        // Every row matches the seed, so they stay together even though
        // the other columns drift.
        let data = "AIRCRAFT_ID,FLIGHT_INDEX,TRACK_INDEX\nA,1,x\nA,1,y\nA,1,z\n";
        assert_eq!(sizes(data), vec![3]);
    }

    #[test]
    fn test_no_rows_no_buffers() {
        assert!(sizes("AIRCRAFT_ID,FLIGHT_INDEX\n").is_empty());
    }

    #[test]
    fn test_discard() {
        let mut seg = Segmenter::new();
        for r in records("AIRCRAFT_ID,FLIGHT_INDEX\nA,1\nA,1\n") {
            seg.push(r);
        }
        assert_eq!(seg.discard(), 2);
        assert!(seg.finish().is_none());
    }

    #[test]
    fn test_label_and_bytes() {
        let mut seg = Segmenter::new();
        for r in records("AIRCRAFT_ID,FLIGHT_INDEX\nA,1\nA,1\n") {
            seg.push(r);
        }
        let buf = seg.finish().unwrap();
        assert_eq!(buf.label("file.csv"), "file.csv:1-2");
        let (b0, b1) = buf.byte_range();
        assert!(b0 < b1);
    }
}
