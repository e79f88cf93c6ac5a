//! Ingestion driver: decode → segment → assemble over a whole input.
//!
//! Two shapes over the same pipeline:
//! - `Ingestor::flights()` returns a `FlightStream`, a lazy iterator of
//!   assembled flights the caller pulls from.
//! - `Ingestor::ingest()` pushes each flight into a consumer closure that
//!   accepts or rejects it, and keeps run statistics in an `IngestContext`.
//!
//! Structural errors (bad row shape, I/O, consumer failure, cancellation)
//! end the run. Whatever was counted before the failure stays in the context.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::analysis::{Analyser, StandardAnalyser};
use crate::assemble::{AssembledFlight, Assembler};
use crate::config::SourceConfig;
use crate::flight::Flight;
use crate::record::RecordReader;
use crate::segment::{FlightBuffer, Segmenter};
use crate::types::{BoxError, FdbError, Result};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared flag checked once per row. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub rows_read: u64,
    /// Flights assembled and offered to the consumer.
    pub flights_proposed: u64,
    pub flights_accepted: u64,
    pub degraded_fields: u64,
}

/// Mutable accumulation state for one or more ingestion runs.
#[derive(Debug, Clone, Default)]
pub struct IngestContext {
    pub stats: IngestStats,
    pub summary: String,
    pub cancel: CancelToken,
}

impl IngestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(cancel: CancelToken) -> Self {
        IngestContext {
            cancel,
            ..Default::default()
        }
    }
}

/// A consumer's verdict on one flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acceptance {
    pub accepted: bool,
    /// Appended to the run summary when non-empty.
    pub note: String,
}

impl Acceptance {
    pub fn accept(note: impl Into<String>) -> Self {
        Acceptance {
            accepted: true,
            note: note.into(),
        }
    }

    pub fn reject(note: impl Into<String>) -> Self {
        Acceptance {
            accepted: false,
            note: note.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pull shape
// ---------------------------------------------------------------------------

/// Lazy sequence of assembled flights from one input.
///
/// Yields at most one `Err`, after which it is exhausted. A cancelled or
/// failed stream never flushes its partial buffer.
pub struct FlightStream<'a, R: Read, A> {
    name: String,
    records: RecordReader<R>,
    segmenter: Segmenter,
    assembler: &'a Assembler<A>,
    cancel: CancelToken,
    flights_proposed: u64,
    degraded_fields: u64,
    done: bool,
}

impl<R: Read, A: Analyser> FlightStream<'_, R, A> {
    pub fn rows_read(&self) -> u64 {
        self.records.rows_read()
    }

    /// Flights yielded so far.
    pub fn flights_proposed(&self) -> u64 {
        self.flights_proposed
    }

    pub fn degraded_fields(&self) -> u64 {
        self.degraded_fields
    }

    /// Counts so far. Acceptance is the consumer's business, so
    /// `flights_accepted` is always zero here.
    pub fn stats(&self) -> IngestStats {
        IngestStats {
            rows_read: self.rows_read(),
            flights_proposed: self.flights_proposed,
            flights_accepted: 0,
            degraded_fields: self.degraded_fields,
        }
    }

    fn flush(&mut self, buffer: FlightBuffer) -> Result<AssembledFlight> {
        match self.assembler.assemble(&self.name, buffer) {
            Ok(out) => {
                self.flights_proposed += 1;
                self.degraded_fields += u64::from(out.degraded_fields);
                Ok(out)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    fn abort(&mut self, err: FdbError) -> Option<Result<AssembledFlight>> {
        self.done = true;
        let dropped = self.segmenter.discard();
        warn!(
            "{}: stopping after {} rows ({dropped} buffered rows dropped): {err}",
            self.name,
            self.rows_read()
        );
        Some(Err(err))
    }
}

impl<R: Read, A: Analyser> Iterator for FlightStream<'_, R, A> {
    type Item = Result<AssembledFlight>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            if self.cancel.is_cancelled() {
                return self.abort(FdbError::Cancelled);
            }
            match self.records.next() {
                Some(Ok(record)) => {
                    if let Some(buffer) = self.segmenter.push(record) {
                        return Some(self.flush(buffer));
                    }
                }
                Some(Err(e)) => return self.abort(e),
                None => {
                    self.done = true;
                    return self.segmenter.finish().map(|buffer| self.flush(buffer));
                }
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Turns track files into flights.
pub struct Ingestor<A = StandardAnalyser> {
    assembler: Assembler<A>,
}

impl Ingestor<StandardAnalyser> {
    pub fn new(source: SourceConfig) -> Self {
        Self::with_analyser(source, StandardAnalyser)
    }
}

impl<A: Analyser> Ingestor<A> {
    pub fn with_analyser(source: SourceConfig, analyser: A) -> Self {
        Ingestor {
            assembler: Assembler::new(source, analyser),
        }
    }

    /// Pull-style: iterate assembled flights from `reader`.
    pub fn flights<R: Read>(
        &self,
        name: &str,
        reader: R,
        cancel: CancelToken,
    ) -> FlightStream<'_, R, A> {
        FlightStream {
            name: name.to_string(),
            records: RecordReader::with_delimiter(reader, self.assembler.source().delimiter),
            segmenter: Segmenter::new(),
            assembler: &self.assembler,
            cancel,
            flights_proposed: 0,
            degraded_fields: 0,
            done: false,
        }
    }

    /// Push-style: offer every flight to `on_flight`, recording results in `ctx`.
    ///
    /// Returns the number of flights accepted in this run. On error, `ctx`
    /// still holds the counts and summary text up to the failure.
    pub fn ingest<R, F>(
        &self,
        ctx: &mut IngestContext,
        name: &str,
        reader: R,
        mut on_flight: F,
    ) -> Result<usize>
    where
        R: Read,
        F: FnMut(Flight) -> std::result::Result<Acceptance, BoxError>,
    {
        info!("{name}: ingesting");
        let base = ctx.stats;
        let mut accepted = 0usize;
        let mut notes = String::new();
        let mut stream = self.flights(name, reader, ctx.cancel.clone());

        let outcome = loop {
            let item = stream.next();
            let run = stream.stats();
            ctx.stats = IngestStats {
                rows_read: base.rows_read + run.rows_read,
                flights_proposed: base.flights_proposed + run.flights_proposed,
                flights_accepted: base.flights_accepted + accepted as u64,
                degraded_fields: base.degraded_fields + run.degraded_fields,
            };

            let assembled = match item {
                Some(Ok(assembled)) => assembled,
                Some(Err(e)) => break Err(e),
                None => break Ok(()),
            };

            let label = assembled.label;
            match on_flight(assembled.flight) {
                Ok(verdict) => {
                    if verdict.accepted {
                        accepted += 1;
                        ctx.stats.flights_accepted += 1;
                    }
                    if !verdict.note.is_empty() {
                        notes.push_str(&format!("{label}: {}", verdict.note));
                        if !verdict.note.ends_with('\n') {
                            notes.push('\n');
                        }
                    }
                }
                Err(e) => {
                    warn!("{label}: consumer failed: {e}");
                    break Err(FdbError::Consumer(e));
                }
            }
        };

        let mut run_summary = format!("---- Flights loaded from {name}\n");
        if outcome.is_ok() {
            run_summary = format!(
                "---- File read, {} rows, {accepted} flights accepted, {} flights proposed\n{run_summary}",
                stream.rows_read(),
                stream.flights_proposed(),
            );
            info!(
                "{name}: {} rows, {accepted}/{} flights accepted",
                stream.rows_read(),
                stream.flights_proposed()
            );
        }
        run_summary.push_str(&notes);
        ctx.summary.push_str(&run_summary);

        outcome.map(|()| accepted)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
