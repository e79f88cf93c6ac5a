//! Flight assembly: turn a completed row buffer into a `Flight`.

use std::time::Instant;

use log::debug;

use crate::analysis::Analyser;
use crate::config::SourceConfig;
use crate::flight::{Flight, FlightTiming};
use crate::segment::FlightBuffer;
use crate::types::{FdbError, Result, Track};

/// A flight fresh off the assembler, with where it came from.
#[derive(Debug, Clone)]
pub struct AssembledFlight {
    pub flight: Flight,
    /// `name:first-last` data-row range in the source.
    pub label: String,
    pub rows: usize,
    /// Fields that failed to parse and were zeroed.
    pub degraded_fields: u32,
}

/// Builds flights from buffers, then runs the analysis hook on each.
pub struct Assembler<A> {
    source: SourceConfig,
    analyser: A,
}

impl<A: Analyser> Assembler<A> {
    pub fn new(source: SourceConfig, analyser: A) -> Self {
        Assembler { source, analyser }
    }

    pub fn source(&self) -> &SourceConfig {
        &self.source
    }

    /// Assemble one flight. `name` identifies the input for provenance labels.
    pub fn assemble(&self, name: &str, buffer: FlightBuffer) -> Result<AssembledFlight> {
        let Some(seed) = buffer.records.first() else {
            return Err(FdbError::EmptyBuffer);
        };

        let label = buffer.label(name);
        let (byte_start, byte_end) = buffer.byte_range();

        let mut degraded_fields = 0;
        let mut track = Track(Vec::with_capacity(buffer.len()));
        for record in &buffer.records {
            let (tp, degraded) = record.to_trackpoint_counted(&self.source.data_source);
            degraded_fields += degraded;
            track.0.push(tp);
        }
        track.sort_by_time();

        let mut flight = seed.to_flight_skeleton();
        flight.tracks.insert(self.source.key.clone(), track);
        flight.set_tag(&self.source.key);

        let analyse_start = Instant::now();
        self.analyser.analyse(&mut flight);
        let analyse = analyse_start.elapsed();

        flight.debug_log.push_str(&format!(
            "Genesis: {label} (bytes {byte_start}-{byte_end})\n"
        ));
        if degraded_fields > 0 {
            flight
                .debug_log
                .push_str(&format!("** {degraded_fields} unparseable fields zeroed\n"));
        }

        let load = buffer.started.elapsed();
        flight.debug_log.push_str(&format!(
            "** full load+parse: {}ms (analyse: {}ms)\n",
            load.as_millis(),
            analyse.as_millis()
        ));
        flight.timing = FlightTiming { load, analyse };

        debug!(
            "assembled {label}: {} ({} points)",
            flight.ident_string(),
            buffer.len()
        );

        Ok(AssembledFlight {
            flight,
            label,
            rows: buffer.len(),
            degraded_fields,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
