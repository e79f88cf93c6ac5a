//! fdb-core: FAA radar track ingestion library.
//!
//! No async, no database: just the pipeline from delimited track rows to
//! assembled flights. `fdb-cli` layers storage and the command line on top.
//!
//! record → row → segment → assemble → ingest

pub mod analysis;
pub mod assemble;
pub mod callsign;
pub mod config;
pub mod flight;
pub mod ingest;
pub mod record;
pub mod row;
pub mod segment;
pub mod types;

// Re-export commonly used types at crate root
pub use analysis::{Analyser, NoopAnalyser, StandardAnalyser};
pub use assemble::{AssembledFlight, Assembler};
pub use callsign::{Callsign, CallsignKind};
pub use flight::{Airframe, Flight, Identity, Schedule};
pub use ingest::{Acceptance, CancelToken, FlightStream, IngestContext, IngestStats, Ingestor};
pub use record::{Record, RecordReader};
pub use row::same_flight;
pub use segment::{FlightBuffer, Segmenter};
pub use types::*;
