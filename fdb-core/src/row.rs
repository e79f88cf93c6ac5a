//! Row translation: FAA track rows → trackpoints and flight skeletons.
//!
//! Typical rows (older vintage, no `USER_CLASS`):
//!
//! ```text
//! AIRCRAFT_ID,FLIGHT_INDEX,TRACK_INDEX,SOURCE_FACILITY,BEACON_CODE,DEP_APRT,ARR_APRT,ACFT_TYPE,LATITUDE,LONGITUDE,ALTITUDEx100ft,TRACK_POINT_DATE_UTC,TRACK_POINT_TIME_UTC
//! VOI902,2015020103105708,20150201065937NCT1024VOI902,NCT,1024,MMGL,OAK,A320,37.69849,-122.21049,1,20150201,07:24:04
//! ```
//!
//! Translation never fails: a numeric or time field that does not parse
//! becomes zero and is counted as degraded. Numbers are trimmed first, so
//! padded values like `" 1 "` still parse.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::debug;

use crate::flight::{Airframe, Flight, Identity, Schedule};
use crate::record::Record;
use crate::types::Trackpoint;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const COL_AIRCRAFT_ID: &str = "AIRCRAFT_ID";
pub const COL_FLIGHT_INDEX: &str = "FLIGHT_INDEX";
pub const COL_TRACK_INDEX: &str = "TRACK_INDEX";
pub const COL_SOURCE_FACILITY: &str = "SOURCE_FACILITY";
pub const COL_BEACON_CODE: &str = "BEACON_CODE";
pub const COL_DEP_APRT: &str = "DEP_APRT";
pub const COL_ARR_APRT: &str = "ARR_APRT";
pub const COL_ACFT_TYPE: &str = "ACFT_TYPE";
pub const COL_USER_CLASS: &str = "USER_CLASS";
pub const COL_LATITUDE: &str = "LATITUDE";
pub const COL_LONGITUDE: &str = "LONGITUDE";
pub const COL_ALTITUDE: &str = "ALTITUDEx100ft";
pub const COL_DATE: &str = "TRACK_POINT_DATE_UTC";
pub const COL_TIME: &str = "TRACK_POINT_TIME_UTC";

/// Foreign-key name under which the per-row track index is kept.
pub const FOREIGN_KEY_FAA: &str = "FAA";

const TIMESTAMP_FORMAT: &str = "%Y%m%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

impl Record {
    /// Build a trackpoint; unparseable fields become zero.
    pub fn to_trackpoint(&self, data_source: &str) -> Trackpoint {
        self.to_trackpoint_counted(data_source).0
    }

    /// Build a trackpoint and report how many fields had to be zeroed.
    pub fn to_trackpoint_counted(&self, data_source: &str) -> (Trackpoint, u32) {
        let mut degraded = 0;

        let lat = self.float_or_zero(COL_LATITUDE, &mut degraded);
        let lon = self.float_or_zero(COL_LONGITUDE, &mut degraded);
        let alt = self.float_or_zero(COL_ALTITUDE, &mut degraded);

        let stamp = format!("{} {}", self.field(COL_DATE), self.field(COL_TIME));
        let timestamp = match NaiveDateTime::parse_from_str(&stamp, TIMESTAMP_FORMAT) {
            Ok(t) => Utc.from_utc_datetime(&t),
            Err(e) => {
                debug!("row {}: bad timestamp {stamp:?}: {e}", self.row());
                degraded += 1;
                DateTime::<Utc>::default()
            }
        };

        let tp = Trackpoint {
            data_source: data_source.to_string(),
            timestamp,
            lat,
            lon,
            altitude_ft: alt * 100.0,
            squawk: self.field(COL_BEACON_CODE).to_string(),
        };
        (tp, degraded)
    }

    /// Build the identity/airframe part of a flight from this row.
    ///
    /// Only meaningful on the first row of a flight; tracks and tags are
    /// left empty for the assembler.
    pub fn to_flight_skeleton(&self) -> Flight {
        let identity = Identity {
            callsign: self.field(COL_AIRCRAFT_ID).to_string(),
            schedule: Schedule {
                origin: self.field(COL_DEP_APRT).to_string(),
                destination: self.field(COL_ARR_APRT).to_string(),
                ..Default::default()
            },
            foreign_keys: [(
                FOREIGN_KEY_FAA.to_string(),
                self.field(COL_TRACK_INDEX).to_string(),
            )]
            .into_iter()
            .collect(),
            parsed_callsign: None,
        };
        let airframe = Airframe {
            equipment_type: self.field(COL_ACFT_TYPE).to_string(),
            registration: None,
            user_class: self
                .get(COL_USER_CLASS)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        };

        let mut f = Flight::new(identity, airframe);
        f.parse_callsign();
        f
    }

    fn float_or_zero(&self, column: &str, degraded: &mut u32) -> f64 {
        let raw = self.field(column);
        match raw.trim().parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                debug!("row {}: bad {column} {raw:?}, using 0", self.row());
                *degraded += 1;
                0.0
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Continuity
// ---------------------------------------------------------------------------

/// Whether two rows belong to the same flight.
///
/// The callsign alone is not enough: the same flight number can show up on
/// consecutive rows for distinct flights, e.g.
///
/// ```text
/// QXE17,2016051028797150,20160510235032NCT6624QXE17,NCT,6624,EUG,SJC,DH8D,...,20160511,00:41:04
/// QXE17,2016051028735155,20160510011647NCT4514QXE17,NCT,4514,SJC,RNO,DH8D,...,20160510,01:16:47
/// ```
///
/// so the FAA's `FLIGHT_INDEX` has to match too.
pub fn same_flight(a: &Record, b: &Record) -> bool {
    a.field(COL_AIRCRAFT_ID) == b.field(COL_AIRCRAFT_ID)
        && a.field(COL_FLIGHT_INDEX) == b.field(COL_FLIGHT_INDEX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
