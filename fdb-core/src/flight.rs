//! Assembled flight records: identity, airframe, tracks, and tags.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::callsign::{Callsign, CallsignKind};
use crate::types::Track;

/// Scheduling data, where we have any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// ICAO carrier prefix (3 chars), from the callsign.
    pub icao: Option<String>,
    pub number: Option<u32>,
    pub origin: String,
    pub destination: String,
}

impl Schedule {
    pub fn icao_flight(&self) -> Option<String> {
        match (&self.icao, self.number) {
            (Some(icao), Some(n)) => Some(format!("{icao}{n}")),
            _ => None,
        }
    }
}

/// Who a flight is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Raw callsign, exactly as found in the source row.
    pub callsign: String,
    pub schedule: Schedule,
    /// Source-assigned identifiers, keyed by source name (e.g. `FAA`).
    pub foreign_keys: BTreeMap<String, String>,
    pub parsed_callsign: Option<Callsign>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Airframe {
    pub equipment_type: String,
    pub registration: Option<String>,
    /// FAA user class (`C`ommercial, `O`ther, `G`eneral), newer files only.
    pub user_class: Option<String>,
}

/// Time spent building a flight. Not part of a flight's content.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FlightTiming {
    /// From the buffer's first row being read to assembly finishing.
    pub load: Duration,
    pub analyse: Duration,
}

/// A flight assembled from one contiguous run of rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flight {
    pub identity: Identity,
    pub airframe: Airframe,
    pub tracks: BTreeMap<String, Track>,
    /// Tag name → number of times set.
    pub tags: BTreeMap<String, u32>,
    pub debug_log: String,
    #[serde(skip)]
    pub timing: FlightTiming,
}

impl PartialEq for Flight {
    /// Content equality; timing and the debug log (which records timing) are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
            && self.airframe == other.airframe
            && self.tracks == other.tracks
            && self.tags == other.tags
    }
}

impl Flight {
    pub fn new(identity: Identity, airframe: Airframe) -> Self {
        Flight {
            identity,
            airframe,
            ..Default::default()
        }
    }

    pub fn set_tag(&mut self, tag: &str) {
        *self.tags.entry(tag.to_string()).or_insert(0) += 1;
    }

    pub fn drop_tag(&mut self, tag: &str) {
        self.tags.remove(tag);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    /// Sorted tag names.
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags.keys().map(String::as_str).collect()
    }

    pub fn track(&self, name: &str) -> Option<&Track> {
        self.tracks.get(name)
    }

    /// Earliest start and latest end across all tracks.
    pub fn times(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.tracks
            .values()
            .filter_map(Track::times)
            .reduce(|(s1, e1), (s2, e2)| (s1.min(s2), e1.max(e2)))
    }

    /// Parse the raw callsign and copy what it tells us into identity and airframe.
    pub fn parse_callsign(&mut self) -> CallsignKind {
        let cs = Callsign::parse(&self.identity.callsign);
        match cs.kind {
            CallsignKind::Registration => {
                self.airframe.registration = cs.registration.clone();
            }
            CallsignKind::IcaoFlightNumber => {
                self.identity.schedule.icao = cs.icao_prefix.clone();
                self.identity.schedule.number = cs.number;
            }
            CallsignKind::BareFlightNumber => {
                self.identity.schedule.number = cs.number;
            }
            CallsignKind::Junk => {}
        }
        let kind = cs.kind;
        self.identity.parsed_callsign = Some(cs);
        kind
    }

    /// Short human label, e.g. `QXE17 [EUG-SJC] FAA:2016...`.
    pub fn ident_string(&self) -> String {
        let id = &self.identity;
        let mut s = id
            .schedule
            .icao_flight()
            .unwrap_or_else(|| id.callsign.clone());
        if !id.schedule.origin.is_empty() || !id.schedule.destination.is_empty() {
            s += &format!(" [{}-{}]", id.schedule.origin, id.schedule.destination);
        }
        for (k, v) in &id.foreign_keys {
            s += &format!(" {k}:{v}");
        }
        s
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
