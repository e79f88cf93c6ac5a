//! Post-assembly flight analysis.
//!
//! An `Analyser` runs once per assembled flight, before the flight is handed
//! to the consumer. It may add tags and debug notes but cannot fail the
//! ingestion run.

use crate::callsign::CallsignKind;
use crate::flight::Flight;

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

pub const TAG_AIRLINE: &str = "AL";
pub const TAG_GENERAL_AVIATION: &str = "GA";

/// Airport groups that get combo tags (`STEM:`, `:STEM`, `:STEM:`).
///
/// FOIA data uses ICAO codes for non-US airports, so both forms appear.
const AIRPORT_GROUPS: &[(&str, &[&str])] = &[
    ("NORCAL", &["SFO", "SJC", "OAK"]),
    (
        "SW",
        &[
            "PHX", "TUS", "SBP", "LAX", "LGB", "BUR", "ONT", "SNA", "DCA", "SBA", "PSP", "SAN",
        ],
    ),
    (
        "OCEANIC",
        &[
            "LIH", "OGG", "HNL", "KOA", "NRT", "HND", "KIX", "PVG", "PEK", "CAN", "CTU", "WUH",
            "HKG", "TPE", "ICN", "MNL", "NHL", "SYD", "VRD", "AKL", "NZAA", "ZGGG", "ZUUU",
            "VHHH", "RJTT", "PHNL", "RKSI", "RJBB", "PHKO", "PHLI", "RPLL", "RJAA", "ZBAA",
            "PHOG", "ZSPD", "YSSY", "RCTP", "ZHHH",
        ],
    ),
];

// ---------------------------------------------------------------------------
// Analysers
// ---------------------------------------------------------------------------

/// Derives extra attributes for a freshly assembled flight.
pub trait Analyser {
    fn analyse(&self, flight: &mut Flight);
}

impl<F: Fn(&mut Flight)> Analyser for F {
    fn analyse(&self, flight: &mut Flight) {
        self(flight)
    }
}

/// Does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnalyser;

impl Analyser for NoopAnalyser {
    fn analyse(&self, _flight: &mut Flight) {}
}

/// Airline/GA classification plus origin/destination tagging.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAnalyser;

impl Analyser for StandardAnalyser {
    fn analyse(&self, f: &mut Flight) {
        f.debug_log.push_str("-- Analyse\n");

        let kind = f.parse_callsign();
        f.debug_log
            .push_str(&format!("callsign: [{}] ({kind})\n", f.identity.callsign));

        match kind {
            CallsignKind::IcaoFlightNumber | CallsignKind::BareFlightNumber => {
                f.drop_tag(TAG_GENERAL_AVIATION);
                f.set_tag(TAG_AIRLINE);
            }
            _ => {
                f.drop_tag(TAG_AIRLINE);
                f.set_tag(TAG_GENERAL_AVIATION);
            }
        }

        let origin = f.identity.schedule.origin.clone();
        let destination = f.identity.schedule.destination.clone();
        if !origin.is_empty() {
            f.set_tag(&format!("{origin}:"));
        }
        if !destination.is_empty() {
            f.set_tag(&format!(":{destination}"));
        }

        for (stem, airports) in AIRPORT_GROUPS {
            if airports.contains(&origin.as_str()) {
                f.set_tag(&format!("{stem}:"));
                f.set_tag(&format!(":{stem}:"));
            }
            if airports.contains(&destination.as_str()) {
                f.set_tag(&format!(":{stem}"));
                f.set_tag(&format!(":{stem}:"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::{Airframe, Identity, Schedule};

    fn flight(callsign: &str, origin: &str, destination: &str) -> Flight {
        Flight::new(
            Identity {
                callsign: callsign.into(),
                schedule: Schedule {
                    origin: origin.into(),
                    destination: destination.into(),
                    ..Default::default()
                },
                ..Default::default()
            },
            Airframe::default(),
        )
    }

    #[test]
    fn test_airline_tags() {
        let mut f = flight("UAL100", "ORD", "SFO");
        StandardAnalyser.analyse(&mut f);
        assert!(f.has_tag(TAG_AIRLINE));
        assert!(!f.has_tag(TAG_GENERAL_AVIATION));
        assert!(f.has_tag("ORD:"));
        assert!(f.has_tag(":SFO"));
        assert!(f.has_tag(":NORCAL"));
        assert!(f.has_tag(":NORCAL:"));
        assert!(!f.has_tag("NORCAL:"));
        assert_eq!(f.identity.schedule.icao.as_deref(), Some("UAL"));
        assert!(f.debug_log.contains("-- Analyse"));
    }

    #[test]
    fn test_bare_number_is_airline() {
        let mut f = flight("4517", "", "");
        StandardAnalyser.analyse(&mut f);
        assert!(f.has_tag(TAG_AIRLINE));
        assert_eq!(f.tag_list(), vec![TAG_AIRLINE]);
    }

    #[test]
    fn test_general_aviation() {
        let mut f = flight("N839AL", "PAO", "");
        f.set_tag(TAG_AIRLINE);
        StandardAnalyser.analyse(&mut f);
        assert!(f.has_tag(TAG_GENERAL_AVIATION));
        assert!(!f.has_tag(TAG_AIRLINE));
        assert!(f.has_tag("PAO:"));
    }

    #[test]
    fn test_oceanic_icao_codes() {
        let mut f = flight("ANZ7", "NZAA", "SFO");
        StandardAnalyser.analyse(&mut f);
        assert!(f.has_tag("OCEANIC:"));
        assert!(f.has_tag(":OCEANIC:"));
        assert!(f.has_tag(":NORCAL"));
    }

    #[test]
    fn test_closure_analyser() {
        let tagger = |f: &mut Flight| f.set_tag("SEEN");
        let mut f = flight("X", "", "");
        tagger.analyse(&mut f);
        assert!(f.has_tag("SEEN"));

        let mut g = flight("UAL1", "SFO", "LAX");
        NoopAnalyser.analyse(&mut g);
        assert!(g.tags.is_empty());
    }
}
