//! Callsign classification.
//!
//! Callsigns seen in radar data come in a few shapes:
//! - ICAO flight numbers (`SWA3848`), sometimes with a TRACON suffix letter (`SKW750R`)
//! - US registrations used by private aircraft (`N839AL`)
//! - bare flight numbers with the carrier prefix missing (`1106`)
//! - junk (empty strings, `????????`, equipment types)

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// What kind of identifier a callsign turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallsignKind {
    Junk,
    Registration,
    IcaoFlightNumber,
    BareFlightNumber,
}

impl fmt::Display for CallsignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallsignKind::Junk => write!(f, "junk"),
            CallsignKind::Registration => write!(f, "registration"),
            CallsignKind::IcaoFlightNumber => write!(f, "icao-flight-number"),
            CallsignKind::BareFlightNumber => write!(f, "bare-flight-number"),
        }
    }
}

/// A parsed callsign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callsign {
    pub raw: String,
    pub kind: CallsignKind,
    pub registration: Option<String>,
    pub icao_prefix: Option<String>,
    pub atc_suffix: Option<String>,
    pub number: Option<u32>,
}

// N-numbers: one to five characters after the N, first digit non-zero,
// letters I and O never used.
fn registration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^N[1-9][0-9A-HJ-NP-Z]{0,4}$").unwrap())
}

fn icao_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([A-Z]{3})([0-9]{1,4})([A-Z]?)$").unwrap())
}

fn bare_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{2,4}$").unwrap())
}

impl Callsign {
    /// Classify a raw callsign string. Never fails; unrecognised input is `Junk`.
    pub fn parse(raw: &str) -> Self {
        let mut cs = Callsign {
            raw: raw.to_string(),
            kind: CallsignKind::Junk,
            registration: None,
            icao_prefix: None,
            atc_suffix: None,
            number: None,
        };

        if registration_pattern().is_match(raw) {
            cs.kind = CallsignKind::Registration;
            cs.registration = Some(raw.to_string());
        } else if let Some(caps) = icao_pattern().captures(raw) {
            cs.kind = CallsignKind::IcaoFlightNumber;
            cs.icao_prefix = Some(caps[1].to_string());
            // At most four digits, always fits
            cs.number = caps[2].parse().ok();
            if !caps[3].is_empty() {
                cs.atc_suffix = Some(caps[3].to_string());
            }
        } else if bare_pattern().is_match(raw) {
            cs.kind = CallsignKind::BareFlightNumber;
            cs.number = raw.parse().ok();
        }

        cs
    }

    pub fn is_airline(&self) -> bool {
        matches!(
            self.kind,
            CallsignKind::IcaoFlightNumber | CallsignKind::BareFlightNumber
        )
    }
}

impl fmt::Display for Callsign {
    /// ICAO flight numbers are normalised (zero padding and ATC suffix dropped);
    /// everything else prints raw.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.icao_prefix, self.number) {
            (CallsignKind::IcaoFlightNumber, Some(prefix), Some(number)) => {
                write!(f, "{prefix}{number}")
            }
            _ => write!(f, "{}", self.raw),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        let cases = [
            ("", "", CallsignKind::Junk),
            ("-.-.-.-.", "-.-.-.-.", CallsignKind::Junk),
            ("N761QA", "N761QA", CallsignKind::Registration),
            ("UAL100", "UAL100", CallsignKind::IcaoFlightNumber),
            ("987", "987", CallsignKind::BareFlightNumber),
            ("VRD010", "VRD10", CallsignKind::IcaoFlightNumber),
            ("SKW750R", "SKW750", CallsignKind::IcaoFlightNumber),
        ];
        for (raw, normalized, kind) in cases {
            let cs = Callsign::parse(raw);
            assert_eq!(cs.kind, kind, "{raw:?}");
            assert_eq!(cs.to_string(), normalized, "{raw:?}");
        }
    }

    #[test]
    fn test_icao_fields() {
        let cs = Callsign::parse("QXE17");
        assert_eq!(cs.icao_prefix.as_deref(), Some("QXE"));
        assert_eq!(cs.number, Some(17));
        assert!(cs.atc_suffix.is_none());
        assert!(cs.is_airline());

        let cs = Callsign::parse("SKW750R");
        assert_eq!(cs.atc_suffix.as_deref(), Some("R"));
    }

    #[test]
    fn test_registration_rules() {
        // Leading zero and the letter O are not valid in N-numbers
        assert_eq!(Callsign::parse("N0123").kind, CallsignKind::Junk);
        assert_eq!(Callsign::parse("N12O").kind, CallsignKind::Junk);
        let cs = Callsign::parse("N839AL");
        assert_eq!(cs.registration.as_deref(), Some("N839AL"));
        assert!(!cs.is_airline());
    }

    #[test]
    fn test_bare_number_bounds() {
        assert_eq!(Callsign::parse("7").kind, CallsignKind::Junk);
        assert_eq!(Callsign::parse("4517").number, Some(4517));
        assert_eq!(Callsign::parse("45170").kind, CallsignKind::Junk);
    }
}
