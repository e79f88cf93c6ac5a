//! Aggregate statistics over a set of ingested flights, for `fdb summary`.

use std::collections::BTreeMap;

use comfy_table::{Cell, Table};

use fdb_core::Flight;

/// Airport tags counted in the report.
pub const AIRPORT_TAGS: &[&str] = &[":SFO", "SFO:", ":SJC", "SJC:", ":OAK", "OAK:"];

/// Counts below this are lumped into `{smalls}`.
const SMALL_COUNT: u64 = 10;
const SMALLS: &str = "{smalls}";

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    fn point(lat: f64, lon: f64) -> Self {
        BoundingBox {
            min_lat: lat,
            max_lat: lat,
            min_lon: lon,
            max_lon: lon,
        }
    }

    fn enclose(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
    }

    /// Width along the northern edge and height along the western edge, in km.
    pub fn size_km(&self) -> (f64, f64) {
        let width = haversine_km(self.max_lat, self.min_lon, self.max_lat, self.max_lon);
        let height = haversine_km(self.max_lat, self.min_lon, self.min_lat, self.min_lon);
        (width, height)
    }
}

fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dp = (lat2 - lat1).to_radians();
    let dl = (lon2 - lon1).to_radians();
    let a = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Running totals across every flight seen.
#[derive(Debug, Default)]
pub struct Summary {
    pub flights: u64,
    pub airports: BTreeMap<String, u64>,
    pub carriers: BTreeMap<String, u64>,
    pub track_min: Option<usize>,
    pub track_max: usize,
    pub track_total: usize,
    pub bbox: Option<BoundingBox>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one flight in. `track` names the track to measure.
    pub fn add(&mut self, flight: &Flight, track: &str) {
        self.flights += 1;

        for tag in AIRPORT_TAGS {
            if flight.has_tag(tag) {
                *self.airports.entry(tag.to_string()).or_default() += 1;
            }
        }

        let carrier = flight.identity.schedule.icao.clone().unwrap_or_default();
        *self.carriers.entry(carrier).or_default() += 1;

        let Some(t) = flight.track(track) else {
            return;
        };
        let n = t.len();
        self.track_min = Some(self.track_min.map_or(n, |m| m.min(n)));
        self.track_max = self.track_max.max(n);
        self.track_total += n;

        for tp in t.points() {
            match self.bbox.as_mut() {
                Some(b) => b.enclose(tp.lat, tp.lon),
                None => self.bbox = Some(BoundingBox::point(tp.lat, tp.lon)),
            }
        }
    }

    pub fn track_mean(&self) -> f64 {
        if self.flights == 0 {
            0.0
        } else {
            self.track_total as f64 / self.flights as f64
        }
    }

    /// Render the report tables.
    pub fn render(&self) -> String {
        let mut out = format!("Flights: {}\n", self.flights);

        if let Some(b) = &self.bbox {
            let (w, h) = b.size_km();
            out.push_str(&format!(
                "Area ({w:.1}KM x {h:.1}KM) : [{:.4},{:.4}] - [{:.4},{:.4}]\n",
                b.max_lat, b.min_lon, b.min_lat, b.max_lon
            ));
        }

        out.push_str(&format!(
            "Track length: min {}, mean {:.1}, max {}\n",
            self.track_min.unwrap_or(0),
            self.track_mean(),
            self.track_max
        ));

        out.push_str("\nAirports:\n");
        out.push_str(&count_table("Tag", &fold_smalls(&self.airports)).to_string());
        out.push_str("\n\nICAO codes:\n");
        out.push_str(&count_table("ICAO", &fold_smalls(&self.carriers)).to_string());
        out.push('\n');
        out
    }
}

/// Drop entries under the threshold, summing them under `{smalls}`.
pub fn fold_smalls(counts: &BTreeMap<String, u64>) -> Vec<(String, u64)> {
    let mut small = 0;
    let mut out = Vec::new();
    for (k, &v) in counts {
        if v < SMALL_COUNT {
            small += v;
        } else {
            out.push((k.clone(), v));
        }
    }
    if small > 0 {
        out.push((SMALLS.to_string(), small));
    }
    out
}

fn count_table(label: &str, rows: &[(String, u64)]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![label, "Count"]);
    for (k, v) in rows {
        table.add_row(vec![Cell::new(k), Cell::new(v)]);
    }
    table
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
