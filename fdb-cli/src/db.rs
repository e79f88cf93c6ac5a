//! SQLite flight store: WAL mode, 2 tables.
//!
//! Schema: flights, trackpoints. A flight is identified by its callsign, its
//! FAA track key and the time of its first trackpoint, which is what makes
//! re-ingesting the same file a no-op.

use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use fdb_core::row::FOREIGN_KEY_FAA;
use fdb_core::Flight;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS flights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    callsign TEXT NOT NULL,
    faa_key TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    end_time INTEGER NOT NULL,
    icao TEXT,
    number INTEGER,
    origin TEXT,
    destination TEXT,
    equipment_type TEXT,
    registration TEXT,
    user_class TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    debug_log TEXT,
    created_at REAL NOT NULL,
    UNIQUE (callsign, faa_key, start_time)
);

CREATE TABLE IF NOT EXISTS trackpoints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    flight_id INTEGER NOT NULL REFERENCES flights(id),
    track TEXT NOT NULL,
    data_source TEXT,
    timestamp INTEGER NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    altitude_ft REAL,
    squawk TEXT
);

CREATE INDEX IF NOT EXISTS idx_flights_callsign ON flights(callsign);
CREATE INDEX IF NOT EXISTS idx_flights_start ON flights(start_time);
CREATE INDEX IF NOT EXISTS idx_trackpoints_flight ON trackpoints(flight_id);
"#;

fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// What makes a stored flight unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightKey {
    pub callsign: String,
    pub faa_key: String,
    /// Unix seconds of the first trackpoint, 0 for a trackless flight.
    pub start_time: i64,
}

impl FlightKey {
    pub fn of(flight: &Flight) -> Self {
        FlightKey {
            callsign: flight.identity.callsign.clone(),
            faa_key: flight
                .identity
                .foreign_keys
                .get(FOREIGN_KEY_FAA)
                .cloned()
                .unwrap_or_default(),
            start_time: flight.times().map(|(s, _)| s.timestamp()).unwrap_or(0),
        }
    }
}

/// SQLite database of assembled flights.
pub struct FlightStore {
    conn: Connection,
}

impl FlightStore {
    /// Open or create a store at the given path.
    pub fn open(path: &str) -> SqlResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            // Ensure parent directory exists
            if let Some(parent) = Path::new(path).parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            Connection::open(path)?
        };

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(FlightStore { conn })
    }

    /// Open in-memory store (for testing).
    pub fn open_memory() -> SqlResult<Self> {
        Self::open(":memory:")
    }

    // -----------------------------------------------------------------------
    // Flights
    // -----------------------------------------------------------------------

    /// Id of an already-stored copy of this flight, if any.
    pub fn find_flight(&self, flight: &Flight) -> SqlResult<Option<i64>> {
        let key = FlightKey::of(flight);
        self.conn
            .query_row(
                "SELECT id FROM flights WHERE callsign = ?1 AND faa_key = ?2 AND start_time = ?3",
                params![key.callsign, key.faa_key, key.start_time],
                |r| r.get(0),
            )
            .optional()
    }

    /// Store a flight and all of its trackpoints in one transaction.
    /// Returns the new flight id.
    pub fn save_flight(&mut self, flight: &Flight) -> SqlResult<i64> {
        let key = FlightKey::of(flight);
        let end_time = flight.times().map(|(_, e)| e.timestamp()).unwrap_or(0);
        let tags = serde_json::to_string(&flight.tag_list())
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let schedule = &flight.identity.schedule;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO flights (callsign, faa_key, start_time, end_time, icao, number,
                                  origin, destination, equipment_type, registration,
                                  user_class, tags, debug_log, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                key.callsign,
                key.faa_key,
                key.start_time,
                end_time,
                schedule.icao,
                schedule.number,
                schedule.origin,
                schedule.destination,
                flight.airframe.equipment_type,
                flight.airframe.registration,
                flight.airframe.user_class,
                tags,
                flight.debug_log,
                now(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO trackpoints (flight_id, track, data_source, timestamp, lat, lon, altitude_ft, squawk)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (name, track) in &flight.tracks {
                for tp in track.points() {
                    stmt.execute(params![
                        id,
                        name,
                        tp.data_source,
                        tp.timestamp.timestamp(),
                        tp.lat,
                        tp.lon,
                        tp.altitude_ft,
                        tp.squawk,
                    ])?;
                }
            }
        }

        tx.commit()?;
        Ok(id)
    }

    pub fn get_flight(&self, id: i64) -> SqlResult<Option<FlightRow>> {
        self.conn
            .query_row(
                "SELECT id, callsign, faa_key, start_time, end_time, origin, destination, tags
                 FROM flights WHERE id = ?1",
                params![id],
                |r| {
                    let tags: String = r.get(7)?;
                    Ok(FlightRow {
                        id: r.get(0)?,
                        callsign: r.get(1)?,
                        faa_key: r.get(2)?,
                        start_time: r.get(3)?,
                        end_time: r.get(4)?,
                        origin: r.get(5)?,
                        destination: r.get(6)?,
                        tags: serde_json::from_str(&tags).unwrap_or_default(),
                    })
                },
            )
            .optional()
    }

    pub fn count_flights(&self) -> SqlResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM flights", [], |r| r.get(0))
    }

    // -----------------------------------------------------------------------
    // Trackpoints
    // -----------------------------------------------------------------------

    pub fn count_trackpoints(&self) -> SqlResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM trackpoints", [], |r| r.get(0))
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    pub fn stats(&self) -> SqlResult<StoreStats> {
        let (earliest, latest) = self.conn.query_row(
            "SELECT MIN(start_time), MAX(end_time) FROM flights",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok(StoreStats {
            flights: self.count_flights()?,
            trackpoints: self.count_trackpoints()?,
            earliest,
            latest,
        })
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightRow {
    pub id: i64,
    pub callsign: String,
    pub faa_key: String,
    pub start_time: i64,
    pub end_time: i64,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub flights: i64,
    pub trackpoints: i64,
    /// Unix seconds; `None` for an empty store.
    pub earliest: Option<i64>,
    pub latest: Option<i64>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use fdb_core::config::SourceConfig;
    use fdb_core::{Acceptance, IngestContext, Ingestor};

    const DAY: &str = "\
AIRCRAFT_ID,FLIGHT_INDEX,TRACK_INDEX,SOURCE_FACILITY,BEACON_CODE,DEP_APRT,ARR_APRT,ACFT_TYPE,LATITUDE,LONGITUDE,ALTITUDEx100ft,TRACK_POINT_DATE_UTC,TRACK_POINT_TIME_UTC
QXE17,100,T100,NCT,6624,EUG,SJC,DH8D,37.34841,-121.91391,3,20160511,00:40:59
QXE17,100,T100,NCT,6624,EUG,SJC,DH8D,37.35002,-121.91558,3,20160511,00:40:54
N761QA,7,T7,NCT,1200,PAO,,C172,37.46,-122.11,12,20160511,02:00:00
";

    fn flights() -> Vec<Flight> {
        let ingestor = Ingestor::new(SourceConfig::default());
        let mut ctx = IngestContext::new();
        let mut out = Vec::new();
        ingestor
            .ingest(&mut ctx, "day", DAY.as_bytes(), |f| {
                out.push(f);
                Ok(Acceptance::accept(""))
            })
            .unwrap();
        out
    }

    fn test_store() -> FlightStore {
        FlightStore::open_memory().unwrap()
    }

    #[test]
    fn test_open_memory() {
        let store = test_store();
        assert_eq!(store.count_flights().unwrap(), 0);
        assert_eq!(store.count_trackpoints().unwrap(), 0);
    }

    #[test]
    fn test_save_and_get_flight() {
        let mut store = test_store();
        let f = &flights()[0];
        let id = store.save_flight(f).unwrap();

        let row = store.get_flight(id).unwrap().unwrap();
        assert_eq!(row.callsign, "QXE17");
        assert_eq!(row.faa_key, "T100");
        assert_eq!(row.origin.as_deref(), Some("EUG"));
        assert!(row.start_time < row.end_time);
        assert!(row.tags.contains(&"FOIA".to_string()));
        assert!(row.tags.contains(&"AL".to_string()));
        assert_eq!(store.count_trackpoints().unwrap(), 2);
    }

    #[test]
    fn test_find_flight() {
        let mut store = test_store();
        let fs = flights();
        assert_eq!(store.find_flight(&fs[0]).unwrap(), None);
        let id = store.save_flight(&fs[0]).unwrap();
        assert_eq!(store.find_flight(&fs[0]).unwrap(), Some(id));
        assert_eq!(store.find_flight(&fs[1]).unwrap(), None);
    }

    #[test]
    fn test_duplicate_rejected_by_schema() {
        let mut store = test_store();
        let f = &flights()[0];
        store.save_flight(f).unwrap();
        assert!(store.save_flight(f).is_err());
        // Failed insert rolled back, no orphan trackpoints
        assert_eq!(store.count_flights().unwrap(), 1);
        assert_eq!(store.count_trackpoints().unwrap(), 2);
    }

    #[test]
    fn test_flight_key() {
        let fs = flights();
        let key = FlightKey::of(&fs[0]);
        assert_eq!(key.callsign, "QXE17");
        assert_eq!(key.faa_key, "T100");
        // First point after sorting is 00:40:54
        assert_eq!(key.start_time, 1462927254);
    }

    #[test]
    fn test_stats() {
        let mut store = test_store();
        let empty = store.stats().unwrap();
        assert_eq!(empty.flights, 0);
        assert!(empty.earliest.is_none());

        for f in &flights() {
            store.save_flight(f).unwrap();
        }
        let stats = store.stats().unwrap();
        assert_eq!(stats.flights, 2);
        assert_eq!(stats.trackpoints, 3);
        assert_eq!(stats.earliest, Some(1462927254));
    }

    #[test]
    fn test_empty_store_stats() {
        let store = test_store();
        assert_eq!(
            store.stats().unwrap(),
            StoreStats {
                flights: 0,
                trackpoints: 0,
                earliest: None,
                latest: None,
            }
        );
        assert_eq!(store.get_flight(1).unwrap(), None);
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("fdb.db");
        let path = path.to_str().unwrap();
        {
            let mut store = FlightStore::open(path).unwrap();
            store.save_flight(&flights()[1]).unwrap();
        }
        let store = FlightStore::open(path).unwrap();
        assert_eq!(store.count_flights().unwrap(), 1);
    }
}
