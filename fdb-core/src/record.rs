//! Header-keyed row decoding for delimited track files.
//!
//! FAA track dumps vary their columns between vintages (newer files add
//! `USER_CLASS`), so each row is exposed as a map from header name to raw
//! value rather than by position. The first line is always the header.
//!
//! Fields are read as raw bytes; invalid UTF-8 is replaced with U+FFFD rather
//! than failing the row, so a stray Latin-1 byte only degrades that field.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use crate::types::{FdbError, Result};

/// Column names from the header line, shared by every record of a file.
#[derive(Debug)]
struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let names: Vec<String> = names
            .into_iter()
            .map(|n| n.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Columns { names, index }
    }
}

/// One decoded data row.
#[derive(Debug, Clone)]
pub struct Record {
    columns: Arc<Columns>,
    values: Vec<String>,
    row: u64,
    byte: u64,
}

impl Record {
    /// Build a record directly from name/value pairs.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Record {
            columns: Arc::new(Columns::new(pairs.iter().map(|(k, _)| *k))),
            values: pairs.iter().map(|(_, v)| v.to_string()).collect(),
            row: 0,
            byte: 0,
        }
    }

    /// Value for a column, `None` if the file has no such column.
    pub fn get(&self, column: &str) -> Option<&str> {
        let i = *self.columns.index.get(column)?;
        self.values.get(i).map(String::as_str)
    }

    /// Value for a column, empty if the column is absent.
    pub fn field(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    /// `(column, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 1-based data row number (the header is not counted).
    pub fn row(&self) -> u64 {
        self.row
    }

    /// Byte offset of the start of this row in the source.
    pub fn byte_offset(&self) -> u64 {
        self.byte
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Lazy, single-pass record decoder over any byte stream.
///
/// Yields `Ok(Record)` per data row, `Some(Err(..))` once on a structural
/// error, then `None` forever after.
pub struct RecordReader<R: Read> {
    csv: csv::Reader<R>,
    columns: Option<Arc<Columns>>,
    scratch: csv::ByteRecord,
    rows_read: u64,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_delimiter(reader, b',')
    }

    pub fn with_delimiter(reader: R, delimiter: u8) -> Self {
        let csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(reader);
        RecordReader {
            csv,
            columns: None,
            scratch: csv::ByteRecord::new(),
            rows_read: 0,
            done: false,
        }
    }

    /// Number of data rows successfully decoded so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Header column names, once the header line has been read.
    pub fn headers(&self) -> Option<&[String]> {
        self.columns.as_deref().map(|c| c.names.as_slice())
    }

    fn read_next(&mut self) -> Result<Option<Record>> {
        let columns = match self.columns.clone() {
            Some(c) => c,
            None => {
                if !self.csv.read_byte_record(&mut self.scratch)? {
                    return Ok(None);
                }
                let names = lossy_fields(&self.scratch);
                let c = Arc::new(Columns::new(names.iter().map(String::as_str)));
                self.columns = Some(Arc::clone(&c));
                c
            }
        };

        if !self.csv.read_byte_record(&mut self.scratch)? {
            return Ok(None);
        }

        let row = self.rows_read + 1;
        if self.scratch.len() != columns.names.len() {
            return Err(FdbError::MalformedRow {
                row,
                expected: columns.names.len(),
                actual: self.scratch.len(),
            });
        }

        let byte = self.scratch.position().map(|p| p.byte()).unwrap_or(0);
        self.rows_read = row;

        Ok(Some(Record {
            columns,
            values: lossy_fields(&self.scratch),
            row,
            byte,
        }))
    }
}

fn lossy_fields(record: &csv::ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect()
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
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

    #[test]
    fn test_header_keys_values() {
        let data = "A,B,C\n1,2,3\n4,5,6\n";
        let mut rdr = RecordReader::new(data.as_bytes());
        let r1 = rdr.next().unwrap().unwrap();
        assert_eq!(r1.get("A"), Some("1"));
        assert_eq!(r1.get("C"), Some("3"));
        assert_eq!(r1.row(), 1);
        let r2 = rdr.next().unwrap().unwrap();
        assert_eq!(r2.field("B"), "5");
        assert_eq!(r2.row(), 2);
        assert!(rdr.next().is_none());
        assert_eq!(rdr.rows_read(), 2);
        assert_eq!(rdr.headers().unwrap(), &["A", "B", "C"]);
    }

    #[test]
    fn test_column_order_irrelevant() {
        let a: Vec<_> = RecordReader::new("X,Y\n1,2\n".as_bytes()).collect();
        let b: Vec<_> = RecordReader::new("Y,X\n2,1\n".as_bytes()).collect();
        let (a, b) = (a[0].as_ref().unwrap(), b[0].as_ref().unwrap());
        assert_eq!(a.get("X"), b.get("X"));
        assert_eq!(a.get("Y"), b.get("Y"));
    }

    #[test]
    fn test_missing_column_reads_empty() {
        let r = RecordReader::new("A\n1\n".as_bytes()).next().unwrap().unwrap();
        assert_eq!(r.get("USER_CLASS"), None);
        assert_eq!(r.field("USER_CLASS"), "");
    }

    #[test]
    fn test_header_only() {
        let mut rdr = RecordReader::new("A,B\n".as_bytes());
        assert!(rdr.next().is_none());
        assert_eq!(rdr.rows_read(), 0);
    }

    #[test]
    fn test_empty_input() {
        let mut rdr = RecordReader::new("".as_bytes());
        assert!(rdr.next().is_none());
        assert!(rdr.headers().is_none());
    }

    #[test]
    fn test_short_row_is_fatal() {
        let data = "A,B,C\n1,2,3\n4,5\n7,8,9\n";
        let mut rdr = RecordReader::new(data.as_bytes());
        assert!(rdr.next().unwrap().is_ok());
        match rdr.next() {
            Some(Err(FdbError::MalformedRow {
                row,
                expected,
                actual,
            })) => {
                assert_eq!(row, 2);
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("expected MalformedRow, got {other:?}"),
        }
        // Fused after the error, the good row after it is never seen
        assert!(rdr.next().is_none());
    }

    #[test]
    fn test_long_row_is_fatal() {
        let mut rdr = RecordReader::new("A\n1,2\n".as_bytes());
        assert!(matches!(
            rdr.next(),
            Some(Err(FdbError::MalformedRow { actual: 2, .. }))
        ));
    }

    #[test]
    fn test_quoted_fields_and_delimiter() {
        let r = RecordReader::with_delimiter("A|B\n\"x|y\"|2\n".as_bytes(), b'|')
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(r.field("A"), "x|y");
        assert_eq!(r.field("B"), "2");
    }

    #[test]
    fn test_header_whitespace_and_bom() {
        let r = RecordReader::new("\u{feff}A , B\n1,2\n".as_bytes())
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(r.get("A"), Some("1"));
        assert_eq!(r.get("B"), Some("2"));
    }

    #[test]
    fn test_byte_offsets_increase() {
        let mut rdr = RecordReader::new("A\n1\n22\n".as_bytes());
        let r1 = rdr.next().unwrap().unwrap();
        let r2 = rdr.next().unwrap().unwrap();
        assert_eq!(r1.byte_offset(), 2);
        assert_eq!(r2.byte_offset(), 4);
    }

    #[test]
    fn test_non_utf8_field_is_not_fatal() {
        let mut data = b"AIRCRAFT_ID,ACFT_TYPE,LATITUDE\nUAL1,B7".to_vec();
        data.push(0xE9);
        data.extend_from_slice(b"2,37.5\nUAL1,B772,37.6\n");

        let mut rdr = RecordReader::new(data.as_slice());
        let r1 = rdr.next().unwrap().unwrap();
        assert_eq!(r1.field("ACFT_TYPE"), "B7\u{fffd}2");
        assert_eq!(r1.field("LATITUDE"), "37.5");
        let r2 = rdr.next().unwrap().unwrap();
        assert_eq!(r2.field("ACFT_TYPE"), "B772");
        assert!(rdr.next().is_none());
        assert_eq!(rdr.rows_read(), 2);
    }

    #[test]
    fn test_non_utf8_header() {
        let mut data = b"A,B".to_vec();
        data.push(0xFF);
        data.extend_from_slice(b"\n1,2\n");
        let r = RecordReader::new(data.as_slice()).next().unwrap().unwrap();
        assert_eq!(r.get("A"), Some("1"));
        assert_eq!(r.get("B\u{fffd}"), Some("2"));
    }

    #[test]
    fn test_from_pairs_iter() {
        let r = Record::from_pairs(&[("A", "1"), ("B", "2")]);
        let pairs: Vec<_> = r.iter().collect();
        assert_eq!(pairs, vec![("A", "1"), ("B", "2")]);
        assert_eq!(r.len(), 2);
    }
}
