//! Configuration file management for fdb.
//!
//! Reads/writes `~/.fdb/config.yaml` with the ingestion source settings and
//! the flight store path.

use std::path::{Path, PathBuf};

use crate::types::FdbError;

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub source: SourceConfig,
    pub database: DatabaseConfig,
}

/// How rows from a track file become flights.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    /// Track name on each flight, also set as a provenance tag.
    pub key: String,
    /// Provenance label stamped on every trackpoint.
    pub data_source: String,
    pub delimiter: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            key: "FOIA".into(),
            data_source: "EB-FOIA".into(),
            delimiter: b',',
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: SourceConfig::default(),
            database: DatabaseConfig {
                path: "data/fdb.db".into(),
            },
        }
    }
}

/// Get the config directory path (`~/.fdb/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".fdb")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.fdb/config.yaml`.
///
/// Returns default config if file doesn't exist.
pub fn load_config() -> Config {
    load_config_from(&config_file())
}

/// Load config from an explicit path, falling back to defaults.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text),
        Err(_) => Config::default(),
    }
}

/// Save config to `~/.fdb/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, FdbError> {
    let path = config_file();
    save_config_to(config, &path)?;
    Ok(path)
}

/// Save config to an explicit path, creating parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> Result<(), FdbError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, serialize_config(config))?;
    Ok(())
}

/// Parse simple YAML-like config text. Unknown keys are ignored.
fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = strip_comment(val.trim());

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }

        match (current_section.as_deref(), key) {
            (Some("source"), "key") => {
                if let Some(v) = parse_string_value(val) {
                    config.source.key = v;
                }
            }
            (Some("source"), "data_source") => {
                if let Some(v) = parse_string_value(val) {
                    config.source.data_source = v;
                }
            }
            (Some("source"), "delimiter") => {
                if let Some(d) = parse_string_value(val).and_then(|v| parse_delimiter(&v)) {
                    config.source.delimiter = d;
                }
            }
            (Some("database"), "path") => {
                if let Some(v) = parse_string_value(val) {
                    config.database.path = v;
                }
            }
            _ => {}
        }
    }

    config
}

fn strip_comment(val: &str) -> &str {
    if let Some(q) = val.chars().next().filter(|c| *c == '"' || *c == '\'') {
        return match val[1..].find(q) {
            Some(end) => &val[..end + 2],
            None => val,
        };
    }
    match val.find(" #") {
        Some(i) => val[..i].trim_end(),
        None => val,
    }
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_delimiter(val: &str) -> Option<u8> {
    match val {
        "\\t" | "tab" => Some(b'\t'),
        v if v.len() == 1 && v.is_ascii() => v.bytes().next(),
        _ => None,
    }
}

fn delimiter_string(d: u8) -> String {
    match d {
        b'\t' => "\\t".into(),
        d => (d as char).to_string(),
    }
}

/// Serialize config to YAML-like text.
fn serialize_config(config: &Config) -> String {
    let lines = [
        "# fdb configuration".to_string(),
        String::new(),
        "source:".into(),
        format!("  key: \"{}\"", config.source.key),
        format!("  data_source: \"{}\"", config.source.data_source),
        format!("  delimiter: \"{}\"", delimiter_string(config.source.delimiter)),
        String::new(),
        "database:".into(),
        format!("  path: \"{}\"", config.database.path),
    ];

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
