//! Runtime configuration read from the environment.
//!
//! `main` calls `dotenvy::dotenv()` first, so a `.env` file next to the
//! binary works too. Values that fail to parse are ignored with a warning.

use std::net::IpAddr;
use std::str::FromStr;

use crate::api::logs::log_warning;
use crate::parser::ExtractOptions;

pub const ENV_HOST: &str = "ROTAPREP_HOST";
pub const ENV_PORT: &str = "ROTAPREP_PORT";
pub const ENV_HEADER_SCAN_ROWS: &str = "ROTAPREP_HEADER_SCAN_ROWS";
pub const ENV_SHEET: &str = "ROTAPREP_SHEET";
pub const ENV_MAX_UPLOAD_BYTES: &str = "ROTAPREP_MAX_UPLOAD_BYTES";
pub const ENV_MAX_SESSIONS: &str = "ROTAPREP_MAX_SESSIONS";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Rows scanned from the top of each sheet when looking for the header
    pub header_scan_rows: usize,
    /// Restrict workbook extraction to one sheet
    pub sheet: Option<String>,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
    /// Sessions kept in memory; the least recently used is evicted past this
    pub max_sessions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
            header_scan_rows: ExtractOptions::default().header_scan_rows,
            sheet: None,
            max_upload_bytes: 10 * 1024 * 1024,
            max_sessions: 256,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: parse_or(&lookup, ENV_HOST, defaults.host),
            port: parse_or(&lookup, ENV_PORT, defaults.port),
            header_scan_rows: parse_or(&lookup, ENV_HEADER_SCAN_ROWS, defaults.header_scan_rows)
                .max(1),
            sheet: lookup(ENV_SHEET)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            max_upload_bytes: parse_or(&lookup, ENV_MAX_UPLOAD_BYTES, defaults.max_upload_bytes),
            max_sessions: parse_or(&lookup, ENV_MAX_SESSIONS, defaults.max_sessions).max(1),
        }
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            sheet: self.sheet.clone(),
            header_scan_rows: self.header_scan_rows,
            ..ExtractOptions::default()
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log_warning(format!("Ignoring malformed {}={:?}", key, raw));
            default
        }),
    }
}
