// crates/swarmgate-testdata/src/source.rs
// ============================================================================
// Module: Test Data Sources
// Description: Configured sources that seed scenario pools.
// Purpose: Load records once, at producer construction.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A pool is seeded from one or more [`DataSource`] values, concatenated in
//! declaration order. File sources are read once and capped at
//! [`MAX_SOURCE_BYTES`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::producer::ProducerError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a file-backed source in bytes.
pub const MAX_SOURCE_BYTES: usize = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Data Source
// ============================================================================

/// Origin of the records in a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSource {
    /// Records listed inline.
    Inline {
        /// Records in declared order.
        records: Vec<Value>,
    },
    /// A file holding a JSON array of records.
    JsonFile {
        /// File path.
        path: PathBuf,
    },
    /// A file holding one JSON record per non-empty line.
    JsonLinesFile {
        /// File path.
        path: PathBuf,
    },
}

impl DataSource {
    /// Loads the records of this source in declared order.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::Source`] when a file cannot be read, exceeds
    /// the size cap, or does not parse.
    pub fn load(&self) -> Result<Vec<Value>, ProducerError> {
        match self {
            Self::Inline {
                records,
            } => Ok(records.clone()),
            Self::JsonFile {
                path,
            } => {
                let bytes = read_capped(path)?;
                let value: Value = serde_json::from_slice(&bytes)
                    .map_err(|err| source_error(path, &err.to_string()))?;
                match value {
                    Value::Array(records) => Ok(records),
                    _ => Err(source_error(path, "expected a JSON array of records")),
                }
            }
            Self::JsonLinesFile {
                path,
            } => {
                let bytes = read_capped(path)?;
                let text = std::str::from_utf8(&bytes)
                    .map_err(|_| source_error(path, "file must be utf-8"))?;
                text.lines()
                    .enumerate()
                    .filter(|(_, line)| !line.trim().is_empty())
                    .map(|(index, line)| {
                        serde_json::from_str(line).map_err(|err| {
                            source_error(path, &format!("line {}: {err}", index + 1))
                        })
                    })
                    .collect()
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a source file, enforcing the size cap.
fn read_capped(path: &Path) -> Result<Vec<u8>, ProducerError> {
    let bytes = fs::read(path).map_err(|err| source_error(path, &err.to_string()))?;
    if bytes.len() > MAX_SOURCE_BYTES {
        return Err(source_error(path, "file exceeds size limit"));
    }
    Ok(bytes)
}

/// Builds a source error for a path.
fn source_error(path: &Path, reason: &str) -> ProducerError {
    ProducerError::Source(format!("{}: {reason}", path.display()))
}
