//! Error types for ingestion, store mutation, persistence and the solver
//! server.
//!
//! Moves and edits that the timeline policy refuses are not errors; they are
//! reported as vetoes by the coordinator. The types here cover input that is
//! malformed and I/O that failed.

use thiserror::Error;

use crate::model::{FlightKey, Track};

/// Source rows could not be turned into a schedule. The store is unchanged.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("source is missing required column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: field '{field}' is empty")]
    MissingField { row: usize, field: String },

    #[error("row {row}: field '{field}' is not an integer: '{value}'")]
    InvalidNumber {
        row: usize,
        field: String,
        value: String,
    },

    #[error("row {row}: duplicate flight {key}")]
    DuplicateKey { row: usize, key: FlightKey },

    #[error("snapshot is not paired: {0}")]
    Unpaired(String),

    #[error("source contains no flights")]
    Empty,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A lookup or patch against the record store failed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("flight {key} on the original track cannot be modified")]
    ImmutableRecord { key: FlightKey },

    #[error("no {track} record for flight {key}")]
    NotFound { track: Track, key: FlightKey },

    #[error("field '{field}' is part of the flight key and cannot be edited")]
    KeyFieldImmutable { field: String },

    #[error("field '{field}' expects an integer, got '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("aircraft {0} has no row on the timeline")]
    UnknownAircraft(u32),
}

/// A local snapshot, settings or export file could not be written or read.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A call to the solver server failed. Always retryable from the UI.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("server reported an error: {0}")]
    Server(String),

    #[error("malformed event stream: {0}")]
    Stream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not read schedule: {0}")]
    Ingest(#[from] IngestError),
}

/// The disruption form does not describe a valid disruption.
#[derive(Debug, Error, PartialEq)]
pub enum DisruptionError {
    #[error("unknown disruption kind '{0}'")]
    UnknownKind(String),

    #[error("index is required")]
    MissingIndex,

    #[error("index must be a number for {0} disruptions")]
    NonNumericIndex(&'static str),

    #[error("time must be a non-negative number of minutes, got '{0}'")]
    InvalidTime(String),

    #[error("value must be an integer, got '{0}'")]
    InvalidMagnitude(String),

    #[error("range must be HHMM-HHMM, got '{0}'")]
    InvalidRange(String),
}
