//! Fleet timeline: a two-track flight schedule with overlap detection.
//!
//! The library holds everything that does not need a window: the record
//! store, the timeline projection, the overlap detector, the mutation
//! coordinator, CSV and snapshot files, settings and the solver client.

pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod model;
