pub mod csv_export;
pub mod csv_import;
pub mod file;
pub mod solver;

pub use file::JsonSnapshotFile;
pub use solver::{SolverClient, SolverEvent};
