pub mod disruption;
pub mod flight;
pub mod store;
pub mod time;
pub mod timeline;

pub use disruption::{Disruption, DisruptionForm, DisruptionKind, DisruptionValue};
pub use flight::{ColumnMap, FlightKey, FlightRecord, RecordPatch, Track};
pub use store::{RecordStore, Snapshot, SourceTable};
pub use time::{TimeCodec, TimeUnit};
pub use timeline::{TimelineScale, TimelineViewport};
