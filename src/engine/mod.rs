pub mod coordinator;
pub mod overlap;
pub mod projection;

pub use coordinator::{
    EditReport, EditSession, EditVeto, ItemPhase, MoveOutcome, MoveProposal, MoveVeto,
    MutationCoordinator, SnapshotSink,
};
pub use overlap::OverlapInterval;
pub use projection::{Editability, FlightCard, Group, GroupId, ItemId, Timeline, TimelineItem};
