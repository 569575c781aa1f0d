//! The single write path for timeline interactions.
//!
//! Drags and edit dialogs never touch records directly. They hand a proposal
//! to the [`MutationCoordinator`], which applies the timeline policy, writes
//! the change through to the record store, re-derives the affected items,
//! recomputes overlaps for exactly the groups that changed and persists a
//! snapshot.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use thiserror::Error;

use super::overlap::{self, reconcile, reconcile_all};
use super::projection::{GroupId, ItemId, Timeline};
use crate::error::{IngestError, PersistError, StoreError};
use crate::model::{
    ColumnMap, FlightKey, FlightRecord, RecordPatch, RecordStore, Snapshot, SourceTable, TimeCodec,
    Track,
};

/// Receives the full two-track snapshot after every mutation.
pub trait SnapshotSink {
    fn persist(&mut self, snapshot: &Snapshot) -> Result<(), PersistError>;

    /// Forget any stored snapshot.
    fn clear(&mut self) -> Result<(), PersistError> {
        Ok(())
    }
}

/// Lifecycle of an item inside one interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemPhase {
    #[default]
    Idle,
    Moved,
    EditRequested,
    Reconciled,
}

/// A drop reported by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveProposal {
    pub id: ItemId,
    pub group: GroupId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveVeto {
    #[error("no item {0} on the timeline")]
    UnknownItem(ItemId),
    #[error("item {0} is on the original track and cannot move")]
    FrozenItem(ItemId),
    #[error("row {0} belongs to the original track")]
    FrozenTarget(GroupId),
    #[error("aircraft {0} has no row on the timeline")]
    UnknownAircraft(u32),
    #[error("flight must end after it starts")]
    InvalidSpan,
    #[error("no modified record for flight {0}")]
    MissingRecord(FlightKey),
}

#[derive(Debug)]
pub enum MoveOutcome {
    /// Nothing changed.
    Rejected(MoveVeto),
    /// The move was committed and `groups` were recomputed.
    Reconciled {
        groups: Vec<GroupId>,
        /// Whether the moved item overlaps another flight in its new row.
        overlap: bool,
        persist_error: Option<PersistError>,
    },
}

impl MoveOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MoveOutcome::Reconciled { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditVeto {
    #[error("no item {0} on the timeline")]
    UnknownItem(ItemId),
    #[error("item {0} is on the original track and cannot be edited")]
    FrozenItem(ItemId),
    #[error("flight must end after it starts")]
    InvalidSpan,
    #[error(transparent)]
    Invalid(#[from] StoreError),
}

/// An open edit dialog, pre-filled from the modified record.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    pub id: ItemId,
    /// Editable fields in source column order.
    pub fields: Vec<(String, String)>,
}

impl EditSession {
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        if let Some((_, v)) = self.fields.iter_mut().find(|(n, _)| n == name) {
            *v = value.into();
        }
    }
}

#[derive(Debug, Default)]
pub struct EditReport {
    /// Groups whose overlaps were recomputed.
    pub groups: Vec<GroupId>,
    pub persist_error: Option<PersistError>,
}

/// Owns the record store and the item store and keeps them consistent.
pub struct MutationCoordinator<S: SnapshotSink> {
    store: RecordStore,
    codec: TimeCodec,
    timeline: Timeline,
    sink: S,
    phases: HashMap<ItemId, ItemPhase>,
    editing: Option<ItemId>,
    unsaved: bool,
}

impl<S: SnapshotSink> MutationCoordinator<S> {
    pub fn new(columns: ColumnMap, codec: TimeCodec, sink: S) -> Self {
        Self {
            store: RecordStore::new(columns),
            codec,
            timeline: Timeline::default(),
            sink,
            phases: HashMap::new(),
            editing: None,
            unsaved: false,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn codec(&self) -> &TimeCodec {
        &self.codec
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Whether the modified track has changes not yet uploaded.
    pub fn unsaved(&self) -> bool {
        self.unsaved
    }

    pub fn phase(&self, id: &ItemId) -> ItemPhase {
        self.phases.get(id).copied().unwrap_or_default()
    }

    pub fn editing(&self) -> Option<&ItemId> {
        self.editing.as_ref()
    }

    /// Replace the schedule with freshly ingested rows.
    pub fn load(&mut self, table: &SourceTable) -> Result<Option<PersistError>, IngestError> {
        self.store.load(table)?;
        self.rebuild();
        Ok(self.persist())
    }

    /// Replace the schedule with a saved snapshot. A snapshot whose working
    /// track differs from the original counts as unsaved.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<(), IngestError> {
        self.store.restore(snapshot)?;
        self.rebuild();
        self.unsaved = self.store.has_modifications();
        Ok(())
    }

    /// Throw away every modification and start over from the original track.
    pub fn reset(&mut self) -> Option<PersistError> {
        self.store.discard_modifications();
        self.rebuild();
        self.persist()
    }

    /// Show a solved schedule on the original track. Records are unchanged.
    pub fn apply_solution(&mut self, records: &[FlightRecord]) -> usize {
        let applied = self.timeline.apply_solution(records, &self.codec);
        tracing::info!(flights = applied, "solved schedule applied");
        applied
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Clear the unsaved flag after the modified track was uploaded.
    pub fn mark_uploaded(&mut self) {
        self.unsaved = false;
    }

    fn rebuild(&mut self) {
        self.timeline = Timeline::project(&self.store, &self.codec);
        reconcile_all(&mut self.timeline);
        self.phases.clear();
        self.editing = None;
        self.unsaved = false;
        tracing::debug!(
            items = self.timeline.len(),
            markers = self.timeline.all_markers().count(),
            "timeline rebuilt"
        );
    }

    fn persist(&mut self) -> Option<PersistError> {
        match self.sink.persist(&self.store.snapshot()) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("failed to persist snapshot: {}", e);
                Some(e)
            }
        }
    }

    /// Handle a drop. Either commits the move and reconciles the affected
    /// groups, or leaves everything as it was.
    pub fn on_move(&mut self, proposal: MoveProposal) -> MoveOutcome {
        match self.check_move(&proposal) {
            Ok(()) => self.commit_move(proposal),
            Err(veto) => {
                tracing::debug!(item = %proposal.id, "move rejected: {}", veto);
                MoveOutcome::Rejected(veto)
            }
        }
    }

    fn check_move(&self, proposal: &MoveProposal) -> Result<(), MoveVeto> {
        let item = self
            .timeline
            .item(&proposal.id)
            .ok_or_else(|| MoveVeto::UnknownItem(proposal.id.clone()))?;
        if !item.editable.can_move_time || item.id.track == Track::Original {
            return Err(MoveVeto::FrozenItem(proposal.id.clone()));
        }
        if item.group != proposal.group && !item.editable.can_move_group {
            return Err(MoveVeto::FrozenItem(proposal.id.clone()));
        }
        if !proposal.group.is_shadow() {
            return Err(MoveVeto::FrozenTarget(proposal.group));
        }
        if !self.timeline.has_group(proposal.group) {
            return Err(MoveVeto::UnknownAircraft(proposal.group.aircraft));
        }
        if proposal.end <= proposal.start {
            return Err(MoveVeto::InvalidSpan);
        }
        self.store
            .find(Track::Modified, &proposal.id.key)
            .map_err(|_| MoveVeto::MissingRecord(proposal.id.key.clone()))?;
        Ok(())
    }

    fn commit_move(&mut self, proposal: MoveProposal) -> MoveOutcome {
        let overlap = overlap::overlaps_any(
            proposal.start,
            proposal.end,
            self.timeline
                .items_in(proposal.group)
                .filter(|other| other.id != proposal.id),
        );

        let patch = RecordPatch::schedule(
            proposal.group.aircraft,
            self.codec.to_offset(proposal.start),
            self.codec.to_offset(proposal.end),
        );
        let record = match self.store.mutate(Track::Modified, &proposal.id.key, &patch) {
            Ok(record) => record.clone(),
            Err(StoreError::UnknownAircraft(aircraft)) => {
                return MoveOutcome::Rejected(MoveVeto::UnknownAircraft(aircraft))
            }
            Err(_) => return MoveOutcome::Rejected(MoveVeto::MissingRecord(proposal.id.key)),
        };
        self.phases.insert(proposal.id.clone(), ItemPhase::Moved);

        let previous = self
            .timeline
            .refresh(&record, &self.codec)
            .unwrap_or(proposal.group);
        if let Some(item) = self.timeline.item_mut(&proposal.id) {
            item.overlap = overlap;
        }

        let groups = affected(previous, proposal.group);
        reconcile(&mut self.timeline, &groups);
        self.phases.insert(proposal.id.clone(), ItemPhase::Reconciled);
        self.unsaved = true;
        tracing::info!(
            flight = %proposal.id.key,
            from = %previous,
            to = %proposal.group,
            overlap,
            "flight moved"
        );

        MoveOutcome::Reconciled {
            groups,
            overlap,
            persist_error: self.persist(),
        }
    }

    /// Open an edit dialog for a shadow-track item.
    pub fn request_edit(&mut self, id: &ItemId) -> Result<EditSession, EditVeto> {
        let item = self
            .timeline
            .item(id)
            .ok_or_else(|| EditVeto::UnknownItem(id.clone()))?;
        if !item.id.track.is_editable() {
            return Err(EditVeto::FrozenItem(id.clone()));
        }
        let record = self.store.find(Track::Modified, &id.key)?;
        let fields = editable_columns(&self.store)
            .into_iter()
            .map(|name| {
                let value = record.field(&name, self.store.columns()).unwrap_or_default();
                (name, value)
            })
            .collect();

        self.phases.insert(id.clone(), ItemPhase::EditRequested);
        self.editing = Some(id.clone());
        Ok(EditSession {
            id: id.clone(),
            fields,
        })
    }

    /// Close the edit dialog without changes.
    pub fn cancel_edit(&mut self) {
        if let Some(id) = self.editing.take() {
            self.phases.insert(id, ItemPhase::Idle);
        }
    }

    /// Apply an edit dialog. Only fields whose text changed are written.
    pub fn submit_edit(&mut self, session: &EditSession) -> Result<EditReport, EditVeto> {
        let id = &session.id;
        if !id.track.is_editable() {
            return Err(EditVeto::FrozenItem(id.clone()));
        }
        if self.timeline.item(id).is_none() {
            return Err(EditVeto::UnknownItem(id.clone()));
        }
        let current = self.store.find(Track::Modified, &id.key)?.clone();
        let columns = self.store.columns().clone();

        let changed: Vec<(String, String)> = session
            .fields
            .iter()
            .filter(|(name, value)| current.field(name, &columns).as_deref() != Some(value.as_str()))
            .cloned()
            .collect();
        let patch = RecordPatch::from_fields(&changed, &columns)?;

        let mut preview = current.clone();
        preview.apply(&patch);
        if preview.arrival <= preview.departure {
            return Err(EditVeto::InvalidSpan);
        }

        if preview == current {
            self.editing = None;
            self.phases.insert(id.clone(), ItemPhase::Reconciled);
            return Ok(EditReport::default());
        }

        let record = self.store.mutate(Track::Modified, &id.key, &patch)?.clone();
        self.editing = None;
        let previous = self
            .timeline
            .refresh(&record, &self.codec)
            .unwrap_or_else(|| GroupId::shadow(record.aircraft));
        let group = GroupId::shadow(record.aircraft);

        let groups = if previous != group {
            affected(previous, group)
        } else if (current.departure, current.arrival) != (record.departure, record.arrival) {
            vec![group]
        } else {
            Vec::new()
        };
        reconcile(&mut self.timeline, &groups);
        self.phases.insert(id.clone(), ItemPhase::Reconciled);
        self.unsaved = true;
        tracing::info!(flight = %id.key, fields = changed.len(), "flight edited");

        Ok(EditReport {
            groups,
            persist_error: self.persist(),
        })
    }
}

fn affected(from: GroupId, to: GroupId) -> Vec<GroupId> {
    if from == to {
        vec![to]
    } else {
        vec![from, to]
    }
}

/// Columns offered by the edit dialog: every source column except the key.
fn editable_columns(store: &RecordStore) -> Vec<String> {
    let columns = store.columns();
    let mut names = store.export_order();
    names.retain(|name| *name != columns.kind && *name != columns.number);
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::tests::table;

    #[derive(Default)]
    struct MemorySink {
        saved: Vec<Snapshot>,
        fail: bool,
    }

    impl SnapshotSink for MemorySink {
        fn persist(&mut self, snapshot: &Snapshot) -> Result<(), PersistError> {
            if self.fail {
                return Err(PersistError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )));
            }
            self.saved.push(snapshot.clone());
            Ok(())
        }
    }

    fn coordinator(rows: &[(&str, i64, u32, i64, i64)]) -> MutationCoordinator<MemorySink> {
        let mut c =
            MutationCoordinator::new(ColumnMap::default(), TimeCodec::default(), MemorySink::default());
        c.load(&table(rows)).unwrap();
        c
    }

    fn fleet() -> MutationCoordinator<MemorySink> {
        coordinator(&[
            ("CA", 1, 2, 0, 60),
            ("CA", 2, 2, 30, 90),
            ("CA", 3, 3, 0, 60),
            ("CA", 4, 3, 100, 160),
            ("CA", 5, 4, 20, 80),
        ])
    }

    fn shadow(number: i64) -> ItemId {
        ItemId::new(FlightKey::new("CA", number), Track::Modified)
    }

    fn at(c: &MutationCoordinator<MemorySink>, minutes: i64) -> NaiveDateTime {
        c.codec().to_absolute(minutes)
    }

    #[test]
    fn test_load_runs_initial_detection() {
        let c = fleet();
        assert_eq!(c.timeline().markers(GroupId::shadow(2)).len(), 1);
        assert!(c.timeline().markers(GroupId::shadow(3)).is_empty());
        assert!(!c.unsaved());
        assert_eq!(c.sink().saved.len(), 1);
    }

    #[test]
    fn test_move_to_original_row_is_vetoed() {
        let mut c = fleet();
        let before: Vec<_> = c.timeline().items().cloned().collect();
        let markers: Vec<_> = c.timeline().all_markers().cloned().collect();

        let outcome = c.on_move(MoveProposal {
            id: shadow(3),
            group: GroupId::original(4),
            start: at(&c, 10),
            end: at(&c, 70),
        });
        assert!(matches!(
            outcome,
            MoveOutcome::Rejected(MoveVeto::FrozenTarget(g)) if g == GroupId::original(4)
        ));
        assert_eq!(c.timeline().items().cloned().collect::<Vec<_>>(), before);
        assert_eq!(c.timeline().all_markers().cloned().collect::<Vec<_>>(), markers);
        assert!(!c.unsaved());
        assert_eq!(c.sink().saved.len(), 1);
    }

    #[test]
    fn test_original_item_cannot_move() {
        let mut c = fleet();
        let id = ItemId::new(FlightKey::new("CA", 3), Track::Original);
        let outcome = c.on_move(MoveProposal {
            id: id.clone(),
            group: GroupId::shadow(3),
            start: at(&c, 10),
            end: at(&c, 70),
        });
        assert!(matches!(outcome, MoveOutcome::Rejected(MoveVeto::FrozenItem(i)) if i == id));
    }

    #[test]
    fn test_cross_group_move_reconciles_both_groups() {
        let mut c = fleet();
        let untouched = c.timeline().markers(GroupId::shadow(2)).to_vec();

        let outcome = c.on_move(MoveProposal {
            id: shadow(3),
            group: GroupId::shadow(4),
            start: at(&c, 40),
            end: at(&c, 100),
        });
        match outcome {
            MoveOutcome::Reconciled {
                groups,
                overlap,
                persist_error,
            } => {
                assert_eq!(groups, vec![GroupId::shadow(3), GroupId::shadow(4)]);
                assert!(overlap);
                assert!(persist_error.is_none());
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        assert_eq!(c.timeline().markers(GroupId::shadow(2)), untouched.as_slice());
        let markers = c.timeline().markers(GroupId::shadow(4));
        assert_eq!(markers.len(), 1);
        assert_eq!((markers[0].start, markers[0].end), (at(&c, 40), at(&c, 80)));

        let record = c
            .store()
            .find(Track::Modified, &FlightKey::new("CA", 3))
            .unwrap();
        assert_eq!((record.aircraft, record.departure, record.arrival), (4, 40, 100));
        let original = c
            .store()
            .find(Track::Original, &FlightKey::new("CA", 3))
            .unwrap();
        assert_eq!(original.aircraft, 3);

        assert!(c.unsaved());
        assert_eq!(c.phase(&shadow(3)), ItemPhase::Reconciled);
        let saved = c.sink().saved.last().unwrap();
        assert_eq!(saved, &c.snapshot());
    }

    #[test]
    fn test_same_group_move_reconciles_one_group() {
        let mut c = fleet();
        let outcome = c.on_move(MoveProposal {
            id: shadow(2),
            group: GroupId::shadow(2),
            start: at(&c, 60),
            end: at(&c, 120),
        });
        assert!(matches!(
            outcome,
            MoveOutcome::Reconciled { ref groups, overlap: false, .. } if groups == &vec![GroupId::shadow(2)]
        ));
        assert!(c.timeline().markers(GroupId::shadow(2)).is_empty());
        assert!(c.timeline().items().all(|item| !item.overlap));
    }

    #[test]
    fn test_move_quantizes_to_codec_unit() {
        let mut c = fleet();
        let start = at(&c, 200) + chrono::Duration::seconds(40);
        let end = at(&c, 260) + chrono::Duration::seconds(40);
        assert!(c
            .on_move(MoveProposal {
                id: shadow(5),
                group: GroupId::shadow(4),
                start,
                end,
            })
            .is_accepted());
        let item = c.timeline().item(&shadow(5)).unwrap();
        assert_eq!((item.start, item.end), (at(&c, 201), at(&c, 261)));
    }

    #[test]
    fn test_move_vetoes() {
        let mut c = fleet();
        let unknown = c.on_move(MoveProposal {
            id: shadow(1),
            group: GroupId::shadow(99),
            start: at(&c, 0),
            end: at(&c, 60),
        });
        assert!(matches!(unknown, MoveOutcome::Rejected(MoveVeto::UnknownAircraft(99))));

        let inverted = c.on_move(MoveProposal {
            id: shadow(1),
            group: GroupId::shadow(2),
            start: at(&c, 60),
            end: at(&c, 60),
        });
        assert!(matches!(inverted, MoveOutcome::Rejected(MoveVeto::InvalidSpan)));

        let missing = c.on_move(MoveProposal {
            id: shadow(42),
            group: GroupId::shadow(2),
            start: at(&c, 0),
            end: at(&c, 60),
        });
        assert!(matches!(missing, MoveOutcome::Rejected(MoveVeto::UnknownItem(_))));
        assert!(!c.unsaved());
    }

    #[test]
    fn test_edit_aircraft_moves_item() {
        let mut c = fleet();
        let mut session = c.request_edit(&shadow(3)).unwrap();
        assert_eq!(c.phase(&shadow(3)), ItemPhase::EditRequested);
        assert!(session.fields.iter().all(|(n, _)| n != "TYPE" && n != "Flight"));
        assert!(session.fields.contains(&("AC".to_string(), "3".to_string())));

        session.set("AC", "4");
        let report = c.submit_edit(&session).unwrap();
        assert_eq!(report.groups, vec![GroupId::shadow(3), GroupId::shadow(4)]);

        let item = c.timeline().item(&shadow(3)).unwrap();
        assert_eq!(item.group, GroupId::shadow(4));
        assert!(item.overlap);
        assert_eq!(c.timeline().markers(GroupId::shadow(4)).len(), 1);
        assert_eq!(
            c.store()
                .find(Track::Modified, &FlightKey::new("CA", 3))
                .unwrap()
                .aircraft,
            4
        );
        assert!(c.unsaved());
        assert!(c.editing().is_none());
    }

    #[test]
    fn test_edit_times_recomputes_one_group() {
        let mut c = fleet();
        let mut session = c.request_edit(&shadow(2)).unwrap();
        session.set("DET", "60");
        session.set("ART", "95");
        let report = c.submit_edit(&session).unwrap();
        assert_eq!(report.groups, vec![GroupId::shadow(2)]);
        assert!(c.timeline().markers(GroupId::shadow(2)).is_empty());
    }

    #[test]
    fn test_edit_pass_through_field() {
        let mut c = fleet();
        let mut session = c.request_edit(&shadow(4)).unwrap();
        session.set("COST", "250");
        session.set("DEP", "CAN");
        let report = c.submit_edit(&session).unwrap();
        assert!(report.groups.is_empty());
        let record = c
            .store()
            .find(Track::Modified, &FlightKey::new("CA", 4))
            .unwrap();
        assert_eq!(record.attributes.get("COST").map(String::as_str), Some("250"));
        assert_eq!(record.origin, "CAN");
        assert_eq!(
            c.timeline().item(&shadow(4)).unwrap().card.origin,
            "CAN"
        );
        assert!(c.unsaved());
    }

    #[test]
    fn test_unchanged_edit_is_noop() {
        let mut c = fleet();
        let session = c.request_edit(&shadow(1)).unwrap();
        let report = c.submit_edit(&session).unwrap();
        assert!(report.groups.is_empty());
        assert!(!c.unsaved());
        assert_eq!(c.sink().saved.len(), 1);
    }

    #[test]
    fn test_rejected_edit_leaves_record() {
        let mut c = fleet();
        let before = c
            .store()
            .find(Track::Modified, &FlightKey::new("CA", 1))
            .unwrap()
            .clone();

        let mut session = c.request_edit(&shadow(1)).unwrap();
        session.set("COST", "12.5");
        assert_eq!(
            c.submit_edit(&session).unwrap_err(),
            EditVeto::Invalid(StoreError::InvalidNumber {
                field: "COST".into(),
                value: "12.5".into()
            })
        );

        let mut session = c.request_edit(&shadow(1)).unwrap();
        session.set("AC", "77");
        assert_eq!(
            c.submit_edit(&session).unwrap_err(),
            EditVeto::Invalid(StoreError::UnknownAircraft(77))
        );

        let mut session = c.request_edit(&shadow(1)).unwrap();
        session.set("ART", "0");
        assert_eq!(c.submit_edit(&session).unwrap_err(), EditVeto::InvalidSpan);

        assert_eq!(
            c.store()
                .find(Track::Modified, &FlightKey::new("CA", 1))
                .unwrap(),
            &before
        );
        assert!(!c.unsaved());
    }

    #[test]
    fn test_edit_rejects_unrepresentable_time() {
        let mut c = fleet();
        let before = c.snapshot();
        let mut session = c.request_edit(&shadow(1)).unwrap();
        session.set("ART", "999999999999");
        assert_eq!(
            c.submit_edit(&session).unwrap_err(),
            EditVeto::Invalid(StoreError::InvalidNumber {
                field: "ART".into(),
                value: "999999999999".into()
            })
        );
        assert_eq!(c.snapshot(), before);
        assert_eq!(c.timeline().item(&shadow(1)).unwrap().end, at(&c, 60));
        assert!(!c.unsaved());
    }

    #[test]
    fn test_load_rejects_unrepresentable_time() {
        let mut c = fleet();
        let before = c.snapshot();
        assert!(matches!(
            c.load(&table(&[("CA", 1, 3, 0, 999_999_999_999)])),
            Err(IngestError::InvalidNumber { row: 1, .. })
        ));
        assert_eq!(c.snapshot(), before);
        assert_eq!(c.timeline().len(), 10);
    }

    #[test]
    fn test_edit_original_item_is_vetoed() {
        let mut c = fleet();
        let id = ItemId::new(FlightKey::new("CA", 1), Track::Original);
        assert_eq!(c.request_edit(&id).unwrap_err(), EditVeto::FrozenItem(id));
    }

    #[test]
    fn test_cancel_edit() {
        let mut c = fleet();
        c.request_edit(&shadow(1)).unwrap();
        c.cancel_edit();
        assert_eq!(c.phase(&shadow(1)), ItemPhase::Idle);
        assert!(c.editing().is_none());
    }

    #[test]
    fn test_persist_failure_keeps_mutation() {
        let mut c = fleet();
        c.sink.fail = true;
        let outcome = c.on_move(MoveProposal {
            id: shadow(1),
            group: GroupId::shadow(2),
            start: at(&c, 200),
            end: at(&c, 260),
        });
        assert!(matches!(
            outcome,
            MoveOutcome::Reconciled {
                persist_error: Some(_),
                ..
            }
        ));
        assert_eq!(
            c.store()
                .find(Track::Modified, &FlightKey::new("CA", 1))
                .unwrap()
                .departure,
            200
        );
    }

    #[test]
    fn test_reset_and_upload_clear_unsaved() {
        let mut c = fleet();
        let moved = MoveProposal {
            id: shadow(1),
            group: GroupId::shadow(3),
            start: at(&c, 300),
            end: at(&c, 360),
        };
        assert!(c.on_move(moved.clone()).is_accepted());
        assert!(c.unsaved());
        c.mark_uploaded();
        assert!(!c.unsaved());

        assert!(c.on_move(moved).is_accepted());
        assert!(c.reset().is_none());
        assert!(!c.unsaved());
        assert_eq!(c.timeline().item(&shadow(1)).unwrap().group, GroupId::shadow(2));
        assert_eq!(c.timeline().markers(GroupId::shadow(2)).len(), 1);
    }

    #[test]
    fn test_restore_snapshot() {
        let mut c = fleet();
        assert!(c
            .on_move(MoveProposal {
                id: shadow(1),
                group: GroupId::shadow(3),
                start: at(&c, 300),
                end: at(&c, 360),
            })
            .is_accepted());
        let snapshot = c.snapshot();

        let mut other =
            MutationCoordinator::new(ColumnMap::default(), TimeCodec::default(), MemorySink::default());
        other.restore(snapshot).unwrap();
        assert_eq!(
            other.timeline().item(&shadow(1)).unwrap().group,
            GroupId::shadow(3)
        );
        assert!(other.unsaved());
        assert!(other.sink().saved.is_empty());

        let mut pristine =
            MutationCoordinator::new(ColumnMap::default(), TimeCodec::default(), MemorySink::default());
        pristine.restore(fleet().snapshot()).unwrap();
        assert!(!pristine.unsaved());
    }

    #[test]
    fn test_apply_solution_keeps_records() {
        let mut c = fleet();
        let mut solved = c.store().records(Track::Original).to_vec();
        solved[0].departure = 500;
        solved[0].arrival = 560;
        assert_eq!(c.apply_solution(&solved), 5);
        let item = c
            .timeline()
            .item(&ItemId::new(FlightKey::new("CA", 1), Track::Original))
            .unwrap();
        assert_eq!(item.start, at(&c, 500));
        assert_eq!(
            c.store()
                .find(Track::Original, &FlightKey::new("CA", 1))
                .unwrap()
                .departure,
            0
        );
    }
}
