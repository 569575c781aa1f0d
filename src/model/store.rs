//! The authoritative two-track schedule.
//!
//! The store owns the `original` baseline and the `modified` working copy.
//! Both are replaced together on load or restore, and for every original
//! record there is exactly one modified record with the same key.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::flight::{ColumnMap, FlightKey, FlightRecord, RecordPatch, Track};
use super::time::offset_in_range;
use crate::error::{IngestError, StoreError};

/// Parsed source rows, in source order, with the header order preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTable {
    pub columns: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
}

/// Both tracks, as handed to the persistence collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Source column order, used when exporting.
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(rename = "data")]
    pub original: Vec<FlightRecord>,
    #[serde(rename = "dataModified")]
    pub modified: Vec<FlightRecord>,
}

/// Owns the original and modified flight records.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    columns: ColumnMap,
    order: Vec<String>,
    original: Vec<FlightRecord>,
    modified: Vec<FlightRecord>,
    /// Position of each key in both vectors. Both tracks share the order.
    index: HashMap<FlightKey, usize>,
}

impl RecordStore {
    pub fn new(columns: ColumnMap) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Source column order of the loaded data.
    pub fn column_order(&self) -> &[String] {
        &self.order
    }

    /// Column order for exports and edit forms. Falls back to the core
    /// columns plus the pass-through attributes when the source order is
    /// unknown.
    pub fn export_order(&self) -> Vec<String> {
        if !self.order.is_empty() {
            return self.order.clone();
        }
        let c = &self.columns;
        [
            &c.kind,
            &c.number,
            &c.aircraft,
            &c.departure,
            &c.arrival,
            &c.origin,
            &c.destination,
        ]
        .into_iter()
        .cloned()
        .chain(
            self.original
                .first()
                .into_iter()
                .flat_map(|r| r.attributes.keys().cloned()),
        )
        .collect()
    }

    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    pub fn records(&self, track: Track) -> &[FlightRecord] {
        match track {
            Track::Original => &self.original,
            Track::Modified => &self.modified,
        }
    }

    /// Replace both tracks from source rows. Nothing changes on error.
    pub fn load(&mut self, table: &SourceTable) -> Result<(), IngestError> {
        for required in self.columns.required() {
            if !table.columns.iter().any(|c| c == required) {
                return Err(IngestError::MissingColumn(required.to_string()));
            }
        }
        if table.rows.is_empty() {
            return Err(IngestError::Empty);
        }

        let mut original = Vec::with_capacity(table.rows.len());
        let mut index = HashMap::with_capacity(table.rows.len());
        for (i, fields) in table.rows.iter().enumerate() {
            let row = i + 1;
            let record = FlightRecord::from_row(row, fields, &self.columns)?;
            if index.insert(record.key.clone(), i).is_some() {
                return Err(IngestError::DuplicateKey {
                    row,
                    key: record.key,
                });
            }
            original.push(record);
        }
        let modified = original
            .iter()
            .map(|r| r.on_track(Track::Modified))
            .collect();

        self.order = table.columns.clone();
        self.original = original;
        self.modified = modified;
        self.index = index;
        tracing::info!(flights = self.original.len(), "schedule loaded");
        Ok(())
    }

    /// Replace both tracks from a saved snapshot after checking that the
    /// tracks are paired. Nothing changes on error.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<(), IngestError> {
        if snapshot.original.len() != snapshot.modified.len() {
            return Err(IngestError::Unpaired(format!(
                "{} original vs {} modified records",
                snapshot.original.len(),
                snapshot.modified.len()
            )));
        }
        if snapshot.original.is_empty() {
            return Err(IngestError::Empty);
        }

        let mut index = HashMap::with_capacity(snapshot.original.len());
        for (i, (orig, modi)) in snapshot
            .original
            .iter()
            .zip(snapshot.modified.iter())
            .enumerate()
        {
            if orig.key != modi.key {
                return Err(IngestError::Unpaired(format!(
                    "position {} holds {} and {}",
                    i, orig.key, modi.key
                )));
            }
            if orig.track != Track::Original || modi.track != Track::Modified {
                return Err(IngestError::Unpaired(format!(
                    "flight {} is on the wrong track",
                    orig.key
                )));
            }
            for record in [orig, modi] {
                let times = [
                    (&self.columns.departure, record.departure),
                    (&self.columns.arrival, record.arrival),
                ];
                if let Some((field, offset)) = times.into_iter().find(|(_, o)| !offset_in_range(*o)) {
                    return Err(IngestError::InvalidNumber {
                        row: i + 1,
                        field: field.clone(),
                        value: offset.to_string(),
                    });
                }
            }
            if index.insert(orig.key.clone(), i).is_some() {
                return Err(IngestError::DuplicateKey {
                    row: i + 1,
                    key: orig.key.clone(),
                });
            }
        }

        self.order = snapshot.columns;
        self.original = snapshot.original;
        self.modified = snapshot.modified;
        self.index = index;
        tracing::info!(flights = self.original.len(), "schedule restored from snapshot");
        Ok(())
    }

    pub fn find(&self, track: Track, key: &FlightKey) -> Result<&FlightRecord, StoreError> {
        self.index
            .get(key)
            .map(|&i| &self.records(track)[i])
            .ok_or_else(|| StoreError::NotFound {
                track,
                key: key.clone(),
            })
    }

    /// Apply a patch to a modified-track record and return the updated record.
    ///
    /// The patch is validated against the current group set before anything
    /// is written.
    pub fn mutate(
        &mut self,
        track: Track,
        key: &FlightKey,
        patch: &RecordPatch,
    ) -> Result<&FlightRecord, StoreError> {
        if track == Track::Original {
            return Err(StoreError::ImmutableRecord { key: key.clone() });
        }
        let i = *self.index.get(key).ok_or_else(|| StoreError::NotFound {
            track,
            key: key.clone(),
        })?;
        if let Some(aircraft) = patch.aircraft {
            if !self.has_aircraft(aircraft) {
                return Err(StoreError::UnknownAircraft(aircraft));
            }
        }
        let times = [
            (&self.columns.departure, patch.departure),
            (&self.columns.arrival, patch.arrival),
        ];
        for (field, offset) in times {
            if let Some(offset) = offset.filter(|&o| !offset_in_range(o)) {
                return Err(StoreError::InvalidNumber {
                    field: field.clone(),
                    value: offset.to_string(),
                });
            }
        }
        let record = &mut self.modified[i];
        record.apply(patch);
        tracing::debug!(flight = %key, aircraft = record.aircraft, "record updated");
        Ok(record)
    }

    /// Reset the modified track to a copy of the original.
    pub fn discard_modifications(&mut self) {
        self.modified = self
            .original
            .iter()
            .map(|r| r.on_track(Track::Modified))
            .collect();
        tracing::info!(flights = self.modified.len(), "modifications discarded");
    }

    /// Whether any working-track record differs from its original.
    pub fn has_modifications(&self) -> bool {
        self.original
            .iter()
            .zip(&self.modified)
            .any(|(original, modified)| modified.on_track(Track::Original) != *original)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            columns: self.order.clone(),
            original: self.original.clone(),
            modified: self.modified.clone(),
        }
    }

    /// Distinct aircraft of the baseline, ascending.
    pub fn aircraft(&self) -> Vec<u32> {
        self.original
            .iter()
            .map(|r| r.aircraft)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn has_aircraft(&self, aircraft: u32) -> bool {
        self.original.iter().any(|r| r.aircraft == aircraft)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn table(rows: &[(&str, i64, u32, i64, i64)]) -> SourceTable {
        let columns: Vec<String> = ["TYPE", "Flight", "AC", "DET", "ART", "DEP", "ARR", "COST"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = rows
            .iter()
            .map(|(kind, number, ac, det, art)| {
                let mut row = BTreeMap::new();
                row.insert("TYPE".to_string(), kind.to_string());
                row.insert("Flight".to_string(), number.to_string());
                row.insert("AC".to_string(), ac.to_string());
                row.insert("DET".to_string(), det.to_string());
                row.insert("ART".to_string(), art.to_string());
                row.insert("DEP".to_string(), "PEK".to_string());
                row.insert("ARR".to_string(), "SHA".to_string());
                row.insert("COST".to_string(), "100".to_string());
                row
            })
            .collect();
        SourceTable { columns, rows }
    }

    fn loaded() -> RecordStore {
        let mut store = RecordStore::new(ColumnMap::default());
        store
            .load(&table(&[
                ("CA", 1, 3, 0, 60),
                ("CA", 2, 3, 90, 150),
                ("MU", 1, 4, 30, 120),
            ]))
            .unwrap();
        store
    }

    #[test]
    fn test_load_pairs_tracks() {
        let store = loaded();
        assert_eq!(store.len(), 3);
        assert_eq!(store.records(Track::Original).len(), store.records(Track::Modified).len());
        for (o, m) in store
            .records(Track::Original)
            .iter()
            .zip(store.records(Track::Modified))
        {
            assert_eq!(o.key, m.key);
            assert_eq!(o.track, Track::Original);
            assert_eq!(m.track, Track::Modified);
            assert_eq!(o.on_track(Track::Modified), *m);
        }
    }

    #[test]
    fn test_load_is_atomic() {
        let mut store = loaded();
        let before = store.snapshot();

        let mut bad = table(&[("CA", 9, 1, 0, 10), ("CA", 10, 1, 20, 30)]);
        bad.rows[1].insert("DET".into(), "soon".into());
        assert!(matches!(
            store.load(&bad),
            Err(IngestError::InvalidNumber { row: 2, .. })
        ));
        assert_eq!(store.snapshot(), before);

        let dup = table(&[("CA", 9, 1, 0, 10), ("CA", 9, 1, 20, 30)]);
        assert!(matches!(store.load(&dup), Err(IngestError::DuplicateKey { row: 2, .. })));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_load_requires_columns() {
        let mut store = RecordStore::new(ColumnMap::default());
        let mut t = table(&[("CA", 1, 3, 0, 60)]);
        t.columns.retain(|c| c != "ART");
        assert!(matches!(store.load(&t), Err(IngestError::MissingColumn(c)) if c == "ART"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_find() {
        let store = loaded();
        let key = FlightKey::new("MU", 1);
        assert_eq!(store.find(Track::Modified, &key).unwrap().aircraft, 4);
        assert_eq!(
            store.find(Track::Original, &FlightKey::new("ZZ", 1)),
            Err(StoreError::NotFound {
                track: Track::Original,
                key: FlightKey::new("ZZ", 1)
            })
        );
    }

    #[test]
    fn test_mutate_modified_only() {
        let mut store = loaded();
        let key = FlightKey::new("CA", 1);
        let updated = store
            .mutate(Track::Modified, &key, &RecordPatch::schedule(4, 10, 70))
            .unwrap();
        assert_eq!((updated.aircraft, updated.departure, updated.arrival), (4, 10, 70));
        assert_eq!(store.find(Track::Original, &key).unwrap().aircraft, 3);

        assert_eq!(
            store.mutate(Track::Original, &key, &RecordPatch::schedule(4, 0, 1)),
            Err(StoreError::ImmutableRecord { key: key.clone() })
        );
    }

    #[test]
    fn test_mutate_unknown_aircraft_leaves_record() {
        let mut store = loaded();
        let key = FlightKey::new("CA", 2);
        let before = store.find(Track::Modified, &key).unwrap().clone();
        assert_eq!(
            store.mutate(Track::Modified, &key, &RecordPatch::schedule(99, 0, 1)),
            Err(StoreError::UnknownAircraft(99))
        );
        assert_eq!(store.find(Track::Modified, &key).unwrap(), &before);
    }

    #[test]
    fn test_load_rejects_unrepresentable_time() {
        let mut store = loaded();
        let before = store.snapshot();
        let far = table(&[("CA", 9, 1, 0, 10), ("CA", 10, 1, 0, 999_999_999_999)]);
        assert!(matches!(
            store.load(&far),
            Err(IngestError::InvalidNumber { row: 2, ref field, .. }) if field == "ART"
        ));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_mutate_rejects_unrepresentable_time() {
        let mut store = loaded();
        let key = FlightKey::new("CA", 1);
        let before = store.find(Track::Modified, &key).unwrap().clone();
        assert_eq!(
            store.mutate(Track::Modified, &key, &RecordPatch::schedule(3, 0, i64::MAX)),
            Err(StoreError::InvalidNumber {
                field: "ART".into(),
                value: i64::MAX.to_string()
            })
        );
        assert_eq!(store.find(Track::Modified, &key).unwrap(), &before);
    }

    #[test]
    fn test_has_modifications() {
        let mut store = loaded();
        assert!(!store.has_modifications());
        let key = FlightKey::new("MU", 1);
        store
            .mutate(Track::Modified, &key, &RecordPatch::schedule(4, 40, 130))
            .unwrap();
        assert!(store.has_modifications());
        store
            .mutate(Track::Modified, &key, &RecordPatch::schedule(4, 30, 120))
            .unwrap();
        assert!(!store.has_modifications());
    }

    #[test]
    fn test_restore_rejects_unrepresentable_time() {
        let mut snap = loaded().snapshot();
        snap.modified[1].departure = -999_999_999_999;
        let mut store = RecordStore::new(ColumnMap::default());
        assert!(matches!(
            store.restore(snap),
            Err(IngestError::InvalidNumber { row: 2, ref field, .. }) if field == "DET"
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_restore() {
        let mut store = loaded();
        store
            .mutate(
                Track::Modified,
                &FlightKey::new("CA", 2),
                &RecordPatch::schedule(4, 95, 155),
            )
            .unwrap();
        let snap = store.snapshot();

        let mut other = RecordStore::new(ColumnMap::default());
        other.restore(snap.clone()).unwrap();
        assert_eq!(other.snapshot(), snap);
        assert_eq!(
            other
                .find(Track::Modified, &FlightKey::new("CA", 2))
                .unwrap()
                .departure,
            95
        );
    }

    #[test]
    fn test_restore_rejects_unpaired() {
        let mut snap = loaded().snapshot();
        snap.modified.pop();
        let mut store = RecordStore::new(ColumnMap::default());
        assert!(matches!(store.restore(snap), Err(IngestError::Unpaired(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_discard_modifications() {
        let mut store = loaded();
        let key = FlightKey::new("CA", 1);
        store
            .mutate(Track::Modified, &key, &RecordPatch::schedule(4, 5, 65))
            .unwrap();
        store.discard_modifications();
        assert_eq!(
            store.find(Track::Modified, &key).unwrap(),
            &store.find(Track::Original, &key).unwrap().on_track(Track::Modified)
        );
    }

    #[test]
    fn test_export_order_fallback() {
        let mut store = RecordStore::new(ColumnMap::default());
        let mut snap = loaded().snapshot();
        snap.columns.clear();
        store.restore(snap).unwrap();
        assert_eq!(
            store.export_order(),
            vec!["TYPE", "Flight", "AC", "DET", "ART", "DEP", "ARR", "COST"]
        );
        assert_eq!(loaded().export_order(), loaded().column_order());
    }

    #[test]
    fn test_aircraft() {
        assert_eq!(loaded().aircraft(), vec![3, 4]);
    }
}
