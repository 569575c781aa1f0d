//! Projection of flight records onto the timeline.
//!
//! Every record becomes one [`TimelineItem`]. Original-track records land in
//! the aircraft's fixed row and are frozen; modified-track records land in
//! the aircraft's shadow row and can be dragged. Items are derived data: the
//! coordinator rebuilds them from the record store and the renderer only
//! reads them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;

use super::overlap::OverlapInterval;
use crate::model::{FlightKey, FlightRecord, RecordStore, TimeCodec, Track};

/// A resource row: one aircraft on one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId {
    pub aircraft: u32,
    pub track: Track,
}

impl GroupId {
    pub fn new(aircraft: u32, track: Track) -> Self {
        Self { aircraft, track }
    }

    pub fn original(aircraft: u32) -> Self {
        Self::new(aircraft, Track::Original)
    }

    pub fn shadow(aircraft: u32) -> Self {
        Self::new(aircraft, Track::Modified)
    }

    pub fn is_shadow(&self) -> bool {
        self.track == Track::Modified
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.track {
            Track::Original => write!(f, "{}", self.aircraft),
            Track::Modified => write!(f, "{}.5", self.aircraft),
        }
    }
}

/// Stable identity of an item: the flight plus its track.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId {
    pub key: FlightKey,
    pub track: Track,
}

impl ItemId {
    pub fn new(key: FlightKey, track: Track) -> Self {
        Self { key, track }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.track {
            Track::Original => write!(f, "{}", self.key),
            Track::Modified => write!(f, "{}-modified", self.key),
        }
    }
}

/// What the renderer may do with an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Editability {
    pub can_move_time: bool,
    pub can_move_group: bool,
}

impl Editability {
    pub fn for_track(track: Track) -> Self {
        let editable = track.is_editable();
        Self {
            can_move_time: editable,
            can_move_group: editable,
        }
    }
}

/// Render payload of a flight bar.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightCard {
    pub kind: String,
    pub number: i64,
    pub departure: String,
    pub arrival: String,
    pub origin: String,
    pub destination: String,
    /// Hue in degrees, stable per flight and aircraft.
    pub hue: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineItem {
    pub id: ItemId,
    pub group: GroupId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub overlap: bool,
    pub editable: Editability,
    pub card: FlightCard,
}

impl TimelineItem {
    pub fn project(record: &FlightRecord, codec: &TimeCodec) -> Self {
        Self {
            id: ItemId::new(record.key.clone(), record.track),
            group: GroupId::new(record.aircraft, record.track),
            start: codec.to_absolute(record.departure),
            end: codec.to_absolute(record.arrival),
            overlap: false,
            editable: Editability::for_track(record.track),
            card: FlightCard::project(record, codec),
        }
    }

    /// Re-derive everything except identity and the overlap flag.
    fn refresh(&mut self, record: &FlightRecord, codec: &TimeCodec) {
        self.group = GroupId::new(record.aircraft, record.track);
        self.start = codec.to_absolute(record.departure);
        self.end = codec.to_absolute(record.arrival);
        self.card = FlightCard::project(record, codec);
    }
}

impl FlightCard {
    fn project(record: &FlightRecord, codec: &TimeCodec) -> Self {
        Self {
            kind: record.key.kind.clone(),
            number: record.key.number,
            departure: codec.clock_label(record.departure),
            arrival: codec.clock_label(record.arrival),
            origin: record.origin.clone(),
            destination: record.destination.clone(),
            hue: flight_hue(record.key.number, record.aircraft),
            opacity: match record.track {
                Track::Original => 1.0,
                Track::Modified => 0.5,
            },
        }
    }
}

/// Hue for a flight on an aircraft, from a 31-multiplier string hash of
/// `"{flight}-{aircraft}"`.
pub fn flight_hue(number: i64, aircraft: u32) -> f32 {
    let text = format!("{}-{}", number, aircraft);
    let hash = text.chars().fold(0i32, |hash, c| {
        (c as i32).wrapping_add((hash << 5).wrapping_sub(hash))
    });
    hash.rem_euclid(360) as f32
}

/// A row header.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: GroupId,
    pub label: String,
}

/// The item store the renderer draws: items, rows and overlap markers.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    items: BTreeMap<ItemId, TimelineItem>,
    groups: Vec<Group>,
    markers: BTreeMap<GroupId, Vec<OverlapInterval>>,
}

impl Timeline {
    /// Project the whole store. Markers start empty.
    pub fn project(store: &RecordStore, codec: &TimeCodec) -> Self {
        let groups = store
            .aircraft()
            .into_iter()
            .flat_map(|aircraft| {
                [
                    Group {
                        id: GroupId::original(aircraft),
                        label: aircraft.to_string(),
                    },
                    Group {
                        id: GroupId::shadow(aircraft),
                        label: format!("{} ✎", aircraft),
                    },
                ]
            })
            .collect();

        let items = [Track::Original, Track::Modified]
            .iter()
            .flat_map(|&track| store.records(track))
            .map(|record| {
                let item = TimelineItem::project(record, codec);
                (item.id.clone(), item)
            })
            .collect();

        Self {
            items,
            groups,
            markers: BTreeMap::new(),
        }
    }

    /// Rows in display order: each aircraft's original row above its shadow.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn has_group(&self, id: GroupId) -> bool {
        self.groups.iter().any(|g| g.id == id)
    }

    pub fn items(&self) -> impl Iterator<Item = &TimelineItem> {
        self.items.values()
    }

    pub fn item(&self, id: &ItemId) -> Option<&TimelineItem> {
        self.items.get(id)
    }

    pub fn items_in(&self, group: GroupId) -> impl Iterator<Item = &TimelineItem> {
        self.items.values().filter(move |item| item.group == group)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Markers of one group, ordered by start.
    pub fn markers(&self, group: GroupId) -> &[OverlapInterval] {
        self.markers.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_markers(&self) -> impl Iterator<Item = &OverlapInterval> {
        self.markers.values().flatten()
    }

    /// Re-derive the item of a record in place. Returns the item's previous
    /// group, or `None` if the record has no item.
    pub fn refresh(&mut self, record: &FlightRecord, codec: &TimeCodec) -> Option<GroupId> {
        let id = ItemId::new(record.key.clone(), record.track);
        let item = self.items.get_mut(&id)?;
        let previous = item.group;
        item.refresh(record, codec);
        Some(previous)
    }

    /// Replace the original-track items with a solved schedule. The solved
    /// items stay frozen. Records on aircraft without a row are skipped.
    pub fn apply_solution(&mut self, records: &[FlightRecord], codec: &TimeCodec) -> usize {
        self.items.retain(|id, _| id.track != Track::Original);
        let mut applied = 0;
        for record in records {
            let record = record.on_track(Track::Original);
            if !self.has_group(GroupId::original(record.aircraft)) {
                tracing::warn!(flight = %record.key, aircraft = record.aircraft, "solved flight has no row, skipped");
                continue;
            }
            let item = TimelineItem::project(&record, codec);
            self.items.insert(item.id.clone(), item);
            applied += 1;
        }
        applied
    }

    pub(crate) fn item_mut(&mut self, id: &ItemId) -> Option<&mut TimelineItem> {
        self.items.get_mut(id)
    }

    pub(crate) fn items_in_mut(
        &mut self,
        group: GroupId,
    ) -> impl Iterator<Item = &mut TimelineItem> {
        self.items
            .values_mut()
            .filter(move |item| item.group == group)
    }

    pub(crate) fn replace_markers(&mut self, group: GroupId, markers: Vec<OverlapInterval>) {
        if markers.is_empty() {
            self.markers.remove(&group);
        } else {
            self.markers.insert(group, markers);
        }
    }
}
