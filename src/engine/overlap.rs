//! Sweep-line detection of aircraft conflicts on the shadow track.
//!
//! Two flights on one aircraft conflict when their half-open intervals
//! `[start, end)` intersect. A pass over a group flags every conflicting
//! item and yields one marker per maximal window in which more than one
//! flight is active.

use std::cmp::Ordering;

use chrono::NaiveDateTime;

use super::projection::{GroupId, Timeline, TimelineItem};

/// A window in which an aircraft is double-booked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapInterval {
    pub group: GroupId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl OverlapInterval {
    /// Marker id, unique per group and window start.
    pub fn id(&self) -> String {
        format!(
            "overlap-{}-{}",
            self.group,
            self.start.and_utc().timestamp_millis()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    // Ends sort first so touching intervals never count as overlapping.
    End,
    Start,
}

#[derive(Debug, Clone, Copy)]
struct Event {
    at: NaiveDateTime,
    kind: EventKind,
    item: usize,
}

/// Result of sweeping a set of intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sweep {
    /// Conflict windows in ascending order.
    pub windows: Vec<(NaiveDateTime, NaiveDateTime)>,
    /// Whether each input interval takes part in a conflict.
    pub flagged: Vec<bool>,
}

/// Sweep half-open intervals. Intervals with `end <= start` take no part.
pub fn sweep(spans: &[(NaiveDateTime, NaiveDateTime)]) -> Sweep {
    let mut events: Vec<Event> = spans
        .iter()
        .enumerate()
        .filter(|(_, (start, end))| end > start)
        .flat_map(|(item, &(start, end))| {
            [
                Event {
                    at: start,
                    kind: EventKind::Start,
                    item,
                },
                Event {
                    at: end,
                    kind: EventKind::End,
                    item,
                },
            ]
        })
        .collect();
    events.sort_by(|a, b| match a.at.cmp(&b.at) {
        Ordering::Equal => a.kind.cmp(&b.kind).then(a.item.cmp(&b.item)),
        other => other,
    });

    let mut result = Sweep {
        windows: Vec::new(),
        flagged: vec![false; spans.len()],
    };
    let mut active: Vec<usize> = Vec::new();
    let mut window_start: Option<NaiveDateTime> = None;

    for event in &events {
        match event.kind {
            EventKind::Start => {
                active.push(event.item);
                if active.len() > 1 {
                    window_start.get_or_insert(event.at);
                    for &i in &active {
                        result.flagged[i] = true;
                    }
                }
            }
            EventKind::End => {
                active.retain(|&i| i != event.item);
                if active.len() == 1 {
                    if let Some(start) = window_start.take() {
                        result.windows.push((start, event.at));
                    }
                }
            }
        }
    }

    // Only reachable if the event list is cut short; close at the last event.
    if let (Some(start), Some(last)) = (window_start, events.last()) {
        result.windows.push((start, last.at));
    }
    result
}

/// Recompute overlap flags and markers of one group.
///
/// Every item of the group is unflagged first. Original-track groups are
/// never flagged and yield no markers.
pub fn detect(timeline: &mut Timeline, group: GroupId) -> Vec<OverlapInterval> {
    let shadow = group.is_shadow();
    let mut ids = Vec::new();
    let mut spans = Vec::new();
    for item in timeline.items_in_mut(group) {
        item.overlap = false;
        if !shadow {
            continue;
        }
        if item.end <= item.start {
            tracing::warn!(item = %item.id, "flight ends before it starts, ignored for overlaps");
        }
        ids.push(item.id.clone());
        spans.push((item.start, item.end));
    }
    if !shadow {
        return Vec::new();
    }

    let result = sweep(&spans);
    for (id, flagged) in ids.iter().zip(&result.flagged) {
        if *flagged {
            if let Some(item) = timeline.item_mut(id) {
                item.overlap = true;
            }
        }
    }
    tracing::debug!(%group, windows = result.windows.len(), "overlap sweep");
    result
        .windows
        .into_iter()
        .map(|(start, end)| OverlapInterval { group, start, end })
        .collect()
}

/// Discard the markers of `groups`, re-run detection for each and store the
/// new markers. Other groups are not touched.
pub fn reconcile(timeline: &mut Timeline, groups: &[GroupId]) {
    for &group in groups {
        let markers = detect(timeline, group);
        timeline.replace_markers(group, markers);
    }
}

/// Reconcile every group of the timeline.
pub fn reconcile_all(timeline: &mut Timeline) {
    let groups: Vec<GroupId> = timeline.groups().iter().map(|g| g.id).collect();
    reconcile(timeline, &groups);
}

/// Whether `[start, end)` intersects any of `others`.
pub fn overlaps_any<'a>(
    start: NaiveDateTime,
    end: NaiveDateTime,
    others: impl IntoIterator<Item = &'a TimelineItem>,
) -> bool {
    others
        .into_iter()
        .any(|other| start < other.end && other.start < end)
}
