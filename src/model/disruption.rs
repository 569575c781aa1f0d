//! Disruption scenarios submitted to the solver.
//!
//! A disruption names what is affected (a flight, an aircraft or an
//! airport), when it starts, and how large it is. The shape of the value
//! depends on the kind: a delay magnitude for flights, nothing for aircraft
//! (sent as 0), a closure window for airports.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::time::parse_hhmm;
use crate::error::DisruptionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisruptionKind {
    Flight,
    Aircraft,
    Airport,
}

impl DisruptionKind {
    pub fn all() -> &'static [DisruptionKind] {
        &[
            DisruptionKind::Flight,
            DisruptionKind::Aircraft,
            DisruptionKind::Airport,
        ]
    }

    /// Wire code of the kind.
    pub fn code(self) -> &'static str {
        match self {
            DisruptionKind::Flight => "1",
            DisruptionKind::Aircraft => "2",
            DisruptionKind::Airport => "3",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, DisruptionError> {
        match code.trim() {
            "1" => Ok(DisruptionKind::Flight),
            "2" => Ok(DisruptionKind::Aircraft),
            "3" => Ok(DisruptionKind::Airport),
            other => Err(DisruptionError::UnknownKind(other.to_string())),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisruptionKind::Flight => "flight",
            DisruptionKind::Aircraft => "aircraft",
            DisruptionKind::Airport => "airport",
        }
    }

    /// Whether the index must be numeric.
    fn numeric_index(self) -> bool {
        self != DisruptionKind::Airport
    }
}

/// Size of a disruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisruptionValue {
    /// Delay or magnitude in schedule units.
    Magnitude(i64),
    /// Aircraft disruptions carry no value.
    Unset,
    /// Closure window, minutes after midnight.
    Window { from: u32, to: u32 },
}

impl DisruptionValue {
    fn wire(&self) -> String {
        match self {
            DisruptionValue::Magnitude(v) => v.to_string(),
            DisruptionValue::Unset => "0".to_string(),
            DisruptionValue::Window { from, to } => format!(
                "{:02}{:02}-{:02}{:02}",
                from / 60,
                from % 60,
                to / 60,
                to % 60
            ),
        }
    }
}

/// A validated disruption ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disruption {
    pub kind: DisruptionKind,
    pub index: String,
    /// Minutes from the schedule base at which the disruption starts.
    pub time: u32,
    pub value: DisruptionValue,
}

impl Serialize for Disruption {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("dis", self.kind.code())?;
        map.serialize_entry("dis_ind", &self.index)?;
        map.serialize_entry("dis_time", &self.time)?;
        map.serialize_entry("dis_value", &self.value.wire())?;
        map.end()
    }
}

/// Raw text of the disruption dialog. Kept between openings of the dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisruptionForm {
    pub kind: DisruptionKind,
    pub index: String,
    pub time: String,
    /// Magnitude for flight disruptions.
    pub magnitude: String,
    /// Window start (`HHMM`) for airport disruptions.
    pub window_from: String,
    /// Window end (`HHMM`) for airport disruptions.
    pub window_to: String,
}

impl Default for DisruptionForm {
    fn default() -> Self {
        Self {
            kind: DisruptionKind::Flight,
            index: String::new(),
            time: String::new(),
            magnitude: String::new(),
            window_from: String::new(),
            window_to: String::new(),
        }
    }
}

impl DisruptionForm {
    pub fn parse(&self) -> Result<Disruption, DisruptionError> {
        let index = self.index.trim();
        if index.is_empty() {
            return Err(DisruptionError::MissingIndex);
        }
        if self.kind.numeric_index() && !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DisruptionError::NonNumericIndex(self.kind.label()));
        }

        let time = self
            .time
            .trim()
            .parse::<u32>()
            .map_err(|_| DisruptionError::InvalidTime(self.time.clone()))?;

        let value = match self.kind {
            DisruptionKind::Flight => {
                let magnitude = self
                    .magnitude
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| DisruptionError::InvalidMagnitude(self.magnitude.clone()))?;
                DisruptionValue::Magnitude(magnitude)
            }
            DisruptionKind::Aircraft => DisruptionValue::Unset,
            DisruptionKind::Airport => {
                let range = format!("{}-{}", self.window_from.trim(), self.window_to.trim());
                match (parse_hhmm(&self.window_from), parse_hhmm(&self.window_to)) {
                    (Some(from), Some(to)) => DisruptionValue::Window { from, to },
                    _ => return Err(DisruptionError::InvalidRange(range)),
                }
            }
        };

        Ok(Disruption {
            kind: self.kind,
            index: index.to_string(),
            time,
            value,
        })
    }
}
