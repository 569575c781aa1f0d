use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, StoreError};
use crate::model::time::offset_in_range;

/// Composite identity of a flight: airline/type code plus flight number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlightKey {
    pub kind: String,
    pub number: i64,
}

impl FlightKey {
    pub fn new(kind: impl Into<String>, number: i64) -> Self {
        Self {
            kind: kind.into(),
            number,
        }
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.number)
    }
}

/// Which of the two parallel schedules a record or item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    /// The baseline as loaded. Never edited.
    Original,
    /// The operator's working copy.
    Modified,
}

impl Track {
    pub fn is_editable(self) -> bool {
        self == Track::Modified
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::Original => f.write_str("original"),
            Track::Modified => f.write_str("modified"),
        }
    }
}

/// Source column names of the fields the engine understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub kind: String,
    pub number: String,
    pub aircraft: String,
    pub departure: String,
    pub arrival: String,
    pub origin: String,
    pub destination: String,
    /// Pass-through columns that must hold integers when edited.
    pub numeric: Vec<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            kind: "TYPE".into(),
            number: "Flight".into(),
            aircraft: "AC".into(),
            departure: "DET".into(),
            arrival: "ART".into(),
            origin: "DEP".into(),
            destination: "ARR".into(),
            numeric: [
                "FT", "DIS", "CAP", "DEL", "COST", "DEM", "TIC", "P1", "P2", "P1_cost", "P2_cost",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ColumnMap {
    /// Columns every source row must provide.
    pub fn required(&self) -> [&str; 5] {
        [
            &self.kind,
            &self.number,
            &self.aircraft,
            &self.departure,
            &self.arrival,
        ]
    }

    fn is_key(&self, name: &str) -> bool {
        name == self.kind || name == self.number
    }
}

/// A scheduled flight leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub key: FlightKey,
    #[serde(rename = "status")]
    pub track: Track,
    /// Aircraft the leg is assigned to.
    pub aircraft: u32,
    /// Departure offset from the base date.
    pub departure: i64,
    /// Arrival offset from the base date.
    pub arrival: i64,
    pub origin: String,
    pub destination: String,
    /// Every other source column, kept as source text.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl FlightRecord {
    /// Build an original-track record from one source row.
    ///
    /// `row` is the 1-based data row number used in error messages.
    pub fn from_row(
        row: usize,
        fields: &BTreeMap<String, String>,
        columns: &ColumnMap,
    ) -> Result<Self, IngestError> {
        let text = |name: &str| -> Result<&str, IngestError> {
            match fields.get(name).map(|v| v.trim()) {
                Some(v) if !v.is_empty() => Ok(v),
                _ => Err(IngestError::MissingField {
                    row,
                    field: name.to_string(),
                }),
            }
        };
        let int = |name: &str| -> Result<i64, IngestError> {
            let value = text(name)?;
            parse_int(value).ok_or_else(|| IngestError::InvalidNumber {
                row,
                field: name.to_string(),
                value: value.to_string(),
            })
        };

        let kind = text(&columns.kind)?.to_string();
        let number = int(&columns.number)?;
        let aircraft_raw = int(&columns.aircraft)?;
        let aircraft = u32::try_from(aircraft_raw).map_err(|_| IngestError::InvalidNumber {
            row,
            field: columns.aircraft.clone(),
            value: aircraft_raw.to_string(),
        })?;
        let offset = |name: &str| -> Result<i64, IngestError> {
            let value = int(name)?;
            if offset_in_range(value) {
                Ok(value)
            } else {
                Err(IngestError::InvalidNumber {
                    row,
                    field: name.to_string(),
                    value: value.to_string(),
                })
            }
        };
        let departure = offset(&columns.departure)?;
        let arrival = offset(&columns.arrival)?;

        let optional = |name: &str| {
            fields
                .get(name)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let origin = optional(&columns.origin);
        let destination = optional(&columns.destination);

        let known = [
            &columns.kind,
            &columns.number,
            &columns.aircraft,
            &columns.departure,
            &columns.arrival,
            &columns.origin,
            &columns.destination,
        ];
        let attributes = fields
            .iter()
            .filter(|(name, _)| !known.contains(name))
            .map(|(name, value)| (name.clone(), value.trim().to_string()))
            .collect();

        Ok(Self {
            key: FlightKey::new(kind, number),
            track: Track::Original,
            aircraft,
            departure,
            arrival,
            origin,
            destination,
            attributes,
        })
    }

    /// Copy of this record on another track.
    pub fn on_track(&self, track: Track) -> Self {
        Self {
            track,
            ..self.clone()
        }
    }

    /// Text of a source column, whether it is a core field or pass-through.
    pub fn field(&self, name: &str, columns: &ColumnMap) -> Option<String> {
        if name == columns.kind {
            Some(self.key.kind.clone())
        } else if name == columns.number {
            Some(self.key.number.to_string())
        } else if name == columns.aircraft {
            Some(self.aircraft.to_string())
        } else if name == columns.departure {
            Some(self.departure.to_string())
        } else if name == columns.arrival {
            Some(self.arrival.to_string())
        } else if name == columns.origin {
            Some(self.origin.clone())
        } else if name == columns.destination {
            Some(self.destination.clone())
        } else {
            self.attributes.get(name).cloned()
        }
    }

    /// Values in the given column order. Unknown columns are empty.
    pub fn to_row(&self, order: &[String], columns: &ColumnMap) -> Vec<String> {
        order
            .iter()
            .map(|name| self.field(name, columns).unwrap_or_default())
            .collect()
    }

    /// Apply a validated patch in place.
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(aircraft) = patch.aircraft {
            self.aircraft = aircraft;
        }
        if let Some(departure) = patch.departure {
            self.departure = departure;
        }
        if let Some(arrival) = patch.arrival {
            self.arrival = arrival;
        }
        if let Some(origin) = &patch.origin {
            self.origin = origin.clone();
        }
        if let Some(destination) = &patch.destination {
            self.destination = destination.clone();
        }
        for (name, value) in &patch.attributes {
            self.attributes.insert(name.clone(), value.clone());
        }
    }
}

/// A set of field changes for a modified-track record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub aircraft: Option<u32>,
    pub departure: Option<i64>,
    pub arrival: Option<i64>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub attributes: Vec<(String, String)>,
}

impl RecordPatch {
    /// Patch produced by a drag: new aircraft and times.
    pub fn schedule(aircraft: u32, departure: i64, arrival: i64) -> Self {
        Self {
            aircraft: Some(aircraft),
            departure: Some(departure),
            arrival: Some(arrival),
            ..Default::default()
        }
    }

    /// Parse edit-form fields. Integer columns are parsed strictly, the rest
    /// are copied verbatim.
    pub fn from_fields(fields: &[(String, String)], columns: &ColumnMap) -> Result<Self, StoreError> {
        let mut patch = Self::default();
        for (name, value) in fields {
            if columns.is_key(name) {
                return Err(StoreError::KeyFieldImmutable { field: name.clone() });
            }
            let int = || {
                parse_int(value).ok_or_else(|| StoreError::InvalidNumber {
                    field: name.clone(),
                    value: value.clone(),
                })
            };
            if *name == columns.aircraft {
                let aircraft = int()?;
                patch.aircraft = Some(u32::try_from(aircraft).map_err(|_| {
                    StoreError::InvalidNumber {
                        field: name.clone(),
                        value: value.clone(),
                    }
                })?);
            } else if *name == columns.departure || *name == columns.arrival {
                let offset = int()?;
                if !offset_in_range(offset) {
                    return Err(StoreError::InvalidNumber {
                        field: name.clone(),
                        value: value.clone(),
                    });
                }
                if *name == columns.departure {
                    patch.departure = Some(offset);
                } else {
                    patch.arrival = Some(offset);
                }
            } else if *name == columns.origin {
                patch.origin = Some(value.trim().to_string());
            } else if *name == columns.destination {
                patch.destination = Some(value.trim().to_string());
            } else if columns.numeric.iter().any(|n| n == name) {
                patch.attributes.push((name.clone(), int()?.to_string()));
            } else {
                patch.attributes.push((name.clone(), value.clone()));
            }
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Strict integer parse. Surrounding whitespace is allowed, fractions are not.
pub fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sample_row() -> BTreeMap<String, String> {
        row(&[
            ("TYPE", "CA"),
            ("Flight", "1201"),
            ("AC", "3"),
            ("DET", "480"),
            ("ART", "615"),
            ("DEP", "PEK"),
            ("ARR", "SHA"),
            ("CAP", "180"),
            ("COST", "5400"),
        ])
    }

    #[test]
    fn test_from_row() {
        let r = FlightRecord::from_row(1, &sample_row(), &ColumnMap::default()).unwrap();
        assert_eq!(r.key, FlightKey::new("CA", 1201));
        assert_eq!(r.track, Track::Original);
        assert_eq!(r.aircraft, 3);
        assert_eq!((r.departure, r.arrival), (480, 615));
        assert_eq!(r.origin, "PEK");
        assert_eq!(r.attributes.get("CAP").map(String::as_str), Some("180"));
        assert!(!r.attributes.contains_key("AC"));
    }

    #[test]
    fn test_from_row_missing_field() {
        let mut fields = sample_row();
        fields.insert("AC".into(), "  ".into());
        let err = FlightRecord::from_row(7, &fields, &ColumnMap::default()).unwrap_err();
        assert!(matches!(err, IngestError::MissingField { row: 7, ref field } if field == "AC"));
    }

    #[test]
    fn test_from_row_rejects_fraction() {
        let mut fields = sample_row();
        fields.insert("DET".into(), "480.5".into());
        let err = FlightRecord::from_row(2, &fields, &ColumnMap::default()).unwrap_err();
        assert!(matches!(err, IngestError::InvalidNumber { row: 2, .. }));
    }

    #[test]
    fn test_from_row_rejects_unrepresentable_time() {
        let mut fields = sample_row();
        fields.insert("ART".into(), "999999999999".into());
        let err = FlightRecord::from_row(4, &fields, &ColumnMap::default()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::InvalidNumber { row: 4, ref field, .. } if field == "ART"
        ));
    }

    #[test]
    fn test_to_row_follows_order() {
        let r = FlightRecord::from_row(1, &sample_row(), &ColumnMap::default()).unwrap();
        let order: Vec<String> = ["Flight", "TYPE", "COST", "AC", "MISSING"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            r.to_row(&order, &ColumnMap::default()),
            vec!["1201", "CA", "5400", "3", ""]
        );
    }

    #[test]
    fn test_patch_from_fields() {
        let fields = vec![
            ("AC".to_string(), "4".to_string()),
            ("DET".to_string(), " 500 ".to_string()),
            ("DEP".to_string(), "CAN".to_string()),
            ("CAP".to_string(), "200".to_string()),
            ("NOTE".to_string(), "swap crew".to_string()),
        ];
        let patch = RecordPatch::from_fields(&fields, &ColumnMap::default()).unwrap();
        assert_eq!(patch.aircraft, Some(4));
        assert_eq!(patch.departure, Some(500));
        assert_eq!(patch.arrival, None);
        assert_eq!(patch.origin.as_deref(), Some("CAN"));
        assert_eq!(
            patch.attributes,
            vec![
                ("CAP".to_string(), "200".to_string()),
                ("NOTE".to_string(), "swap crew".to_string()),
            ]
        );
    }

    #[test]
    fn test_patch_rejects_bad_numbers_and_keys() {
        let columns = ColumnMap::default();
        let bad = vec![("COST".to_string(), "12.5".to_string())];
        assert_eq!(
            RecordPatch::from_fields(&bad, &columns),
            Err(StoreError::InvalidNumber {
                field: "COST".into(),
                value: "12.5".into()
            })
        );
        let key = vec![("Flight".to_string(), "99".to_string())];
        assert_eq!(
            RecordPatch::from_fields(&key, &columns),
            Err(StoreError::KeyFieldImmutable {
                field: "Flight".into()
            })
        );
        let negative_ac = vec![("AC".to_string(), "-1".to_string())];
        assert!(RecordPatch::from_fields(&negative_ac, &columns).is_err());
    }

    #[test]
    fn test_patch_rejects_unrepresentable_time() {
        let far = vec![("ART".to_string(), "999999999999".to_string())];
        assert_eq!(
            RecordPatch::from_fields(&far, &ColumnMap::default()),
            Err(StoreError::InvalidNumber {
                field: "ART".into(),
                value: "999999999999".into()
            })
        );
    }

    #[test]
    fn test_apply_patch() {
        let mut r = FlightRecord::from_row(1, &sample_row(), &ColumnMap::default()).unwrap();
        r.apply(&RecordPatch::schedule(5, 700, 820));
        assert_eq!((r.aircraft, r.departure, r.arrival), (5, 700, 820));
        assert_eq!(r.origin, "PEK");
    }

    #[test]
    fn test_track_serializes_as_status() {
        let r = FlightRecord::from_row(1, &sample_row(), &ColumnMap::default())
            .unwrap()
            .on_track(Track::Modified);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "modified");
    }
}
