//! Shift definitions for the shift calendar.
//!
//! A shift definition maps shift ids to `[start, end]` hour offsets from
//! midnight. Offsets past 24 describe shifts that end on the following day,
//! e.g. `"3": [21, 29.5]` runs from 21:00 to 05:30 the next morning.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

/// One recurring daily shift.
#[derive(Debug, Clone, PartialEq)]
pub struct Shift {
    pub id: String,
    /// Start offset in hours from midnight of the shift day.
    pub start_hours: f64,
    /// End offset in hours from midnight of the shift day.
    pub end_hours: f64,
}

impl Shift {
    pub fn new(id: impl Into<String>, start_hours: f64, end_hours: f64) -> Self {
        Self {
            id: id.into(),
            start_hours,
            end_hours,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidShift {
            shift_id: self.id.clone(),
            reason: reason.to_string(),
        };
        if self.id.trim().is_empty() {
            return Err(invalid("shift id must not be empty"));
        }
        if !self.start_hours.is_finite() || !self.end_hours.is_finite() {
            return Err(invalid("hour offsets must be finite numbers"));
        }
        if self.start_hours < 0.0 {
            return Err(invalid("start must not be negative"));
        }
        if self.end_hours <= self.start_hours {
            return Err(invalid("end must be after start"));
        }
        Ok(())
    }
}

/// Ordered set of shifts. Always validated; overlap is not checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftDefinition {
    shifts: Vec<Shift>,
}

impl ShiftDefinition {
    /// Build and validate a definition.
    pub fn new(shifts: Vec<Shift>) -> Result<Self, ConfigError> {
        if shifts.is_empty() {
            return Err(ConfigError::EmptyShiftDefinition);
        }
        for (idx, shift) in shifts.iter().enumerate() {
            shift.validate()?;
            if shifts[..idx].iter().any(|other| other.id == shift.id) {
                return Err(ConfigError::InvalidShift {
                    shift_id: shift.id.clone(),
                    reason: "shift id is defined more than once".to_string(),
                });
            }
        }
        Ok(Self { shifts })
    }

    /// Build from `(id, [start, end])` pairs, as read from configuration.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let shifts = pairs
            .into_iter()
            .map(|(id, hours)| {
                let id = id.into();
                match hours.as_slice() {
                    [start, end] => Ok(Shift::new(id, *start, *end)),
                    _ => Err(ConfigError::InvalidShift {
                        shift_id: id,
                        reason: format!("expected [start, end], got {} value(s)", hours.len()),
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(shifts)
    }

    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }

    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }
}

impl Default for ShiftDefinition {
    fn default() -> Self {
        Self {
            shifts: vec![
                Shift::new("1", 5.5, 14.0),
                Shift::new("2", 14.0, 21.0),
                Shift::new("3", 21.0, 29.5),
            ],
        }
    }
}

impl Serialize for ShiftDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.shifts.len()))?;
        for shift in &self.shifts {
            map.serialize_entry(&shift.id, &[shift.start_hours, shift.end_hours])?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ShiftDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ShiftDefinitionVisitor)
    }
}

struct ShiftDefinitionVisitor;

impl<'de> Visitor<'de> for ShiftDefinitionVisitor {
    type Value = ShiftDefinition;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of shift id to [start_hours, end_hours]")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut pairs: Vec<(String, Vec<f64>)> = Vec::new();
        while let Some((id, hours)) = access.next_entry::<String, Vec<f64>>()? {
            pairs.push((id, hours));
        }
        ShiftDefinition::from_pairs(pairs).map_err(de::Error::custom)
    }
}
