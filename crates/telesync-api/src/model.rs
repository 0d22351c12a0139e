//! Telemetry snapshot model.
//!
//! A [`Snapshot`] bundles the four sensor channels the server reports.
//! Individual data points are owned by the upstream schema and kept as
//! opaque JSON; only counting and whole-unit replacement matter here.

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

// ── DataPoint ────────────────────────────────────────────────────────

/// A single telemetry row, exactly as the server sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataPoint(serde_json::Value);

impl DataPoint {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Look up a top-level field of the row.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for DataPoint {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

// ── Channel ──────────────────────────────────────────────────────────

/// One of the four sensor channels in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Channel {
    Battery,
    Motor,
    Mppt,
    Vehicle,
}

impl Channel {
    /// All channels in payload order.
    pub const ALL: [Self; 4] = [Self::Battery, Self::Motor, Self::Mppt, Self::Vehicle];

    /// Field name of this channel in the server's JSON payload.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Battery => "battery_data",
            Self::Motor => "motor_data",
            Self::Mppt => "mppt_data",
            Self::Vehicle => "vehicle_data",
        }
    }

    /// Human-readable label, e.g. for CSV export and tables.
    pub fn label(self) -> &'static str {
        match self {
            Self::Battery => "Battery",
            Self::Motor => "Motor",
            Self::Mppt => "MPPT",
            Self::Vehicle => "Vehicle",
        }
    }
}

// ── Snapshot ─────────────────────────────────────────────────────────

/// Four-channel telemetry bundle.
///
/// Missing or `null` channels decode as empty, so a payload that only
/// carries some channels still yields a complete snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub battery_data: Vec<DataPoint>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub motor_data: Vec<DataPoint>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub mppt_data: Vec<DataPoint>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub vehicle_data: Vec<DataPoint>,
}

impl Snapshot {
    pub fn points(&self, channel: Channel) -> &[DataPoint] {
        match channel {
            Channel::Battery => &self.battery_data,
            Channel::Motor => &self.motor_data,
            Channel::Mppt => &self.mppt_data,
            Channel::Vehicle => &self.vehicle_data,
        }
    }

    pub fn len(&self, channel: Channel) -> usize {
        self.points(channel).len()
    }

    /// Sum of all channel lengths.
    pub fn total_points(&self) -> usize {
        Channel::iter().map(|c| self.len(c)).sum()
    }

    /// `true` if any channel holds at least one point.
    pub fn has_data(&self) -> bool {
        Channel::iter().any(|c| self.len(c) > 0)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<DataPoint>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<DataPoint>>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Tests ────────────────────────────────────────────────────────────
