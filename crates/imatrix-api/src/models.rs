// iMatrix API response types
//
// Wire models for the handful of endpoints the bridge consumes. Fields use
// `#[serde(default)]` liberally because the API omits keys instead of
// sending nulls. Serials and sensor ids arrive as numbers on most accounts
// and as strings on some, so both are normalized to `String`.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

// ── Identifier normalization ─────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(v: StringOrNumber) -> Self {
        match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(d).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(d).map(|v| v.map(String::from))
}

// ── Things ───────────────────────────────────────────────────────────

/// Page envelope from `GET /things?page=1&per_page=100`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThingList {
    #[serde(default)]
    pub list: Vec<ThingRecord>,
}

/// One registered thing as listed by the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThingRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub sn: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(
        default,
        rename = "currentVersion",
        deserialize_with = "opt_string_or_number"
    )]
    pub current_version: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
}

/// Product metadata from `GET /things/{sn}/product`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, rename = "shortName")]
    pub short_name: Option<String>,
    #[serde(default, rename = "iconUrl")]
    pub icon_url: Option<String>,
}

// ── Sensors ──────────────────────────────────────────────────────────

/// One channel from the sensor catalog `GET /things/{sn}/sensors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
}

/// Body of `GET /things/{sn}/sensors/last`, keyed by serial.
pub type LatestValues = HashMap<String, ThingLatest>;

/// Latest-values snapshot for a single thing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThingLatest {
    /// Epoch milliseconds of the most recent check-in.
    #[serde(default, rename = "lastSeen")]
    pub last_seen: Option<i64>,
    #[serde(default, rename = "sensorsData")]
    pub sensors_data: HashMap<String, SensorSample>,
}

impl ThingLatest {
    /// Raw value reported for a sensor id, if the channel is present.
    pub fn value(&self, sensor_id: &str) -> Option<&serde_json::Value> {
        self.sensors_data.get(sensor_id).map(|s| &s.value)
    }
}

/// A single raw reading. The value is left untyped: numeric channels
/// usually send numbers, but strings and nulls both occur in the wild.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorSample {
    #[serde(default)]
    pub value: serde_json::Value,
}
