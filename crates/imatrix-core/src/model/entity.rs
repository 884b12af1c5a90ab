// ── Entity domain type ──
//
// An entity is the exposed, pollable object bound to one sensor channel
// (numeric or tamper) or to a thing's last check-in. Entities are plain
// data; the hub's poll tasks hold the client and call `apply` with each
// fresh latest-values snapshot.

use chrono::{DateTime, SecondsFormat, Utc};
use imatrix_api::ThingLatest;
use serde::Serialize;
use strum::{AsRefStr, Display};

use super::thing::{ChannelKind, DeviceInfo, SensorDescriptor, Thing};
use crate::units::{self, DeviceClass, UnitMapping};

const TAMPER_ICON: &str = "mdi:toggle-switch";
const LAST_SEEN_KEY: &str = "last_seen";

/// Result of one poll, reported for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PollOutcome {
    /// The value was recomputed (possibly to unknown).
    Updated,
    /// The snapshot carried nothing usable; the prior value was kept.
    Rejected,
    /// The fetch itself failed; the prior value was kept.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    Sensor {
        sensor_id: String,
        vendor_unit: Option<String>,
        mapping: UnitMapping,
        icon: Option<&'static str>,
    },
    Tamper {
        sensor_id: String,
    },
    LastSeen,
}

/// Typed current value. `None` inside a variant means unknown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityValue {
    Number(Option<f64>),
    Binary(Option<bool>),
    Timestamp(Option<DateTime<Utc>>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    /// `<sn>_<sensor_id>` or `<sn>_last_seen`.
    pub unique_id: String,
    pub name: String,
    pub thing_sn: String,
    pub device: DeviceInfo,
    pub kind: EntityKind,
    pub value: EntityValue,
    /// When a poll last produced `Updated`.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity {
    /// Entity for one catalog channel, value not yet known.
    pub fn for_sensor(thing: &Thing, sensor: &SensorDescriptor) -> Self {
        let (kind, value) = match sensor.kind {
            ChannelKind::Tamper => (
                EntityKind::Tamper {
                    sensor_id: sensor.id.clone(),
                },
                EntityValue::Binary(None),
            ),
            ChannelKind::Numeric => (
                EntityKind::Sensor {
                    sensor_id: sensor.id.clone(),
                    vendor_unit: sensor.units.clone(),
                    mapping: units::lookup(sensor.units.as_deref()),
                    icon: units::icon_for(sensor.units.as_deref(), &sensor.name),
                },
                EntityValue::Number(None),
            ),
        };

        Self {
            unique_id: format!("{}_{}", thing.sn, sensor.id),
            name: format!("{}: {}", thing.name, sensor.name),
            thing_sn: thing.sn.clone(),
            device: thing.device_info(),
            kind,
            value,
            updated_at: None,
        }
    }

    /// Entity for the thing's last check-in time.
    pub fn last_seen(thing: &Thing) -> Self {
        Self {
            unique_id: format!("{}_{LAST_SEEN_KEY}", thing.sn),
            name: format!("{}: Last Seen", thing.name),
            thing_sn: thing.sn.clone(),
            device: thing.device_info(),
            kind: EntityKind::LastSeen,
            value: EntityValue::Timestamp(None),
            updated_at: None,
        }
    }

    /// Map key for the entity store.
    pub fn key(&self) -> &str {
        &self.unique_id
    }

    pub fn sensor_id(&self) -> Option<&str> {
        match &self.kind {
            EntityKind::Sensor { sensor_id, .. } | EntityKind::Tamper { sensor_id } => {
                Some(sensor_id)
            }
            EntityKind::LastSeen => None,
        }
    }

    pub fn device_class(&self) -> Option<DeviceClass> {
        match &self.kind {
            EntityKind::Sensor { mapping, .. } => mapping.device_class,
            EntityKind::Tamper { .. } => Some(DeviceClass::Tamper),
            EntityKind::LastSeen => Some(DeviceClass::Timestamp),
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match &self.kind {
            EntityKind::Sensor { mapping, .. } => mapping.display_unit,
            EntityKind::Tamper { .. } | EntityKind::LastSeen => None,
        }
    }

    pub fn icon(&self) -> Option<&'static str> {
        match &self.kind {
            EntityKind::Sensor { icon, .. } => *icon,
            EntityKind::Tamper { .. } => Some(TAMPER_ICON),
            EntityKind::LastSeen => None,
        }
    }

    /// Numeric sensors are measurements; nothing else has a state class.
    pub fn state_class(&self) -> Option<&'static str> {
        matches!(self.kind, EntityKind::Sensor { .. }).then_some("measurement")
    }

    /// Recompute the value from a latest-values snapshot of this entity's thing.
    pub fn apply(&mut self, latest: &ThingLatest) -> PollOutcome {
        let outcome = match &self.kind {
            EntityKind::Sensor {
                sensor_id, mapping, ..
            } => {
                let parsed = latest.value(sensor_id).and_then(parse_raw);
                self.value = EntityValue::Number(parsed.map(|v| mapping.rounding.apply(v)));
                PollOutcome::Updated
            }
            EntityKind::Tamper { sensor_id } => {
                match latest.value(sensor_id).and_then(parse_raw) {
                    Some(v) => {
                        self.value = EntityValue::Binary(Some(tamper_triggered(v)));
                        PollOutcome::Updated
                    }
                    None => PollOutcome::Rejected,
                }
            }
            EntityKind::LastSeen => {
                match latest.last_seen.and_then(DateTime::from_timestamp_millis) {
                    Some(ts) => {
                        self.value = EntityValue::Timestamp(Some(ts));
                        PollOutcome::Updated
                    }
                    None => PollOutcome::Rejected,
                }
            }
        };

        if outcome == PollOutcome::Updated {
            self.updated_at = Some(Utc::now());
        }
        outcome
    }

    /// Human-readable state: rounded number, `on`/`off`, RFC 3339, or `unknown`.
    pub fn display_state(&self) -> String {
        match (&self.value, &self.kind) {
            (EntityValue::Number(Some(v)), EntityKind::Sensor { mapping, .. }) => {
                mapping.rounding.format(*v)
            }
            (EntityValue::Number(Some(v)), _) => v.to_string(),
            (EntityValue::Binary(Some(true)), _) => "on".into(),
            (EntityValue::Binary(Some(false)), _) => "off".into(),
            (EntityValue::Timestamp(Some(ts)), _) => {
                ts.to_rfc3339_opts(SecondsFormat::Secs, true)
            }
            (
                EntityValue::Number(None)
                | EntityValue::Binary(None)
                | EntityValue::Timestamp(None),
                _,
            ) => "unknown".into(),
        }
    }
}

/// Tamper polarity is inverted: exactly zero means triggered.
#[allow(clippy::float_cmp)]
fn tamper_triggered(raw: f64) -> bool {
    raw == 0.0
}

/// Interpret a raw reading as a finite number.
///
/// Accepts JSON numbers, numeric strings (surrounding whitespace allowed)
/// and booleans. Everything else is non-numeric.
pub fn parse_raw(raw: &serde_json::Value) -> Option<f64> {
    let n = match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        serde_json::Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        serde_json::Value::Null
        | serde_json::Value::Array(_)
        | serde_json::Value::Object(_) => None,
    };
    n.filter(|v| v.is_finite())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use imatrix_api::{Product, SensorRecord, ThingRecord};
    use serde_json::json;

    fn thing() -> Thing {
        let record: ThingRecord =
            serde_json::from_value(json!({ "sn": 42, "name": "Freezer" })).unwrap();
        Thing::from_api(record, Product::default())
    }

    fn sensor(id: u32, name: &str, units: &str) -> SensorDescriptor {
        let record: SensorRecord =
            serde_json::from_value(json!({ "id": id, "name": name, "units": units })).unwrap();
        SensorDescriptor::from_api(record)
    }

    fn snapshot(value: serde_json::Value) -> ThingLatest {
        serde_json::from_value(value).unwrap()
    }

    fn with_value(id: &str, value: serde_json::Value) -> ThingLatest {
        snapshot(json!({ "sensorsData": { id: { "value": value } } }))
    }

    #[test]
    fn identity_and_naming() {
        let entity = Entity::for_sensor(&thing(), &sensor(3, "Temperature", "Deg. C"));
        assert_eq!(entity.unique_id, "42_3");
        assert_eq!(entity.name, "Freezer: Temperature");
        assert_eq!(entity.unit(), Some("°C"));
        assert_eq!(entity.device_class(), Some(DeviceClass::Temperature));
        assert_eq!(entity.state_class(), Some("measurement"));

        let seen = Entity::last_seen(&thing());
        assert_eq!(seen.unique_id, "42_last_seen");
        assert_eq!(seen.name, "Freezer: Last Seen");
        assert_eq!(seen.device_class(), Some(DeviceClass::Timestamp));
        assert!(seen.state_class().is_none());
    }

    #[test]
    fn numeric_values_are_rounded_per_unit() {
        let mut temp = Entity::for_sensor(&thing(), &sensor(3, "Temperature", "Deg. C"));
        assert_eq!(temp.apply(&with_value("3", json!(21.73))), PollOutcome::Updated);
        assert_eq!(temp.value, EntityValue::Number(Some(21.7)));
        assert_eq!(temp.display_state(), "21.7");

        let mut uptime = Entity::for_sensor(&thing(), &sensor(4, "Uptime", "Seconds"));
        uptime.apply(&with_value("4", json!("63.7")));
        assert_eq!(uptime.value, EntityValue::Number(Some(64.0)));
        assert_eq!(uptime.display_state(), "64");

        let mut battery = Entity::for_sensor(&thing(), &sensor(5, "Battery", "Volts"));
        battery.apply(&with_value("5", json!(3.14159)));
        assert_eq!(battery.display_state(), "3.14");
    }

    #[test]
    fn non_numeric_value_becomes_unknown() {
        let mut temp = Entity::for_sensor(&thing(), &sensor(3, "Temperature", "Deg. C"));
        temp.apply(&with_value("3", json!(4.0)));

        assert_eq!(temp.apply(&with_value("3", json!("n/a"))), PollOutcome::Updated);
        assert_eq!(temp.value, EntityValue::Number(None));
        assert_eq!(temp.display_state(), "unknown");

        temp.apply(&with_value("3", json!(4.0)));
        assert_eq!(temp.apply(&snapshot(json!({}))), PollOutcome::Updated);
        assert_eq!(temp.value, EntityValue::Number(None));
    }

    #[test]
    fn tamper_polarity_is_inverted() {
        let mut lid = Entity::for_sensor(&thing(), &sensor(9, "Lid", "Tamper"));
        assert_eq!(lid.icon(), Some("mdi:toggle-switch"));
        assert_eq!(lid.device_class(), Some(DeviceClass::Tamper));

        lid.apply(&with_value("9", json!(0.0)));
        assert_eq!(lid.value, EntityValue::Binary(Some(true)));
        assert_eq!(lid.display_state(), "on");

        lid.apply(&with_value("9", json!(1.0)));
        assert_eq!(lid.value, EntityValue::Binary(Some(false)));
        assert_eq!(lid.display_state(), "off");
    }

    #[test]
    fn tamper_rejects_non_numeric_and_keeps_prior_value() {
        let mut lid = Entity::for_sensor(&thing(), &sensor(9, "Lid", "Tamper"));
        lid.apply(&with_value("9", json!(0)));

        assert_eq!(lid.apply(&with_value("9", json!("open"))), PollOutcome::Rejected);
        assert_eq!(lid.value, EntityValue::Binary(Some(true)));

        assert_eq!(lid.apply(&snapshot(json!({}))), PollOutcome::Rejected);
        assert_eq!(lid.value, EntityValue::Binary(Some(true)));
    }

    #[test]
    fn last_seen_tracks_snapshot_and_keeps_prior_when_absent() {
        let mut seen = Entity::last_seen(&thing());
        seen.apply(&snapshot(json!({ "lastSeen": 1_700_000_000_000_i64 })));
        assert_eq!(seen.display_state(), "2023-11-14T22:13:20Z");

        assert_eq!(seen.apply(&snapshot(json!({}))), PollOutcome::Rejected);
        assert_eq!(seen.display_state(), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn parse_raw_accepts_numbers_strings_and_bools() {
        assert_eq!(parse_raw(&json!(5)), Some(5.0));
        assert_eq!(parse_raw(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(parse_raw(&json!(true)), Some(1.0));
        assert_eq!(parse_raw(&json!("NaN")), None);
        assert_eq!(parse_raw(&json!(null)), None);
        assert_eq!(parse_raw(&json!([1])), None);
    }

    #[test]
    fn door_counter_icon() {
        let opens = Entity::for_sensor(&thing(), &sensor(6, "Open count", "Count"));
        assert_eq!(opens.icon(), Some("mdi:door-open"));
        assert!(opens.unit().is_none());
    }
}
