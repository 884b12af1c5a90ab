// ── Vendor unit mapping ──
//
// One static table from iMatrix unit strings to display unit, device
// class, icon and rounding. `Tamper` channels never reach this table:
// they are boolean and handled by the entity model.

use serde::Serialize;
use strum::{AsRefStr, Display};

/// Vendor unit string marking a boolean tamper channel.
pub const TAMPER_UNIT: &str = "Tamper";

/// Semantic class of an entity, used by consumers for formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceClass {
    Temperature,
    Humidity,
    Pressure,
    SignalStrength,
    Battery,
    Tamper,
    Timestamp,
}

/// How many decimals a numeric reading keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    Integer,
    Decimals(u8),
}

impl Rounding {
    /// Round to this precision. Whole numbers round half to even; decimal
    /// places round the exact stored value, so `0.15` (held just below
    /// the tie) becomes `0.1`.
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::Integer => value.round_ties_even(),
            Self::Decimals(_) if !value.is_finite() => value,
            Self::Decimals(_) => self.format(value).parse().unwrap_or(value),
        }
    }

    /// Render an already-rounded value with exactly this many decimals.
    pub fn format(self, value: f64) -> String {
        match self {
            Self::Integer => format!("{value:.0}"),
            Self::Decimals(places) => format!("{value:.prec$}", prec = usize::from(places)),
        }
    }
}

/// Everything the display layer needs to know about a vendor unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitMapping {
    pub display_unit: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
    pub icon: Option<&'static str>,
    pub rounding: Rounding,
}

const fn mapping(
    display_unit: Option<&'static str>,
    device_class: Option<DeviceClass>,
    icon: Option<&'static str>,
    rounding: Rounding,
) -> UnitMapping {
    UnitMapping {
        display_unit,
        device_class,
        icon,
        rounding,
    }
}

const ONE_DECIMAL: Rounding = Rounding::Decimals(1);

/// Any unit not listed below: no display unit, no class, one decimal.
pub const DEFAULT_MAPPING: UnitMapping = mapping(None, None, None, ONE_DECIMAL);

// Seconds and Volts have a display unit but no device class: the
// duration/voltage classes would reformat the value on screen.
const UNIT_TABLE: &[(&str, UnitMapping)] = &[
    (
        "Deg. C",
        mapping(Some("°C"), Some(DeviceClass::Temperature), None, ONE_DECIMAL),
    ),
    (
        "%RH",
        mapping(Some("%"), Some(DeviceClass::Humidity), None, ONE_DECIMAL),
    ),
    (
        "kPa",
        mapping(Some("kPa"), Some(DeviceClass::Pressure), None, ONE_DECIMAL),
    ),
    (
        "Volts",
        mapping(Some("V"), None, Some("mdi:sine-wave"), Rounding::Decimals(2)),
    ),
    (
        "V",
        mapping(Some("V"), None, Some("mdi:sine-wave"), Rounding::Decimals(2)),
    ),
    ("Bps", mapping(Some("Bps"), None, None, ONE_DECIMAL)),
    ("bps", mapping(Some("bps"), None, None, ONE_DECIMAL)),
    (
        "dB",
        mapping(Some("dB"), Some(DeviceClass::SignalStrength), None, ONE_DECIMAL),
    ),
    (
        "Level",
        mapping(Some("%"), Some(DeviceClass::Battery), None, ONE_DECIMAL),
    ),
    (
        "Seconds",
        mapping(Some("s"), None, Some("mdi:clock-outline"), Rounding::Integer),
    ),
    (
        "s",
        mapping(Some("s"), None, Some("mdi:clock-outline"), Rounding::Integer),
    ),
    ("Thing(s)", mapping(None, None, None, Rounding::Integer)),
    ("Count", mapping(None, None, None, Rounding::Integer)),
];

/// Look up a vendor unit. Unknown or missing units get [`DEFAULT_MAPPING`].
pub fn lookup(vendor_unit: Option<&str>) -> UnitMapping {
    let Some(unit) = vendor_unit else {
        return DEFAULT_MAPPING;
    };
    UNIT_TABLE
        .iter()
        .find(|(key, _)| *key == unit)
        .map_or(DEFAULT_MAPPING, |(_, m)| *m)
}

/// Icon for a numeric channel. Door counters (`Count` units whose name
/// starts with "Open") get a door icon on top of the table entry.
pub fn icon_for(vendor_unit: Option<&str>, sensor_name: &str) -> Option<&'static str> {
    if vendor_unit == Some("Count") && sensor_name.starts_with("Open") {
        return Some("mdi:door-open");
    }
    lookup(vendor_unit).icon
}

pub fn is_tamper(vendor_unit: Option<&str>) -> bool {
    vendor_unit == Some(TAMPER_UNIT)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn integer_units_round_to_whole_numbers() {
        for unit in ["Seconds", "s", "Count", "Thing(s)"] {
            let rounded = lookup(Some(unit)).rounding.apply(63.7);
            assert_eq!(rounded, 64.0, "unit {unit}");
            assert_eq!(rounded.fract(), 0.0);
        }
    }

    #[test]
    fn volts_keep_two_decimals() {
        for unit in ["Volts", "V"] {
            let m = lookup(Some(unit));
            assert_eq!(m.rounding.apply(3.14159), 3.14);
            assert_eq!(m.rounding.format(3.14), "3.14");
        }
    }

    #[test]
    fn other_units_keep_one_decimal() {
        for unit in [Some("Deg. C"), Some("%RH"), Some("kPa"), Some("dB"), Some("furlongs"), None] {
            assert_eq!(lookup(unit).rounding.apply(21.73), 21.7, "unit {unit:?}");
        }
    }

    #[test]
    fn ties_round_to_even() {
        assert_eq!(Rounding::Integer.apply(2.5), 2.0);
        assert_eq!(Rounding::Integer.apply(3.5), 4.0);
    }

    #[test]
    fn decimals_round_the_stored_value() {
        assert_eq!(Rounding::Decimals(1).apply(0.15), 0.1);
        assert_eq!(Rounding::Decimals(1).apply(0.35), 0.3);
        assert_eq!(Rounding::Decimals(1).apply(0.45), 0.5);
        assert_eq!(Rounding::Decimals(2).apply(2.675), 2.67);
        assert_eq!(Rounding::Decimals(1).apply(-21.76), -21.8);
    }

    #[test]
    fn device_class_suppressed_for_seconds_and_volts() {
        for unit in ["Seconds", "s", "Volts", "V"] {
            let m = lookup(Some(unit));
            assert!(m.display_unit.is_some(), "unit {unit} should map a display unit");
            assert!(m.device_class.is_none(), "unit {unit} must not infer a class");
        }
        assert_eq!(
            lookup(Some("Deg. C")).device_class,
            Some(DeviceClass::Temperature)
        );
        assert_eq!(lookup(Some("Level")).display_unit, Some("%"));
        assert_eq!(lookup(Some("Level")).device_class, Some(DeviceClass::Battery));
    }

    #[test]
    fn icons() {
        assert_eq!(icon_for(Some("Volts"), "Battery"), Some("mdi:sine-wave"));
        assert_eq!(icon_for(Some("s"), "Uptime"), Some("mdi:clock-outline"));
        assert_eq!(icon_for(Some("Count"), "Open events"), Some("mdi:door-open"));
        assert_eq!(icon_for(Some("Count"), "Reboots"), None);
        assert_eq!(icon_for(Some("Deg. C"), "Open air"), None);
    }

    #[test]
    fn tamper_is_not_in_the_numeric_table() {
        assert!(is_tamper(Some("Tamper")));
        assert!(!is_tamper(Some("tamper")));
        assert_eq!(lookup(Some(TAMPER_UNIT)), DEFAULT_MAPPING);
    }

    #[test]
    fn device_class_names_are_snake_case() {
        assert_eq!(DeviceClass::SignalStrength.to_string(), "signal_strength");
        assert_eq!(DeviceClass::Tamper.as_ref(), "tamper");
    }
}
