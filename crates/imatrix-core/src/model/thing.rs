// ── Thing domain type ──

use imatrix_api::{Product, SensorRecord, ThingRecord};
use serde::Serialize;

use crate::units;

pub const MANUFACTURER: &str = "iMatrix";
const CONFIGURATION_URL_BASE: &str = "https://app.imatrixsys.com/things";
const UNKNOWN_MODEL: &str = "Unknown";

/// A remote device registered under the account. Immutable after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thing {
    pub sn: String,
    /// Display name, `Thing <sn>` when the account has none.
    pub name: String,
    pub firmware: Option<String>,
    pub mac: Option<String>,
    /// Product short name, `Unknown` when missing.
    pub model: String,
    /// Only kept when it is an absolute http(s) URL.
    pub icon_url: Option<String>,
}

impl Thing {
    pub fn from_api(record: ThingRecord, product: Product) -> Self {
        let name = record
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Thing {}", record.sn));

        Self {
            name,
            firmware: record.current_version,
            mac: record.mac,
            model: product
                .short_name
                .unwrap_or_else(|| UNKNOWN_MODEL.to_owned()),
            icon_url: product.icon_url.filter(|u| u.starts_with("http")),
            sn: record.sn,
        }
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifier: self.sn.clone(),
            name: self.name.clone(),
            manufacturer: MANUFACTURER,
            model: self.model.clone(),
            sw_version: self.firmware.clone(),
            serial_number: self.sn.clone(),
            mac: self.mac.clone(),
            configuration_url: format!("{CONFIGURATION_URL_BASE}/{}", self.sn),
            icon_url: self.icon_url.clone(),
        }
    }
}

/// Device grouping shared by every entity of one thing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Keyed by thing serial.
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: String,
    pub sw_version: Option<String>,
    pub serial_number: String,
    pub mac: Option<String>,
    pub configuration_url: String,
    pub icon_url: Option<String>,
}

/// Whether a channel carries a number or the inverted tamper flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Numeric,
    Tamper,
}

/// Metadata for one telemetry channel of a thing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorDescriptor {
    /// Unique within its thing.
    pub id: String,
    pub name: String,
    pub units: Option<String>,
    pub kind: ChannelKind,
}

impl SensorDescriptor {
    pub fn from_api(record: SensorRecord) -> Self {
        let kind = if units::is_tamper(record.units.as_deref()) {
            ChannelKind::Tamper
        } else {
            ChannelKind::Numeric
        };
        Self {
            name: record
                .name
                .unwrap_or_else(|| format!("Sensor {}", record.id)),
            id: record.id,
            units: record.units,
            kind,
        }
    }
}
