// ── Domain model ──
//
// Canonical types built from API responses during discovery.

pub mod entity;
pub mod thing;

pub use entity::{Entity, EntityKind, EntityValue, PollOutcome, parse_raw};
pub use thing::{ChannelKind, DeviceInfo, MANUFACTURER, SensorDescriptor, Thing};
