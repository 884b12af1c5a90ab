//! Runtime layer between `imatrix-api` and consumers (the CLI).
//!
//! - **[`Hub`]**: lifecycle facade for one account.
//!   [`setup()`](Hub::setup) logs in, runs a discovery pass and spawns one
//!   poll task per entity; [`unload()`](Hub::unload) cancels them.
//!   [`Hub::oneshot()`](Hub::oneshot) is the no-polling mode for single CLI
//!   invocations.
//!
//! - **[`DataStore`]**: `DashMap` + `tokio::sync::watch` storage for things
//!   and entities. Poll tasks only touch their own entry.
//!
//! - **Domain model** ([`model`]): [`Thing`], [`SensorDescriptor`],
//!   [`Entity`] and its typed [`EntityValue`].
//!
//! - **[`units`]**: the vendor unit table (display unit, device class,
//!   icon, rounding).

pub mod config;
pub mod discovery;
pub mod error;
pub mod hub;
pub mod model;
pub mod store;
pub mod units;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_POLL_INTERVAL, DEFAULT_SETUP_RETRY_DELAY, HubConfig, TlsVerification};
pub use discovery::{DiscoveredThing, build_entities, discover};
pub use error::CoreError;
pub use hub::{Hub, HubState};
pub use store::DataStore;
pub use units::{DeviceClass, Rounding, UnitMapping};

pub use model::{
    ChannelKind, DeviceInfo, Entity, EntityKind, EntityValue, PollOutcome, SensorDescriptor, Thing,
};
