// imatrix-api: Async Rust client for the iMatrix IoT telemetry API

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod things;
pub mod transport;

pub use auth::{Credentials, TokenStore, VerifyOutcome, verify_credentials};
pub use client::{AUTH_HEADER, ImatrixClient};
pub use error::Error;
pub use models::{
    LatestValues, Product, SensorRecord, SensorSample, ThingLatest, ThingList, ThingRecord,
};
pub use things::THINGS_PAGE_SIZE;
pub use transport::{TlsMode, TransportConfig};

/// Production API root. Every endpoint path is joined onto this.
pub const DEFAULT_BASE_URL: &str = "https://api.imatrixsys.com/api/v1";
