// Thing and sensor endpoints
//
// All four are authenticated GETs and share the refresh-once policy in
// `ImatrixClient::get_authed`.

use tracing::debug;

use crate::client::ImatrixClient;
use crate::error::Error;
use crate::models::{LatestValues, Product, SensorRecord, ThingLatest, ThingList, ThingRecord};

/// The only page size the bridge requests. Things past the first page
/// are not listed.
pub const THINGS_PAGE_SIZE: u32 = 100;

impl ImatrixClient {
    /// List the account's things (first page only).
    ///
    /// `GET /things?page=1&per_page=100`
    pub async fn list_things(&self) -> Result<Vec<ThingRecord>, Error> {
        let page: ThingList = self
            .get_authed(
                &["things"],
                &[
                    ("page", "1".to_owned()),
                    ("per_page", THINGS_PAGE_SIZE.to_string()),
                ],
            )
            .await?;
        debug!(count = page.list.len(), "listed things");
        Ok(page.list)
    }

    /// Product metadata (model name, icon) for one thing.
    ///
    /// `GET /things/{sn}/product`
    pub async fn get_product(&self, sn: &str) -> Result<Product, Error> {
        self.get_authed(&["things", sn, "product"], &[]).await
    }

    /// Sensor catalog (channel metadata) for one thing.
    ///
    /// `GET /things/{sn}/sensors`
    pub async fn list_sensors(&self, sn: &str) -> Result<Vec<SensorRecord>, Error> {
        self.get_authed(&["things", sn, "sensors"], &[]).await
    }

    /// Latest readings and last check-in for one thing.
    ///
    /// `GET /things/{sn}/sensors/last`. The body is keyed by serial; a
    /// response without this thing's key yields an empty snapshot.
    pub async fn latest_values(&self, sn: &str) -> Result<ThingLatest, Error> {
        let mut all: LatestValues = self
            .get_authed(&["things", sn, "sensors", "last"], &[])
            .await?;
        Ok(all.remove(sn).unwrap_or_default())
    }
}
