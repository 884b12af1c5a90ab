// ── Discovery pass ──
//
// One-time enumeration of things, product metadata, latest values and
// sensor catalogs. Any failing fetch abandons the whole pass, so a thing's
// entities are either fully built or not built at all.

use std::collections::HashSet;

use imatrix_api::{ImatrixClient, ThingLatest};
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{Entity, SensorDescriptor, Thing};

/// Everything fetched for one thing during discovery.
#[derive(Debug, Clone)]
pub struct DiscoveredThing {
    pub thing: Thing,
    pub sensors: Vec<SensorDescriptor>,
    /// Latest-values snapshot taken during discovery. Decides which
    /// channels get entities and seeds their initial values.
    pub latest: ThingLatest,
}

impl DiscoveredThing {
    /// One entity per catalog channel present in the snapshot, plus a
    /// last-seen entity when the snapshot carries `lastSeen`.
    ///
    /// Channels absent from the snapshot are skipped for good; duplicate
    /// catalog ids collapse to the first occurrence.
    pub fn entities(&self) -> Vec<Entity> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut entities = Vec::with_capacity(self.sensors.len() + 1);

        for sensor in &self.sensors {
            if !self.latest.sensors_data.contains_key(&sensor.id) {
                debug!(sn = %self.thing.sn, sensor = %sensor.id, "no latest value, skipping channel");
                continue;
            }
            if !seen.insert(sensor.id.as_str()) {
                debug!(sn = %self.thing.sn, sensor = %sensor.id, "duplicate sensor id in catalog");
                continue;
            }
            let mut entity = Entity::for_sensor(&self.thing, sensor);
            entity.apply(&self.latest);
            entities.push(entity);
        }

        if self.latest.last_seen.is_some() {
            let mut entity = Entity::last_seen(&self.thing);
            entity.apply(&self.latest);
            entities.push(entity);
        }

        entities
    }
}

/// Run one discovery pass against the account.
///
/// Per thing, fetches in order: product, latest values, sensor catalog.
/// Only the first page of things is requested.
pub async fn discover(client: &ImatrixClient) -> Result<Vec<DiscoveredThing>, CoreError> {
    let records = client.list_things().await?;
    debug!(count = records.len(), "thing list fetched");

    let mut seen = HashSet::new();
    let mut discovered = Vec::with_capacity(records.len());

    for record in records {
        if !seen.insert(record.sn.clone()) {
            warn!(sn = %record.sn, "thing listed twice, ignoring duplicate");
            continue;
        }

        let product = client.get_product(&record.sn).await?;
        let latest = client.latest_values(&record.sn).await?;
        let sensors = client
            .list_sensors(&record.sn)
            .await?
            .into_iter()
            .map(SensorDescriptor::from_api)
            .collect();

        discovered.push(DiscoveredThing {
            thing: Thing::from_api(record, product),
            sensors,
            latest,
        });
    }

    info!(things = discovered.len(), "discovery complete");
    Ok(discovered)
}

/// Flatten a discovery result into the entity set.
pub fn build_entities(discovered: &[DiscoveredThing]) -> Vec<Entity> {
    discovered.iter().flat_map(DiscoveredThing::entities).collect()
}
