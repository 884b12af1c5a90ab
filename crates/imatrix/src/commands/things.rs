//! Thing listing.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use imatrix_core::{Hub, HubConfig, Thing};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// A thing plus the number of entities discovery created for it.
#[derive(Serialize)]
struct ThingListing {
    #[serde(flatten)]
    thing: Arc<Thing>,
    entity_count: usize,
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ThingRow {
    #[tabled(rename = "Serial")]
    sn: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Entities")]
    entities: usize,
}

impl From<&ThingListing> for ThingRow {
    fn from(listing: &ThingListing) -> Self {
        let thing = &listing.thing;
        Self {
            sn: thing.sn.clone(),
            name: thing.name.clone(),
            model: thing.model.clone(),
            firmware: thing.firmware.clone().unwrap_or_default(),
            mac: thing.mac.clone().unwrap_or_default(),
            entities: listing.entity_count,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(hub_config: HubConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let listings = Hub::oneshot(hub_config, |hub| async move {
        let listings: Vec<ThingListing> = hub
            .things_snapshot()
            .iter()
            .map(|thing| ThingListing {
                entity_count: hub.store().entity_ids_for_thing(&thing.sn).len(),
                thing: Arc::clone(thing),
            })
            .collect();
        Ok(listings)
    })
    .await?;

    let out = output::render_list(
        &global.output,
        &listings,
        |l| ThingRow::from(l),
        |l| l.thing.sn.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
