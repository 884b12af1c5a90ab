//! Entity listing: one discovery pass, current values, then unload.

use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;
use tabled::Tabled;

use imatrix_core::{Entity, Hub, HubConfig};

use crate::cli::{EntitiesArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Icon")]
    icon: String,
}

impl From<&Arc<Entity>> for EntityRow {
    fn from(e: &Arc<Entity>) -> Self {
        Self {
            id: e.unique_id.clone(),
            name: e.name.clone(),
            state: e.display_state(),
            unit: e.unit().unwrap_or_default().to_owned(),
            class: e
                .device_class()
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            icon: e.icon().unwrap_or_default().to_owned(),
        }
    }
}

/// Spinner on stderr while the account is discovered.
pub(crate) fn discovery_spinner(global: &GlobalOpts) -> ProgressBar {
    if global.quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_message("Discovering things and sensors...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    hub_config: HubConfig,
    args: EntitiesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let spinner = discovery_spinner(global);
    let thing = args.thing.clone();
    let result = Hub::oneshot(hub_config, |hub| async move {
        let known = thing.as_deref().is_none_or(|sn| hub.store().thing(sn).is_some());
        Ok((hub.entities_snapshot(), known))
    })
    .await;
    spinner.finish_and_clear();
    let (entities, known) = result?;

    if !known {
        return Err(CliError::NotFound {
            resource_type: "thing".into(),
            identifier: args.thing.unwrap_or_default(),
            list_command: "things".into(),
        });
    }

    let selected: Vec<Arc<Entity>> = entities
        .iter()
        .filter(|e| args.thing.as_deref().is_none_or(|sn| e.thing_sn == sn))
        .cloned()
        .collect();

    let out = output::render_list(
        &global.output,
        &selected,
        |e| EntityRow::from(e),
        |e| e.unique_id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
