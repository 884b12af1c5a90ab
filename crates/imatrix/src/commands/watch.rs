//! Long-running mode: keep every entity polling and print value changes
//! until Ctrl-C.

use std::collections::HashMap;
use std::sync::Arc;

use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use imatrix_core::{Entity, Hub, HubConfig};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::entities::discovery_spinner;

pub async fn handle(
    hub_config: HubConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let hub_config = config::with_poll_interval(hub_config, args.interval)?;
    let period = hub_config.poll_interval;
    let hub = Hub::new(hub_config);

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let spinner = discovery_spinner(global);
    let setup = hub.setup_with_retry(&cancel).await;
    spinner.finish_and_clear();
    if let Err(e) = setup {
        interrupt.abort();
        if cancel.is_cancelled() {
            debug!(error = %e, "interrupted during setup");
            return Ok(());
        }
        return Err(e.into());
    }
    info!(
        entities = hub.store().entity_count(),
        discovered_at = ?hub.store().last_discovery(),
        ?period,
        "watching"
    );

    let color = output::should_color(&global.color);
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut rx = hub.store().subscribe_entities();

    // Current values first, then changes as polls land.
    let snapshot = rx.borrow_and_update().clone();
    print_changes(&snapshot, &mut seen, args.thing.as_deref(), global, color);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                print_changes(&snapshot, &mut seen, args.thing.as_deref(), global, color);
            }
        }
    }

    hub.unload().await;
    interrupt.abort();
    Ok(())
}

/// Print every entity whose displayed state differs from the last one
/// printed for it.
fn print_changes(
    snapshot: &[Arc<Entity>],
    seen: &mut HashMap<String, String>,
    thing: Option<&str>,
    global: &GlobalOpts,
    color: bool,
) {
    for entity in snapshot {
        if thing.is_some_and(|sn| entity.thing_sn != sn) {
            continue;
        }
        let state = entity.display_state();
        if seen.get(&entity.unique_id) == Some(&state) {
            continue;
        }
        let line = format_change(entity, &state, &global.output, color);
        output::print_output(&line, global.quiet);
        seen.insert(entity.unique_id.clone(), state);
    }
}

fn format_change(entity: &Entity, state: &str, format: &OutputFormat, color: bool) -> String {
    match format {
        // One document per line so the stream stays parseable.
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(entity, true),
        OutputFormat::Plain => format!("{} {state}", entity.unique_id),
        OutputFormat::Table | OutputFormat::Yaml => {
            let at = chrono::Local::now().format("%H:%M:%S").to_string();
            let unit = entity.unit().map(|u| format!(" {u}")).unwrap_or_default();
            if color {
                format!(
                    "{} {} {}{unit}  {}",
                    at.dimmed(),
                    entity.unique_id.cyan(),
                    state.bold(),
                    entity.name.dimmed()
                )
            } else {
                format!("{at} {} {state}{unit}  {}", entity.unique_id, entity.name)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use imatrix_core::{EntityKind, EntityValue, Thing};

    fn entity(value: Option<bool>) -> Entity {
        let thing = Thing {
            sn: "1001".into(),
            name: "Cold room".into(),
            firmware: None,
            mac: None,
            model: "Unknown".into(),
            icon_url: None,
        };
        Entity {
            unique_id: "1001_9".into(),
            name: "Door".into(),
            thing_sn: thing.sn.clone(),
            device: thing.device_info(),
            kind: EntityKind::Tamper {
                sensor_id: "9".into(),
            },
            value: EntityValue::Binary(value),
            updated_at: None,
        }
    }

    #[test]
    fn plain_change_line_is_id_and_state() {
        let e = entity(Some(true));
        let line = format_change(&e, &e.display_state(), &OutputFormat::Plain, false);
        assert_eq!(line, "1001_9 on");
    }

    #[test]
    fn json_change_line_is_single_document() {
        let e = entity(None);
        let line = format_change(&e, &e.display_state(), &OutputFormat::Json, false);
        assert!(!line.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["unique_id"], "1001_9");
        assert!(parsed["value"].is_null());
    }
}
