//! `irdeck remotes`: one-shot catalogue listing.

use std::sync::Arc;

use tabled::Tabled;

use irdeck_core::{Bridge, Remote};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RemoteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Buttons")]
    buttons: String,
}

impl RemoteRow {
    fn new(remote: &Arc<Remote>, color: bool) -> Self {
        Self {
            id: remote.id.to_string(),
            name: remote.name.clone(),
            tag: output::tag(&remote.tag, color),
            device: remote.device_id.to_string(),
            buttons: remote.button_names().join(", "),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    let summary = bridge.sync_registry().await?;
    if summary.skipped > 0 && !global.quiet {
        eprintln!("{} remote(s) skipped: their buttons could not be loaded", summary.skipped);
    }

    let remotes = bridge.remotes();
    let color = output::should_color(global.color);
    let out = output::render_list(
        global.output,
        &remotes,
        |r| RemoteRow::new(r, color),
        |r| r.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
