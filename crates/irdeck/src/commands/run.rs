//! `irdeck run`: the long-running bridge.

use tracing::info;

use irdeck_core::{Bridge, PassSummary};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::output;

fn describe(summary: &PassSummary) -> String {
    let r = &summary.remotes;
    let a = &summary.accessories;
    format!(
        "remotes:     {} added, {} updated, {} removed, {} skipped\n\
         accessories: {} registered, {} updated, {} unregistered, {} attached, {} unexposed, {} failed",
        r.added,
        r.updated,
        r.removed,
        r.skipped,
        a.registered,
        a.updated,
        a.unregistered,
        a.attached,
        a.unexposed,
        a.failed,
    )
}

pub async fn handle(bridge: &Bridge, args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if args.once {
        let result = bridge.reconcile().await;
        bridge.shutdown().await;
        let summary = result?;

        let out = output::render_single(global.output, &summary, describe)?;
        output::print_output(&out, global.quiet);
        return Ok(());
    }

    bridge.start().await;
    info!("bridge running, press Ctrl-C to stop");

    let signal = tokio::signal::ctrl_c().await;
    info!("shutting down");
    bridge.shutdown().await;
    signal?;
    Ok(())
}
