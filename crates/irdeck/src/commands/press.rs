//! `irdeck press`: one-shot resolve-and-send.

use irdeck_core::Bridge;

use crate::cli::{GlobalOpts, PressArgs};
use crate::error::CliError;

pub async fn handle(bridge: &Bridge, args: &PressArgs, global: &GlobalOpts) -> Result<(), CliError> {
    bridge.sync_registry().await?;
    bridge.press(&args.remote, &args.button).await?;

    if !global.quiet {
        eprintln!("Pressed '{}' on '{}'", args.button, args.remote);
    }
    Ok(())
}
