//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{config_file, load_config};

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config_file(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let (mut cfg, _) = load_config(global)?;
            if cfg.api_token.is_some() {
                cfg.api_token = Some("****".into());
            }
            if cfg.cache_path.is_none() {
                cfg.cache_path = Some(cfg.cache_path());
            }

            let toml_str = toml::to_string_pretty(&cfg)
                .map_err(|e| CliError::Internal(format!("TOML serialization failed: {e}")))?;
            let out = output::render_single(global.output, &cfg, |_| toml_str.trim_end().to_owned())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
