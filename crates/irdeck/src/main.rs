mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The bridge is a daemon: log progress by default.
    let base = u8::from(matches!(cli.command, Command::Run(_)));
    init_tracing(base.saturating_add(cli.global.verbose), cli.global.quiet);

    if let Err(err) = run(&cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, quiet: bool) {
    let level = match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = format!("warn,irdeck={level},irdeck_core={level},irdeck_api={level}");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    let global = &cli.global;

    match &cli.command {
        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "irdeck", &mut std::io::stdout());
            Ok(())
        }

        // Config commands never contact the backend
        Command::Config(args) => commands::config_cmd::handle(args, global),

        Command::Accessories => {
            let (cfg, _) = commands::load_config(global)?;
            commands::accessories::handle(&cfg, global).await
        }

        Command::Remotes => {
            let (cfg, path) = commands::load_config(global)?;
            let (bridge, _) = commands::connect(&cfg, &path).await?;
            commands::remotes::handle(&bridge, global).await
        }

        Command::Press(args) => {
            let (cfg, path) = commands::load_config(global)?;
            let (bridge, _) = commands::connect(&cfg, &path).await?;
            commands::press::handle(&bridge, args, global).await
        }

        Command::Run(args) => {
            let (cfg, path) = commands::load_config(global)?;
            let (bridge, cached) = commands::connect(&cfg, &path).await?;
            tracing::info!(
                config = %path.display(),
                cache = %cfg.cache_path().display(),
                backend = %cfg.backend,
                "starting irdeck"
            );
            bridge.restore(cached);
            commands::run::handle(&bridge, args, global).await
        }
    }
}
