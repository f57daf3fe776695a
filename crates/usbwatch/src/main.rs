mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use usbwatch_core::Monitor;

use crate::cli::{Cli, Command};
use crate::commands::Render;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands never start detection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "usbwatch", &mut std::io::stdout());
            Ok(())
        }

        // Everything else runs against a started monitor
        cmd => {
            let cfg = config::load(&cli.global)?;
            let render = Render {
                format: config::output_format(&cli.global, &cfg)?,
                color: output::should_color(config::color_mode(&cli.global, &cfg)?),
                quiet: cli.global.quiet,
            };
            let monitor = Monitor::new(config::monitor_config(&cli.global, &cfg)?)?;

            tracing::debug!(command = ?cmd, strategy = %monitor.strategy(), "dispatching command");
            monitor.start().await?;
            let result = commands::dispatch(cmd, &monitor, &render).await;
            monitor.stop().await;
            result
        }
    }
}
