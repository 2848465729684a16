//! kve - Azure Key Vault item editor
//!
//! Thin binary over the `vaultedit` library: parses arguments, sets up
//! logging, loads configuration and runs the selected command.

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vaultedit::cli::{Cli, Commands};
use vaultedit::config::{self, Config};
use vaultedit::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The detached clipboard clearer runs silently
    let quiet = matches!(cli.command, Commands::ClipboardClear { .. });
    init_logging(cli.debug, quiet);

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    debug!("Starting kve {}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.command {
        // A broken config file must not lock the user out of fixing it
        Commands::Config { .. } => config::load_config().await.unwrap_or_else(|e| {
            eprintln!("Warning: ignoring configuration: {}", e);
            Config::default()
        }),
        _ => config::load_config().await?,
    };

    cli.execute(config).await
}

fn init_logging(debug: bool, quiet: bool) {
    let default_directive = match (debug, quiet) {
        (true, _) => "vaultedit=debug",
        (false, true) => "vaultedit=error",
        (false, false) => "vaultedit=info",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
