use clap::Parser;

use lex_config::LexConfig;
use lex_server::cli::{Cli, Commands};
use lex_server::commands;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("lexora error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let config = LexConfig::load_with_dotenv()?;

    match cli.command {
        Commands::Serve(args) => commands::serve::handle(&args, config).await,
        Commands::Migrate => commands::migrate::handle(&config).await,
        Commands::CreateAdmin(args) => commands::create_admin::handle(&args, &config).await,
        Commands::Ingest(args) => commands::ingest::handle(&args, &config).await,
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("LEXORA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
