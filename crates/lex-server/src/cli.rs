use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI parser for the `lexora` binary.
#[derive(Debug, Parser)]
#[command(name = "lexora", version, about = "Lexora - English learning platform backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API and the abandoned-test sweeper
    Serve(ServeArgs),
    /// Create or upgrade the database schema and exit
    Migrate,
    /// Create an admin account
    CreateAdmin(CreateAdminArgs),
    /// Chunk, embed, and store a text file as a knowledge source
    Ingest(IngestArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override `server.host`
    #[arg(long)]
    pub host: Option<String>,

    /// Override `server.port`
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, Args)]
pub struct CreateAdminArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub password: String,

    #[arg(long)]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Source name; re-ingesting a name replaces its chunks
    #[arg(long)]
    pub source: String,

    /// UTF-8 text file
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Commands};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_overrides_parse() {
        let cli = Cli::try_parse_from(["lexora", "--verbose", "serve", "--port", "8080"])
            .expect("cli should parse");
        assert!(cli.verbose);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.port, Some(8080));
                assert_eq!(args.host, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn ingest_takes_source_and_file() {
        let cli = Cli::try_parse_from(["lexora", "ingest", "--source", "toeic-guide", "guide.txt"])
            .expect("cli should parse");
        let Commands::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(args.source, "toeic-guide");
        assert_eq!(args.file.to_str(), Some("guide.txt"));
    }
}
