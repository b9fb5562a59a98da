//! Handlers for each `lexora` subcommand.

pub mod create_admin;
pub mod ingest;
pub mod migrate;
pub mod serve;
