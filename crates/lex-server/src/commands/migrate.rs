use anyhow::Context;

use lex_config::LexConfig;
use lex_db::LexDb;

/// Handle `lexora migrate`. Opening the database applies pending migrations.
pub async fn handle(config: &LexConfig) -> anyhow::Result<()> {
    LexDb::open(&config.database)
        .await
        .context("migrate: failed to open database")?;
    tracing::info!("database schema is up to date");
    Ok(())
}
