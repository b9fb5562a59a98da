use std::sync::Arc;

use anyhow::Context;

use lex_config::LexConfig;
use lex_db::LexDb;
use lex_db::service::LexService;
use lex_rag::KnowledgeBase;

use crate::cli::IngestArgs;
use crate::state::load_embedder;

/// Handle `lexora ingest`.
pub async fn handle(args: &IngestArgs, config: &LexConfig) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("ingest: failed to read {}", args.file.display()))?;

    let db = LexDb::open(&config.database)
        .await
        .context("ingest: failed to open database")?;
    let knowledge = KnowledgeBase::new(
        Arc::new(LexService::from_db(db)),
        load_embedder().await,
        config.rag.chunk_size,
        config.rag.chunk_overlap,
    );

    let chunks = knowledge
        .ingest(&args.source, &text)
        .await
        .context("ingest: failed to store knowledge source")?;
    tracing::info!(source = %args.source, chunks = chunks.len(), "knowledge source ingested");
    println!("{} chunks stored for {}", chunks.len(), args.source);
    Ok(())
}
