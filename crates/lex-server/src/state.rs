use std::sync::Arc;

use anyhow::Context;

use lex_auth::TokenIssuer;
use lex_config::LexConfig;
use lex_db::LexDb;
use lex_db::paging::Paging;
use lex_db::service::LexService;
use lex_embeddings::{Embedder, EmbeddingEngine, HashEmbedder};
use lex_payments::{PayOsGateway, PaymentGateway};
use lex_rag::{ChatPipeline, KnowledgeBase, LlmBackend, OpenAiBackend};
use lex_storage::UploadStore;

use crate::error::ApiError;
use crate::mailer::{LogMailer, Mailer};

pub type SharedState = Arc<AppState>;

/// Shared application resources initialized once at startup.
pub struct AppState {
    pub config: LexConfig,
    pub svc: Arc<LexService>,
    pub tokens: TokenIssuer,
    pub uploads: UploadStore,
    /// `None` when payment credentials are not configured.
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub knowledge: Arc<KnowledgeBase>,
    pub chat: ChatPipeline,
    pub mailer: Arc<dyn Mailer>,
}

/// External services the state is built from, swappable in tests.
pub struct Parts {
    pub svc: Arc<LexService>,
    pub embedder: Arc<dyn Embedder>,
    pub llm: Arc<dyn LlmBackend>,
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub uploads: UploadStore,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    #[must_use]
    pub fn assemble(config: LexConfig, parts: Parts) -> Self {
        let knowledge = Arc::new(KnowledgeBase::new(
            Arc::clone(&parts.svc),
            parts.embedder,
            config.rag.chunk_size,
            config.rag.chunk_overlap,
        ));
        let chat = ChatPipeline::new(
            Arc::clone(&parts.svc),
            Arc::clone(&knowledge),
            parts.llm,
            config.rag.clone(),
            &config.llm,
        );
        Self {
            tokens: TokenIssuer::from_config(&config.jwt),
            svc: parts.svc,
            uploads: parts.uploads,
            gateway: parts.gateway,
            knowledge,
            chat,
            mailer: parts.mailer,
            config,
        }
    }

    /// Open the database and connect every configured integration.
    ///
    /// Unconfigured storage falls back to memory, unconfigured payments are
    /// disabled, and a model that fails to load falls back to hashed features.
    ///
    /// # Errors
    ///
    /// Fails if the database cannot be opened or the S3 client cannot be built.
    pub async fn from_config(config: LexConfig) -> anyhow::Result<Self> {
        let db = LexDb::open(&config.database)
            .await
            .context("failed to open database")?;
        let svc = Arc::new(LexService::from_db(db));

        let uploads = UploadStore::from_config(&config.storage)
            .context("failed to initialize object storage")?;
        if !config.storage.is_configured() {
            tracing::warn!("storage is not configured; uploads are kept in memory");
        }

        let gateway: Option<Arc<dyn PaymentGateway>> = if config.payment.is_configured() {
            Some(Arc::new(PayOsGateway::from_config(&config.payment)?))
        } else {
            tracing::warn!("payment gateway is not configured; paid enrollment is disabled");
            None
        };

        if !config.llm.is_configured() {
            tracing::warn!(base_url = %config.llm.base_url, "llm api key is empty");
        }
        let llm: Arc<dyn LlmBackend> = Arc::new(OpenAiBackend::from_config(&config.llm));

        let parts = Parts {
            svc,
            embedder: load_embedder().await,
            llm,
            gateway,
            uploads,
            mailer: Arc::new(LogMailer),
        };
        Ok(Self::assemble(config, parts))
    }

    /// The gateway, or 503 when payments are off.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unavailable` when no gateway is configured.
    pub fn gateway(&self) -> Result<&Arc<dyn PaymentGateway>, ApiError> {
        self.gateway
            .as_ref()
            .ok_or_else(|| ApiError::Unavailable("payments are not configured".into()))
    }

    #[must_use]
    pub fn paging(&self, page: Option<u32>, page_size: Option<u32>) -> Paging {
        Paging::new(page, self.config.general.clamp_page_size(page_size))
    }
}

/// fastembed when the model loads, hashed features otherwise.
pub async fn load_embedder() -> Arc<dyn Embedder> {
    match tokio::task::spawn_blocking(EmbeddingEngine::new).await {
        Ok(Ok(engine)) => Arc::new(engine),
        Ok(Err(error)) => {
            tracing::warn!(%error, "embedding model unavailable; using hashed features");
            Arc::new(HashEmbedder::default())
        }
        Err(error) => {
            tracing::warn!(%error, "embedding model load panicked; using hashed features");
            Arc::new(HashEmbedder::default())
        }
    }
}
