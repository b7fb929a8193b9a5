use anyhow::Context;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::{Config, LlmConfig};
use crate::llm::embeddings::{Embedder, HttpEmbedder};
use crate::pipeline::DocumentPipeline;
use crate::sql::SalesDb;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<DocumentPipeline>,
    pub sales_db: Option<SalesDb>,
    pub http_client: reqwest::Client,
    pub llm_config: Arc<LlmConfig>,
    pub chat_semaphore: Arc<tokio::sync::Semaphore>,
}

impl AppState {
    /// State backed by the configured embedding provider.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;
        let llm_config = Arc::new(config.llm.clone());
        let embedder = Arc::new(HttpEmbedder::new(http_client.clone(), llm_config.clone()));
        Self::assemble(config, http_client, llm_config, embedder).await
    }

    /// State with a caller-supplied embedder.
    pub async fn with_embedder(config: Config, embedder: Arc<dyn Embedder>) -> anyhow::Result<Self> {
        let llm_config = Arc::new(config.llm.clone());
        Self::assemble(config, reqwest::Client::new(), llm_config, embedder).await
    }

    async fn assemble(
        config: Config,
        http_client: reqwest::Client,
        llm_config: Arc<LlmConfig>,
        embedder: Arc<dyn Embedder>,
    ) -> anyhow::Result<Self> {
        // Ensure data directories exist
        for dir in [config.vector_db_dir(), config.metadata_dir(), config.merged_db_dir()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let catalog = Catalog::open(&config.catalog_db).await?;
        let pipeline = DocumentPipeline::new(&config, embedder, catalog)?;

        let sales_db = match &config.sales_db {
            Some(path) => Some(SalesDb::open(path).await?),
            None => {
                tracing::info!("ADSALES_SALES_DB not set; /query endpoints disabled");
                None
            }
        };

        let max_concurrent_chats = config.max_concurrent_chats;
        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
            sales_db,
            http_client,
            llm_config,
            chat_semaphore: Arc::new(tokio::sync::Semaphore::new(max_concurrent_chats)),
        })
    }
}
