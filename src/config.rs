use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root for per-document artifacts, sidecars and the merged index
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Maximum characters per chunk
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
    /// SQLite file holding the document catalog
    pub catalog_db: PathBuf,
    /// SQLite file holding the advertising-sales data queried by `/query`.
    /// If None, the query endpoints answer 503.
    pub sales_db: Option<PathBuf>,
    /// Row limit appended to ad-hoc queries when the caller gives none
    pub sql_row_limit: u32,
    /// Maximum concurrent chat completions
    pub max_concurrent_chats: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for chat
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub embedding_dim: usize,
    /// Sampling temperature for chat replies
    pub temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:8000".to_string(),
            llm: LlmConfig::default(),
            chunk_size: 1000,
            chunk_overlap: 200,
            catalog_db: PathBuf::from("./data/catalog.db"),
            sales_db: None,
            sql_row_limit: 10,
            max_concurrent_chats: 3,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            api_key: None,
            embedding_dim: 1536,
            temperature: 0.6,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("ADSALES_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
            config.catalog_db = config.data_dir.join("catalog.db");
        }
        if let Ok(addr) = std::env::var("ADSALES_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(val) = std::env::var("ADSALES_CHUNK_SIZE") {
            if let Ok(v) = val.parse() {
                config.chunk_size = v;
            }
        }
        if let Ok(val) = std::env::var("ADSALES_CHUNK_OVERLAP") {
            if let Ok(v) = val.parse() {
                config.chunk_overlap = v;
            }
        }
        if let Ok(path) = std::env::var("ADSALES_CATALOG_DB") {
            config.catalog_db = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("ADSALES_SALES_DB") {
            config.sales_db = Some(PathBuf::from(path));
        }
        if let Ok(val) = std::env::var("ADSALES_SQL_ROW_LIMIT") {
            if let Ok(v) = val.parse() {
                config.sql_row_limit = v;
            }
        }
        if let Ok(val) = std::env::var("ADSALES_MAX_CONCURRENT_CHATS") {
            if let Ok(v) = val.parse::<usize>() {
                config.max_concurrent_chats = v.max(1);
            }
        }

        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        // OPENAI_API_KEY is what existing deployments already export
        if let Ok(key) = std::env::var("LLM_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY")) {
            config.llm.api_key = Some(key);
        }
        if let Ok(dim) = std::env::var("LLM_EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.llm.embedding_dim = d;
            }
        }
        if let Ok(val) = std::env::var("LLM_TEMPERATURE") {
            if let Ok(t) = val.parse() {
                config.llm.temperature = t;
            }
        }

        config
    }

    /// Per-document vector arrays and single-document indexes.
    pub fn vector_db_dir(&self) -> PathBuf {
        self.data_dir.join("vector_db")
    }

    /// JSON sidecars, one per ingested document.
    pub fn metadata_dir(&self) -> PathBuf {
        self.data_dir.join("metadata")
    }

    /// Merged index and its metadata.
    pub fn merged_db_dir(&self) -> PathBuf {
        self.data_dir.join("merged_db")
    }
}
