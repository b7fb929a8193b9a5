//! # ad-sales-assistant
//!
//! Backend for a broadcast-advertising sales assistant: document ingestion
//! into per-document vector indexes, a corpus-wide merged index with
//! backup and rollback, semantic search, chat and ad-hoc SQL queries.
//!
//! ## Ingestion flow
//!
//! ```text
//!   file (.pdf .txt .docx .csv)
//!        │
//!        ▼
//!   ┌──────────┐    ┌───────────┐    ┌───────────┐
//!   │  Loader  │───▶│  Chunker  │───▶│ Embedder  │
//!   └──────────┘    └───────────┘    └─────┬─────┘
//!                                          │ one vector per chunk
//!                        ┌─────────────────┼─────────────────┐
//!                        ▼                 ▼                 ▼
//!               ┌────────────────┐ ┌──────────────┐ ┌─────────────────┐
//!               │ vector_db/     │ │ catalog row  │ │ merged_db/      │
//!               │ metadata/ JSON │ │ (SQLite)     │ │ append w/ backup│
//!               └────────────────┘ └──────────────┘ └─────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration
//! - [`error`] - `DocError` taxonomy and its HTTP status mapping
//! - [`loaders`] - Text extraction per file format
//! - [`chunking`] - Recursive character splitter
//! - [`llm`] - Embedding and chat clients for Ollama or OpenAI-compatible APIs
//! - [`index`] - Flat L2 index, per-document artifacts, merged index
//! - [`catalog`] - SQLite document catalog
//! - [`pipeline`] - Ingest, append and rebuild orchestration
//! - [`search`] - Query service over the merged index
//! - [`sql`] - Read-only passthrough to the sales database
//! - [`api`] - Axum HTTP handlers and router
//! - [`state`] - Shared application state

pub mod api;
pub mod catalog;
pub mod chunking;
pub mod config;
pub mod error;
pub mod index;
pub mod llm;
pub mod loaders;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod sql;
pub mod state;
