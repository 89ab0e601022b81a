#![deny(missing_docs)]

//! Core library for docqa, a retrieval-augmented question-answering service over uploaded
//! documents.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Generative model abstraction and adapters.
pub mod generation;
/// Local persistent vector index.
pub mod index;
/// Document loading, chunking, and chunk preparation.
pub mod ingestion;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and answer metrics helpers.
pub mod metrics;
/// Question routing, text cleanup, retrieval, and answer synthesis.
pub mod rag;
/// Lazily initialized, shared model handles.
pub mod registry;
