//! # Grant Tagger Core
//!
//! Runtime-agnostic logic for Grant Tagger: data models, tag normalization,
//! the heuristic and LLM taggers, synonym placement, the tag resolver, and
//! the storage and completion-provider traits.
//!
//! This crate contains no tokio, sqlx, reqwest, or filesystem I/O. Concrete
//! stores (SQLite) and completion providers (Gemini, OpenAI) live in the
//! `grant-tagger` app crate.
//!
//! ## Tag resolution
//!
//! ```text
//!  NewGrant ──▶ TagResolver ──┬──▶ heuristic_tags ─────────────┐
//!                             │                                ▼
//!                             └──▶ LlmTagger ──▶ Store   ──▶ tag set
//!                                     │         (vocab,
//!                                     └──▶ SynonymPlacer  synonyms)
//! ```

pub mod completion;
pub mod error;
pub mod llm_tagger;
pub mod models;
pub mod prompt;
pub mod resolver;
pub mod store;
pub mod synonyms;
pub mod tags;
pub mod vocabulary;

pub use error::{Result, TaggerError};
pub use models::{Grant, NewGrant, SynonymGroup, TagSet};
pub use resolver::TagResolver;
