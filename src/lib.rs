//! # Grant Tagger
//!
//! Grant intake and retrieval service. Each submitted grant is tagged
//! against a controlled, growing vocabulary, by a language model when one is
//! configured and by a deterministic substring matcher otherwise.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ HTTP/CLI │──▶│ GrantService │──▶│ TagResolver  │──▶│  SQLite  │
//! └──────────┘   │  validation  │   │ LLM/heuristic│   │ grants   │
//!                └──────┬───────┘   └──────┬───────┘   │ tags     │
//!                       │                  ▼           │ synonyms │
//!                       │           ┌──────────────┐   └────▲─────┘
//!                       │           │ Gemini/OpenAI│        │
//!                       │           └──────────────┘        │
//!                       └───────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! grants init                       # create database, seed vocabulary
//! grants add --name "Soil Health Grant" \
//!     --description "Funds for soil health and nutrient management on farms"
//! grants list --tags agriculture --synonyms
//! grants serve                      # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool with WAL mode |
//! | [`migrate`] | Schema migrations and vocabulary seeding (idempotent) |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`llm`] | Gemini and OpenAI completion providers |
//! | [`grants`] | Payload validation, submission, and tag-filtered listing |
//! | [`server`] | HTTP API (Axum) with CORS |
//!
//! The tagging pipeline itself lives in [`grant_tagger_core`].

pub mod config;
pub mod db;
pub mod grants;
pub mod llm;
pub mod migrate;
pub mod server;
pub mod sqlite_store;

pub use grants::GrantService;
