//! Grant Tagger HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/health` | Health check |
//! | `GET`  | `/api/tags` | Current vocabulary |
//! | `GET`  | `/api/tags/effective_tags` | Selected tags after synonym expansion |
//! | `POST` | `/api/grants` | Submit one grant or an array of grants |
//! | `GET`  | `/api/grants` | List grants, optionally filtered by tags |
//!
//! `tags` query parameters are comma-separated; `include_synonyms` accepts
//! `true`/`1`/`yes`/`on`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Invalid JSON body." } }
//! ```
//!
//! Error codes: `bad_request` (400), `configuration` (400), `upstream` (400),
//! `conflict` (409), `internal` (500).

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use grant_tagger_core::models::Grant;
use grant_tagger_core::TaggerError;

use crate::config::Config;
use crate::db;
use crate::grants::GrantService;
use crate::llm::create_provider;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    service: Arc<GrantService>,
}

/// Starts the HTTP server on `[server].bind`.
///
/// Runs migrations first so a fresh database is usable immediately.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;

    let store = Arc::new(SqliteStore::new(pool));
    let provider = create_provider(&config.llm)?;
    let service = GrantService::new(store, provider);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "grant API listening");
    println!("Grant API listening on http://{}", config.server.bind);

    axum::serve(listener, router(service)).await?;
    Ok(())
}

/// Build the router around `service`.
pub fn router(service: GrantService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState {
        service: Arc::new(service),
    };

    Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/tags", get(handle_tags))
        .route("/api/tags/effective_tags", get(handle_effective_tags))
        .route("/api/grants", get(handle_list_grants).post(handle_add_grants))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<TaggerError> for AppError {
    fn from(err: TaggerError) -> Self {
        let message = err.to_string();
        let (status, code) = match err {
            TaggerError::Validation(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            TaggerError::Configuration(_) => (StatusCode::BAD_REQUEST, "configuration"),
            TaggerError::Upstream(_) => (StatusCode::BAD_REQUEST, "upstream"),
            TaggerError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            TaggerError::Store(ref e) => {
                error!(error = %format!("{:#}", e), "store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        AppError {
            status,
            code,
            message,
        }
    }
}

// ============ Query parsing ============

#[derive(Debug, Default, Deserialize)]
struct TagQuery {
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    include_synonyms: Option<String>,
}

impl TagQuery {
    fn selected(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .map(|csv| csv.split(',').map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn include_synonyms(&self) -> bool {
        self.include_synonyms.as_deref().is_some_and(parse_bool)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Response shape of one grant.
#[derive(Serialize)]
struct GrantView {
    grant_name: String,
    grant_description: String,
    tags: Vec<String>,
}

impl From<Grant> for GrantView {
    fn from(g: Grant) -> Self {
        Self {
            grant_name: g.name,
            grant_description: g.description,
            tags: g.tags.into_iter().collect(),
        }
    }
}

#[derive(Serialize)]
struct GrantsResponse {
    grants: Vec<GrantView>,
}

impl GrantsResponse {
    fn from_grants(grants: Vec<Grant>) -> Self {
        Self {
            grants: grants.into_iter().map(GrantView::from).collect(),
        }
    }
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/tags ============

#[derive(Serialize)]
struct TagsResponse {
    tags: Vec<String>,
}

async fn handle_tags(State(state): State<AppState>) -> Result<Json<TagsResponse>, AppError> {
    let tags = state.service.vocabulary().await?;
    Ok(Json(TagsResponse { tags }))
}

// ============ GET /api/tags/effective_tags ============

#[derive(Serialize)]
struct EffectiveTagsResponse {
    effective_tags: Vec<String>,
}

async fn handle_effective_tags(
    State(state): State<AppState>,
    Query(query): Query<TagQuery>,
) -> Result<Json<EffectiveTagsResponse>, AppError> {
    let effective_tags = state
        .service
        .effective_tags(&query.selected(), query.include_synonyms())
        .await?;
    Ok(Json(EffectiveTagsResponse { effective_tags }))
}

// ============ POST /api/grants ============

/// Handler for `POST /api/grants`.
///
/// The body is parsed by hand so that malformed JSON yields the standard
/// error body rather than Axum's plain-text rejection.
async fn handle_add_grants(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<GrantsResponse>), AppError> {
    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| bad_request("Invalid JSON body."))?;

    let grants = state.service.submit(&payload).await?;
    Ok((StatusCode::CREATED, Json(GrantsResponse::from_grants(grants))))
}

// ============ GET /api/grants ============

async fn handle_list_grants(
    State(state): State<AppState>,
    Query(query): Query<TagQuery>,
) -> Result<Json<GrantsResponse>, AppError> {
    let grants = state
        .service
        .list(&query.selected(), query.include_synonyms())
        .await?;
    Ok(Json(GrantsResponse::from_grants(grants)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        for v in ["true", "TRUE", "1", "yes", " on "] {
            assert!(parse_bool(v), "{}", v);
        }
        for v in ["false", "0", "", "maybe"] {
            assert!(!parse_bool(v), "{}", v);
        }
    }

    #[test]
    fn test_tag_query_selected() {
        let q = TagQuery {
            tags: Some("agriculture,,water".to_string()),
            include_synonyms: None,
        };
        assert_eq!(q.selected(), vec!["agriculture", "", "water"]);
        assert!(!q.include_synonyms());
        assert!(TagQuery::default().selected().is_empty());
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (TaggerError::Validation("v".into()), StatusCode::BAD_REQUEST),
            (TaggerError::Configuration("c".into()), StatusCode::BAD_REQUEST),
            (TaggerError::Upstream("u".into()), StatusCode::BAD_REQUEST),
            (TaggerError::Conflict("d".into()), StatusCode::CONFLICT),
            (
                TaggerError::Store(anyhow::anyhow!("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }
}
