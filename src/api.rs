use std::sync::Arc;

use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::ingest::{BatchReport, ImportCandidate, ImportOptions, Importer, IngestError, TenantScope};

#[derive(Clone)]
pub struct AppState {
    pub importer: Arc<Importer>,
}

impl AppState {
    pub fn new(importer: Importer) -> Self {
        Self {
            importer: Arc::new(importer),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/import", post(import_batch))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn default_allow_live() -> bool {
    true
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportReq {
    tenant: TenantScope,
    candidates: Vec<ImportCandidate>,
    #[serde(default = "default_allow_live")]
    allow_live_retrieval: bool,
}

#[derive(serde::Serialize)]
struct ErrorResp {
    error: String,
}

async fn import_batch(
    State(state): State<AppState>,
    Json(body): Json<ImportReq>,
) -> Result<Json<BatchReport>, (StatusCode, Json<ErrorResp>)> {
    let options = ImportOptions {
        allow_live_retrieval: body.allow_live_retrieval,
    };
    match state
        .importer
        .run_import_batch(body.candidates, &body.tenant, options)
        .await
    {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            let status = status_for(&e);
            tracing::warn!(target: "ingest", tenant = %body.tenant, error = %e, "import batch rejected");
            Err((
                status,
                Json(ErrorResp {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

fn status_for(e: &IngestError) -> StatusCode {
    if e.is_input_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
