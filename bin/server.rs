// docgen - Web Server
// REST API over the record store and the generation pipeline.
//
// The store sits behind a Mutex, so writes to any natural key are
// serialised. Lookup and file-write phases run on the blocking pool under a
// timeout; expiry maps to LookupTimeout / PersistFailure.
//
// A timeout only stops the handler from waiting: blocking tasks cannot be
// cancelled, so a write that expired may still land on disk afterwards. Such
// a file has no document_generated event; the event log is the record of
// what was delivered.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use docgen::{
    compose, gather_inputs, record_generation, AppConfig, BusinessRequirement, Client,
    DocumentPublisher, FsTemplateSource, GenerationError, GenerationRequest, GenerationResult,
    RecordStore,
};
use serde::Serialize;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<RecordStore>>,
    templates: Arc<FsTemplateSource>,
    publisher: Arc<DocumentPublisher>,
    timeout: Duration,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiErrorBody>,
}

#[derive(Serialize)]
struct ApiErrorBody {
    kind: String,
    message: String,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Error type for handlers; maps the generation taxonomy onto HTTP codes
struct ApiError {
    status: StatusCode,
    kind: String,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal".to_string(),
            message: message.into(),
        }
    }

    fn not_found(kind: &str, message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        let status = match &err {
            GenerationError::ClientNotFound { .. } | GenerationError::TemplateNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            GenerationError::UnknownField { .. }
            | GenerationError::Catalog(_)
            | GenerationError::ConflictingInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GenerationError::LookupTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GenerationError::PersistFailure { source, .. }
                if source.kind() == io::ErrorKind::TimedOut =>
            {
                StatusCode::GATEWAY_TIMEOUT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        ApiError {
            status,
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<docgen::StoreError> for ApiError {
    fn from(err: docgen::StoreError) -> Self {
        GenerationError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(kind = %self.kind, "{}", self.message);
        }
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(ApiErrorBody {
                kind: self.kind,
                message: self.message,
            }),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Run blocking work on the blocking pool, bounded by `limit`
async fn run_bounded<T, F>(
    limit: Duration,
    on_timeout: impl FnOnce() -> GenerationError,
    work: F,
) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GenerationError> + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
        Err(_) => Err(on_timeout().into()),
        Ok(Err(join)) => Err(ApiError::internal(format!("worker failed: {}", join))),
        Ok(Ok(result)) => result.map_err(ApiError::from),
    }
}

fn lock(store: &Mutex<RecordStore>) -> Result<std::sync::MutexGuard<'_, RecordStore>, GenerationError> {
    store.lock().map_err(|_| {
        docgen::StoreError::Io(io::Error::new(io::ErrorKind::Other, "record store lock poisoned"))
            .into()
    })
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/clients - All clients
async fn get_clients(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Client>>>, ApiError> {
    let store = state.store.clone();
    let seconds = state.timeout.as_secs();
    let clients = run_bounded(
        state.timeout,
        move || GenerationError::LookupTimeout { seconds },
        move || Ok(lock(&store)?.list_clients()?),
    )
    .await?;

    Ok(Json(ApiResponse::ok(clients)))
}

/// GET /api/clients/:name - One client by name
async fn get_client(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<Client>>, ApiError> {
    let store = state.store.clone();
    let seconds = state.timeout.as_secs();
    let lookup_name = name.clone();
    let client = run_bounded(
        state.timeout,
        move || GenerationError::LookupTimeout { seconds },
        move || Ok(lock(&store)?.find_client_by_name(&lookup_name)?),
    )
    .await?;

    match client {
        Some(client) => Ok(Json(ApiResponse::ok(client))),
        None => Err(ApiError::not_found("client_not_found", format!("client not found: {}", name))),
    }
}

/// GET /api/business-types - All business requirements
async fn get_business_types(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<BusinessRequirement>>>, ApiError> {
    let store = state.store.clone();
    let seconds = state.timeout.as_secs();
    let requirements = run_bounded(
        state.timeout,
        move || GenerationError::LookupTimeout { seconds },
        move || Ok(lock(&store)?.list_business_requirements()?),
    )
    .await?;

    Ok(Json(ApiResponse::ok(requirements)))
}

/// POST /api/generate - Resolve, render and publish one document
async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<ApiResponse<GenerationResult>>, ApiError> {
    let seconds = state.timeout.as_secs();
    let request = Arc::new(request);

    // 1. lookups
    let inputs = {
        let store = state.store.clone();
        let templates = state.templates.clone();
        let request = request.clone();
        run_bounded(
            state.timeout,
            move || GenerationError::LookupTimeout { seconds },
            move || gather_inputs(&lock(&store)?, templates.as_ref(), &request),
        )
        .await?
    };

    // 2. resolve + render
    let composed = compose(&inputs, &request)?;

    // 3. write (on timeout the detached write may still finish; no audit event follows)
    let generated_at = Local::now().naive_local();
    let destination =
        state
            .publisher
            .destination(&inputs.client.name, &request.business_type, generated_at);
    let output_path = {
        let publisher = state.publisher.clone();
        let client_name = inputs.client.name.clone();
        let business_type = request.business_type.clone();
        let document = composed.document.clone();
        run_bounded(
            state.timeout,
            move || GenerationError::PersistFailure {
                path: destination,
                source: io::Error::new(io::ErrorKind::TimedOut, "document write timed out"),
            },
            move || publisher.publish(&client_name, &business_type, &document, generated_at),
        )
        .await?
    };

    // 4. audit
    let store = state.store.clone();
    let result = run_bounded(
        state.timeout,
        move || GenerationError::LookupTimeout { seconds },
        move || {
            Ok(record_generation(
                &lock(&store)?,
                &inputs,
                &request,
                &composed,
                output_path,
                generated_at,
            ))
        },
    )
    .await?;

    Ok(Json(ApiResponse::ok(result)))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docgen=info,docgen_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    let store = RecordStore::open(&config.database_path)?;
    info!(path = %config.database_path.display(), "database opened");

    let state = AppState {
        store: Arc::new(Mutex::new(store)),
        templates: Arc::new(FsTemplateSource::new(&config.templates_dir)),
        publisher: Arc::new(DocumentPublisher::new(&config.clients_dir)),
        timeout: config.lookup_timeout(),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/clients", get(get_clients))
        .route("/clients/:name", get(get_client))
        .route("/business-types", get(get_business_types))
        .route("/generate", post(generate))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    info!(addr = %config.server_addr, "🚀 server running");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expired_write_reports_timeout_but_may_still_land() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("late.txt");
        let write_to = target.clone();
        let reported = target.clone();

        let err = run_bounded(
            Duration::from_millis(20),
            move || GenerationError::PersistFailure {
                path: reported,
                source: io::Error::new(io::ErrorKind::TimedOut, "document write timed out"),
            },
            move || {
                std::thread::sleep(Duration::from_millis(200));
                std::fs::write(&write_to, "late").map_err(|source| GenerationError::PersistFailure {
                    path: write_to.clone(),
                    source,
                })
            },
        )
        .await
        .err()
        .unwrap();

        assert_eq!(err.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.kind, "persist_failure");

        // the blocking task was not cancelled
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(target.exists());
        println!("✅ Write timeout test PASSED");
    }

    #[test]
    fn test_conflicting_input_is_unprocessable() {
        let err: ApiError = GenerationError::ConflictingInput {
            key: "NEW_ADDRESS".to_string(),
            spellings: vec!["NEW_ADDRESS".to_string(), "new_address".to_string()],
        }
        .into();

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.kind, "conflicting_input");
    }
}
