use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tower_http::limit::RequestBodyLimitLayer;

use healthlog_core::appwrite::{BackendError, User};
use healthlog_core::dashboard::{Dashboard, build_dashboard};
use healthlog_core::forms::{ExerciseForm, FoodForm, Form, FormError, SleepForm, WeightForm};
use healthlog_core::models::{NewRecord, ParseEnumError, RecordKind};
use healthlog_core::records::{Category, RecordCounts, RecordEntry, list_records};
use healthlog_core::tracker::Tracker;

const BODY_LIMIT: usize = 64 * 1024; // 64 KB

#[derive(Clone)]
struct AppState {
    tracker: Arc<Tracker>,
    api_key: Option<String>,
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct DashboardQuery {
    date: Option<String>,
}

#[derive(Deserialize)]
struct RecordsQuery {
    category: Option<String>,
}

#[derive(Serialize)]
struct RecordsResponse {
    category: String,
    records: Vec<RecordEntry>,
    counts: RecordCounts,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        if err.is_auth() {
            Self::Unauthorized(err.to_string())
        } else if err.is_not_found() {
            Self::NotFound("Record not found".to_string())
        } else {
            Self::Internal(err.into())
        }
    }
}

impl From<FormError> for ApiError {
    fn from(err: FormError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

fn require_user(state: &AppState) -> Result<User, ApiError> {
    state
        .tracker
        .user()
        .ok_or_else(|| ApiError::Unauthorized("Not signed in".to_string()))
}

fn parse_date(date: Option<&str>) -> Result<NaiveDate, ApiError> {
    match date {
        None => Ok(Local::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("Invalid date '{s}'. Use YYYY-MM-DD"))),
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn get_session(State(state): State<AppState>) -> Result<Json<User>, ApiError> {
    require_user(&state).map(Json)
}

async fn refresh(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    require_user(&state)?;
    state.tracker.refresh().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Dashboard>, ApiError> {
    require_user(&state)?;
    let date = parse_date(query.date.as_deref())?;
    Ok(Json(build_dashboard(&state.tracker.snapshot(), date)))
}

async fn get_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    require_user(&state)?;
    let category = match query.category.as_deref() {
        Some(c) => c
            .parse::<Category>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => Category::All,
    };
    let data = state.tracker.snapshot();
    Ok(Json(RecordsResponse {
        category: category.to_string(),
        records: list_records(&data, category),
        counts: RecordCounts::of(&data),
    }))
}

async fn create_record<F>(
    State(state): State<AppState>,
    Json(form): Json<F>,
) -> Result<(StatusCode, Json<<F::Output as NewRecord>::Record>), ApiError>
where
    F: Form + DeserializeOwned + Send + 'static,
{
    let record = form.to_record(Local::now().date_naive())?;
    let created = state.tracker.add(record).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_record(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let kind: RecordKind = kind
        .parse()
        .map_err(|e: ParseEnumError| ApiError::BadRequest(e.to_string()))?;
    state.tracker.delete_kind(kind, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Router ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/refresh", post(refresh))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/records", get(get_records))
        .route("/api/exercise", post(create_record::<ExerciseForm>))
        .route("/api/food", post(create_record::<FoodForm>))
        .route("/api/sleep", post(create_record::<SleepForm>))
        .route("/api/weight", post(create_record::<WeightForm>))
        .route("/api/{kind}/{id}", delete(delete_record))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// First and last four characters of `key`; fully starred when too short to
/// hide anything.
fn masked_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub async fn start_server(
    tracker: Tracker,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    if let Some(user) = tracker.user() {
        eprintln!("Serving records for {} <{}>", user.name, user.email);
    }

    let state = AppState {
        tracker: Arc::new(tracker),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {} (see api_key file in data directory)",
            masked_key(key)
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    eprintln!("Listening on http://{bind}:{port}");
    tracing::info!(%bind, port, "local API started");
    axum::serve(listener, app).await?;

    Ok(())
}
