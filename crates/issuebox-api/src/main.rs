//! issuebox-api: REST API server for the issuebox issue tracker
//!
//! Thin HTTP layer over `issuebox_core::Store`. All state lives in memory
//! and is gone when the process exits.

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use issuebox_core::{
    Config, Error, ErrorKind, Issue, IssueId, IssueUpdate, NewIssue, Status, Store, User, UserId,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Parser, Debug)]
#[command(name = "issuebox-api")]
#[command(about = "REST API server for the issuebox issue tracker")]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(long, env = "ISSUEBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind, overrides the config file
    #[arg(long, env = "ISSUEBOX_HOST")]
    host: Option<String>,

    /// Port to listen on, overrides the config file
    #[arg(long, env = "ISSUEBOX_PORT")]
    port: Option<u16>,

    /// Print a commented default config and exit
    #[arg(long)]
    print_config: bool,
}

/// Shared application state
struct AppState {
    store: Store,
}

/// Request to create a new issue
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateIssueRequest {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "userId")]
    assignee_id: Option<UserId>,
}

impl From<CreateIssueRequest> for NewIssue {
    fn from(req: CreateIssueRequest) -> Self {
        NewIssue {
            title: req.title,
            description: req.description.unwrap_or_default(),
            assignee: req.assignee_id,
        }
    }
}

/// Request to update an issue. `assigneeId: 0` removes the assignee.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateIssueRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "userId")]
    assignee_id: Option<UserId>,
}

impl From<UpdateIssueRequest> for IssueUpdate {
    fn from(req: UpdateIssueRequest) -> Self {
        IssueUpdate {
            title: req.title,
            description: req.description,
            status: req.status,
            assignee: req.assignee_id.map(IssueUpdate::assignee_from_wire),
        }
    }
}

/// Query parameters for listing issues
#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct IssuesResponse {
    issues: Vec<Issue>,
}

#[derive(Debug, Serialize)]
struct UsersResponse {
    users: Vec<Arc<User>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
    kind: &'static str,
}

/// Core error carried to the HTTP boundary
#[derive(Debug)]
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::MalformedRequest(rejection.body_text()))
    }
}

fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::MalformedRequest
        | ErrorKind::InvalidEnumValue
        | ErrorKind::UnknownReference
        | ErrorKind::IllegalTransition => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let code = status_code(kind);
        if code.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, kind = %kind, "request rejected");
        }

        let body = ErrorResponse {
            error: self.0.to_string(),
            code: code.as_u16(),
            kind: kind.as_str(),
        };
        (code, Json(body)).into_response()
    }
}

fn parse_id(raw: &str) -> Result<IssueId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError(Error::MalformedRequest(format!("invalid issue id: {raw}"))))
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// List issues, optionally filtered by status
async fn list_issues(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<IssuesResponse>, ApiError> {
    let issues = match query.status.as_deref() {
        None | Some("") => state.store.all_issues(),
        Some(raw) => state.store.issues_by_status(raw.parse::<Status>()?),
    };
    Ok(Json(IssuesResponse { issues }))
}

/// Get a single issue by ID
async fn get_issue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Issue>, ApiError> {
    let id = parse_id(&id)?;
    let issue = state.store.get_issue(id).ok_or(Error::NotFound(id))?;
    Ok(Json(issue))
}

/// Create a new issue
async fn create_issue(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateIssueRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Issue>), ApiError> {
    let Json(req) = payload?;
    let issue = state.store.submit_issue(&NewIssue::from(req))?;
    tracing::info!(issue_id = issue.id, status = %issue.status, "created issue");
    Ok((StatusCode::CREATED, Json(issue)))
}

/// Update an existing issue
async fn update_issue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateIssueRequest>, JsonRejection>,
) -> Result<Json<Issue>, ApiError> {
    let id = parse_id(&id)?;
    if !state.store.contains_issue(id) {
        return Err(Error::NotFound(id).into());
    }
    let Json(req) = payload?;
    let issue = state.store.submit_update(id, &IssueUpdate::from(req))?;
    tracing::info!(issue_id = issue.id, status = %issue.status, "updated issue");
    Ok(Json(issue))
}

/// List the fixed user table
async fn list_users(State(state): State<Arc<AppState>>) -> Json<UsersResponse> {
    Json(UsersResponse {
        users: state.store.users(),
    })
}

fn router(store: Store) -> Router {
    let state = Arc::new(AppState { store });

    Router::new()
        .route("/health", get(health))
        .route("/issue", post(create_issue))
        .route("/issues", get(list_issues))
        .route("/issue/{id}", get(get_issue).patch(update_issue))
        .route("/users", get(list_users))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match cli.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down, in-memory issues are discarded");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.print_config {
        print!("{}", Config::default_with_comments());
        return Ok(());
    }

    init_tracing();

    let config = load_config(&cli)?;
    let store = Store::from_config(&config);
    tracing::info!(users = store.users().len(), "Seeded user table");

    let app = router(store);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    tracing::info!("Starting issuebox-api on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
