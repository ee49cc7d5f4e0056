#![forbid(unsafe_code)]

//! HTTP surface for the project service.
//!
//! Routes:
//! - `GET /` lists the caller's projects
//! - `POST /{project}` creates a project and redirects to it
//! - `GET /{project}` reads the tree
//! - `GET /{project}/document?id=N` reads one node's content
//! - `POST /{project}/document` creates a node from a form
//! - `POST /{project}/tree` applies structural edits
//! - `POST /{project}/documents` applies content edits

pub mod config;
mod error;

pub use error::{ApiError, status_for};

use axum::body::Bytes;
use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use scribe_core::{CreatedNode, DocumentView, OwnerId, TreeView};
use scribe_service::{CreateDocumentForm, ProjectService, ServiceError, require_owner};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for request handlers.
#[derive(Debug)]
pub struct AppState {
    pub service: Arc<ProjectService>,
    /// Header set by the fronting auth layer.
    pub identity_header: HeaderName,
}

impl AppState {
    pub fn new(service: ProjectService, identity_header: HeaderName) -> Self {
        Self {
            service: Arc::new(service),
            identity_header,
        }
    }

    fn owner(&self, headers: &HeaderMap) -> Result<OwnerId, ApiError> {
        let identity = headers
            .get(&self.identity_header)
            .and_then(|value| value.to_str().ok());
        Ok(require_owner(identity)?)
    }

    /// Runs a service call on the blocking pool; the store does synchronous I/O.
    async fn blocking<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&ProjectService) -> Result<T, ServiceError> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || work(&service))
            .await
            .map_err(|err| ApiError::Worker(err.to_string()))?
            .map_err(ApiError::from)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list_projects))
        .route("/{project}", get(read_tree).post(create_project))
        .route(
            "/{project}/document",
            get(read_document).post(create_document),
        )
        .route("/{project}/tree", post(update_tree))
        .route("/{project}/documents", post(update_documents))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(())
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = response.status();
                        if !status.is_success() && !status.is_redirection() {
                            tracing::warn!(
                                status = %status,
                                latency_ms = latency.as_millis(),
                                "request failed"
                            );
                        }
                    },
                ),
        )
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("scribe listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, ApiError> {
    let owner = state.owner(&headers)?;
    let projects = state
        .blocking(move |service| service.list_projects(&owner))
        .await?;
    Ok(Json(
        projects
            .into_iter()
            .map(|project| project.as_str().to_string())
            .collect(),
    ))
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    let owner = state.owner(&headers)?;
    let created = state
        .blocking(move |service| service.create_project(&owner, &project))
        .await?;
    Ok(Redirect::to(&project_path(created.as_str())))
}

fn project_path(project: &str) -> String {
    format!("/{}", urlencoding::encode(project))
}

async fn read_tree(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TreeView>, ApiError> {
    let owner = state.owner(&headers)?;
    let tree = state
        .blocking(move |service| service.read_tree(&owner, &project))
        .await?;
    Ok(Json(tree))
}

#[derive(Debug, Deserialize)]
struct DocumentQuery {
    id: Option<String>,
}

async fn read_document(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
    Query(query): Query<DocumentQuery>,
    headers: HeaderMap,
) -> Result<Json<DocumentView>, ApiError> {
    let owner = state.owner(&headers)?;
    let id = query.id.ok_or(ServiceError::MissingField("id"))?;
    let document = state
        .blocking(move |service| service.read_document(&owner, &project, &id))
        .await?;
    Ok(Json(document))
}

async fn create_document(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
    headers: HeaderMap,
    Form(form): Form<CreateDocumentForm>,
) -> Result<Json<CreatedNode>, ApiError> {
    let owner = state.owner(&headers)?;
    let created = state
        .blocking(move |service| service.create_document(&owner, &project, &form))
        .await?;
    Ok(Json(created))
}

async fn update_tree(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let owner = state.owner(&headers)?;
    state
        .blocking(move |service| service.update_tree(&owner, &project, &body))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_documents(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let owner = state.owner(&headers)?;
    state
        .blocking(move |service| service.update_documents(&owner, &project, &body))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
