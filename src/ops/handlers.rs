use super::directory::Directory;
use crate::replication::protocol::{
    Contact, EditRequest, ReplicateResponse, ENDPOINT_ADD, ENDPOINT_DELETE, ENDPOINT_DELETE_REMOTE,
    ENDPOINT_EDIT, ENDPOINT_PING, ENDPOINT_REPLICATE, ENDPOINT_REPLICATE_EDIT,
};
use crate::storage::pending::{DEAD_LETTER_PREFIX, PENDING_PREFIX};

use axum::extract::{Extension, Form, Json};
use axum::http::StatusCode;
use axum::response::{Html, Redirect};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct AddForm {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct EditForm {
    pub original_name: String,
    pub name: String,
    pub phone: String,
}

/// Builds the node's full HTTP surface over one directory instance. Used
/// by `main` and by tests that need a real peer.
pub fn app(directory: Arc<Directory>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route(ENDPOINT_ADD, post(handle_add))
        .route(ENDPOINT_DELETE, post(handle_delete))
        .route(ENDPOINT_DELETE_REMOTE, post(handle_delete_remote))
        .route(ENDPOINT_EDIT, post(handle_edit))
        .route(ENDPOINT_REPLICATE, post(handle_replicate))
        .route(ENDPOINT_REPLICATE_EDIT, post(handle_replicate_edit))
        .route(ENDPOINT_PING, get(handle_ping))
        .layer(Extension(directory))
}

/// Human view of the live contacts. Pending and quarantined entries never
/// show up here.
pub async fn handle_index(
    Extension(directory): Extension<Arc<Directory>>,
) -> Result<Html<String>, (StatusCode, String)> {
    let contacts = directory.list().map_err(internal_error)?;
    Ok(Html(render_listing(&contacts, directory.config().port())))
}

pub async fn handle_add(
    Extension(directory): Extension<Arc<Directory>>,
    Form(form): Form<AddForm>,
) -> Result<Redirect, (StatusCode, String)> {
    validate_name(&form.name)?;

    directory
        .add(&form.name, &form.phone)
        .await
        .map_err(internal_error)?;
    Ok(Redirect::to("/"))
}

pub async fn handle_delete(
    Extension(directory): Extension<Arc<Directory>>,
    Form(form): Form<DeleteForm>,
) -> Result<Redirect, (StatusCode, String)> {
    directory.delete(&form.name).map_err(internal_error)?;
    Ok(Redirect::to("/"))
}

/// Receiving half of the delete broadcast.
pub async fn handle_delete_remote(
    Extension(directory): Extension<Arc<Directory>>,
    Form(form): Form<DeleteForm>,
) -> Result<&'static str, (StatusCode, String)> {
    directory.delete_local(&form.name).map_err(internal_error)?;
    Ok("deleted")
}

pub async fn handle_edit(
    Extension(directory): Extension<Arc<Directory>>,
    Form(form): Form<EditForm>,
) -> Result<Redirect, (StatusCode, String)> {
    validate_name(&form.original_name)?;
    validate_name(&form.name)?;

    directory
        .edit(EditRequest {
            original_name: form.original_name,
            name: form.name,
            phone: form.phone,
        })
        .await
        .map_err(internal_error)?;
    Ok(Redirect::to("/"))
}

/// Receiving half of contact replication: apply locally without further
/// propagation, otherwise a write would fan out forever.
pub async fn handle_replicate(
    Extension(directory): Extension<Arc<Directory>>,
    Json(contact): Json<Contact>,
) -> (StatusCode, Json<ReplicateResponse>) {
    if let Err((status, message)) = validate_name(&contact.name) {
        return (status, Json(ReplicateResponse { status: message }));
    }

    match directory.apply_replica(&contact) {
        Ok(()) => (
            StatusCode::OK,
            Json(ReplicateResponse {
                status: "replicated".to_string(),
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to store replica '{}': {}", contact.name, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReplicateResponse {
                    status: "error".to_string(),
                }),
            )
        }
    }
}

/// Receiving half of edit replication.
pub async fn handle_replicate_edit(
    Extension(directory): Extension<Arc<Directory>>,
    Json(edit): Json<EditRequest>,
) -> (StatusCode, Json<ReplicateResponse>) {
    if let Err((status, message)) = validate_name(&edit.name) {
        return (status, Json(ReplicateResponse { status: message }));
    }

    match directory.apply_edit_replica(&edit) {
        Ok(()) => (
            StatusCode::OK,
            Json(ReplicateResponse {
                status: "edit replicated".to_string(),
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to apply edit replica '{}': {}", edit.name, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReplicateResponse {
                    status: "error".to_string(),
                }),
            )
        }
    }
}

/// Liveness probe target.
pub async fn handle_ping() -> &'static str {
    "pong"
}

/// Contact names are storage keys; an empty name or one inside a reserved
/// namespace would be indistinguishable from fallback state.
fn validate_name(name: &str) -> Result<(), (StatusCode, String)> {
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "name must not be empty".to_string()));
    }
    if name.starts_with(PENDING_PREFIX) || name.starts_with(DEAD_LETTER_PREFIX) {
        return Err((
            StatusCode::BAD_REQUEST,
            "name uses a reserved prefix".to_string(),
        ));
    }
    Ok(())
}

fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Request failed: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn render_listing(contacts: &[Contact], port: u16) -> String {
    let mut rows = String::new();
    for contact in contacts {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            escape_html(&contact.name),
            escape_html(&contact.phone)
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Contacts - node {port}</title></head>\n<body>\n\
         <h1>Contacts (node {port})</h1>\n\
         <table border=\"1\">\n<tr><th>Name</th><th>Phone</th></tr>\n{rows}</table>\n\
         </body>\n</html>\n"
    )
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
