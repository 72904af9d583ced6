use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use diesel::pg::PgConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::middleware::AuthenticatedUser;
use crate::core::shared::state::AppState;

use super::error::CrmError;
use super::service;
use super::types::{Client, CreateNoteRequest, Lead, Note, StageChangeRequest};

/// Runs `op` on a pooled connection off the async runtime.
async fn with_conn<T, F>(state: &AppState, op: F) -> Result<T, CrmError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, CrmError> + Send + 'static,
{
    let pool = state.conn.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| CrmError::Store(e.to_string()))?;
        op(&mut conn)
    })
    .await
    .map_err(|e| CrmError::Store(format!("Task join error: {e}")))?
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, CrmError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| CrmError::InvalidRequest(rejection.body_text()))
}

pub async fn handle_get_lead(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Lead>, CrmError> {
    let lead = with_conn(&state, move |conn| service::get_lead(conn, id, &user)).await?;
    Ok(Json(lead))
}

pub async fn handle_change_stage(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<StageChangeRequest>, JsonRejection>,
) -> Result<Json<Lead>, CrmError> {
    let request = body(payload)?;
    let lead = with_conn(&state, move |conn| {
        service::change_stage(conn, id, &user, &request)
    })
    .await?;
    Ok(Json(lead))
}

pub async fn handle_promote_lead(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Client>), CrmError> {
    let client = with_conn(&state, move |conn| service::promote_lead(conn, id, &user)).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn handle_list_notes(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Note>>, CrmError> {
    let notes = with_conn(&state, move |conn| service::list_notes(conn, id, &user)).await?;
    Ok(Json(notes))
}

pub async fn handle_add_note(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Note>), CrmError> {
    let request = body(payload)?;
    let content = service::normalize_note(&request.content)?;
    let note = with_conn(&state, move |conn| service::add_note(conn, id, &user, content)).await?;
    Ok((StatusCode::CREATED, Json(note)))
}
