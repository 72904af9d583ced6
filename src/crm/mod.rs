pub mod error;
pub mod handlers;
pub mod service;
pub mod types;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use error::CrmError;
pub use handlers::*;
pub use types::*;

pub fn configure_crm_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/crm/leads/:id", get(handle_get_lead))
        .route("/api/crm/leads/:id/stage", put(handle_change_stage))
        .route("/api/crm/leads/:id/promote", post(handle_promote_lead))
        .route(
            "/api/crm/leads/:id/notes",
            get(handle_list_notes).post(handle_add_note),
        )
}
