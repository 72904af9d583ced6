pub mod error;
pub mod export;
pub mod filter;
pub mod forecast;
pub mod handlers;
pub mod metrics;
pub mod service;
pub mod store;
pub mod types;

use axum::{routing::post, Router};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use error::ReportsError;
pub use export::{ExportFormat, ReportLocale, ReportRenderer};
pub use filter::LeadScope;
pub use forecast::ForecastWeights;
pub use handlers::*;
pub use service::{ExportedReport, ReportsService};
pub use store::{LeadStore, PgLeadStore, StoreError};
pub use types::*;

pub fn configure_reports_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reports/dashboard", post(handle_dashboard_report))
        .route("/api/reports/export/csv", post(handle_export_csv))
        .route("/api/reports/export/pdf", post(handle_export_pdf))
}
