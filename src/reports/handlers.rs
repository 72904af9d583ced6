use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::middleware::AuthenticatedUser;
use crate::core::shared::state::AppState;

use super::error::ReportsError;
use super::export::{ExportFormat, ReportLocale};
use super::service::ExportedReport;
use super::types::{DashboardReport, ReportFilters, ReportRequest};

pub const LEAD_COUNT_HEADER: HeaderName = HeaderName::from_static("x-report-lead-count");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportBody {
    #[serde(default)]
    pub filters: ReportFilters,
    #[serde(default)]
    pub locale: Option<String>,
}

fn report_request(user: &AuthenticatedUser, body: &ReportBody) -> ReportRequest {
    ReportRequest {
        filters: body.filters.clone(),
        requester_id: user.user_id,
        requester_is_admin: user.sees_all_records(),
    }
}

fn read_body(payload: Result<Json<ReportBody>, JsonRejection>) -> Result<ReportBody, ReportsError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ReportsError::InvalidRequest(rejection.body_text()))
}

fn resolve_locale(state: &AppState, body: &ReportBody) -> Result<ReportLocale, ReportsError> {
    match body.locale.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        Some(tag) => tag
            .parse()
            .map_err(|e: super::export::locale::UnknownLocale| {
                ReportsError::InvalidRequest(e.to_string())
            }),
        None => Ok(state.config.reports.default_locale),
    }
}

pub async fn handle_dashboard_report(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    payload: Result<Json<ReportBody>, JsonRejection>,
) -> Result<Json<DashboardReport>, ReportsError> {
    let body = read_body(payload)?;
    let request = report_request(&user, &body);
    let report = state.reports.dashboard(&request).await?;
    Ok(Json(report))
}

pub async fn handle_export_csv(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    payload: Result<Json<ReportBody>, JsonRejection>,
) -> Result<Response, ReportsError> {
    export(&state, &user, payload, ExportFormat::Csv).await
}

pub async fn handle_export_pdf(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    payload: Result<Json<ReportBody>, JsonRejection>,
) -> Result<Response, ReportsError> {
    export(&state, &user, payload, ExportFormat::Pdf).await
}

async fn export(
    state: &AppState,
    user: &AuthenticatedUser,
    payload: Result<Json<ReportBody>, JsonRejection>,
    format: ExportFormat,
) -> Result<Response, ReportsError> {
    let body = read_body(payload)?;
    let locale = resolve_locale(state, &body)?;
    let request = report_request(user, &body);
    let exported = state.reports.export(&request, format, locale).await?;
    download_response(exported)
}

fn download_response(exported: ExportedReport) -> Result<Response, ReportsError> {
    let disposition =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", exported.file_name))
            .map_err(|e| ReportsError::Internal(format!("Invalid file name header: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(exported.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
            (LEAD_COUNT_HEADER, HeaderValue::from(exported.lead_count)),
        ],
        exported.bytes,
    )
        .into_response())
}
