mod csv_renderer;
mod document;
pub mod locale;
pub mod pdf;

use serde::{Deserialize, Serialize};

use super::types::{DashboardReport, LeadRecord, ReportFilters};

pub use csv_renderer::CsvRenderer;
pub use document::PdfReportRenderer;
pub use locale::{Labels, ReportLocale};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Pdf => "application/pdf",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("Rendering failed: {0}")]
    Render(String),
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        Self::Render(e.to_string())
    }
}

/// Everything a renderer needs: the computed report and the exact lead slice it was
/// computed from.
#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub report: DashboardReport,
    pub leads: Vec<LeadRecord>,
    pub filters: ReportFilters,
    pub locale: ReportLocale,
}

pub trait ReportRenderer: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn render(&self, payload: &ExportPayload) -> Result<Vec<u8>, ExportError>;

    fn content_type(&self) -> &'static str {
        self.format().content_type()
    }

    fn extension(&self) -> &'static str {
        self.format().extension()
    }
}

pub fn renderer_for(format: ExportFormat) -> Box<dyn ReportRenderer> {
    match format {
        ExportFormat::Csv => Box::new(CsvRenderer),
        ExportFormat::Pdf => Box::new(PdfReportRenderer::default()),
    }
}

/// Human-readable one-liner of the filters for document headers.
pub fn describe_filters(filters: &ReportFilters, locale: ReportLocale) -> String {
    let labels = locale.labels();
    let show = |value: Option<&str>| -> String {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() && !v.eq_ignore_ascii_case("all") => v.to_string(),
            _ => labels.any.to_string(),
        }
    };
    let period = match (filters.date_start.as_deref(), filters.date_end.as_deref()) {
        (None, None) => labels.any.to_string(),
        (start, end) => format!("{} - {}", show(start), show(end)),
    };
    format!(
        "{}: {} | {}: {} | {}: {}",
        labels.period,
        period,
        labels.seller,
        show(filters.seller_id.as_deref()),
        labels.source,
        show(filters.source.as_deref())
    )
}
