use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::error::ReportsError;
use super::export::{renderer_for, ExportError, ExportFormat, ExportPayload, ReportLocale, ReportRenderer};
use super::filter::LeadScope;
use super::forecast::{forecast, ForecastWeights};
use super::metrics::{funnel_stages, lost_reasons, productivity};
use super::store::LeadStore;
use super::types::{DashboardReport, LeadRecord, ReportRequest};

impl DashboardReport {
    /// Every section is computed from the same slice, so totals always agree.
    pub fn from_leads(
        leads: &[LeadRecord],
        weights: &ForecastWeights,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            productivity: productivity(leads),
            sales_forecast: forecast(leads, weights),
            funnel_stages: funnel_stages(leads),
            lost_reasons_analysis: lost_reasons(leads),
            generated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportedReport {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
    pub lead_count: usize,
}

pub struct ReportsService {
    store: Arc<dyn LeadStore>,
    weights: ForecastWeights,
}

impl std::fmt::Debug for ReportsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportsService")
            .field("weights", &self.weights)
            .finish_non_exhaustive()
    }
}

impl ReportsService {
    pub fn new(store: Arc<dyn LeadStore>, weights: ForecastWeights) -> Self {
        Self { store, weights }
    }

    async fn load(&self, request: &ReportRequest) -> Result<Vec<LeadRecord>, ReportsError> {
        let scope = LeadScope::resolve(request)?;
        Ok(self.store.fetch_leads(&scope).await?)
    }

    pub async fn dashboard(&self, request: &ReportRequest) -> Result<DashboardReport, ReportsError> {
        let leads = self.load(request).await?;
        log::info!(
            "Dashboard report for {} over {} leads",
            request.requester_id,
            leads.len()
        );
        Ok(DashboardReport::from_leads(&leads, &self.weights, Utc::now()))
    }

    pub async fn export(
        &self,
        request: &ReportRequest,
        format: ExportFormat,
        locale: ReportLocale,
    ) -> Result<ExportedReport, ReportsError> {
        self.export_with(request, Arc::from(renderer_for(format)), locale)
            .await
    }

    /// Exports with an explicit renderer. The report and the rows handed to the
    /// renderer come from one fetch.
    pub async fn export_with(
        &self,
        request: &ReportRequest,
        renderer: Arc<dyn ReportRenderer>,
        locale: ReportLocale,
    ) -> Result<ExportedReport, ReportsError> {
        let leads = self.load(request).await?;
        let generated_at = Utc::now();
        let report = DashboardReport::from_leads(&leads, &self.weights, generated_at);
        let lead_count = leads.len();

        let payload = ExportPayload {
            report,
            leads,
            filters: request.filters.clone(),
            locale,
        };

        let content_type = renderer.content_type();
        let file_name = format!(
            "sales-report-{}.{}",
            generated_at.format("%Y%m%d-%H%M%S"),
            renderer.extension()
        );

        let bytes = tokio::task::spawn_blocking(move || renderer.render(&payload))
            .await
            .map_err(|e| ExportError::Render(format!("Render task failed: {e}")))??;

        log::info!(
            "Exported {file_name} ({} bytes, {lead_count} leads) for {}",
            bytes.len(),
            request.requester_id
        );

        Ok(ExportedReport {
            bytes,
            content_type,
            file_name,
            lead_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::test_utils::{lead_fixture, FailingLeadStore, InMemoryLeadStore};
    use crate::reports::types::{ReportFilters, Stage};
    use chrono::Duration;
    use uuid::Uuid;

    struct BrokenRenderer;

    impl ReportRenderer for BrokenRenderer {
        fn format(&self) -> ExportFormat {
            ExportFormat::Pdf
        }

        fn render(&self, _payload: &ExportPayload) -> Result<Vec<u8>, ExportError> {
            Err(ExportError::Render("font table missing".to_string()))
        }
    }

    fn admin_request() -> ReportRequest {
        ReportRequest {
            filters: ReportFilters::default(),
            requester_id: Uuid::new_v4(),
            requester_is_admin: true,
        }
    }

    fn scenario(owner: Uuid) -> Vec<LeadRecord> {
        let mut leads = Vec::new();
        for (value, days) in [(100.0, 2), (200.0, 4), (300.0, 6), (400.0, 8)] {
            let mut lead = lead_fixture("Won", value, Some(owner));
            lead.updated_at = lead.created_at + Duration::days(days);
            leads.push(lead);
        }
        for _ in 0..2 {
            let mut lead = lead_fixture("Lost", 0.0, Some(owner));
            lead.lost_reason = Some("Price".to_string());
            leads.push(lead);
        }
        for _ in 0..2 {
            leads.push(lead_fixture("Proposal", 500.0, Some(owner)));
            leads.push(lead_fixture("Negotiation", 1000.0, Some(owner)));
        }
        leads
    }

    #[tokio::test]
    async fn test_dashboard_scenario() {
        let store = InMemoryLeadStore::new(scenario(Uuid::new_v4()));
        let service = ReportsService::new(Arc::new(store), ForecastWeights::default());

        let report = service.dashboard(&admin_request()).await.unwrap();
        let p = &report.productivity;
        assert_eq!(p.total_leads, 10);
        assert_eq!(p.total_won_count, 4);
        assert!((p.total_won_value - 1000.0).abs() < 1e-9);
        assert!((p.avg_closing_time_days - 5.0).abs() < 1e-9);
        assert!((p.conversion_rate - 0.4).abs() < 1e-9);
        assert!((p.loss_rate - 0.2).abs() < 1e-9);

        let reasons = &report.lost_reasons_analysis.reasons;
        assert_eq!(reasons.len(), 1);
        assert_eq!(reasons[0].reason, "Price");
        assert!((reasons[0].percentage - 1.0).abs() < 1e-9);

        assert!((report.sales_forecast.forecasted_value_weighted - 2000.0).abs() < 1e-9);
        assert!((report.sales_forecast.total_pipeline_value - 3000.0).abs() < 1e-9);

        let funnel: Vec<Stage> = report.funnel_stages.iter().map(|s| s.stage.clone()).collect();
        assert_eq!(
            funnel,
            vec![Stage::Proposal, Stage::Negotiation, Stage::Won, Stage::Lost]
        );
    }

    #[tokio::test]
    async fn test_empty_base_is_all_zero() {
        let service = ReportsService::new(
            Arc::new(InMemoryLeadStore::new(Vec::new())),
            ForecastWeights::default(),
        );
        let report = service.dashboard(&admin_request()).await.unwrap();
        assert_eq!(report.productivity.conversion_rate, 0.0);
        assert_eq!(report.productivity.loss_rate, 0.0);
        assert_eq!(report.productivity.avg_closing_time_days, 0.0);
        assert_eq!(report.sales_forecast.forecasted_value_weighted, 0.0);
    }

    #[tokio::test]
    async fn test_export_uses_same_base_as_metrics() {
        let service = ReportsService::new(
            Arc::new(InMemoryLeadStore::new(scenario(Uuid::new_v4()))),
            ForecastWeights::default(),
        );
        let exported = service
            .export(&admin_request(), ExportFormat::Csv, ReportLocale::En)
            .await
            .unwrap();
        assert_eq!(exported.lead_count, 10);
        assert_eq!(exported.content_type, "text/csv; charset=utf-8");
        assert!(exported.file_name.ends_with(".csv"));

        let text = String::from_utf8(exported.bytes).unwrap();
        assert_eq!(text.lines().count(), 11);
    }

    #[tokio::test]
    async fn test_failures_are_distinguishable() {
        let service = ReportsService::new(
            Arc::new(InMemoryLeadStore::new(Vec::new())),
            ForecastWeights::default(),
        );
        let render_err = service
            .export_with(&admin_request(), Arc::new(BrokenRenderer), ReportLocale::En)
            .await
            .unwrap_err();
        assert_eq!(render_err.kind(), "export");

        let failing = ReportsService::new(Arc::new(FailingLeadStore), ForecastWeights::default());
        let store_err = failing.dashboard(&admin_request()).await.unwrap_err();
        assert_eq!(store_err.kind(), "store");
    }

    #[tokio::test]
    async fn test_invalid_filter_skips_store() {
        let service = ReportsService::new(Arc::new(FailingLeadStore), ForecastWeights::default());
        let mut request = admin_request();
        request.filters.date_start = Some("yesterday".to_string());
        let err = service.dashboard(&request).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }
}
