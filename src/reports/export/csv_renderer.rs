use super::{ExportError, ExportFormat, ExportPayload, ReportRenderer};

/// One row per lead of the filtered base, columns in fixed order.
pub struct CsvRenderer;

impl ReportRenderer for CsvRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn render(&self, payload: &ExportPayload) -> Result<Vec<u8>, ExportError> {
        let locale = payload.locale;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(locale.csv_delimiter())
            .from_writer(Vec::new());

        writer.write_record(locale.labels().columns)?;

        for lead in &payload.leads {
            writer.write_record([
                lead.name.as_str(),
                lead.company.as_deref().unwrap_or_default(),
                lead.email.as_deref().unwrap_or_default(),
                lead.phone.as_deref().unwrap_or_default(),
                lead.stage.label(),
                lead.source.as_deref().unwrap_or_default(),
                &locale.format_number(lead.value),
                lead.owner_name.as_deref().unwrap_or_default(),
                lead.lost_reason.as_deref().unwrap_or_default(),
                &locale.format_date(&lead.created_at),
                &locale.format_date(&lead.updated_at),
            ])?;
        }

        writer
            .into_inner()
            .map_err(|e| ExportError::Render(format!("CSV flush failed: {}", e.error())))
    }
}
