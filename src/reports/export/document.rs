use chrono::Utc;

use super::pdf::{fit_text, text_width, Font, PdfDocument, Rgb, A4_HEIGHT, A4_WIDTH};
use super::{describe_filters, ExportError, ExportFormat, ExportPayload, ReportLocale, ReportRenderer};

const MARGIN: f64 = 40.0;
const FOOTER: f64 = 30.0;
const ROW_HEIGHT: f64 = 16.0;
const CELL_PADDING: f64 = 4.0;
const BODY_SIZE: f64 = 9.0;
const HEADER_FILL: Rgb = Rgb(0.88, 0.90, 0.93);
const RULE: Rgb = Rgb(0.75, 0.75, 0.75);

/// Printable report: header block, metric summary, forecast, funnel, loss reasons
/// and the lead listing.
#[derive(Debug, Clone)]
pub struct PdfReportRenderer {
    page_width: f64,
    page_height: f64,
}

impl Default for PdfReportRenderer {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH,
            page_height: A4_HEIGHT,
        }
    }
}

struct Column {
    header: &'static str,
    width: f64,
    numeric: bool,
}

struct Table {
    title: &'static str,
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

struct Layout<'a> {
    doc: PdfDocument,
    renderer: &'a PdfReportRenderer,
    locale: ReportLocale,
    y: f64,
}

impl<'a> Layout<'a> {
    fn new(renderer: &'a PdfReportRenderer, locale: ReportLocale) -> Self {
        let mut layout = Self {
            doc: PdfDocument::new(locale.labels().title),
            renderer,
            locale,
            y: MARGIN,
        };
        layout.new_page();
        layout
    }

    fn bottom(&self) -> f64 {
        self.renderer.page_height - MARGIN - FOOTER
    }

    fn content_width(&self) -> f64 {
        self.renderer.page_width - 2.0 * MARGIN
    }

    fn new_page(&mut self) {
        self.doc
            .add_page(self.renderer.page_width, self.renderer.page_height);
        let number = format!("{} {}", self.locale.labels().page, self.doc.page_count());
        self.doc.set_font(Font::Regular);
        self.doc.set_fill_color(Rgb::BLACK);
        self.doc.draw_text(
            &number,
            self.renderer.page_width - MARGIN - 50.0,
            self.renderer.page_height - MARGIN / 2.0,
            8.0,
        );
        self.y = MARGIN;
    }

    fn ensure_space(&mut self, height: f64) -> bool {
        if self.y + height > self.bottom() {
            self.new_page();
            return true;
        }
        false
    }

    fn text(&mut self, text: &str, size: f64, font: Font) {
        self.ensure_space(size + 6.0);
        self.y += size + 6.0;
        self.doc.set_font(font);
        self.doc.set_fill_color(Rgb::BLACK);
        let line = fit_text(text, size, self.content_width());
        self.doc.draw_text(&line, MARGIN, self.y, size);
    }

    fn gap(&mut self, height: f64) {
        self.y += height;
    }

    fn header_row(&mut self, columns: &[Column]) {
        let width = self.content_width();
        self.doc.set_fill_color(HEADER_FILL);
        self.doc.draw_rect(MARGIN, self.y, width, ROW_HEIGHT, true, false);
        self.draw_cells(
            columns,
            columns.iter().map(|c| c.header.to_string()).collect::<Vec<_>>().as_slice(),
            Font::Bold,
        );
    }

    fn draw_cells(&mut self, columns: &[Column], cells: &[String], font: Font) {
        self.doc.set_font(font);
        self.doc.set_fill_color(Rgb::BLACK);
        let baseline = self.y + ROW_HEIGHT - CELL_PADDING - 1.0;
        let mut x = MARGIN;
        for (column, cell) in columns.iter().zip(cells) {
            let fitted = fit_text(cell, BODY_SIZE, column.width - 2.0 * CELL_PADDING);
            let text_x = if column.numeric {
                x + column.width - CELL_PADDING - text_width(&fitted, BODY_SIZE)
            } else {
                x + CELL_PADDING
            };
            self.doc.draw_text(&fitted, text_x, baseline, BODY_SIZE);
            x += column.width;
        }
        self.y += ROW_HEIGHT;
        self.doc.set_stroke_color(RULE);
        self.doc.set_line_width(0.5);
        self.doc
            .draw_line(MARGIN, self.y, MARGIN + self.content_width(), self.y);
    }

    fn table(&mut self, table: &Table) {
        self.ensure_space(ROW_HEIGHT * 3.0 + 18.0);
        self.text(table.title, 12.0, Font::Bold);
        self.gap(4.0);
        self.header_row(&table.columns);

        if table.rows.is_empty() {
            let no_data = vec![self.locale.labels().no_data.to_string()];
            let span = [Column {
                header: "",
                width: self.content_width(),
                numeric: false,
            }];
            self.draw_cells(&span, &no_data, Font::Regular);
        }

        for row in &table.rows {
            if self.ensure_space(ROW_HEIGHT) {
                self.header_row(&table.columns);
            }
            self.draw_cells(&table.columns, row, Font::Regular);
        }
        self.gap(14.0);
    }
}

impl PdfReportRenderer {
    pub fn build(&self, payload: &ExportPayload) -> PdfDocument {
        let locale = payload.locale;
        let labels = locale.labels();
        let report = &payload.report;
        let productivity = &report.productivity;
        let mut layout = Layout::new(self, locale);

        layout.text(labels.title, 18.0, Font::Bold);
        layout.text(
            &format!(
                "{}: {}",
                labels.generated_at,
                locale.format_timestamp(&report.generated_at)
            ),
            9.0,
            Font::Regular,
        );
        layout.text(
            &format!("{}: {}", labels.filters, describe_filters(&payload.filters, locale)),
            9.0,
            Font::Regular,
        );
        layout.gap(12.0);

        let half = layout.content_width() / 2.0;
        let pair = |header: &'static str, numeric: bool| Column {
            header,
            width: half,
            numeric,
        };

        layout.table(&Table {
            title: labels.metrics,
            columns: vec![pair(labels.metric, false), pair(labels.value, true)],
            rows: vec![
                vec![labels.total_leads.into(), locale.format_count(productivity.total_leads)],
                vec![labels.active_leads.into(), locale.format_count(productivity.leads_active)],
                vec![labels.won_count.into(), locale.format_count(productivity.total_won_count)],
                vec![labels.won_value.into(), locale.format_number(productivity.total_won_value)],
                vec![labels.lost_count.into(), locale.format_count(productivity.total_lost_count)],
                vec![labels.conversion_rate.into(), locale.format_percent(productivity.conversion_rate)],
                vec![labels.loss_rate.into(), locale.format_percent(productivity.loss_rate)],
                vec![labels.avg_closing_time.into(), locale.format_number(productivity.avg_closing_time_days)],
            ],
        });

        layout.text(labels.forecast, 12.0, Font::Bold);
        layout.text(
            &format!(
                "{}: {}    {}: {}",
                labels.weighted_forecast,
                locale.format_number(report.sales_forecast.forecasted_value_weighted),
                labels.pipeline_value,
                locale.format_number(report.sales_forecast.total_pipeline_value)
            ),
            10.0,
            Font::Regular,
        );
        layout.gap(14.0);

        let third = layout.content_width() / 3.0;
        let col = |header: &'static str, numeric: bool| Column {
            header,
            width: third,
            numeric,
        };

        layout.table(&Table {
            title: labels.funnel,
            columns: vec![col(labels.stage, false), col(labels.count, true), col(labels.value, true)],
            rows: report
                .funnel_stages
                .iter()
                .map(|s| {
                    vec![
                        s.stage.to_string(),
                        locale.format_count(s.count),
                        locale.format_number(s.total_value),
                    ]
                })
                .collect(),
        });

        layout.table(&Table {
            title: labels.lost_reasons,
            columns: vec![col(labels.reason, false), col(labels.count, true), col(labels.share, true)],
            rows: report
                .lost_reasons_analysis
                .reasons
                .iter()
                .map(|r| {
                    vec![
                        r.reason.clone(),
                        locale.format_count(r.count),
                        locale.format_percent(r.percentage),
                    ]
                })
                .collect(),
        });

        let columns = &labels.columns;
        let share = layout.content_width() / 100.0;
        let lead_col = |header: &'static str, weight: f64, numeric: bool| Column {
            header,
            width: share * weight,
            numeric,
        };
        layout.table(&Table {
            title: labels.leads,
            columns: vec![
                lead_col(columns[0], 22.0, false),
                lead_col(columns[1], 20.0, false),
                lead_col(columns[4], 14.0, false),
                lead_col(columns[6], 14.0, true),
                lead_col(columns[7], 16.0, false),
                lead_col(columns[9], 14.0, false),
            ],
            rows: payload
                .leads
                .iter()
                .map(|lead| {
                    vec![
                        lead.name.clone(),
                        lead.company.clone().unwrap_or_default(),
                        lead.stage.to_string(),
                        locale.format_number(lead.value),
                        lead.owner_name.clone().unwrap_or_default(),
                        locale.format_date(&lead.created_at),
                    ]
                })
                .collect(),
        });

        let mut doc = layout.doc;
        doc.add_metadata(labels.title, &Utc::now().format("D:%Y%m%d%H%M%SZ").to_string());
        doc
    }
}

impl ReportRenderer for PdfReportRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn render(&self, payload: &ExportPayload) -> Result<Vec<u8>, ExportError> {
        let doc = self.build(payload);
        if doc.page_count() == 0 {
            return Err(ExportError::Render("document has no pages".to_string()));
        }
        Ok(doc.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::forecast::ForecastWeights;
    use crate::reports::types::{DashboardReport, LeadRecord, ReportFilters, Stage};
    use uuid::Uuid;

    fn payload(leads: Vec<LeadRecord>) -> ExportPayload {
        let report = DashboardReport::from_leads(&leads, &ForecastWeights::default(), Utc::now());
        ExportPayload {
            report,
            leads,
            filters: ReportFilters::default(),
            locale: ReportLocale::En,
        }
    }

    fn lead(i: usize) -> LeadRecord {
        let now = Utc::now();
        LeadRecord {
            id: Uuid::new_v4(),
            name: format!("Lead {i}"),
            company: Some("Acme (Holdings)".to_string()),
            email: None,
            phone: None,
            stage: if i % 5 == 0 { Stage::Lost } else { Stage::Proposal },
            value: 100.0 * i as f64,
            source: None,
            owner_id: None,
            owner_name: Some("Ana".to_string()),
            lost_reason: Some("Price".to_string()),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn occurrences(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_empty_report_renders_no_data_rows() {
        let bytes = PdfReportRenderer::default().render(&payload(Vec::new())).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(occurrences(&text, "(No data) Tj"), 3);
        assert!(text.contains("(Page 1) Tj"));
    }

    #[test]
    fn test_long_listing_breaks_pages_and_repeats_header() {
        let leads: Vec<LeadRecord> = (1..=150).map(lead).collect();
        let renderer = PdfReportRenderer::default();
        let doc = renderer.build(&payload(leads));
        assert!(doc.page_count() >= 3);

        let bytes = doc.to_bytes();
        let text = String::from_utf8_lossy(&bytes);
        // The lead table header is drawn once per page it spans.
        assert!(occurrences(&text, "(Company) Tj") >= doc.page_count() - 1);
        for page in 1..=doc.page_count() {
            assert!(text.contains(&format!("(Page {page}) Tj")));
        }
        assert!(text.contains("Acme \\(Holdings\\)"));
    }
}
