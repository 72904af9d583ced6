use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLocale {
    #[default]
    En,
    Pt,
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported locale: {0} (expected en or pt)")]
pub struct UnknownLocale(pub String);

impl std::str::FromStr for ReportLocale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_lowercase().replace('_', "-");
        match tag.split('-').next().unwrap_or_default() {
            "en" => Ok(Self::En),
            "pt" => Ok(Self::Pt),
            _ => Err(UnknownLocale(s.to_string())),
        }
    }
}

impl std::fmt::Display for ReportLocale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::En => write!(f, "en"),
            Self::Pt => write!(f, "pt"),
        }
    }
}

/// User-facing strings of the exported documents.
pub struct Labels {
    pub title: &'static str,
    pub generated_at: &'static str,
    pub filters: &'static str,
    pub period: &'static str,
    pub seller: &'static str,
    pub source: &'static str,
    pub any: &'static str,
    pub metrics: &'static str,
    pub metric: &'static str,
    pub value: &'static str,
    pub total_leads: &'static str,
    pub active_leads: &'static str,
    pub won_count: &'static str,
    pub won_value: &'static str,
    pub lost_count: &'static str,
    pub conversion_rate: &'static str,
    pub loss_rate: &'static str,
    pub avg_closing_time: &'static str,
    pub forecast: &'static str,
    pub weighted_forecast: &'static str,
    pub pipeline_value: &'static str,
    pub funnel: &'static str,
    pub stage: &'static str,
    pub count: &'static str,
    pub lost_reasons: &'static str,
    pub reason: &'static str,
    pub share: &'static str,
    pub leads: &'static str,
    pub page: &'static str,
    pub no_data: &'static str,
    pub columns: [&'static str; 11],
}

const EN_LABELS: Labels = Labels {
    title: "Sales Report",
    generated_at: "Generated at",
    filters: "Filters",
    period: "Period",
    seller: "Seller",
    source: "Source",
    any: "All",
    metrics: "Productivity",
    metric: "Metric",
    value: "Value",
    total_leads: "Total leads",
    active_leads: "Active leads",
    won_count: "Won",
    won_value: "Won value",
    lost_count: "Lost",
    conversion_rate: "Conversion rate",
    loss_rate: "Loss rate",
    avg_closing_time: "Avg. closing time (days)",
    forecast: "Sales forecast",
    weighted_forecast: "Weighted forecast",
    pipeline_value: "Pipeline value",
    funnel: "Funnel",
    stage: "Stage",
    count: "Count",
    lost_reasons: "Loss reasons",
    reason: "Reason",
    share: "Share",
    leads: "Leads",
    page: "Page",
    no_data: "No data",
    columns: [
        "Name",
        "Company",
        "Email",
        "Phone",
        "Stage",
        "Source",
        "Value",
        "Owner",
        "Lost Reason",
        "Created",
        "Updated",
    ],
};

const PT_LABELS: Labels = Labels {
    title: "Relatório de Vendas",
    generated_at: "Gerado em",
    filters: "Filtros",
    period: "Período",
    seller: "Vendedor",
    source: "Origem",
    any: "Todos",
    metrics: "Produtividade",
    metric: "Métrica",
    value: "Valor",
    total_leads: "Total de leads",
    active_leads: "Leads ativos",
    won_count: "Ganhos",
    won_value: "Valor ganho",
    lost_count: "Perdidos",
    conversion_rate: "Taxa de conversão",
    loss_rate: "Taxa de perda",
    avg_closing_time: "Tempo médio de fechamento (dias)",
    forecast: "Previsão de vendas",
    weighted_forecast: "Previsão ponderada",
    pipeline_value: "Valor do funil",
    funnel: "Funil",
    stage: "Etapa",
    count: "Quantidade",
    lost_reasons: "Motivos de perda",
    reason: "Motivo",
    share: "Participação",
    leads: "Leads",
    page: "Página",
    no_data: "Sem dados",
    columns: [
        "Nome",
        "Empresa",
        "E-mail",
        "Telefone",
        "Etapa",
        "Origem",
        "Valor",
        "Responsável",
        "Motivo da Perda",
        "Criado em",
        "Atualizado em",
    ],
};

impl ReportLocale {
    pub fn labels(self) -> &'static Labels {
        match self {
            Self::En => &EN_LABELS,
            Self::Pt => &PT_LABELS,
        }
    }

    fn number_locale(self) -> Locale {
        match self {
            Self::En => Locale::en,
            Self::Pt => Locale::pt,
        }
    }

    pub fn decimal_separator(self) -> char {
        match self {
            Self::En => '.',
            Self::Pt => ',',
        }
    }

    /// Field separator for CSV; `;` where the comma is the decimal mark.
    pub fn csv_delimiter(self) -> u8 {
        match self {
            Self::En => b',',
            Self::Pt => b';',
        }
    }

    /// Two decimal places with locale grouping.
    pub fn format_number(self, value: f64) -> String {
        if !value.is_finite() {
            return "0".to_string();
        }
        let cents = (value.abs() * 100.0).round() as i64;
        let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
        format!(
            "{}{}{}{:02}",
            sign,
            (cents / 100).to_formatted_string(&self.number_locale()),
            self.decimal_separator(),
            cents % 100
        )
    }

    pub fn format_count(self, value: i64) -> String {
        value.to_formatted_string(&self.number_locale())
    }

    /// Formats a 0-1 fraction as a percentage with one decimal place.
    pub fn format_percent(self, fraction: f64) -> String {
        let tenths = (fraction * 1000.0).round() as i64;
        format!(
            "{}{}{}%",
            tenths / 10,
            self.decimal_separator(),
            (tenths % 10).abs()
        )
    }

    pub fn format_date(self, at: &DateTime<Utc>) -> String {
        match self {
            Self::En => at.format("%m/%d/%Y").to_string(),
            Self::Pt => at.format("%d/%m/%Y").to_string(),
        }
    }

    pub fn format_timestamp(self, at: &DateTime<Utc>) -> String {
        match self {
            Self::En => at.format("%m/%d/%Y %H:%M UTC").to_string(),
            Self::Pt => at.format("%d/%m/%Y %H:%M UTC").to_string(),
        }
    }
}
