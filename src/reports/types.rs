use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Pipeline position of a lead. Anything the CRM UI stored that is not one of the
/// known stages is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    FirstContact,
    Qualification,
    Proposal,
    Negotiation,
    Won,
    Lost,
    Other(String),
}

impl Stage {
    pub const PIPELINE: [Stage; 6] = [
        Stage::FirstContact,
        Stage::Qualification,
        Stage::Proposal,
        Stage::Negotiation,
        Stage::Won,
        Stage::Lost,
    ];

    pub fn parse(raw: &str) -> Self {
        let normalized = raw
            .trim()
            .to_lowercase()
            .replace(['_', '-'], " ");
        match normalized.as_str() {
            "first contact" | "new" | "lead" => Self::FirstContact,
            "qualification" | "qualified" => Self::Qualification,
            "proposal" => Self::Proposal,
            "negotiation" => Self::Negotiation,
            "won" | "converted" | "closed won" => Self::Won,
            "lost" | "closed lost" => Self::Lost,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::FirstContact => "First Contact",
            Self::Qualification => "Qualification",
            Self::Proposal => "Proposal",
            Self::Negotiation => "Negotiation",
            Self::Won => "Won",
            Self::Lost => "Lost",
            Self::Other(name) => name,
        }
    }

    /// Position in the canonical pipeline; `None` for unrecognized stages.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::FirstContact => Some(0),
            Self::Qualification => Some(1),
            Self::Proposal => Some(2),
            Self::Negotiation => Some(3),
            Self::Won => Some(4),
            Self::Lost => Some(5),
            Self::Other(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }

    /// Canonical stages first in pipeline order, unknown stages after them by name.
    pub fn sort_key(&self) -> (u8, &str) {
        (self.rank().unwrap_or(u8::MAX), self.label())
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Stage {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// One row of the filtered base, as read from the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub id: Uuid,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub stage: Stage,
    pub value: f64,
    pub source: Option<String>,
    pub owner_id: Option<Uuid>,
    pub owner_name: Option<String>,
    pub lost_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Filters as sent by the dashboard UI. Values are raw strings; `"all"` and empty
/// strings mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilters {
    #[serde(default)]
    pub date_start: Option<String>,
    #[serde(default)]
    pub date_end: Option<String>,
    #[serde(default)]
    pub seller_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub filters: ReportFilters,
    pub requester_id: Uuid,
    pub requester_is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerProductivity {
    pub seller_id: Option<Uuid>,
    pub seller_name: String,
    pub total_leads: i64,
    pub leads_active: i64,
    pub won_count: i64,
    pub won_value: f64,
    pub lost_count: i64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityMetrics {
    pub total_leads: i64,
    pub leads_active: i64,
    pub total_won_count: i64,
    pub total_won_value: f64,
    pub avg_closing_time_days: f64,
    pub total_lost_count: i64,
    pub conversion_rate: f64,
    pub loss_rate: f64,
    pub sellers: Vec<SellerProductivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastStage {
    pub stage: Stage,
    pub count: i64,
    pub value: f64,
    pub weight: f64,
    pub weighted_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesForecast {
    pub forecasted_value_weighted: f64,
    pub total_pipeline_value: f64,
    pub stages: Vec<ForecastStage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStage {
    pub stage: Stage,
    pub count: i64,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LostReasonShare {
    pub reason: String,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LostReasonsAnalysis {
    pub total_lost_count: i64,
    pub reasons: Vec<LostReasonShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub productivity: ProductivityMetrics,
    pub sales_forecast: SalesForecast,
    pub funnel_stages: Vec<FunnelStage>,
    pub lost_reasons_analysis: LostReasonsAnalysis,
    pub generated_at: DateTime<Utc>,
}
