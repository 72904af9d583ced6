use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use super::error::ReportsError;
use super::types::{LeadRecord, ReportRequest};

/// Sentinel the UI sends for "no constraint" on seller and source selectors.
pub const ALL_SENTINEL: &str = "all";

/// The filtered base for one request, after authorization narrowing. Every report
/// and export of a request is computed from the rows this scope admits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadScope {
    pub owner_id: Option<Uuid>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Uuid(Uuid),
    Text(String),
    Timestamp(DateTime<Utc>),
}

/// A WHERE fragment over the `l` alias of `crm_leads` and the values bound to its
/// `$n` placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadPredicate {
    pub clause: String,
    pub binds: Vec<BindValue>,
}

impl LeadScope {
    pub fn resolve(request: &ReportRequest) -> Result<Self, ReportsError> {
        let filters = &request.filters;

        let date_start = optional_value(filters.date_start.as_deref())
            .map(|raw| parse_date("dateStart", raw))
            .transpose()?;
        let date_end = optional_value(filters.date_end.as_deref())
            .map(|raw| parse_date("dateEnd", raw))
            .transpose()?;

        if let (Some(start), Some(end)) = (date_start, date_end) {
            if start > end {
                return Err(ReportsError::InvalidFilter(format!(
                    "dateStart ({start}) is after dateEnd ({end})"
                )));
            }
        }

        let requested_seller = selector_value(filters.seller_id.as_deref());

        // Non-admin requests ignore sellerId entirely, malformed or not.
        let owner_id = if request.requester_is_admin {
            requested_seller
                .map(|raw| {
                    Uuid::parse_str(raw).map_err(|_| {
                        ReportsError::InvalidFilter(format!("sellerId is not a valid id: {raw}"))
                    })
                })
                .transpose()?
        } else {
            if let Some(raw) = requested_seller {
                log::debug!(
                    "Narrowing report scope of {} to own leads (requested seller {})",
                    request.requester_id,
                    raw
                );
            }
            Some(request.requester_id)
        };

        let created_from = date_start.map(start_of_day);
        let created_before = date_end
            .map(|end| {
                end.checked_add_days(Days::new(1))
                    .map(start_of_day)
                    .ok_or_else(|| {
                        ReportsError::InvalidFilter(format!("dateEnd out of range: {end}"))
                    })
            })
            .transpose()?;

        Ok(Self {
            owner_id,
            created_from,
            created_before,
            source: selector_value(filters.source.as_deref()).map(str::to_string),
        })
    }

    pub fn to_predicate(&self) -> LeadPredicate {
        let mut conditions = vec!["l.deleted_at IS NULL".to_string()];
        let mut binds = Vec::new();

        if let Some(owner_id) = self.owner_id {
            binds.push(BindValue::Uuid(owner_id));
            conditions.push(format!("l.owner_id = ${}", binds.len()));
        }

        if let Some(from) = self.created_from {
            binds.push(BindValue::Timestamp(from));
            conditions.push(format!("l.created_at >= ${}", binds.len()));
        }

        if let Some(before) = self.created_before {
            binds.push(BindValue::Timestamp(before));
            conditions.push(format!("l.created_at < ${}", binds.len()));
        }

        if let Some(ref source) = self.source {
            binds.push(BindValue::Text(source.clone()));
            conditions.push(format!("l.source = ${}", binds.len()));
        }

        LeadPredicate {
            clause: conditions.join(" AND "),
            binds,
        }
    }

    /// In-process evaluation of the same predicate `to_predicate` produces.
    pub fn admits(&self, lead: &LeadRecord) -> bool {
        if lead.deleted_at.is_some() {
            return false;
        }
        if let Some(owner_id) = self.owner_id {
            if lead.owner_id != Some(owner_id) {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if lead.created_at < from {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if lead.created_at >= before {
                return false;
            }
        }
        if let Some(ref source) = self.source {
            if lead.source.as_deref() != Some(source.as_str()) {
                return false;
            }
        }
        true
    }
}

fn optional_value(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

fn selector_value(raw: Option<&str>) -> Option<&str> {
    optional_value(raw).filter(|v| !v.eq_ignore_ascii_case(ALL_SENTINEL))
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ReportsError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    // Date pickers sometimes send a full ISO timestamp; only the calendar day counts.
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|_| ReportsError::InvalidFilter(format!("{field} is not a valid date: {raw}")))
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
