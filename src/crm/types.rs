use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::schema::{crm_clients, crm_leads, crm_notes};
use crate::reports::types::Stage;

/// Optional qualification data captured by the sales team. Stored as JSONB; keys
/// the struct does not know about are ignored on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_consumption: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_notes: Option<String>,
}

impl LeadAttributes {
    pub fn from_json(lead_id: Uuid, value: &serde_json::Value) -> Self {
        if value.is_null() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed attributes on lead {lead_id}: {e}");
            Self::default()
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crm_leads)]
pub struct DbLead {
    pub id: Uuid,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub stage: String,
    pub value: Option<f64>,
    pub source: Option<String>,
    pub owner_id: Option<Uuid>,
    pub lost_reason: Option<String>,
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub stage: Stage,
    pub value: f64,
    pub source: Option<String>,
    pub owner_id: Option<Uuid>,
    pub lost_reason: Option<String>,
    pub attributes: LeadAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbLead> for Lead {
    fn from(db: DbLead) -> Self {
        Self {
            attributes: LeadAttributes::from_json(db.id, &db.attributes),
            id: db.id,
            name: db.name,
            company: db.company,
            email: db.email,
            phone: db.phone,
            stage: Stage::parse(&db.stage),
            value: db.value.unwrap_or(0.0),
            source: db.source,
            owner_id: db.owner_id,
            lost_reason: db.lost_reason,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = crm_clients)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub lead_id: Option<Uuid>,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// A new client carrying over the lead's identity and ownership.
    pub fn from_lead(lead: &DbLead, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lead_id: Some(lead.id),
            name: lead.name.clone(),
            company: lead.company.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            owner_id: lead.owner_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = crm_notes)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageChangeRequest {
    pub stage: String,
    #[serde(default)]
    pub lost_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNoteRequest {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn db_lead(attributes: serde_json::Value) -> DbLead {
        let now = Utc::now();
        DbLead {
            id: Uuid::new_v4(),
            name: "Padaria Central".to_string(),
            company: Some("Central LTDA".to_string()),
            email: None,
            phone: Some("+55 11 5555-0000".to_string()),
            stage: "qualified".to_string(),
            value: None,
            source: Some("Referral".to_string()),
            owner_id: Some(Uuid::new_v4()),
            lost_reason: None,
            attributes,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_attributes_decode_known_fields() {
        let lead = Lead::from(db_lead(json!({
            "companySize": "11-50",
            "monthlyConsumption": 1250.5,
            "legacyFlag": true
        })));
        assert_eq!(lead.attributes.company_size.as_deref(), Some("11-50"));
        assert_eq!(lead.attributes.monthly_consumption, Some(1250.5));
        assert_eq!(lead.attributes.website, None);
        assert_eq!(lead.stage, Stage::Qualification);
        assert_eq!(lead.value, 0.0);
    }

    #[test]
    fn test_malformed_attributes_fall_back_to_empty() {
        let lead = Lead::from(db_lead(json!({ "monthlyConsumption": "a lot" })));
        assert_eq!(lead.attributes, LeadAttributes::default());

        let lead = Lead::from(db_lead(serde_json::Value::Null));
        assert_eq!(lead.attributes, LeadAttributes::default());
    }

    #[test]
    fn test_attributes_serialize_sparse() {
        let attrs = LeadAttributes {
            website: Some("https://padaria.example".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&attrs).unwrap(),
            json!({ "website": "https://padaria.example" })
        );
    }

    #[test]
    fn test_client_copies_lead_identity() {
        let lead = db_lead(json!({}));
        let client = Client::from_lead(&lead, Utc::now());
        assert_eq!(client.lead_id, Some(lead.id));
        assert_eq!(client.name, lead.name);
        assert_eq!(client.phone, lead.phone);
        assert_eq!(client.owner_id, lead.owner_id);
    }
}
