use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{Float8, Nullable, Text, Timestamptz, Uuid as DieselUuid};
use uuid::Uuid;

use super::filter::{BindValue, LeadScope};
use super::types::{LeadRecord, Stage};
use crate::core::shared::utils::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    Connection(String),
    #[error("Query failed: {0}")]
    Query(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        Self::Query(e.to_string())
    }
}

/// Read access to the lead base. One call returns the full filtered base for a
/// scope, read from a single consistent snapshot.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn fetch_leads(&self, scope: &LeadScope) -> Result<Vec<LeadRecord>, StoreError>;
}

#[derive(QueryableByName)]
struct LeadRow {
    #[diesel(sql_type = DieselUuid)]
    id: Uuid,
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Nullable<Text>)]
    company: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    email: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    phone: Option<String>,
    #[diesel(sql_type = Text)]
    stage: String,
    #[diesel(sql_type = Nullable<Float8>)]
    value: Option<f64>,
    #[diesel(sql_type = Nullable<Text>)]
    source: Option<String>,
    #[diesel(sql_type = Nullable<DieselUuid>)]
    owner_id: Option<Uuid>,
    #[diesel(sql_type = Nullable<Text>)]
    owner_name: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    lost_reason: Option<String>,
    #[diesel(sql_type = Timestamptz)]
    created_at: DateTime<Utc>,
    #[diesel(sql_type = Timestamptz)]
    updated_at: DateTime<Utc>,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    deleted_at: Option<DateTime<Utc>>,
}

impl From<LeadRow> for LeadRecord {
    fn from(row: LeadRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            company: row.company,
            email: row.email,
            phone: row.phone,
            stage: Stage::parse(&row.stage),
            value: row.value.unwrap_or(0.0),
            source: row.source,
            owner_id: row.owner_id,
            owner_name: row.owner_name,
            lost_reason: row.lost_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

pub fn lead_base_sql(clause: &str) -> String {
    format!(
        r#"
        SELECT l.id, l.name, l.company, l.email, l.phone, l.stage, l.value, l.source,
               l.owner_id, u.name AS owner_name, l.lost_reason,
               l.created_at, l.updated_at, l.deleted_at
        FROM crm_leads l
        LEFT JOIN crm_users u ON u.id = l.owner_id
        WHERE {clause}
        ORDER BY l.created_at DESC, l.id
        "#
    )
}

fn bind_all(sql: String, binds: Vec<BindValue>) -> BoxedSqlQuery<'static, Pg, SqlQuery> {
    let mut query = diesel::sql_query(sql).into_boxed::<Pg>();
    for value in binds {
        query = match value {
            BindValue::Uuid(id) => query.bind::<DieselUuid, _>(id),
            BindValue::Text(text) => query.bind::<Text, _>(text),
            BindValue::Timestamp(ts) => query.bind::<Timestamptz, _>(ts),
        };
    }
    query
}

pub struct PgLeadStore {
    pool: DbPool,
}

impl PgLeadStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn fetch_leads(&self, scope: &LeadScope) -> Result<Vec<LeadRecord>, StoreError> {
        let pool = self.pool.clone();
        let predicate = scope.to_predicate();

        let rows = tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Connection(e.to_string()))?;

            let query = bind_all(lead_base_sql(&predicate.clause), predicate.binds);
            conn.build_transaction()
                .read_only()
                .repeatable_read()
                .run(|conn| query.load::<LeadRow>(conn))
                .map_err(StoreError::from)
        })
        .await
        .map_err(|e| StoreError::Query(format!("Task join error: {e}")))??;

        log::debug!("Fetched {} leads for report scope", rows.len());
        Ok(rows.into_iter().map(LeadRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_embeds_clause_without_values() {
        let scope = LeadScope {
            source: Some("Website".to_string()),
            ..Default::default()
        };
        let predicate = scope.to_predicate();
        let sql = lead_base_sql(&predicate.clause);
        assert!(sql.contains("WHERE l.deleted_at IS NULL AND l.source = $1"));
        assert!(!sql.contains("Website"));
        assert!(sql.contains("LEFT JOIN crm_users u"));
    }

    #[test]
    fn test_row_conversion_defaults_missing_value() {
        let now = Utc::now();
        let row = LeadRow {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            company: None,
            email: None,
            phone: None,
            stage: "negotiation".to_string(),
            value: None,
            source: None,
            owner_id: None,
            owner_name: None,
            lost_reason: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let record = LeadRecord::from(row);
        assert_eq!(record.stage, Stage::Negotiation);
        assert_eq!(record.value, 0.0);
    }
}
