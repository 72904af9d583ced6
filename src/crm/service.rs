use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use super::error::CrmError;
use super::types::{Client, DbLead, Lead, Note, StageChangeRequest};
use crate::core::middleware::AuthenticatedUser;
use crate::core::shared::schema::{crm_clients, crm_leads, crm_notes};
use crate::reports::types::Stage;

/// Leads outside the requester's visibility are reported exactly like missing ones.
pub fn ensure_visible(lead: &DbLead, user: &AuthenticatedUser) -> Result<(), CrmError> {
    if user.sees_all_records() || lead.owner_id == Some(user.user_id) {
        Ok(())
    } else {
        Err(CrmError::lead_not_found())
    }
}

/// Stages only move forward through the pipeline and never leave Won or Lost.
pub fn validate_transition(current: &Stage, target: &Stage) -> Result<(), CrmError> {
    let Some(target_rank) = target.rank() else {
        return Err(CrmError::InvalidRequest(format!(
            "Unknown stage: {target}"
        )));
    };
    if current.is_terminal() {
        return Err(CrmError::Conflict(format!(
            "Lead is already {current} and cannot change stage"
        )));
    }
    if let Some(current_rank) = current.rank() {
        if target_rank <= current_rank {
            return Err(CrmError::Conflict(format!(
                "Cannot move lead from {current} back to {target}"
            )));
        }
    }
    Ok(())
}

/// Only leads still moving through the pipeline become clients.
pub fn validate_promotion(stage: &Stage) -> Result<(), CrmError> {
    if stage.is_terminal() {
        return Err(CrmError::Conflict(format!(
            "Lead is already {stage} and cannot be promoted"
        )));
    }
    Ok(())
}

/// A move to Lost records the supplied reason, or keeps the stored one when none is
/// given. Other targets leave the stored reason untouched.
pub fn resolve_lost_reason(
    target: &Stage,
    requested: Option<&str>,
    existing: Option<String>,
) -> Option<String> {
    match target {
        Stage::Lost => requested
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .or(existing),
        _ => existing,
    }
}

/// The unique index on `crm_clients.lead_id` turns a concurrent second promotion into
/// a conflict.
pub fn client_insert_error(e: diesel::result::Error) -> CrmError {
    match e {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ) => CrmError::Conflict("Lead was already promoted".to_string()),
        other => CrmError::from(other),
    }
}

pub fn normalize_note(content: &str) -> Result<String, CrmError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(CrmError::InvalidRequest(
            "Note content cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn load_lead(conn: &mut PgConnection, id: Uuid, user: &AuthenticatedUser) -> Result<DbLead, CrmError> {
    let lead: DbLead = crm_leads::table
        .filter(crm_leads::id.eq(id))
        .filter(crm_leads::deleted_at.is_null())
        .select(DbLead::as_select())
        .first(conn)?;
    ensure_visible(&lead, user)?;
    Ok(lead)
}

fn lock_lead(conn: &mut PgConnection, id: Uuid, user: &AuthenticatedUser) -> Result<DbLead, CrmError> {
    let lead: DbLead = crm_leads::table
        .filter(crm_leads::id.eq(id))
        .filter(crm_leads::deleted_at.is_null())
        .select(DbLead::as_select())
        .for_update()
        .first(conn)?;
    ensure_visible(&lead, user)?;
    Ok(lead)
}

pub fn get_lead(conn: &mut PgConnection, id: Uuid, user: &AuthenticatedUser) -> Result<Lead, CrmError> {
    load_lead(conn, id, user).map(Lead::from)
}

pub fn change_stage(
    conn: &mut PgConnection,
    id: Uuid,
    user: &AuthenticatedUser,
    request: &StageChangeRequest,
) -> Result<Lead, CrmError> {
    let target = Stage::parse(&request.stage);

    conn.transaction(|conn| {
        let lead = lock_lead(conn, id, user)?;
        validate_transition(&Stage::parse(&lead.stage), &target)?;

        let lost_reason =
            resolve_lost_reason(&target, request.lost_reason.as_deref(), lead.lost_reason);

        let updated: DbLead = diesel::update(crm_leads::table.filter(crm_leads::id.eq(id)))
            .set((
                crm_leads::stage.eq(target.label()),
                crm_leads::lost_reason.eq(lost_reason),
                crm_leads::updated_at.eq(Utc::now()),
            ))
            .returning(DbLead::as_returning())
            .get_result(conn)?;

        log::info!(
            "Lead {id} moved from {} to {} by {}",
            lead.stage,
            updated.stage,
            user.user_id
        );
        Ok(Lead::from(updated))
    })
}

pub fn promote_lead(conn: &mut PgConnection, id: Uuid, user: &AuthenticatedUser) -> Result<Client, CrmError> {
    conn.transaction(|conn| {
        let lead = lock_lead(conn, id, user)?;
        validate_promotion(&Stage::parse(&lead.stage))?;

        let now = Utc::now();
        let client = Client::from_lead(&lead, now);
        diesel::insert_into(crm_clients::table)
            .values(&client)
            .execute(conn)
            .map_err(client_insert_error)?;

        diesel::update(crm_leads::table.filter(crm_leads::id.eq(id)))
            .set((
                crm_leads::stage.eq(Stage::Won.label()),
                crm_leads::updated_at.eq(now),
            ))
            .execute(conn)?;

        log::info!("Lead {id} promoted to client {} by {}", client.id, user.user_id);
        Ok(client)
    })
}

pub fn list_notes(conn: &mut PgConnection, lead_id: Uuid, user: &AuthenticatedUser) -> Result<Vec<Note>, CrmError> {
    load_lead(conn, lead_id, user)?;
    let notes = crm_notes::table
        .filter(crm_notes::lead_id.eq(lead_id))
        .order((crm_notes::created_at.asc(), crm_notes::id.asc()))
        .select(Note::as_select())
        .load(conn)?;
    Ok(notes)
}

pub fn add_note(
    conn: &mut PgConnection,
    lead_id: Uuid,
    user: &AuthenticatedUser,
    content: String,
) -> Result<Note, CrmError> {
    load_lead(conn, lead_id, user)?;

    let note = Note {
        id: Uuid::new_v4(),
        lead_id,
        author_id: Some(user.user_id),
        content,
        created_at: Utc::now(),
    };
    diesel::insert_into(crm_notes::table)
        .values(&note)
        .execute(conn)?;
    Ok(note)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::middleware::UserRole;

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(validate_transition(&Stage::FirstContact, &Stage::Proposal).is_ok());
        assert!(validate_transition(&Stage::Negotiation, &Stage::Won).is_ok());
        assert!(validate_transition(&Stage::Qualification, &Stage::Lost).is_ok());
        assert!(validate_transition(&Stage::Other("Demo".into()), &Stage::Qualification).is_ok());
    }

    #[test]
    fn test_backward_and_repeat_rejected() {
        let back = validate_transition(&Stage::Proposal, &Stage::Qualification).unwrap_err();
        assert_eq!(back.kind(), "conflict");
        let same = validate_transition(&Stage::Proposal, &Stage::Proposal).unwrap_err();
        assert_eq!(same.kind(), "conflict");
    }

    #[test]
    fn test_terminal_stages_are_final() {
        for terminal in [Stage::Won, Stage::Lost] {
            for target in Stage::PIPELINE.iter() {
                let err = validate_transition(&terminal, target).unwrap_err();
                assert_eq!(err.kind(), "conflict");
            }
        }
    }

    #[test]
    fn test_unknown_target_is_invalid() {
        let err = validate_transition(&Stage::FirstContact, &Stage::parse("Limbo")).unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }

    #[test]
    fn test_promotion_rejects_terminal_leads() {
        assert!(validate_promotion(&Stage::Proposal).is_ok());
        assert!(validate_promotion(&Stage::Other("Demo".into())).is_ok());

        // A promoted lead is Won, so promoting it again conflicts.
        for terminal in [Stage::Won, Stage::Lost] {
            assert_eq!(validate_promotion(&terminal).unwrap_err().kind(), "conflict");
        }
    }

    #[test]
    fn test_duplicate_client_maps_to_conflict() {
        use diesel::result::{DatabaseErrorKind, Error};

        let duplicate = Error::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_string()),
        );
        assert_eq!(client_insert_error(duplicate).kind(), "conflict");

        let broken = Error::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new("server closed the connection".to_string()),
        );
        assert_eq!(client_insert_error(broken).kind(), "store");
    }

    #[test]
    fn test_lost_reason_resolution() {
        let stored = Some("Price".to_string());

        assert_eq!(
            resolve_lost_reason(&Stage::Lost, Some("  Timing "), stored.clone()),
            Some("Timing".to_string())
        );
        assert_eq!(resolve_lost_reason(&Stage::Lost, Some("   "), stored.clone()), stored);
        assert_eq!(resolve_lost_reason(&Stage::Lost, None, None), None);
        assert_eq!(
            resolve_lost_reason(&Stage::Won, Some("Timing"), stored.clone()),
            stored
        );
        assert_eq!(resolve_lost_reason(&Stage::Negotiation, Some("Timing"), None), None);
    }

    #[test]
    fn test_note_content_trimmed() {
        assert_eq!(normalize_note("  call back monday \n").unwrap(), "call back monday");
        assert!(normalize_note("   ").is_err());
    }

    #[test]
    fn test_visibility() {
        let owner = Uuid::new_v4();
        let lead = DbLead {
            id: Uuid::new_v4(),
            name: "Lead".to_string(),
            company: None,
            email: None,
            phone: None,
            stage: "Proposal".to_string(),
            value: Some(10.0),
            source: None,
            owner_id: Some(owner),
            lost_reason: None,
            attributes: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };

        assert!(ensure_visible(&lead, &AuthenticatedUser::new(owner, UserRole::Seller)).is_ok());
        assert!(ensure_visible(&lead, &AuthenticatedUser::new(Uuid::new_v4(), UserRole::Admin)).is_ok());

        let stranger = AuthenticatedUser::new(Uuid::new_v4(), UserRole::Seller);
        assert_eq!(ensure_visible(&lead, &stranger).unwrap_err().kind(), "not_found");
        assert!(ensure_visible(&lead, &stranger.with_report_visibility(true)).is_ok());
    }
}
