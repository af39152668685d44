//! Append-only audit trail for corrections to financial events.

use chrono::{DateTime, SubsecRound, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::parties::require_active_user;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::catalogs::{AuditAction, OriginType};
use crate::models::{audit_entry, expense, income};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub user_id: i32,
    pub origin_type: OriginType,
    pub origin_id: i32,
    pub action: AuditAction,
    pub reason: String,
    pub previous_values: Option<Json>,
    pub new_values: Option<Json>,
}

/// SHA-256 over every field of an entry except its id.
#[allow(clippy::too_many_arguments)]
pub fn integrity_hash(
    occurred_at: &DateTime<Utc>,
    user_id: i32,
    origin_type: OriginType,
    origin_id: i32,
    action: AuditAction,
    reason: &str,
    previous_values: Option<&Json>,
    new_values: Option<&Json>,
) -> String {
    let render = |value: Option<&Json>| value.map(Json::to_string).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(occurred_at.timestamp_micros().to_string());
    hasher.update(b"|");
    hasher.update(user_id.to_string());
    hasher.update(b"|");
    hasher.update(origin_type.to_string());
    hasher.update(b"|");
    hasher.update(origin_id.to_string());
    hasher.update(b"|");
    hasher.update(action.to_string());
    hasher.update(b"|");
    hasher.update(reason);
    hasher.update(b"|");
    hasher.update(render(previous_values));
    hasher.update(b"|");
    hasher.update(render(new_values));
    hex::encode(hasher.finalize())
}

/// Recomputes the hash of a stored entry and compares it with the recorded one.
pub fn verify_integrity(entry: &audit_entry::Model) -> bool {
    integrity_hash(
        &entry.occurred_at,
        entry.user_id,
        entry.origin_type,
        entry.origin_id,
        entry.action,
        &entry.reason,
        entry.previous_values.as_ref(),
        entry.new_values.as_ref(),
    ) == entry.integrity_hash
}

pub(crate) async fn ensure_origin_exists<C: ConnectionTrait>(
    conn: &C,
    origin_type: OriginType,
    origin_id: i32,
) -> Result<(), ServiceError> {
    let exists = match origin_type {
        OriginType::Income => income::Entity::find_by_id(origin_id).one(conn).await?.is_some(),
        OriginType::Expense => expense::Entity::find_by_id(origin_id).one(conn).await?.is_some(),
    };
    if !exists {
        return Err(ServiceError::ReferenceError(format!(
            "{} {} does not exist",
            origin_type, origin_id
        )));
    }
    Ok(())
}

/// Writes one audit entry on the caller's connection, so a correction and its
/// trail commit or roll back together.
pub async fn append_entry<C: ConnectionTrait>(
    conn: &C,
    entry: NewAuditEntry,
) -> Result<audit_entry::Model, ServiceError> {
    let reason = entry.reason.trim();
    if reason.is_empty() {
        return Err(ServiceError::ValidationError(
            "an audit entry requires a reason".into(),
        ));
    }

    require_active_user(conn, entry.user_id).await?;
    ensure_origin_exists(conn, entry.origin_type, entry.origin_id).await?;

    // Microsecond precision survives every supported backend.
    let occurred_at = Utc::now().trunc_subsecs(6);
    let hash = integrity_hash(
        &occurred_at,
        entry.user_id,
        entry.origin_type,
        entry.origin_id,
        entry.action,
        reason,
        entry.previous_values.as_ref(),
        entry.new_values.as_ref(),
    );

    let created = audit_entry::ActiveModel {
        occurred_at: Set(occurred_at),
        user_id: Set(entry.user_id),
        origin_type: Set(entry.origin_type),
        origin_id: Set(entry.origin_id),
        action: Set(entry.action),
        reason: Set(reason.to_string()),
        previous_values: Set(entry.previous_values),
        new_values: Set(entry.new_values),
        integrity_hash: Set(hash),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok(created)
}

#[derive(Clone)]
pub struct AuditService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl AuditService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, entry), fields(origin = %entry.origin_type, origin_id = entry.origin_id, action = %entry.action))]
    pub async fn record_audit(
        &self,
        entry: NewAuditEntry,
    ) -> Result<audit_entry::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let created = append_entry(&txn, entry).await?;
        txn.commit().await?;

        info!(audit_id = created.id, "Audit entry recorded");
        self.event_sender
            .publish(Event::AuditLogged {
                audit_id: created.id,
                origin_type: created.origin_type,
                origin_id: created.origin_id,
            })
            .await;
        Ok(created)
    }

    pub async fn entries_for(
        &self,
        origin_type: OriginType,
        origin_id: i32,
    ) -> Result<Vec<audit_entry::Model>, ServiceError> {
        let entries = audit_entry::Entity::find()
            .filter(audit_entry::Column::OriginType.eq(origin_type))
            .filter(audit_entry::Column::OriginId.eq(origin_id))
            .order_by_asc(audit_entry::Column::Id)
            .all(&*self.db)
            .await?;

        for entry in entries.iter().filter(|e| !verify_integrity(e)) {
            warn!(audit_id = entry.id, "Audit entry failed integrity check");
        }
        Ok(entries)
    }
}
