use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::audit::ensure_origin_exists;
use super::parties::require_active_user;
use super::validation::not_blank;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::attachment;
use crate::models::catalogs::{DocumentType, FileExtension, OriginType};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewAttachment {
    pub origin_type: OriginType,
    pub origin_id: i32,
    pub document_type: DocumentType,
    #[validate(length(max = 255), custom = "not_blank")]
    pub original_name: String,
    /// Where the external file store put the document. Derived from the
    /// attachment root when absent.
    #[validate(length(max = 500))]
    pub file_path: Option<String>,
    pub uploaded_by: i32,
}

fn storage_path(root: &str, input: &NewAttachment) -> String {
    input.file_path.clone().unwrap_or_else(|| {
        Path::new(root)
            .join(input.origin_type.to_string().to_lowercase())
            .join(input.origin_id.to_string())
            .join(input.original_name.trim())
            .to_string_lossy()
            .into_owned()
    })
}

/// Files one supporting document against an income or expense. Each
/// (origin, document type) pair holds at most one attachment.
#[derive(Clone)]
pub struct AttachmentService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    attachment_root: String,
}

impl AttachmentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        attachment_root: impl Into<String>,
    ) -> Self {
        Self {
            db,
            event_sender,
            attachment_root: attachment_root.into(),
        }
    }

    #[instrument(skip(self, input), fields(origin = %input.origin_type, origin_id = input.origin_id, document_type = %input.document_type))]
    pub async fn attach_document(
        &self,
        input: NewAttachment,
    ) -> Result<attachment::Model, ServiceError> {
        input.validate()?;
        let file_path = storage_path(&self.attachment_root, &input);
        let extension = FileExtension::from_path(&file_path).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "{} does not have a supported document extension",
                file_path
            ))
        })?;

        let txn = self.db.begin().await?;

        require_active_user(&txn, input.uploaded_by).await?;
        ensure_origin_exists(&txn, input.origin_type, input.origin_id).await?;

        let existing = attachment::Entity::find()
            .filter(attachment::Column::OriginType.eq(input.origin_type))
            .filter(attachment::Column::OriginId.eq(input.origin_id))
            .filter(attachment::Column::DocumentType.eq(input.document_type))
            .one(&txn)
            .await?;
        if let Some(existing) = existing {
            warn!(attachment_id = existing.id, "Rejected second attachment");
            return Err(ServiceError::DuplicateError(format!(
                "{} {} already has a {} attached",
                input.origin_type, input.origin_id, input.document_type
            )));
        }

        let created = attachment::ActiveModel {
            origin_type: Set(input.origin_type),
            origin_id: Set(input.origin_id),
            document_type: Set(input.document_type),
            file_path: Set(file_path),
            original_name: Set(input.original_name.trim().to_string()),
            extension: Set(extension),
            uploaded_by: Set(input.uploaded_by),
            uploaded_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(attachment_id = created.id, path = %created.file_path, "Document attached");
        self.event_sender
            .publish(Event::AttachmentAdded {
                attachment_id: created.id,
                origin_type: created.origin_type,
                origin_id: created.origin_id,
                document_type: created.document_type,
            })
            .await;
        Ok(created)
    }

    pub async fn attachments_for(
        &self,
        origin_type: OriginType,
        origin_id: i32,
    ) -> Result<Vec<attachment::Model>, ServiceError> {
        Ok(attachment::Entity::find()
            .filter(attachment::Column::OriginType.eq(origin_type))
            .filter(attachment::Column::OriginId.eq(origin_id))
            .order_by_asc(attachment::Column::Id)
            .all(&*self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(file_path: Option<&str>) -> NewAttachment {
        NewAttachment {
            origin_type: OriginType::Expense,
            origin_id: 12,
            document_type: DocumentType::Receipt,
            original_name: "rent-march.pdf".into(),
            file_path: file_path.map(str::to_string),
            uploaded_by: 1,
        }
    }

    #[test]
    fn storage_path_defaults_under_root() {
        let path = storage_path("/srv/attachments", &input(None));
        assert_eq!(path, "/srv/attachments/expense/12/rent-march.pdf");
    }

    #[test]
    fn explicit_storage_path_wins() {
        let path = storage_path("/srv/attachments", &input(Some("/mnt/scan/001.pdf")));
        assert_eq!(path, "/mnt/scan/001.pdf");
    }
}
