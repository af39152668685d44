//! Party registry: students, instructors and users.
//!
//! Parties are never hard-deleted; deactivation keeps every financial fact
//! that points at them resolvable.

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::validation::{non_negative_decimal, not_blank, DOCUMENT_NUMBER_RE, USERNAME_RE};
use crate::errors::ServiceError;
use crate::models::catalogs::{AcademicDegree, IdIssuancePlace, UserRole};
use crate::models::{instructor, student, user};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewStudent {
    #[validate(regex = "DOCUMENT_NUMBER_RE")]
    pub document_number: String,
    pub issuance_place: IdIssuancePlace,
    #[validate(length(max = 100), custom = "not_blank")]
    pub first_names: String,
    #[validate(length(max = 100), custom = "not_blank")]
    pub last_names: String,
    pub birth_date: Option<NaiveDate>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub alma_mater: Option<String>,
    #[validate(length(max = 100))]
    pub profession: Option<String>,
    pub photo_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewInstructor {
    #[validate(regex = "DOCUMENT_NUMBER_RE")]
    pub document_number: String,
    pub issuance_place: IdIssuancePlace,
    #[validate(length(max = 100), custom = "not_blank")]
    pub first_names: String,
    #[validate(length(max = 100), custom = "not_blank")]
    pub last_names: String,
    pub birth_date: Option<NaiveDate>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub academic_degree: Option<AcademicDegree>,
    #[validate(length(max = 150))]
    pub specialty: Option<String>,
    pub cv_path: Option<String>,
    #[validate(custom = "non_negative_decimal")]
    pub hourly_fee: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(regex = "USERNAME_RE")]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(max = 150), custom = "not_blank")]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub role: UserRole,
}

/// Resolves the "recorded by" identity of a mutating operation.
///
/// Runs on whatever connection the caller holds so the check shares the
/// caller's transaction.
pub async fn require_active_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<user::Model, ServiceError> {
    match user::Entity::find_by_id(user_id).one(conn).await? {
        Some(found) if found.active => Ok(found),
        Some(_) => Err(ServiceError::ReferenceError(format!(
            "user {} is deactivated",
            user_id
        ))),
        None => Err(ServiceError::ReferenceError(format!(
            "user {} does not exist",
            user_id
        ))),
    }
}

pub(crate) fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| ServiceError::InternalError(format!("salt encoding failed: {}", e)))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {}", e)))
}

/// Service for registering and deactivating parties.
#[derive(Clone)]
pub struct PartyService {
    db: Arc<DatabaseConnection>,
}

impl PartyService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(document_number = %input.document_number))]
    pub async fn register_student(&self, input: NewStudent) -> Result<student::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db;

        let existing = student::Entity::find()
            .filter(student::Column::DocumentNumber.eq(input.document_number.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            warn!("Rejected duplicate student document number");
            return Err(ServiceError::DuplicateError(format!(
                "a student with document number {} already exists",
                input.document_number
            )));
        }

        let created = student::ActiveModel {
            document_number: Set(input.document_number),
            issuance_place: Set(input.issuance_place),
            first_names: Set(input.first_names.trim().to_string()),
            last_names: Set(input.last_names.trim().to_string()),
            birth_date: Set(input.birth_date),
            phone: Set(input.phone),
            email: Set(input.email),
            alma_mater: Set(input.alma_mater),
            profession: Set(input.profession),
            photo_path: Set(input.photo_path),
            active: Set(true),
            registered_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(student_id = created.id, "Student registered");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn deactivate_student(&self, student_id: i32) -> Result<student::Model, ServiceError> {
        let found = student::Entity::find_by_id(student_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("student {}", student_id)))?;

        let mut active: student::ActiveModel = found.into();
        active.active = Set(false);
        let updated = active.update(&*self.db).await?;
        info!(student_id, "Student deactivated");
        Ok(updated)
    }

    pub async fn get_student(&self, student_id: i32) -> Result<student::Model, ServiceError> {
        student::Entity::find_by_id(student_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("student {}", student_id)))
    }

    #[instrument(skip(self, input), fields(document_number = %input.document_number))]
    pub async fn register_instructor(
        &self,
        input: NewInstructor,
    ) -> Result<instructor::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db;

        let existing = instructor::Entity::find()
            .filter(instructor::Column::DocumentNumber.eq(input.document_number.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            warn!("Rejected duplicate instructor document number");
            return Err(ServiceError::DuplicateError(format!(
                "an instructor with document number {} already exists",
                input.document_number
            )));
        }

        let created = instructor::ActiveModel {
            document_number: Set(input.document_number),
            issuance_place: Set(input.issuance_place),
            first_names: Set(input.first_names.trim().to_string()),
            last_names: Set(input.last_names.trim().to_string()),
            birth_date: Set(input.birth_date),
            phone: Set(input.phone),
            email: Set(input.email),
            academic_degree: Set(input.academic_degree),
            specialty: Set(input.specialty),
            cv_path: Set(input.cv_path),
            hourly_fee: Set(input.hourly_fee),
            active: Set(true),
            registered_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(instructor_id = created.id, "Instructor registered");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn deactivate_instructor(
        &self,
        instructor_id: i32,
    ) -> Result<instructor::Model, ServiceError> {
        let found = instructor::Entity::find_by_id(instructor_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("instructor {}", instructor_id)))?;

        let mut active: instructor::ActiveModel = found.into();
        active.active = Set(false);
        let updated = active.update(&*self.db).await?;
        info!(instructor_id, "Instructor deactivated");
        Ok(updated)
    }

    #[instrument(skip(self, input), fields(username = %input.username, role = %input.role))]
    pub async fn provision_user(&self, input: NewUser) -> Result<user::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db;

        let existing = user::Entity::find()
            .filter(user::Column::Username.eq(input.username.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            warn!("Rejected duplicate username");
            return Err(ServiceError::DuplicateError(format!(
                "username {} is taken",
                input.username
            )));
        }

        let created = user::ActiveModel {
            username: Set(input.username),
            password_hash: Set(hash_password(&input.password)?),
            full_name: Set(input.full_name.trim().to_string()),
            email: Set(input.email),
            role: Set(input.role),
            active: Set(true),
            last_login: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(user_id = created.id, "User provisioned");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn deactivate_user(&self, user_id: i32) -> Result<user::Model, ServiceError> {
        let found = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))?;

        let mut active: user::ActiveModel = found.into();
        active.active = Set(false);
        let updated = active.update(&*self.db).await?;
        info!(user_id, "User deactivated");
        Ok(updated)
    }
}
