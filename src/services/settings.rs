//! Process-wide settings backed by the `system_config` table.
//!
//! The service owns an in-process cache with an explicit lifecycle: `load`
//! fills it, `refresh` rebuilds it from storage and `upsert` writes through.
//! Reads never hit the database.

use chrono::Utc;
use dashmap::DashMap;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::system_config;

const MAX_KEY_LEN: usize = 100;

/// Keys seeded on a fresh installation, with their initial values.
pub const DEFAULT_SETTINGS: &[(&str, &str, &str)] = &[
    ("INSTITUTION_NAME", "Postgraduate Studies Center", "Institution name printed on documents"),
    ("INSTITUTION_ADDRESS", "", "Institution street address"),
    ("INSTITUTION_PHONE", "", "Institution contact phone"),
    ("INSTITUTION_EMAIL", "", "Institution contact email"),
    ("INSTITUTION_TAX_ID", "", "Institution tax identification number"),
    ("SYSTEM_CURRENCY", "Bs.", "Currency symbol for amounts"),
    ("SYSTEM_COUNTRY", "Bolivia", "Country of operation"),
    ("SYSTEM_LANGUAGE", "es", "Interface language"),
    ("SYSTEM_TIME_ZONE", "America/La_Paz", "Time zone for dates"),
    ("SYSTEM_DATE_FORMAT", "DD/MM/YYYY", "Display format for dates"),
    ("SYSTEM_PAGE_SIZE", "25", "Rows per page in listings"),
    ("ACADEMIC_DEFAULT_INSTALLMENT", "1500.00", "Default installment amount"),
    ("ACADEMIC_DEFAULT_HOURLY_FEE", "50.00", "Default instructor hourly fee"),
    ("ACADEMIC_MAX_PAYMENT_DAYS", "30", "Days allowed before a payment is overdue"),
    ("ACADEMIC_LATE_FEE_RATE", "0.5", "Late fee percentage per day"),
    ("ACADEMIC_EARLY_PAYMENT_DISCOUNT", "5.0", "Discount percentage for early payment"),
];

fn check_key(key: &str) -> Result<(), ServiceError> {
    if key.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "setting key must not be blank".into(),
        ));
    }
    if key.chars().count() > MAX_KEY_LEN {
        return Err(ServiceError::ValidationError(format!(
            "setting key must be at most {} characters",
            MAX_KEY_LEN
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct SettingsService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    cache: Arc<DashMap<String, String>>,
}

impl SettingsService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            db,
            event_sender,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Fills the cache from storage. Returns the number of settings loaded.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<usize, ServiceError> {
        let rows = system_config::Entity::find().all(&*self.db).await?;
        for row in &rows {
            self.cache.insert(row.key.clone(), row.value.clone());
        }
        debug!(count = rows.len(), "Settings loaded");
        Ok(rows.len())
    }

    /// Drops the cache and loads it again, forgetting keys removed elsewhere.
    pub async fn refresh(&self) -> Result<usize, ServiceError> {
        let rows = system_config::Entity::find().all(&*self.db).await?;
        self.cache.clear();
        for row in &rows {
            self.cache.insert(row.key.clone(), row.value.clone());
        }
        info!(count = rows.len(), "Settings refreshed");
        Ok(rows.len())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).map(|value| value.clone())
    }

    /// Cached value parsed as `T`. Missing keys are `NotFound`, unparsable
    /// values are `ConfigError`.
    pub fn get_parsed<T>(&self, key: &str) -> Result<T, ServiceError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self
            .get(key)
            .ok_or_else(|| ServiceError::NotFound(format!("setting {}", key)))?;
        raw.trim().parse::<T>().map_err(|e| {
            ServiceError::ConfigError(format!("setting {} has invalid value {:?}: {}", key, raw, e))
        })
    }

    /// All stored settings ordered by key, straight from storage.
    pub async fn list(&self) -> Result<Vec<system_config::Model>, ServiceError> {
        Ok(system_config::Entity::find()
            .order_by_asc(system_config::Column::Key)
            .all(&*self.db)
            .await?)
    }

    /// Creates the setting or replaces its value. Never fails on an existing key.
    #[instrument(skip(self, value, description))]
    pub async fn upsert(
        &self,
        key: &str,
        value: &str,
        description: Option<&str>,
    ) -> Result<system_config::Model, ServiceError> {
        check_key(key)?;

        let mut update_columns = vec![system_config::Column::Value, system_config::Column::UpdatedAt];
        if description.is_some() {
            update_columns.push(system_config::Column::Description);
        }

        let row = system_config::ActiveModel {
            id: NotSet,
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            description: Set(description.map(str::to_string)),
            updated_at: Set(Utc::now()),
        };
        system_config::Entity::insert(row)
            .on_conflict(
                OnConflict::column(system_config::Column::Key)
                    .update_columns(update_columns)
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;

        let stored = system_config::Entity::find()
            .filter(system_config::Column::Key.eq(key))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::InternalError(format!("setting {} vanished after upsert", key)))?;

        self.cache.insert(stored.key.clone(), stored.value.clone());
        info!(key, "Setting stored");
        self.event_sender
            .publish(Event::SettingChanged {
                key: stored.key.clone(),
            })
            .await;
        Ok(stored)
    }

    /// Inserts every default key that is still absent, leaving existing
    /// values alone. Returns how many keys were added.
    #[instrument(skip(self))]
    pub async fn seed_defaults(&self) -> Result<usize, ServiceError> {
        let before = system_config::Entity::find().all(&*self.db).await?.len();

        let now = Utc::now();
        for (key, value, description) in DEFAULT_SETTINGS {
            let row = system_config::ActiveModel {
                id: NotSet,
                key: Set((*key).to_string()),
                value: Set((*value).to_string()),
                description: Set(Some((*description).to_string())),
                updated_at: Set(now),
            };
            system_config::Entity::insert(row)
                .on_conflict(
                    OnConflict::column(system_config::Column::Key)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&*self.db)
                .await?;
        }

        let after = self.refresh().await?;
        let added = after.saturating_sub(before);
        info!(added, "Default settings seeded");
        Ok(added)
    }
}
