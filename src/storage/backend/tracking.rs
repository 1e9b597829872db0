use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::debug;

use super::SeaOrmStorage;
use super::converters::{
    click_to_active_model, configuration_model_to_record, error_entry_to_active_model,
    landing_to_active_model, model_to_error_entry, partner_model_to_record,
};
use super::retry::with_retry;
use crate::errors::Result;
use crate::models::{ClickTrackingData, LandingData};
use crate::reporting::ErrorLogEntry;
use crate::storage::{PartnerConfigurationRecord, PartnerRecord, TrackingStore};
use migration::entities::{error_log, landing, partner_configuration, rental_click, rental_partner};

#[async_trait]
impl TrackingStore for SeaOrmStorage {
    async fn load_active_partners(&self) -> Result<Vec<PartnerRecord>> {
        let db = &self.db;
        let models = with_retry("load_active_partners", self.retry_config, || async {
            rental_partner::Entity::find()
                .filter(rental_partner::Column::IsActive.eq(true))
                .order_by_asc(rental_partner::Column::Name)
                .all(db)
                .await
        })
        .await?;

        Ok(models.into_iter().map(partner_model_to_record).collect())
    }

    async fn load_partner_configurations(&self) -> Result<Vec<PartnerConfigurationRecord>> {
        let db = &self.db;
        let models = with_retry("load_partner_configurations", self.retry_config, || async {
            partner_configuration::Entity::find()
                .order_by_asc(partner_configuration::Column::Id)
                .all(db)
                .await
        })
        .await?;

        Ok(models
            .into_iter()
            .map(configuration_model_to_record)
            .collect())
    }

    async fn insert_click(&self, click: &ClickTrackingData) -> Result<()> {
        let db = &self.db;
        let model = click_to_active_model(click)?;
        with_retry("insert_click", self.retry_config, || {
            let model = model.clone();
            async move { rental_click::Entity::insert(model).exec(db).await }
        })
        .await?;

        debug!("Click {} inserted", click.click_id);
        Ok(())
    }

    async fn insert_landing(&self, data: &LandingData) -> Result<()> {
        let db = &self.db;
        let model = landing_to_active_model(data)?;
        with_retry("insert_landing", self.retry_config, || {
            let model = model.clone();
            async move { landing::Entity::insert(model).exec(db).await }
        })
        .await?;

        debug!("Landing {} inserted", data.landing_id);
        Ok(())
    }

    async fn insert_error_logs(&self, entries: &[ErrorLogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let db = &self.db;
        let models = entries
            .iter()
            .map(error_entry_to_active_model)
            .collect::<Result<Vec<_>>>()?;
        with_retry("insert_error_logs", self.retry_config, || {
            let models = models.clone();
            async move { error_log::Entity::insert_many(models).exec(db).await }
        })
        .await?;

        debug!("{} error log entries inserted", entries.len());
        Ok(())
    }

    async fn recent_error_logs(&self, since: DateTime<Utc>) -> Result<Vec<ErrorLogEntry>> {
        let models = error_log::Entity::find()
            .filter(error_log::Column::Timestamp.gte(since))
            .order_by_asc(error_log::Column::Timestamp)
            .all(&self.db)
            .await?;

        models.into_iter().map(model_to_error_entry).collect()
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await?;
        Ok(())
    }

    fn backend_name(&self) -> &str {
        &self.backend_name
    }
}
