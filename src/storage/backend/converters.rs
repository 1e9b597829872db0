use sea_orm::ActiveValue::{NotSet, Set};

use crate::errors::{RentrouteError, Result};
use crate::models::{ClickTrackingData, LandingData};
use crate::reporting::ErrorLogEntry;
use crate::storage::{PartnerConfigurationRecord, PartnerRecord};
use migration::entities::{error_log, landing, partner_configuration, rental_click, rental_partner};

pub fn partner_model_to_record(model: rental_partner::Model) -> PartnerRecord {
    PartnerRecord {
        id: model.id,
        name: model.name,
        display_name: model.display_name,
        is_active: model.is_active,
    }
}

pub fn configuration_model_to_record(
    model: partner_configuration::Model,
) -> PartnerConfigurationRecord {
    PartnerConfigurationRecord {
        partner_id: model.partner_id,
        config_key: model.config_key,
        config_value: model.config_value,
    }
}

pub fn click_to_active_model(click: &ClickTrackingData) -> Result<rental_click::ActiveModel> {
    Ok(rental_click::ActiveModel {
        id: NotSet,
        click_id: Set(click.click_id.clone()),
        landing_id: Set(click.landing_id.clone()),
        partner: Set(click.partner.clone()),
        iata_code: Set(click.iata_code.clone()),
        location_id: Set(click.location_id.clone()),
        pickup_date_new: Set(click.pickup_date_new.clone()),
        pickup_time_new: Set(click.pickup_time_new.clone()),
        dropoff_date_new: Set(click.dropoff_date_new.clone()),
        dropoff_time_new: Set(click.dropoff_time_new.clone()),
        timestamp: Set(click.timestamp),
        placement: Set(click.placement.to_string()),
        redirect_url: Set(click.redirect_url.clone()),
        search_params: Set(serde_json::to_string(&click.search_params)?),
        auto_params: Set(click.auto_params),
    })
}

pub fn landing_to_active_model(data: &LandingData) -> Result<landing::ActiveModel> {
    Ok(landing::ActiveModel {
        id: NotSet,
        landing_id: Set(data.landing_id.clone()),
        timestamp: Set(data.timestamp),
        url_params: Set(data.url_params.clone()),
        metadata: Set(serde_json::to_string(&data.metadata)?),
    })
}

pub fn error_entry_to_active_model(entry: &ErrorLogEntry) -> Result<error_log::ActiveModel> {
    Ok(error_log::ActiveModel {
        id: NotSet,
        error_id: Set(entry.error_id.clone()),
        timestamp: Set(entry.timestamp),
        error_type: Set(entry.error_type.to_string()),
        title: Set(entry.title.clone()),
        message: Set(entry.message.clone()),
        stack: Set(entry.stack.clone()),
        user_context: Set(serde_json::to_string(&entry.user_context)?),
        error_context: Set(serde_json::to_string(&entry.error_context)?),
        severity: Set(entry.severity.to_string()),
        resolved: Set(entry.resolved),
        metadata: Set(serde_json::to_string(&entry.metadata)?),
    })
}

pub fn model_to_error_entry(model: error_log::Model) -> Result<ErrorLogEntry> {
    let error_type = model.error_type.parse().map_err(|_| {
        RentrouteError::serialization(format!("unknown error_type '{}'", model.error_type))
    })?;
    let severity = model.severity.parse().map_err(|_| {
        RentrouteError::serialization(format!("unknown severity '{}'", model.severity))
    })?;

    Ok(ErrorLogEntry {
        error_id: model.error_id,
        timestamp: model.timestamp,
        error_type,
        title: model.title,
        message: model.message,
        stack: model.stack,
        user_context: serde_json::from_str(&model.user_context)?,
        error_context: serde_json::from_str(&model.error_context)?,
        severity,
        resolved: model.resolved,
        metadata: serde_json::from_str(&model.metadata)?,
    })
}
