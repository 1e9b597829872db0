use crate::models::{PartnerConfig, RentalLocation, SearchParams};

use super::form_query;
use super::tokens::{place_name, resolve_dropoff};

pub const AUTORENTALS_BASE_URL: &str = "https://www.autorentals.com/remotesearch";
pub const DEFAULT_CAMPAIGN_ID: &str = "11001";
/// 无点击 ID 时的 tpm
pub const DEFAULT_TRACKING_PARAM: &str = "21207214";

/// AutoRentals 深链，地点使用完整的可读名称
#[derive(Debug, Clone)]
pub struct AutoRentalsPartner {
    config: PartnerConfig,
    campaign_id: String,
    tracking_param: String,
}

impl AutoRentalsPartner {
    pub fn new(config: PartnerConfig) -> Self {
        let campaign_id = config.get_or("campaign_id", DEFAULT_CAMPAIGN_ID).to_string();
        let tracking_param = config
            .get_or("tracking_param", DEFAULT_TRACKING_PARAM)
            .to_string();
        Self {
            config,
            campaign_id,
            tracking_param,
        }
    }

    pub fn config(&self) -> &PartnerConfig {
        &self.config
    }

    pub fn generate_deep_link(
        &self,
        params: &SearchParams,
        location: &RentalLocation,
        click_id: Option<&str>,
    ) -> String {
        let pickup = place_name(params.effective_pickup(location));
        let dropoff = resolve_dropoff(params, &pickup, selected_dropoff_name, |text| {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        });

        let tpm = click_id
            .filter(|id| !id.is_empty())
            .unwrap_or(self.tracking_param.as_str());
        let pickup_date = params.pickup_date.format("%Y%m%d").to_string();
        let dropoff_date = params.dropoff_date.format("%Y%m%d").to_string();
        let pickup_time = params.pickup_time_str();
        let dropoff_time = params.dropoff_time_str();

        let query = form_query(&[
            ("cid", self.campaign_id.as_str()),
            ("tpm", tpm),
            ("utm_campaign", self.campaign_id.as_str()),
            ("utm_source", "rental-bookings"),
            ("utm_medium", "widget"),
            ("pl", pickup.as_str()),
            ("dl", dropoff.as_str()),
            ("pd", pickup_date.as_str()),
            ("pt", pickup_time.as_str()),
            ("dd", dropoff_date.as_str()),
            ("dt", dropoff_time.as_str()),
            ("view", "list"),
        ]);
        format!("{}?{}", AUTORENTALS_BASE_URL, query)
    }
}

/// 选中的还车地点：显示名 → name → code
fn selected_dropoff_name(location: &RentalLocation) -> Option<String> {
    location
        .label()
        .or_else(|| location.code())
        .map(String::from)
}
