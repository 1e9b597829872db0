use crate::models::{PartnerConfig, RentalLocation, SearchParams};

use super::form_query;
use super::tokens::{
    place_identifier, resolve_dropoff, selected_dropoff_identifier, typed_dropoff_identifier,
};

pub const SKYSCANNER_BASE_URL: &str = "https://skyscanner.com/g/referrals/v1/cars/day-view/";
pub const DEFAULT_MEDIA_PARTNER_ID: &str = "3495464";
/// 无点击 ID 时的 utm_term
pub const DEFAULT_UTM_TERM: &str = "21208037";

#[derive(Debug, Clone)]
pub struct SkyscannerPartner {
    config: PartnerConfig,
    media_partner_id: String,
}

impl SkyscannerPartner {
    pub fn new(config: PartnerConfig) -> Self {
        let media_partner_id = config
            .get_or("mediaPartnerId", DEFAULT_MEDIA_PARTNER_ID)
            .to_string();
        Self {
            config,
            media_partner_id,
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
        let pickup = place_identifier(params.effective_pickup(location));
        let dropoff = resolve_dropoff(params, &pickup, selected_dropoff_identifier, |text| {
            typed_dropoff_identifier(text, false)
        });

        let pickup_time = format!("{}T{}", params.pickup_date_str(), params.pickup_time_str());
        let dropoff_time = format!(
            "{}T{}",
            params.dropoff_date_str(),
            params.dropoff_time_str()
        );
        let utm_term = click_id.filter(|id| !id.is_empty()).unwrap_or(DEFAULT_UTM_TERM);

        let query = form_query(&[
            ("mediaPartnerId", self.media_partner_id.as_str()),
            ("utm_term", utm_term),
            ("pickupPlace", pickup.as_str()),
            ("dropoffPlace", dropoff.as_str()),
            ("pickupTime", pickup_time.as_str()),
            ("dropoffTime", dropoff_time.as_str()),
            ("driverAge", "30"),
            ("locale", "en-US"),
            ("market", "US"),
        ]);
        format!("{}?{}", SKYSCANNER_BASE_URL, query)
    }
}
