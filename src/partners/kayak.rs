use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::models::{PartnerConfig, RentalLocation, SearchParams};
use crate::utils::generate_click_id;

use super::form_query;
use super::places::format_location_for_kayak;
use super::tokens::{
    place_identifier, resolve_dropoff, selected_dropoff_identifier, typed_dropoff_identifier,
};

pub const KAYAK_BASE_URL: &str = "https://www.kayak.com/in";
pub const DEFAULT_INTEGRATION_CODE: &str = "kan_317604_592756";

/// Kayak 联盟深链
///
/// `https://www.kayak.com/in?a=<code>&encoder=27_1&...&url=/cars/{pick}/{drop}/{pdt}/{ddt}`
#[derive(Debug, Clone)]
pub struct KayakPartner {
    config: PartnerConfig,
    integration_code: String,
}

impl KayakPartner {
    pub fn new(config: PartnerConfig) -> Self {
        let integration_code = config
            .get_or("integration_code", DEFAULT_INTEGRATION_CODE)
            .to_string();
        Self {
            config,
            integration_code,
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
        let path = cars_path(params, location);
        let click_id = click_id
            .filter(|id| !id.is_empty())
            .map(String::from)
            .unwrap_or_else(generate_click_id);

        let query = form_query(&[
            ("a", self.integration_code.as_str()),
            ("encoder", "27_1"),
            ("enc_pid", "deeplinks"),
            ("enc_eid", "0"),
            ("enc_cid", click_id.as_str()),
            ("enc_lid", "cars-rentals"),
            ("url", path.as_str()),
        ]);
        format!("{}?{}", KAYAK_BASE_URL, query)
    }
}

/// `/cars/{pickup}/{dropoff}/{pickupDateHour}/{dropoffDateHour}`
pub fn cars_path(params: &SearchParams, location: &RentalLocation) -> String {
    let pickup = place_identifier(params.effective_pickup(location));
    let dropoff = resolve_dropoff(params, &pickup, selected_dropoff_identifier, |text| {
        typed_dropoff_identifier(text, true)
    });

    format!(
        "/cars/{}/{}/{}/{}",
        format_location_for_kayak(&pickup),
        format_location_for_kayak(&dropoff),
        format_date_hour(params.pickup_date, params.pickup_time),
        format_date_hour(params.dropoff_date, params.dropoff_time),
    )
}

/// `YYYY-MM-DD`，非 12:00 时追加 `-<H>h`（小时不补零，分钟忽略）
pub fn format_date_hour(date: NaiveDate, time: NaiveTime) -> String {
    let date = date.format("%Y-%m-%d");
    if time.hour() == 12 && time.minute() == 0 {
        date.to_string()
    } else {
        format!("{}-{}h", date, time.hour())
    }
}
