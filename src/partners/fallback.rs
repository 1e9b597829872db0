//! 存储不可用时使用的内置合作方配置

use std::collections::BTreeMap;

use crate::models::PartnerConfig;

use super::PartnerKind;

fn config(id: &str, name: &str, display_name: &str, pairs: &[(&str, &str)]) -> PartnerConfig {
    PartnerConfig {
        id: id.to_string(),
        name: name.to_string(),
        display_name: display_name.to_string(),
        is_active: true,
        configurations: pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// 单个规范合作方的后备配置
pub fn fallback_config(kind: PartnerKind) -> PartnerConfig {
    match kind {
        PartnerKind::AutoRentals => config(
            "autorentals-fallback",
            "autorentals",
            "AutoRentals",
            &[
                ("campaign_id", "11001"),
                ("tracking_param", "21207214"),
                ("utm_source", "rental-discounts"),
                ("utm_medium", "widget"),
            ],
        ),
        PartnerKind::Skyscanner => config(
            "skyscanner-fallback",
            "skyscanner",
            "Skyscanner",
            &[
                ("mediaPartnerId", "3495464"),
                ("utm_term", "21207558"),
                ("utm_source", "rental-discounts"),
                ("utm_medium", "affiliate"),
            ],
        ),
        PartnerKind::Kayak => config(
            "kayak-fallback",
            "kayak",
            "Kayak",
            &[
                ("affiliateId", "rental-discounts"),
                ("utm_source", "rental-discounts"),
                ("utm_medium", "affiliate"),
            ],
        ),
    }
}

/// 三个规范合作方的后备配置
pub fn fallback_configs() -> Vec<PartnerConfig> {
    [
        PartnerKind::AutoRentals,
        PartnerKind::Skyscanner,
        PartnerKind::Kayak,
    ]
    .into_iter()
    .map(fallback_config)
    .collect()
}
