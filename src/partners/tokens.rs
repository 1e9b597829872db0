//! 取车 / 还车地点标识的解析规则（各合作方共用）

use crate::models::{RentalLocation, SearchParams};
use crate::utils::parse_location_id;

/// Kayak / Skyscanner 的取车标识：
/// 机场代码 → 显示名 → code/id 解析出的前缀 → `UNKNOWN`
pub fn place_identifier(location: &RentalLocation) -> String {
    if let Some(code) = location.airport_code() {
        return code.to_string();
    }
    if let Some(label) = location.label() {
        return label.to_string();
    }
    if let Some(code_or_id) = location.code_or_id() {
        return parse_location_id(code_or_id).0;
    }
    "UNKNOWN".to_string()
}

/// AutoRentals 的取车名称：显示名 → name → code → id 前缀 → `Unknown Location`
pub fn place_name(location: &RentalLocation) -> String {
    if let Some(label) = location.label() {
        return label.to_string();
    }
    if let Some(code) = location.code() {
        return code.to_string();
    }
    if let Some(id) = location.id() {
        return parse_location_id(id).0;
    }
    "Unknown Location".to_string()
}

/// 下拉框里选中的还车地点（Kayak / Skyscanner）
///
/// 没有可用字段时返回 None，由调用方退回取车标识。
pub fn selected_dropoff_identifier(location: &RentalLocation) -> Option<String> {
    if let Some(code) = location.airport_code() {
        return Some(code.to_string());
    }
    if let Some(label) = location.label() {
        return Some(label.to_string());
    }
    location
        .code_or_id()
        .map(|code_or_id| parse_location_id(code_or_id).0)
}

/// 手动输入的还车文本（未从下拉框选择）
///
/// 3-4 个字符视为 IATA 代码；`first_segment_only` 时只取第一个逗号前的部分。
/// 去掉空白后为空返回 None。
pub fn typed_dropoff_identifier(text: &str, first_segment_only: bool) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let len = text.chars().count();
    if (3..=4).contains(&len) {
        return Some(text.to_uppercase());
    }

    if first_segment_only && let Some((first, _)) = text.split_once(',') {
        let first = first.trim();
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }

    Some(text.to_string())
}

/// 还车标识的完整策略：选中的地点 → 不同的输入文本 → 与取车相同
pub fn resolve_dropoff(
    params: &SearchParams,
    pickup_identifier: &str,
    selected: impl Fn(&RentalLocation) -> Option<String>,
    typed: impl Fn(&str) -> Option<String>,
) -> String {
    let resolved = match &params.dropoff_location {
        Some(location) => selected(location),
        None if params.has_typed_dropoff() => typed(&params.dropoff),
        None => None,
    };
    resolved.unwrap_or_else(|| pickup_identifier.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocationType;

    fn city(display_name: &str, code: &str, id: &str) -> RentalLocation {
        RentalLocation {
            id: id.to_string(),
            display_name: display_name.to_string(),
            code: code.to_string(),
            location_type: LocationType::City,
            ..Default::default()
        }
    }

    #[test]
    fn test_place_identifier_priority() {
        assert_eq!(place_identifier(&RentalLocation::airport("LHR", "Heathrow")), "LHR");
        assert_eq!(
            place_identifier(&city("Boston, MA", "BOS", "bos-c1")),
            "Boston, MA"
        );
        assert_eq!(place_identifier(&city("", "", "tlh-a15927")), "TLH");
        assert_eq!(place_identifier(&RentalLocation::default()), "UNKNOWN");
    }

    #[test]
    fn test_place_name_priority() {
        assert_eq!(
            place_name(&RentalLocation::airport("LHR", "London Heathrow")),
            "London Heathrow"
        );
        assert_eq!(place_name(&city("", "MCO", "")), "MCO");
        assert_eq!(place_name(&city("", "", "mco-a9")), "MCO");
        assert_eq!(place_name(&RentalLocation::default()), "Unknown Location");
    }

    #[test]
    fn test_typed_dropoff() {
        assert_eq!(typed_dropoff_identifier(" jfk ", true), Some("JFK".to_string()));
        assert_eq!(
            typed_dropoff_identifier("Orlando, Florida", true),
            Some("Orlando".to_string())
        );
        assert_eq!(
            typed_dropoff_identifier("Orlando, Florida", false),
            Some("Orlando, Florida".to_string())
        );
        assert_eq!(typed_dropoff_identifier("   ", true), None);
    }
}
