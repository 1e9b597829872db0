use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// 错误分类
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorType {
    UserError,
    ValidationError,
    NetworkError,
    PartnerError,
    SystemError,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// 按错误类型与消息关键字推断严重级别（关键字区分大小写）
pub fn determine_severity(error_type: ErrorType, message: &str) -> Severity {
    if error_type == ErrorType::SystemError || message.contains("partner service not responding") {
        return Severity::Critical;
    }
    if error_type == ErrorType::PartnerError
        || message.contains("timeout")
        || message.contains("network")
    {
        return Severity::High;
    }
    if error_type == ErrorType::ValidationError || message.contains("unavailable") {
        return Severity::Medium;
    }
    Severity::Low
}

/// 上报时的访客上下文
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_agent: String,
    pub url: String,
    pub referrer: String,
    pub device_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// 出错位置及相关数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_params: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_name: Option<String>,
    /// 其余上下文（fallback_url、original_error_id 等）
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ErrorContext {
    pub fn new(component: &str, function: &str) -> Self {
        Self {
            component: Some(component.to_string()),
            function: Some(function.to_string()),
            ..Default::default()
        }
    }

    pub fn with_search_params<T: Serialize>(mut self, params: &T) -> Self {
        self.search_params = serde_json::to_value(params).ok();
        self
    }

    pub fn with_location<T: Serialize>(mut self, location: &T) -> Self {
        self.location_data = serde_json::to_value(location).ok();
        self
    }

    pub fn with_partner(mut self, partner: &str) -> Self {
        self.partner_name = Some(partner.to_string());
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetadata {
    pub version: String,
    pub environment: String,
}

/// 一条待写入 error_logs 的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub error_id: String,
    pub timestamp: DateTime<Utc>,
    pub error_type: ErrorType,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub user_context: UserContext,
    pub error_context: ErrorContext,
    pub severity: Severity,
    pub resolved: bool,
    pub metadata: ErrorMetadata,
}

/// 近 N 天错误统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorStats {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
    pub by_resolved: BTreeMap<String, usize>,
    /// 最近 10 条
    pub recent: Vec<ErrorLogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_by_type() {
        assert_eq!(
            determine_severity(ErrorType::SystemError, "anything"),
            Severity::Critical
        );
        assert_eq!(
            determine_severity(ErrorType::PartnerError, "anything"),
            Severity::High
        );
        assert_eq!(
            determine_severity(ErrorType::ValidationError, "anything"),
            Severity::Medium
        );
        assert_eq!(
            determine_severity(ErrorType::UserError, "anything"),
            Severity::Low
        );
    }

    #[test]
    fn test_severity_by_message_keyword() {
        assert_eq!(
            determine_severity(ErrorType::UserError, "partner service not responding"),
            Severity::Critical
        );
        assert_eq!(
            determine_severity(ErrorType::NetworkError, "Landing write timeout after 5000ms"),
            Severity::High
        );
        assert_eq!(
            determine_severity(ErrorType::UserError, "service unavailable"),
            Severity::Medium
        );
        // 关键字区分大小写
        assert_eq!(
            determine_severity(ErrorType::NetworkError, "Timeout"),
            Severity::Low
        );
    }

    #[test]
    fn test_error_context_serialization() {
        let ctx = ErrorContext::new("DeepLinkOrchestrator", "track_click")
            .with_partner("kayak")
            .with_extra("fallback_url", "https://www.kayak.com/cars");
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["component"], "DeepLinkOrchestrator");
        assert_eq!(json["partner_name"], "kayak");
        assert_eq!(json["fallback_url"], "https://www.kayak.com/cars");
        assert!(json.get("search_params").is_none());
    }
}
