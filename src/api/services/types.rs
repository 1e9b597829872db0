use serde::{Deserialize, Serialize};

use crate::errors::RentrouteError;
use crate::models::{RentalLocation, SearchParams};
use crate::services::{NavigationAction, SearchOutcome};

/// 业务错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    NotFound = 1004,
    InternalServerError = 1005,
    ServiceUnavailable = 1030,

    // 搜索错误 3000-3099
    SearchInvalidParams = 3000,
    SearchLocationNeeded = 3001,
    SearchFailed = 3002,
    PartnerNotFound = 3003,
}

impl From<&RentrouteError> for ErrorCode {
    fn from(err: &RentrouteError) -> Self {
        match err {
            RentrouteError::Validation(_) | RentrouteError::DateParse(_) => {
                ErrorCode::SearchInvalidParams
            }
            RentrouteError::PartnerNotFound(_) => ErrorCode::PartnerNotFound,
            RentrouteError::NotFound(_) => ErrorCode::NotFound,
            RentrouteError::Timeout(_) | RentrouteError::PartnerUnavailable(_) => {
                ErrorCode::ServiceUnavailable
            }
            _ => ErrorCode::InternalServerError,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: ErrorCode::Success as i32,
            message: "OK".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
        }
    }
}

/// 深链生成模式
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeepLinkMode {
    #[default]
    Both,
    Redirect,
    NewTab,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeepLinkRequest {
    pub search: SearchParams,
    /// 访客选中的地点，缺省时取 `search.pickupLocation`
    #[serde(default)]
    pub location: Option<RentalLocation>,
    /// 定位得到的默认地点，缺省时按客户端 IP 查询
    #[serde(default)]
    pub default_location: Option<RentalLocation>,
    #[serde(default)]
    pub mode: DeepLinkMode,
    /// 上一次返回的新标签页被浏览器拦截
    #[serde(default)]
    pub popup_blocked: bool,
}

#[derive(Serialize, Clone, Debug)]
pub struct DeepLinkResponse {
    pub outcome: SearchOutcome,
    pub actions: Vec<NavigationAction>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LocationQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub partner: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct HealthStorageCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: u32,
    pub storage: HealthStorageCheck,
    pub partners: Vec<String>,
    pub pending_error_logs: usize,
    pub response_time_ms: u32,
}
