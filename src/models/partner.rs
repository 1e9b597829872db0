use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 合作方配置（启动时从存储加载，适配器构造后不再变化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerConfig {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub is_active: bool,
    #[serde(default)]
    pub configurations: BTreeMap<String, String>,
}

impl PartnerConfig {
    /// 读取配置项，空字符串视为缺失
    pub fn get(&self, key: &str) -> Option<&str> {
        self.configurations
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }
}
