use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 服务器地址、端口、CPU 数量
/// - database: 数据库连接配置
/// - logging: 日志配置
/// - locations: 地点自动补全接口
/// - pipeline: 深链管线各阶段超时
/// - partners: 默认合作方与国家覆盖表
/// - landing: 落地会话 Cookie 与 GeoIP
/// - reporting: 错误日志上报
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub locations: LocationsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub partners: PartnersConfig,
    #[serde(default)]
    pub landing: LandingConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：RR，分隔符：__
    /// 示例：RR__SERVER__PORT=9999
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    /// 从指定路径加载配置（文件可不存在）
    pub fn load_from(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 RR，分隔符 __
            .add_source(
                Environment::with_prefix("RR")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 允许跨域调用 /api 的来源（空 = 仅同源）
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 地点自动补全接口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationsConfig {
    /// 自动补全接口地址（为空则地点搜索不可用）
    #[serde(default)]
    pub api_url: String,
    /// Bearer token
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_locations_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_locations_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_locations_cache_capacity")]
    pub cache_capacity: u64,
}

/// 深链管线超时配置（毫秒）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_registry_query_timeout_ms")]
    pub registry_query_timeout_ms: u64,
    #[serde(default = "default_partner_resolution_timeout_ms")]
    pub partner_resolution_timeout_ms: u64,
    #[serde(default = "default_landing_timeout_ms")]
    pub landing_timeout_ms: u64,
    #[serde(default = "default_click_timeout_ms")]
    pub click_timeout_ms: u64,
}

/// 单个国家的合作方覆盖
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GeoOverride {
    #[serde(default)]
    pub new_tab: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
}

/// 合作方默认值配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnersConfig {
    /// 旧版单一默认合作方
    #[serde(default = "default_active_partner")]
    pub active_partner: String,
    #[serde(default = "default_new_tab_partner")]
    pub default_new_tab: String,
    #[serde(default = "default_redirect_partner")]
    pub default_redirect: String,
    /// 国家代码（ISO alpha-2，大写）→ 覆盖
    #[serde(default)]
    pub geo_overrides: HashMap<String, GeoOverride>,
}

/// 落地会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandingConfig {
    #[serde(default = "default_landing_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_landing_ttl_secs")]
    pub ttl_secs: u64,
    /// 允许透传 landing_id 的来源站点
    #[serde(default = "default_trusted_referrers")]
    pub trusted_referrers: Vec<String>,
    #[serde(default = "default_enable_geo_lookup")]
    pub enable_geo_lookup: bool,
    /// `{ip}` 占位符
    #[serde(default = "default_geoip_api_url")]
    pub geoip_api_url: String,
}

/// 错误日志上报配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    #[serde(default = "default_reporting_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_reporting_version")]
    pub version: String,
    #[serde(default = "default_reporting_environment")]
    pub environment: String,
    /// 队列上限，存储不可用时超出部分丢弃最旧的条目
    #[serde(default = "default_reporting_max_pending")]
    pub max_pending: usize,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "rentroute.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_locations_http_timeout_secs() -> u64 {
    5
}

fn default_locations_cache_ttl_secs() -> u64 {
    300
}

fn default_locations_cache_capacity() -> u64 {
    1000
}

fn default_registry_query_timeout_ms() -> u64 {
    8000
}

fn default_partner_resolution_timeout_ms() -> u64 {
    10_000
}

fn default_landing_timeout_ms() -> u64 {
    5000
}

fn default_click_timeout_ms() -> u64 {
    5000
}

fn default_active_partner() -> String {
    "kayak".to_string()
}

fn default_new_tab_partner() -> String {
    "skyscanner".to_string()
}

fn default_redirect_partner() -> String {
    "autorentals".to_string()
}

fn default_landing_cookie_name() -> String {
    "landing_id".to_string()
}

fn default_landing_ttl_secs() -> u64 {
    300
}

fn default_trusted_referrers() -> Vec<String> {
    vec!["rent-off.com".to_string(), "flight-off.com".to_string()]
}

fn default_enable_geo_lookup() -> bool {
    true
}

fn default_geoip_api_url() -> String {
    "https://ipinfo.io/{ip}/json".to_string()
}

fn default_reporting_flush_interval_ms() -> u64 {
    1000
}

fn default_reporting_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_reporting_environment() -> String {
    "production".to_string()
}

fn default_reporting_max_pending() -> usize {
    1000
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for LocationsConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_token: None,
            http_timeout_secs: default_locations_http_timeout_secs(),
            cache_ttl_secs: default_locations_cache_ttl_secs(),
            cache_capacity: default_locations_cache_capacity(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            registry_query_timeout_ms: default_registry_query_timeout_ms(),
            partner_resolution_timeout_ms: default_partner_resolution_timeout_ms(),
            landing_timeout_ms: default_landing_timeout_ms(),
            click_timeout_ms: default_click_timeout_ms(),
        }
    }
}

impl Default for PartnersConfig {
    fn default() -> Self {
        Self {
            active_partner: default_active_partner(),
            default_new_tab: default_new_tab_partner(),
            default_redirect: default_redirect_partner(),
            geo_overrides: HashMap::new(),
        }
    }
}

impl Default for LandingConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_landing_cookie_name(),
            ttl_secs: default_landing_ttl_secs(),
            trusted_referrers: default_trusted_referrers(),
            enable_geo_lookup: default_enable_geo_lookup(),
            geoip_api_url: default_geoip_api_url(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_reporting_flush_interval_ms(),
            version: default_reporting_version(),
            environment: default_reporting_environment(),
            max_pending: default_reporting_max_pending(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_defaults() {
        let pipeline = PipelineConfig::default();
        assert_eq!(pipeline.registry_query_timeout_ms, 8000);
        assert_eq!(pipeline.partner_resolution_timeout_ms, 10_000);
        assert_eq!(pipeline.landing_timeout_ms, 5000);
        assert_eq!(pipeline.click_timeout_ms, 5000);
    }

    #[test]
    fn test_partner_defaults() {
        let partners = PartnersConfig::default();
        assert_eq!(partners.active_partner, "kayak");
        assert_eq!(partners.default_new_tab, "skyscanner");
        assert_eq!(partners.default_redirect, "autorentals");
        assert!(partners.geo_overrides.is_empty());
    }

    #[test]
    fn test_sample_config_round_trips_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        assert!(sample.contains("[pipeline]"));
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.landing.cookie_name, "landing_id");
        assert_eq!(parsed.landing.ttl_secs, 300);
    }

    #[test]
    fn test_geo_overrides_from_toml() {
        let parsed: StaticConfig = toml::from_str(
            r#"
            [partners.geo_overrides.GB]
            new_tab = "kayak"
            "#,
        )
        .unwrap();
        let gb = parsed.partners.geo_overrides.get("GB").unwrap();
        assert_eq!(gb.new_tab.as_deref(), Some("kayak"));
        assert_eq!(gb.redirect, None);
    }
}
