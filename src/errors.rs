use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum RentrouteError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    PartnerNotFound(String),
    PartnerUnavailable(String),
    LocationApi(String),
    Network(String),
    Timeout(String),
    Serialization(String),
    DateParse(String),
}

impl RentrouteError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            RentrouteError::DatabaseConfig(_) => "E001",
            RentrouteError::DatabaseConnection(_) => "E002",
            RentrouteError::DatabaseOperation(_) => "E003",
            RentrouteError::FileOperation(_) => "E004",
            RentrouteError::Validation(_) => "E005",
            RentrouteError::NotFound(_) => "E006",
            RentrouteError::PartnerNotFound(_) => "E007",
            RentrouteError::PartnerUnavailable(_) => "E008",
            RentrouteError::LocationApi(_) => "E009",
            RentrouteError::Network(_) => "E010",
            RentrouteError::Timeout(_) => "E011",
            RentrouteError::Serialization(_) => "E012",
            RentrouteError::DateParse(_) => "E013",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            RentrouteError::DatabaseConfig(_) => "Database Configuration Error",
            RentrouteError::DatabaseConnection(_) => "Database Connection Error",
            RentrouteError::DatabaseOperation(_) => "Database Operation Error",
            RentrouteError::FileOperation(_) => "File Operation Error",
            RentrouteError::Validation(_) => "Validation Error",
            RentrouteError::NotFound(_) => "Resource Not Found",
            RentrouteError::PartnerNotFound(_) => "Partner Not Found",
            RentrouteError::PartnerUnavailable(_) => "Partner Unavailable",
            RentrouteError::LocationApi(_) => "Location API Error",
            RentrouteError::Network(_) => "Network Error",
            RentrouteError::Timeout(_) => "Timeout",
            RentrouteError::Serialization(_) => "Serialization Error",
            RentrouteError::DateParse(_) => "Date Parse Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            RentrouteError::DatabaseConfig(msg) => msg,
            RentrouteError::DatabaseConnection(msg) => msg,
            RentrouteError::DatabaseOperation(msg) => msg,
            RentrouteError::FileOperation(msg) => msg,
            RentrouteError::Validation(msg) => msg,
            RentrouteError::NotFound(msg) => msg,
            RentrouteError::PartnerNotFound(msg) => msg,
            RentrouteError::PartnerUnavailable(msg) => msg,
            RentrouteError::LocationApi(msg) => msg,
            RentrouteError::Network(msg) => msg,
            RentrouteError::Timeout(msg) => msg,
            RentrouteError::Serialization(msg) => msg,
            RentrouteError::DateParse(msg) => msg,
        }
    }

    /// 是否为超时错误
    pub fn is_timeout(&self) -> bool {
        matches!(self, RentrouteError::Timeout(_))
    }

    /// 格式化为彩色输出（用于 Server 模式）
    #[cfg(feature = "server")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for RentrouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 默认使用简洁格式
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for RentrouteError {}

// 便捷的构造函数
impl RentrouteError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        RentrouteError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        RentrouteError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        RentrouteError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        RentrouteError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        RentrouteError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        RentrouteError::NotFound(msg.into())
    }

    pub fn partner_not_found<T: Into<String>>(name: T) -> Self {
        RentrouteError::PartnerNotFound(format!("Partner {} not found", name.into()))
    }

    pub fn partner_unavailable<T: Into<String>>(msg: T) -> Self {
        RentrouteError::PartnerUnavailable(msg.into())
    }

    pub fn location_api<T: Into<String>>(msg: T) -> Self {
        RentrouteError::LocationApi(msg.into())
    }

    pub fn network<T: Into<String>>(msg: T) -> Self {
        RentrouteError::Network(msg.into())
    }

    pub fn timeout(operation: &str, after: Duration) -> Self {
        RentrouteError::Timeout(format!(
            "{} timeout after {}ms",
            operation,
            after.as_millis()
        ))
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        RentrouteError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        RentrouteError::DateParse(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for RentrouteError {
    fn from(err: sea_orm::DbErr) -> Self {
        RentrouteError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for RentrouteError {
    fn from(err: std::io::Error) -> Self {
        RentrouteError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for RentrouteError {
    fn from(err: serde_json::Error) -> Self {
        RentrouteError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for RentrouteError {
    fn from(err: chrono::ParseError) -> Self {
        RentrouteError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RentrouteError>;
