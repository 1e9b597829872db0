//! 错误分类、严重级别推断与批量上报

mod reporter;
mod types;

pub use reporter::{ErrorReporter, generate_error_id, generate_session_id};
pub use types::{
    ErrorContext, ErrorLogEntry, ErrorMetadata, ErrorStats, ErrorType, Severity, UserContext,
    determine_severity,
};
