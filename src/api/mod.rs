//! HTTP 接口

pub mod middleware;
pub mod services;
