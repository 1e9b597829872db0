pub mod ip;
pub mod timeout;

pub use timeout::{with_timeout, with_timeout_ms};

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    // 随机选择字母和数字
    iter::repeat_with(|| ALPHANUMERIC[rand::random_range(0..ALPHANUMERIC.len())] as char)
        .take(length)
        .collect()
}

/// 点击 ID：10 位字母数字
pub fn generate_click_id() -> String {
    generate_random_code(10)
}

/// 落地 ID：`RB-` + 10 位字母数字
pub fn generate_landing_id() -> String {
    format!("RB-{}", generate_random_code(10))
}

/// 解析复合地点 ID（如 `tlh-a15927`），返回大写的前缀代码与剩余部分
pub fn parse_location_id(location_id: &str) -> (String, String) {
    let mut parts = location_id.split('-');
    let head = parts.next().unwrap_or_default();
    match parts.next() {
        Some(rest) => (head.to_uppercase(), rest.to_string()),
        None => (location_id.to_uppercase(), location_id.to_string()),
    }
}
