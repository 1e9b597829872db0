//! 客户端 IP 提取
//!
//! 连接来自私有地址 / localhost 时认为前面有反向代理，读取转发头；
//! 公网直连时只信任连接地址。

use std::net::IpAddr;

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;

/// 检查 IP 是否为私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10
        }
    }
}

/// 转发头里的原始客户端 IP（X-Forwarded-For 第一个，其次 X-Real-IP）
pub fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
        })
}

/// 根据连接地址与请求头决定客户端 IP
pub fn resolve_client_ip(peer: Option<&str>, headers: &HeaderMap) -> Option<String> {
    let peer = peer?;
    let peer_ip = peer
        .parse::<std::net::SocketAddr>()
        .map(|s| s.ip())
        .or_else(|_| peer.parse::<IpAddr>());

    match peer_ip {
        Ok(ip) if is_private_or_local(&ip) => {
            forwarded_ip(headers).or_else(|| Some(ip.to_string()))
        }
        Ok(ip) => Some(ip.to_string()),
        Err(_) => Some(peer.to_string()),
    }
}

/// 从 HttpRequest 提取真实客户端 IP
pub fn extract_client_ip(req: &HttpRequest) -> Option<String> {
    let conn = req.connection_info();
    resolve_client_ip(conn.peer_addr(), req.headers())
}
