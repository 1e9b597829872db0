//! Request ID middleware
//!
//! 为每个请求生成随机 ID，注入到 tracing span 中，方便日志关联追踪。

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::middleware::Next;
use actix_web::{Error, HttpMessage};
use tracing::{Instrument, info_span};

use crate::utils::generate_random_code;

const REQUEST_ID_LEN: usize = 16;

/// 请求 ID，可从 request extensions 中提取
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// 配合 `actix_web::middleware::from_fn` 使用
pub async fn request_id(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    // 上游代理已经带了就沿用
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 64)
        .map(String::from)
        .unwrap_or_else(|| generate_random_code(REQUEST_ID_LEN));

    req.extensions_mut().insert(RequestId(id.clone()));

    let span = info_span!(
        "request",
        request_id = %id,
        method = %req.method(),
        path = %req.path(),
    );

    async move {
        let mut response = next.call(req).await?;
        if let Ok(value) = HeaderValue::from_str(&id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static("x-request-id"), value);
        }
        Ok(response)
    }
    .instrument(span)
    .await
}
