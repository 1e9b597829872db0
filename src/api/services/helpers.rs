//! 请求上下文与落地 cookie

use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::http::header;
use actix_web::{HttpMessage, HttpRequest, HttpResponseBuilder};

use crate::models::VisitContext;
use crate::services::{AppServices, CookieChange, LandingSession};
use crate::utils::ip::extract_client_ip;

/// 从请求中提取访客信息
pub fn visit_from_request(req: &HttpRequest) -> VisitContext {
    let header_str = |name: header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };

    let page_url = {
        let conn = req.connection_info();
        format!("{}://{}{}", conn.scheme(), conn.host(), req.uri())
    };

    VisitContext {
        user_agent: header_str(header::USER_AGENT),
        referrer: header_str(header::REFERER),
        client_ip: extract_client_ip(req),
        query_string: req.query_string().to_string(),
        page_url,
    }
}

/// 按请求 cookie 恢复落地会话
pub fn session_from_request(req: &HttpRequest, services: &AppServices) -> LandingSession {
    let cookie = req.cookie(&services.cookie_name);
    services.session_from_cookie(cookie.as_ref().map(|c| c.value()))
}

/// 把会话在本次请求内的变化写回 Set-Cookie
pub fn apply_session_cookie(
    builder: &mut HttpResponseBuilder,
    session: &LandingSession,
    services: &AppServices,
) {
    let cookie = match session.take_change() {
        CookieChange::Unchanged => return,
        CookieChange::Set(landing_id) => build_landing_cookie(
            &services.cookie_name,
            landing_id,
            CookieDuration::seconds(session.ttl().as_secs() as i64),
        ),
        CookieChange::Removed => {
            build_landing_cookie(&services.cookie_name, String::new(), CookieDuration::ZERO)
        }
    };
    builder.cookie(cookie);
}

fn build_landing_cookie(name: &str, value: String, max_age: CookieDuration) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.to_string(), value);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(max_age);
    cookie
}
