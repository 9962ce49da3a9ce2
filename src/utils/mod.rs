pub mod audit;
pub mod db_utils;
pub mod presence_cache;

use actix_web::HttpRequest;

/// Client address honoring X-Forwarded-For.
pub fn client_ip(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("")
        .to_string()
}
