use actix_web::http::header;
use actix_web::middleware::DefaultHeaders;

const CSP: &str = "default-src 'self'; img-src 'self' data:; object-src 'none'; base-uri 'none'; frame-ancestors 'none'";
const HSTS: &str = "max-age=63072000; includeSubDomains; preload";

/// Response headers stamped on every API response. `DefaultHeaders` leaves
/// any header a handler already set untouched.
pub fn security_headers(enable_hsts: bool) -> DefaultHeaders {
    let headers = DefaultHeaders::new()
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::X_FRAME_OPTIONS, "DENY"))
        .add((header::REFERRER_POLICY, "no-referrer"))
        .add((header::CONTENT_SECURITY_POLICY, CSP));
    if enable_hsts {
        headers.add((header::STRICT_TRANSPORT_SECURITY, HSTS))
    } else {
        headers
    }
}
