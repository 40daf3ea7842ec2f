#![cfg(feature = "inmem-store")]

use actix_web::{test, web, App, HttpResponse};
use quill::repo::inmem::InMemRepo;
use quill::service::PageLimits;
use quill::{config, security_headers, AppState};
use std::sync::Arc;

fn state() -> web::Data<AppState> {
    web::Data::new(AppState::new(Arc::new(InMemRepo::new()), PageLimits::default()))
}

#[actix_web::test]
async fn security_headers_present() {
    let app = test::init_service(
        App::new()
            .wrap(security_headers(false))
            .app_data(state())
            .configure(config),
    )
    .await;
    let req = test::TestRequest::get().uri("/healthz").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert!(headers.get("content-security-policy").is_some());
    assert_eq!(headers.get("referrer-policy").unwrap(), "no-referrer");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("strict-transport-security").is_none()); // not enabled
}

#[actix_web::test]
async fn headers_also_stamped_on_errors() {
    let app = test::init_service(
        App::new()
            .wrap(security_headers(false))
            .app_data(state())
            .configure(config),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/comments").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
}

#[actix_web::test]
async fn hsts_enabled_on_request() {
    let app = test::init_service(
        App::new()
            .wrap(security_headers(true))
            .app_data(state())
            .configure(config),
    )
    .await;
    let req = test::TestRequest::get().uri("/healthz").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().get("strict-transport-security").is_some(), "HSTS header missing");
}

#[actix_web::test]
async fn existing_csp_header_preserved() {
    let app = test::init_service(
        App::new()
            .wrap(security_headers(false))
            .route(
                "/custom",
                web::get().to(|| async {
                    HttpResponse::Ok()
                        .insert_header(("Content-Security-Policy", "default-src 'none'"))
                        .finish()
                }),
            ),
    )
    .await;
    let req = test::TestRequest::get().uri("/custom").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get("content-security-policy").unwrap(), "default-src 'none'");
}
