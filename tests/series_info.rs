#![cfg(feature = "inmem-store")]

use actix_web::{test, web, App};
use quill::models::NewPost;
use quill::repo::inmem::InMemRepo;
use quill::repo::PostRepo;
use quill::service::PageLimits;
use quill::{config, AppState};
use serde_json::Value;
use std::sync::Arc;

fn part(series_id: Option<i64>, order: Option<i32>, published: bool, title: &str) -> NewPost {
    NewPost {
        title: title.into(),
        content: String::new(),
        published,
        category_id: Some(1),
        series_id,
        order_in_series: order,
    }
}

#[actix_web::test]
async fn series_info_for_published_series_post() {
    let repo = InMemRepo::new();
    let s = repo.create_series("Async Rust".into()).await.unwrap();
    let p1 = repo.create_post(part(Some(s.id), Some(1), true, "Futures")).await.unwrap();
    let p2 = repo.create_post(part(Some(s.id), Some(2), true, "Pinning")).await.unwrap();
    let p3 = repo.create_post(part(Some(s.id), Some(3), true, "Executors")).await.unwrap();
    let draft = repo.create_post(part(Some(s.id), Some(4), false, "Draft")).await.unwrap();
    let loose = repo.create_post(part(None, None, true, "Standalone")).await.unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(Arc::new(repo), PageLimits::default())))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::get().uri(&format!("/api/series-info/{}", p2.id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let info: Value = test::read_body_json(resp).await;
    assert_eq!(info["id"], s.id);
    assert_eq!(info["title"], "Async Rust");
    assert_eq!(info["currentPost"]["id"], p2.id);
    assert_eq!(info["currentPost"]["orderInSeries"], 2);
    assert_eq!(info["prevPost"]["id"], p1.id);
    assert_eq!(info["nextPost"]["id"], p3.id);
    assert_eq!(info["totalPosts"], 3);
    assert_eq!(info["progress"], 33);
    assert_eq!(info["posts"].as_array().unwrap().len(), 3);

    for missing in [draft.id, loose.id, 9999] {
        let req = test::TestRequest::get().uri(&format!("/api/series-info/{missing}")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404, "post {missing}");
    }
}
