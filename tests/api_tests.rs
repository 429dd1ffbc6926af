//! HTTP API tests
//!
//! POST /shorten, GET /{token} and GET /{token}/stats through the full
//! actix service stack on the in-memory backend.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use serde_json::{Value, json};

use shortstat::api::link_routes;
use shortstat::api::middleware::RequestTrace;
use shortstat::config::StoreConfig;
use shortstat::services::{LinkResolver, ResolverOptions, SuffixGenerator};
use shortstat::storage::{LinkRecordStore, MemoryBackend};

fn resolver() -> Arc<LinkResolver> {
    let store = Arc::new(LinkRecordStore::new(
        Arc::new(MemoryBackend::new()),
        &StoreConfig::default(),
    ));
    Arc::new(LinkResolver::new(
        store,
        SuffixGenerator::default(),
        ResolverOptions::default(),
    ))
}

macro_rules! app {
    ($resolver:expr) => {
        test::init_service(
            App::new()
                .wrap(RequestTrace)
                .app_data(web::Data::new($resolver.clone()))
                .service(link_routes()),
        )
        .await
    };
}

#[actix_rt::test]
async fn test_shorten_redirect_stats_flow() {
    let resolver = resolver();
    let app = app!(resolver);

    let req = TestRequest::post()
        .uri("/shorten")
        .set_json(json!({ "url": "https://example.com/page" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 0);
    let suffix = body["data"]["suffix"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["original_url"], "https://example.com/page");

    let req = TestRequest::get().uri(&format!("/{}", suffix)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get("Location").unwrap(),
        "https://example.com/page"
    );

    let req = TestRequest::get()
        .uri(&format!("/{}/stats", suffix))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["visit_count"], 1);
    let distribution = body["data"]["distribution"].as_array().unwrap();
    assert_eq!(distribution.len(), 1);
    assert_eq!(distribution[0]["count"], 1);
}

#[actix_rt::test]
async fn test_shorten_is_idempotent() {
    let resolver = resolver();
    let app = app!(resolver);

    let mut suffixes = Vec::new();
    for _ in 0..2 {
        let req = TestRequest::post()
            .uri("/shorten")
            .set_json(json!({ "url": "https://example.com/" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        suffixes.push(body["data"]["suffix"].as_str().unwrap().to_string());
    }
    assert_eq!(suffixes[0], suffixes[1]);
}

#[actix_rt::test]
async fn test_shorten_rejects_invalid_url() {
    let resolver = resolver();
    let app = app!(resolver);

    let req = TestRequest::post()
        .uri("/shorten")
        .set_json(json!({ "url": "ftp://example.com/file" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 3002);
}

#[actix_rt::test]
async fn test_shorten_rejects_malformed_body() {
    let resolver = resolver();
    let app = app!(resolver);

    let req = TestRequest::post()
        .uri("/shorten")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 1000);
}

#[actix_rt::test]
async fn test_custom_suffix_conflict() {
    let resolver = resolver();
    let app = app!(resolver);

    let req = TestRequest::post()
        .uri("/shorten")
        .set_json(json!({ "url": "https://a.example/", "custom_suffix": "launch" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::post()
        .uri("/shorten")
        .set_json(json!({ "url": "https://b.example/", "custom_suffix": "launch" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 3001);

    let req = TestRequest::get().uri("/launch").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers().get("Location").unwrap(), "https://a.example/");
}

#[actix_rt::test]
async fn test_unknown_token_is_404() {
    let resolver = resolver();
    let app = app!(resolver);

    let req = TestRequest::get().uri("/no-such-token").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = TestRequest::get().uri("/no-such-token/stats").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 3000);
}

#[actix_rt::test]
async fn test_stats_csv_export() {
    let resolver = resolver();
    let record = resolver
        .create_or_fetch("https://example.com/", Some("csv"))
        .await
        .unwrap();
    resolver.resolve(&record.suffix).await.unwrap();
    resolver.resolve("csv").await.unwrap();
    let app = app!(resolver);

    let req = TestRequest::get().uri("/csv/stats?format=csv").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()
            .get("Content-Type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );

    let body = test::read_body(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("from,to,count"));
    let total: u64 = lines
        .map(|line| line.rsplit(',').next().unwrap().parse::<u64>().unwrap())
        .sum();
    assert_eq!(total, 2);
}
