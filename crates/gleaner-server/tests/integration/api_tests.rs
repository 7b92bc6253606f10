use axum::http::StatusCode;
use serde_json::json;

use crate::integration::common::{get_json, post_json, setup_test_app, setup_test_app_without_llm};

#[tokio::test]
async fn health_reports_llm_configured() {
    let app = setup_test_app().await;

    let (status, json) = get_json(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["llm"], "configured");
}

#[tokio::test]
async fn health_reports_llm_disabled() {
    let app = setup_test_app_without_llm().await;

    let (status, json) = get_json(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["llm"], "disabled");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_test_app().await;

    let (status, json) = get_json(&app.router, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/v1/batch"].is_object());
    assert!(json["paths"]["/v1/extract"].is_object());
}

// ---------------------------------------------------------------------------
// /v1/batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_returns_one_record_per_url_in_order() {
    let app = setup_test_app().await;
    let urls = vec![app.page("/plain"), app.page("/slow"), app.page("/missing")];

    let (status, json) = post_json(&app.router, "/v1/batch", json!({ "urls": urls })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["succeeded"], 1);
    assert_eq!(json["failed"], 2);

    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    for (result, url) in results.iter().zip(&urls) {
        assert_eq!(result["url"], url.as_str());
    }

    assert_eq!(results[0]["content"]["title"], "Sample");
    assert_eq!(results[0]["content"]["text"], "Hello world");
    assert!(results[0].get("error").is_none());

    assert_eq!(results[1]["error"]["stage"], "fetch");
    assert_eq!(results[1]["error"]["kind"], "timeout");
    assert!(results[1].get("content").is_none());

    assert_eq!(results[2]["error"]["kind"], "http_status");
    assert_eq!(results[2]["error"]["message"], "404");
}

#[tokio::test]
async fn batch_empty_list_returns_empty_results() {
    let app = setup_test_app().await;

    let (status, json) = post_json(&app.router, "/v1/batch", json!({ "urls": [] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"], json!([]));
    assert_eq!(json["succeeded"], 0);
}

#[tokio::test]
async fn batch_rejects_too_many_urls() {
    let app = setup_test_app().await;
    let urls: Vec<String> = (0..6).map(|i| app.page(&format!("/plain?{i}"))).collect();

    let (status, json) = post_json(&app.router, "/v1/batch", json!({ "urls": urls })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn batch_rejects_blank_url() {
    let app = setup_test_app().await;

    let (status, json) = post_json(
        &app.router,
        "/v1/batch",
        json!({ "urls": [app.page("/plain"), "   "] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn batch_rejects_zero_concurrency() {
    let app = setup_test_app().await;

    let (status, _) = post_json(
        &app.router,
        "/v1/batch",
        json!({ "urls": [app.page("/plain")], "concurrency": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_request_timeout_is_capped_by_server() {
    let app = setup_test_app().await;

    // Server limit is one second; the slow page takes ten.
    let started = std::time::Instant::now();
    let (status, json) = post_json(
        &app.router,
        "/v1/batch",
        json!({ "urls": [app.page("/slow")], "timeout_secs": 3600, "concurrency": 1000 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["error"]["kind"], "timeout");
    assert_eq!(json["results"][0]["error"]["message"], "1s");
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

// ---------------------------------------------------------------------------
// /v1/extract
// ---------------------------------------------------------------------------

#[tokio::test]
async fn extract_returns_events() {
    let app = setup_test_app().await;

    let (status, json) = post_json(
        &app.router,
        "/v1/extract",
        json!({ "urls": [app.page("/gigs")] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let events = json["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["band_name"], "The Examples");
    assert_eq!(events[0]["venue"], "Roundhouse");
    assert_eq!(events[0]["date"], "2024-06-01T20:00:00Z");
    assert_eq!(app.llm_calls(), 1);
}

#[tokio::test]
async fn extract_concatenates_events_across_urls() {
    let app = setup_test_app().await;

    let (status, json) = post_json(
        &app.router,
        "/v1/extract",
        json!({ "urls": [app.page("/gigs"), app.page("/plain")] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["events"].as_array().unwrap().len(), 2);
    assert_eq!(app.llm_calls(), 2);
}

#[tokio::test]
async fn extract_fetch_failure_is_bad_gateway() {
    let app = setup_test_app().await;

    let (status, json) = post_json(
        &app.router,
        "/v1/extract",
        json!({ "urls": [app.page("/gigs"), app.page("/missing")] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "fetch_error");
    assert!(json.get("events").is_none());
}

#[tokio::test]
async fn extract_fetch_timeout_is_gateway_timeout() {
    let app = setup_test_app().await;

    let (status, json) = post_json(
        &app.router,
        "/v1/extract",
        json!({ "urls": [app.page("/slow")] }),
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["error"], "timeout");
    assert_eq!(app.llm_calls(), 0);
}

#[tokio::test]
async fn extract_invalid_url_is_rejected_before_any_work() {
    let app = setup_test_app().await;

    let (status, json) = post_json(
        &app.router,
        "/v1/extract",
        json!({ "urls": [app.page("/gigs"), "ftp://files.example/list"] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
    assert_eq!(app.llm_calls(), 0);
}

#[tokio::test]
async fn extract_without_llm_is_config_error() {
    let app = setup_test_app_without_llm().await;

    let (status, json) = post_json(
        &app.router,
        "/v1/extract",
        json!({ "urls": [app.page("/gigs")] }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "config_error");
}
