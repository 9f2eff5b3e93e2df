//! Integration tests for relluna-api HTTP endpoints

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use helpers::{current_period, RecordingEncoder, TestEnv};
use http_body_util::BodyExt;
use relluna_common::db::PlanTier;
use serde_json::{json, Value};
use tower::util::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn relume_request(memory_id: &str, user_id: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/memories/{}/relume", memory_id))
        .header("content-type", "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id);
    }
    builder.body(body).unwrap()
}

#[tokio::test]
async fn test_root_endpoint() {
    let env = TestEnv::new().await;

    let response = env
        .app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Relluna API online");
    assert_eq!(body["app"], "relluna-api");
}

#[tokio::test]
async fn test_health_endpoint() {
    let env = TestEnv::new().await;

    let response = env
        .app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "relluna-api");
    assert!(body["uptime_seconds"].is_u64());
    assert!(body.get("last_error").is_none());
}

#[tokio::test]
async fn test_relume_success_and_video_served() {
    let env = TestEnv::new().await;
    let media = env.write_upload("a.jpg");
    env.seed_user("u1", PlanTier::BetaFree, 0, 0, Some(current_period())).await;
    env.seed_memory("m1", "u1", Some(&media), Some("Aniversário da vó")).await;
    let app = env.app();

    let response = app
        .clone()
        .oneshot(relume_request("m1", Some("u1"), Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["memory_id"], "m1");
    assert_eq!(body["relumination_style"], 1);
    let url = body["relumination_url"].as_str().unwrap().to_string();
    assert!(url.starts_with("http://localhost:8000/media/reluminations/"));
    assert!(url.ends_with("_style1.mp4"));

    let path = url.trim_start_matches("http://localhost:8000");
    let response = app
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"fake mp4");
}

#[tokio::test]
async fn test_relume_with_explicit_style() {
    let env = TestEnv::new().await;
    let media = env.write_upload("a.jpg");
    env.seed_user("u1", PlanTier::BetaFree, 0, 0, None).await;
    env.seed_memory("m1", "u1", Some(&media), None).await;

    let response = env
        .app()
        .oneshot(relume_request(
            "m1",
            Some("u1"),
            Body::from(json!({"style": 1}).to_string()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_relume_unknown_style_is_bad_request() {
    let env = TestEnv::new().await;
    let media = env.write_upload("a.jpg");
    env.seed_user("u1", PlanTier::BetaFree, 0, 0, None).await;
    env.seed_memory("m1", "u1", Some(&media), None).await;

    let response = env
        .app()
        .oneshot(relume_request(
            "m1",
            Some("u1"),
            Body::from(json!({"style": 7}).to_string()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(env.quota("u1").await.relumination_used_this_month, 0);
}

#[tokio::test]
async fn test_relume_quota_exceeded_is_payment_required() {
    let env = TestEnv::new().await;
    let media = env.write_upload("a.jpg");
    env.seed_user("u1", PlanTier::BetaFree, 0, 10, Some(current_period())).await;
    env.seed_memory("m1", "u1", Some(&media), None).await;

    let response = env
        .app()
        .oneshot(relume_request("m1", Some("u1"), Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "QUOTA_EXCEEDED");
}

#[tokio::test]
async fn test_relume_already_relumed_is_conflict() {
    let env = TestEnv::new().await;
    let media = env.write_upload("a.jpg");
    env.seed_user("u1", PlanTier::BetaFree, 0, 0, Some(current_period())).await;
    env.seed_memory("m1", "u1", Some(&media), None).await;
    let app = env.app();

    let first = app
        .clone()
        .oneshot(relume_request("m1", Some("u1"), Body::empty()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(relume_request("m1", Some("u1"), Body::empty()))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["error"]["code"], "ALREADY_RELUMED");
}

#[tokio::test]
async fn test_relume_without_identity_is_unauthorized() {
    let env = TestEnv::new().await;

    let response = env
        .app()
        .oneshot(relume_request("m1", None, Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_relume_unknown_memory_is_not_found() {
    let env = TestEnv::new().await;
    env.seed_user("u1", PlanTier::BetaFree, 0, 0, None).await;

    let response = env
        .app()
        .oneshot(relume_request("missing", Some("u1"), Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_relume_missing_media_is_bad_request() {
    let env = TestEnv::new().await;
    env.seed_user("u1", PlanTier::BetaFree, 0, 0, None).await;
    env.seed_memory("m1", "u1", None, None).await;

    let response = env
        .app()
        .oneshot(relume_request("m1", Some("u1"), Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "MISSING_MEDIA");
}

#[tokio::test]
async fn test_render_failure_reported_on_health() {
    let env = TestEnv::with_encoder(RecordingEncoder::failing()).await;
    let media = env.write_upload("a.jpg");
    env.seed_user("u1", PlanTier::BetaFree, 0, 0, None).await;
    env.seed_memory("m1", "u1", Some(&media), None).await;
    let app = env.app();

    let response = app
        .clone()
        .oneshot(relume_request("m1", Some("u1"), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"]["code"], "RENDER_FAILED");

    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(health).await;
    assert!(body["last_error"].as_str().unwrap().contains("simulated encoder failure"));
}

#[tokio::test]
async fn test_quota_endpoint() {
    let env = TestEnv::new().await;
    env.seed_user("u1", PlanTier::BetaFree, 2, 3, Some(current_period())).await;

    let response = env
        .app()
        .oneshot(
            Request::builder()
                .uri("/reluminations/quota")
                .header("x-user-id", "u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["plan_tier"], "beta_free");
    assert_eq!(body["period"], current_period());
    assert_eq!(body["relumination_credits"], 2);
    assert_eq!(body["relumination_used_this_month"], 3);
    assert_eq!(body["monthly_limit"], 10);
    assert_eq!(body["remaining_free"], 7);
}

#[tokio::test]
async fn test_quota_endpoint_unknown_user() {
    let env = TestEnv::new().await;

    let response = env
        .app()
        .oneshot(
            Request::builder()
                .uri("/reluminations/quota")
                .header("x-user-id", "ghost")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
