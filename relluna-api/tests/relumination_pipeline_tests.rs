//! End-to-end relumination through the pipeline
//!
//! The video encoder is replaced by a recording double; everything else
//! (database, quota, asset copy, decode, compositing) is real.

mod helpers;

use helpers::{current_period, RecordingEncoder, TestEnv};
use relluna_api::error::ReluminationError;
use relluna_api::services::renderer::ReluminationStyle;
use relluna_common::db::PlanTier;

#[tokio::test]
async fn test_ninth_to_tenth_free_use_produces_video() {
    let env = TestEnv::new().await;
    let media = env.write_upload("praia.jpg");
    env.seed_user("u1", PlanTier::BetaFree, 0, 9, Some(current_period())).await;
    env.seed_memory("m1", "u1", Some(&media), Some("Um dia de sol na praia")).await;

    let outcome = env
        .pipeline()
        .relume("u1", "m1", ReluminationStyle::Style1)
        .await
        .unwrap();

    assert_eq!(env.quota("u1").await.relumination_used_this_month, 10);

    assert!(outcome.path.exists());
    assert!(helpers::is_token_name(&outcome.path, "_style1.mp4"));
    assert_eq!(outcome.path.parent().unwrap(), env.output_dir());
    let file_name = outcome.path.file_name().unwrap().to_string_lossy().to_string();
    assert_eq!(
        outcome.url,
        format!("http://localhost:8000/media/reluminations/{}", file_name)
    );

    let memory = env.memory("m1").await;
    assert_eq!(memory.relumination_url.as_deref(), Some(outcome.url.as_str()));
    assert_eq!(memory.relumination_style, Some(1));

    let calls = env.encoder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].frame_count, 4);
    assert_eq!(calls[0].frame_size, (270, 480));
    assert_eq!(calls[0].title, "Férias em família");
}

#[tokio::test]
async fn test_second_attempt_in_same_period_rejected_without_changes() {
    let env = TestEnv::new().await;
    let media = env.write_upload("praia.jpg");
    env.seed_user("u1", PlanTier::BetaFree, 0, 9, Some(current_period())).await;
    env.seed_memory("m1", "u1", Some(&media), Some("Um dia de sol na praia")).await;
    env.seed_memory("m2", "u1", Some(&media), Some("Outro dia")).await;
    let pipeline = env.pipeline();

    pipeline.relume("u1", "m1", ReluminationStyle::Style1).await.unwrap();
    let quota_before = env.quota("u1").await;
    let m1_before = env.memory("m1").await;
    let m2_before = env.memory("m2").await;
    let videos_before = env.output_files("_style1.mp4").len();

    let err = pipeline
        .relume("u1", "m2", ReluminationStyle::Style1)
        .await
        .unwrap_err();

    assert!(matches!(err, ReluminationError::QuotaExceeded { used: 10, limit: 10 }));
    assert_eq!(env.quota("u1").await, quota_before);
    assert_eq!(env.memory("m1").await, m1_before);
    assert_eq!(env.memory("m2").await, m2_before);
    assert_eq!(env.output_files("_style1.mp4").len(), videos_before);
}

#[tokio::test]
async fn test_free_user_cannot_relume_same_memory_twice() {
    let env = TestEnv::new().await;
    let media = env.write_upload("a.jpg");
    env.seed_user("u1", PlanTier::BetaFree, 0, 0, Some(current_period())).await;
    env.seed_memory("m1", "u1", Some(&media), None).await;
    let pipeline = env.pipeline();

    pipeline.relume("u1", "m1", ReluminationStyle::Style1).await.unwrap();
    let err = pipeline
        .relume("u1", "m1", ReluminationStyle::Style1)
        .await
        .unwrap_err();

    assert!(matches!(err, ReluminationError::AlreadyRelumed));
    // Gate runs before the ledger
    assert_eq!(env.quota("u1").await.relumination_used_this_month, 1);
}

#[tokio::test]
async fn test_credit_allows_re_relumination() {
    let env = TestEnv::new().await;
    let media = env.write_upload("a.jpg");
    env.seed_user("u1", PlanTier::BetaFree, 1, 0, Some(current_period())).await;
    env.seed_memory("m1", "u1", Some(&media), Some("primeira")).await;
    let pipeline = env.pipeline();

    // Uses the credit
    let first = pipeline.relume("u1", "m1", ReluminationStyle::Style1).await.unwrap();
    assert_eq!(env.quota("u1").await.relumination_credits, 0);

    // Now free with no credits: blocked
    let err = pipeline
        .relume("u1", "m1", ReluminationStyle::Style1)
        .await
        .unwrap_err();
    assert!(matches!(err, ReluminationError::AlreadyRelumed));
    assert_eq!(env.memory("m1").await.relumination_url.as_deref(), Some(first.url.as_str()));
}

#[tokio::test]
async fn test_paid_plan_overwrites_previous_relumination() {
    let env = TestEnv::new().await;
    let media = env.write_upload("a.jpg");
    env.seed_user("u1", PlanTier::Pro, 0, 0, Some(current_period())).await;
    env.seed_memory("m1", "u1", Some(&media), Some("texto")).await;
    let pipeline = env.pipeline();

    let first = pipeline.relume("u1", "m1", ReluminationStyle::Style1).await.unwrap();
    let second = pipeline.relume("u1", "m1", ReluminationStyle::Style1).await.unwrap();

    assert_ne!(first.url, second.url);
    assert_eq!(env.memory("m1").await.relumination_url.as_deref(), Some(second.url.as_str()));
    assert_eq!(env.output_files("_style1.mp4").len(), 2);
}

#[tokio::test]
async fn test_memory_without_media() {
    let env = TestEnv::new().await;
    env.seed_user("u1", PlanTier::BetaFree, 0, 0, Some(current_period())).await;
    env.seed_memory("m1", "u1", None, Some("sem foto")).await;

    let err = env
        .pipeline()
        .relume("u1", "m1", ReluminationStyle::Style1)
        .await
        .unwrap_err();

    assert!(matches!(err, ReluminationError::MissingMedia));
    assert_eq!(env.quota("u1").await.relumination_used_this_month, 0);
}

#[tokio::test]
async fn test_memory_of_another_user_is_not_found() {
    let env = TestEnv::new().await;
    let media = env.write_upload("a.jpg");
    env.seed_user("owner", PlanTier::BetaFree, 0, 0, None).await;
    env.seed_user("intruder", PlanTier::BetaFree, 0, 0, None).await;
    env.seed_memory("m1", "owner", Some(&media), None).await;

    let err = env
        .pipeline()
        .relume("intruder", "m1", ReluminationStyle::Style1)
        .await
        .unwrap_err();

    assert!(matches!(err, ReluminationError::MemoryNotFound(id) if id == "m1"));
}

#[tokio::test]
async fn test_missing_local_asset_after_quota_spent() {
    let env = TestEnv::new().await;
    env.seed_user("u1", PlanTier::BetaFree, 0, 0, Some(current_period())).await;
    env.seed_memory("m1", "u1", Some("/uploads/gone.jpg"), None).await;

    let err = env
        .pipeline()
        .relume("u1", "m1", ReluminationStyle::Style1)
        .await
        .unwrap_err();

    assert!(matches!(err, ReluminationError::AssetNotFound(_)));
    assert_eq!(env.quota("u1").await.relumination_used_this_month, 1);
    assert_eq!(env.memory("m1").await.relumination_url, None);
}

#[tokio::test]
async fn test_render_failure_keeps_quota_and_leaves_no_video() {
    let env = TestEnv::with_encoder(RecordingEncoder::failing()).await;
    let media = env.write_upload("a.jpg");
    env.seed_user("u1", PlanTier::BetaFree, 0, 2, Some(current_period())).await;
    env.seed_memory("m1", "u1", Some(&media), Some("texto")).await;

    let err = env
        .pipeline()
        .relume("u1", "m1", ReluminationStyle::Style1)
        .await
        .unwrap_err();

    assert!(matches!(err, ReluminationError::RenderFailed(_)));
    assert_eq!(env.quota("u1").await.relumination_used_this_month, 3);
    assert_eq!(env.memory("m1").await.relumination_url, None);
    assert!(env.output_files("_style1.mp4").is_empty());
    // Resolved source copy is kept
    assert_eq!(env.output_files(".jpg").len(), 1);
}

#[tokio::test]
async fn test_undecodable_image_is_render_failure() {
    let env = TestEnv::new().await;
    let uploads = env.dir.path().join("uploads");
    std::fs::create_dir_all(&uploads).unwrap();
    std::fs::write(uploads.join("notes.jpg"), b"definitely not an image").unwrap();
    env.seed_user("u1", PlanTier::BetaFree, 0, 0, Some(current_period())).await;
    env.seed_memory("m1", "u1", Some("/uploads/notes.jpg"), None).await;

    let err = env
        .pipeline()
        .relume("u1", "m1", ReluminationStyle::Style1)
        .await
        .unwrap_err();

    assert!(matches!(err, ReluminationError::RenderFailed(_)));
    assert!(env.encoder.calls().is_empty());
}
