//! Shared fixtures for relluna-api integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use image::{Rgb, RgbImage};
use relluna_api::config::{ServiceConfig, VideoParams};
use relluna_api::db::{memories, users};
use relluna_api::services::renderer::frames::FrameSequence;
use relluna_api::services::renderer::{EncodeMetadata, RenderError, VideoEncoder};
use relluna_api::services::ReluminationPipeline;
use relluna_api::{build_router, AppState};
use relluna_common::db::{MemoryRecord, PlanTier, QuotaState};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// What the encoder was asked to produce
#[derive(Debug, Clone)]
pub struct EncodeCall {
    pub output: PathBuf,
    pub title: String,
    pub frame_count: u32,
    pub frame_size: (u32, u32),
}

/// Encoder double: composes the first and last frames, writes a stub file
#[derive(Default)]
pub struct RecordingEncoder {
    pub calls: Mutex<Vec<EncodeCall>>,
    pub fail: AtomicBool,
}

impl RecordingEncoder {
    pub fn failing() -> Self {
        let encoder = Self::default();
        encoder.fail.store(true, Ordering::SeqCst);
        encoder
    }

    pub fn calls(&self) -> Vec<EncodeCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl VideoEncoder for RecordingEncoder {
    fn encode(
        &self,
        frames: FrameSequence<'_>,
        output: &Path,
        metadata: &EncodeMetadata,
    ) -> Result<(), RenderError> {
        if self.fail.load(Ordering::SeqCst) {
            std::fs::write(output, b"partial")?;
            return Err(RenderError::Encode("simulated encoder failure".to_string()));
        }

        let frame_count = frames.frame_count();
        let first = frames.render_frame(0);
        let _last = frames.render_frame(frame_count.saturating_sub(1));
        std::fs::write(output, b"fake mp4")?;

        self.calls.lock().unwrap().push(EncodeCall {
            output: output.to_path_buf(),
            title: metadata.title.clone(),
            frame_count,
            frame_size: first.dimensions(),
        });
        Ok(())
    }
}

/// Temp root with database, uploads and output directory
pub struct TestEnv {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub config: ServiceConfig,
    pub encoder: Arc<RecordingEncoder>,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_encoder(RecordingEncoder::default()).await
    }

    pub async fn with_encoder(encoder: RecordingEncoder) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().to_path_buf();

        let mut config = ServiceConfig::with_root(root.clone());
        let output_dir = root.join("media").join("reluminations");
        config.assets.local_root = root.clone();
        config.assets.output_dir = output_dir.clone();
        config.assets.fetch_timeout = Duration::from_secs(2);
        config.render.output_dir = output_dir;
        config.render.font_path = root.join("missing-font.ttf");
        config.render.video = VideoParams {
            width: 270,
            height: 480,
            fps: 2,
            duration_secs: 2,
        };

        let pool = relluna_api::db::init_database_pool(&config.database_path)
            .await
            .expect("Failed to open test database");

        Self {
            dir,
            pool,
            config,
            encoder: Arc::new(encoder),
        }
    }

    pub fn pipeline(&self) -> ReluminationPipeline {
        let encoder: Arc<dyn VideoEncoder> = self.encoder.clone();
        ReluminationPipeline::from_config(self.pool.clone(), &self.config, encoder)
            .expect("Failed to build pipeline")
    }

    pub fn app(&self) -> Router {
        let state = AppState::new(self.pool.clone(), self.pipeline(), self.config.clone());
        build_router(state)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.config.render.output_dir.clone()
    }

    /// Write a JPEG under `<root>/uploads/` and return its `/uploads/...` reference
    pub fn write_upload(&self, name: &str) -> String {
        let uploads = self.dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        write_test_jpeg(&uploads.join(name), 320, 240);
        format!("/uploads/{}", name)
    }

    pub async fn seed_user(
        &self,
        user_id: &str,
        plan_tier: PlanTier,
        credits: i64,
        used: i64,
        month_ref: Option<String>,
    ) {
        let quota = QuotaState {
            plan_tier,
            relumination_credits: credits,
            relumination_used_this_month: used,
            relumination_month_ref: month_ref,
        };
        users::insert_user(&self.pool, user_id, user_id, &format!("{}@example.com", user_id), &quota)
            .await
            .expect("Failed to seed user");
    }

    pub async fn seed_memory(
        &self,
        memory_id: &str,
        owner: &str,
        media_url: Option<&str>,
        short_description: Option<&str>,
    ) {
        let memory = MemoryRecord {
            guid: memory_id.to_string(),
            user_id: owner.to_string(),
            main_caption: "Férias em família".to_string(),
            media_url: media_url.map(str::to_string),
            alt_text: None,
            short_description: short_description.map(str::to_string),
            long_description: None,
            relumination_url: None,
            relumination_style: None,
        };
        memories::insert_memory(&self.pool, &memory)
            .await
            .expect("Failed to seed memory");
    }

    pub async fn quota(&self, user_id: &str) -> QuotaState {
        users::load_user(&self.pool, user_id)
            .await
            .unwrap()
            .expect("user exists")
            .quota_state()
    }

    pub async fn memory(&self, memory_id: &str) -> MemoryRecord {
        sqlx::query_as::<_, MemoryRecord>(
            r#"
            SELECT guid, user_id, main_caption, media_url, alt_text,
                   short_description, long_description,
                   relumination_url, relumination_style
            FROM memories WHERE guid = ?
            "#,
        )
        .bind(memory_id)
        .fetch_one(&self.pool)
        .await
        .expect("memory exists")
    }

    /// Files in the output directory with the given suffix
    pub fn output_files(&self, suffix: &str) -> Vec<PathBuf> {
        match std::fs::read_dir(self.output_dir()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.to_string_lossy().ends_with(suffix))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    image.save(path).expect("Failed to write test JPEG");
}

pub fn jpeg_bytes() -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixture.jpg");
    write_test_jpeg(&path, 64, 48);
    std::fs::read(path).unwrap()
}

pub fn current_period() -> String {
    relluna_common::time::period_ref(relluna_common::time::now())
}

/// `<32 hex><suffix>` file name check
pub fn is_token_name(path: &Path, suffix: &str) -> bool {
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    match name.strip_suffix(suffix) {
        Some(token) => token.len() == 32 && token.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
