//! Relumination pipeline
//!
//! One request, start to finish: load the memory, check the gate, spend
//! quota, fetch the image, render, and store the result on the memory.
//! Steps run in order and the first failure ends the request.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{error, info};

use super::asset_resolver::AssetResolver;
use super::authorization_gate;
use super::quota_ledger::{QuotaLedger, SqliteQuotaStore};
use super::renderer::{ReluminationStyle, Renderer, VideoEncoder};
use crate::config::ServiceConfig;
use crate::db::{memories, users};
use crate::error::ReluminationError;

/// Result of a successful relumination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReluminationOutcome {
    pub url: String,
    pub style: ReluminationStyle,
    /// Video file on local disk
    pub path: PathBuf,
}

pub struct ReluminationPipeline {
    db: SqlitePool,
    ledger: QuotaLedger,
    resolver: AssetResolver,
    renderer: Arc<Renderer>,
    public_base_url: String,
}

impl ReluminationPipeline {
    pub fn new(
        db: SqlitePool,
        ledger: QuotaLedger,
        resolver: AssetResolver,
        renderer: Arc<Renderer>,
        public_base_url: String,
    ) -> Self {
        Self {
            db,
            ledger,
            resolver,
            renderer,
            public_base_url,
        }
    }

    /// Wire every collaborator from one configuration
    pub fn from_config(
        db: SqlitePool,
        config: &ServiceConfig,
        encoder: Arc<dyn VideoEncoder>,
    ) -> Result<Self, ReluminationError> {
        let ledger = QuotaLedger::new(
            Arc::new(SqliteQuotaStore::new(db.clone())),
            config.quota.clone(),
        );
        let resolver = AssetResolver::new(config.assets.clone())?;
        let renderer = Arc::new(Renderer::new(config.render.clone(), encoder));

        Ok(Self::new(
            db,
            ledger,
            resolver,
            renderer,
            config.public_base_url.clone(),
        ))
    }

    pub fn ledger(&self) -> &QuotaLedger {
        &self.ledger
    }

    pub async fn relume(
        &self,
        user_id: &str,
        memory_id: &str,
        style: ReluminationStyle,
    ) -> Result<ReluminationOutcome, ReluminationError> {
        self.relume_at(user_id, memory_id, style, relluna_common::time::now())
            .await
    }

    /// [`relume`](Self::relume) with an explicit clock for the quota period
    pub async fn relume_at(
        &self,
        user_id: &str,
        memory_id: &str,
        style: ReluminationStyle,
        now: DateTime<Utc>,
    ) -> Result<ReluminationOutcome, ReluminationError> {
        let memory = memories::load_memory_for_user(&self.db, memory_id, user_id)
            .await?
            .ok_or_else(|| ReluminationError::MemoryNotFound(memory_id.to_string()))?;

        let media_reference = memory
            .media_reference()
            .ok_or(ReluminationError::MissingMedia)?
            .to_string();

        let user = users::load_user(&self.db, user_id)
            .await?
            .ok_or_else(|| ReluminationError::UserNotFound(user_id.to_string()))?;

        authorization_gate::authorize(&user.quota_state(), &memory)?;

        let consumption = self.ledger.check_and_consume(user_id, now).await?;

        let local_image = self.resolver.resolve_to_local(&media_reference).await?;

        let narrative = memory.narrative().unwrap_or_default().to_string();
        let title = memory.main_caption.clone();

        let renderer = Arc::clone(&self.renderer);
        let image_path = local_image.clone();
        let rendered = tokio::task::spawn_blocking(move || {
            renderer.render(&image_path, &narrative, &title, style)
        })
        .await
        .map_err(|e| ReluminationError::RenderFailed(format!("render task failed: {}", e)))?;

        let video_path = match rendered {
            Ok(path) => path,
            Err(e) => {
                // Quota stays spent
                error!(
                    user_id,
                    memory_id,
                    kind = ?consumption.kind,
                    image = %local_image.display(),
                    error = %e,
                    "Relumination render failed after quota was consumed"
                );
                return Err(e.into());
            }
        };

        let url = self.public_url(&video_path);
        memories::set_relumination(&self.db, memory_id, &url, style.id()).await?;

        info!(
            user_id,
            memory_id,
            kind = ?consumption.kind,
            url = %url,
            "Memory relumed"
        );

        Ok(ReluminationOutcome {
            url,
            style,
            path: video_path,
        })
    }

    /// `<public_base_url>/<public_path>/<file name>`
    pub fn public_url(&self, video_path: &Path) -> String {
        let file_name = video_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            self.renderer.config().public_path.trim_matches('/'),
            file_name
        )
    }
}
