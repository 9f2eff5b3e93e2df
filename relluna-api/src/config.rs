//! Configuration resolution for relluna-api
//!
//! Resolved once at startup into an immutable [`ServiceConfig`] with priority
//! CLI → ENV → TOML → built-in default. Each component receives its own
//! section (`QuotaConfig`, `AssetConfig`, `RenderConfig`) by value, so tests
//! construct them directly with overridden limits.

use clap::Parser;
use relluna_common::config::{
    default_config_path, load_toml_or_default, RootFolderInitializer, RootFolderResolver,
    TomlConfig,
};
use relluna_common::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Service name used for the TOML file and log prefixes
pub const SERVICE_NAME: &str = "relluna-api";

/// Free reluminations per calendar month on the `beta_free` plan
pub const DEFAULT_MONTHLY_LIMIT: i64 = 10;

/// Bounded wait for a remote asset fetch
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;

/// Command-line arguments (each falls back to an environment variable)
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "relluna-api", version, about = "Relluna relumination service")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, env = "RELLUNA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(long, env = "RELLUNA_ROOT_FOLDER")]
    pub root_folder: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(long, env = "RELLUNA_BIND")]
    pub bind: Option<String>,

    /// Base URL prefixed to generated video URLs
    #[arg(long, env = "RELLUNA_PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,

    /// Free reluminations per month for the beta_free plan
    #[arg(long, env = "RELLUNA_MONTHLY_LIMIT")]
    pub monthly_limit: Option<i64>,

    /// TrueType font used for captions
    #[arg(long, env = "RELLUNA_FONT_PATH")]
    pub font_path: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long, env = "RELLUNA_FFMPEG")]
    pub ffmpeg: Option<String>,
}

// ============================================================================
// TOML schema
// ============================================================================

/// Full TOML file: shared bootstrap keys plus service sections
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiTomlConfig {
    #[serde(flatten)]
    pub bootstrap: TomlConfig,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub quota: QuotaSection,
    #[serde(default)]
    pub assets: AssetSection,
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub cors: CorsSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    pub bind_address: Option<String>,
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotaSection {
    pub monthly_limit: Option<i64>,
    pub max_cas_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetSection {
    pub local_root: Option<PathBuf>,
    pub loopback_hosts: Option<Vec<String>>,
    pub fetch_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderSection {
    pub output_dir: Option<PathBuf>,
    pub public_path: Option<String>,
    pub font_path: Option<PathBuf>,
    pub font_size: Option<f32>,
    pub ffmpeg_binary: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsSection {
    pub allowed_origins: Option<Vec<String>>,
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// Quota Ledger settings
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub monthly_limit: i64,
    /// Compare-and-swap attempts before giving up under contention
    pub max_cas_attempts: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            monthly_limit: DEFAULT_MONTHLY_LIMIT,
            max_cas_attempts: 8,
        }
    }
}

/// Asset Resolver settings
#[derive(Debug, Clone)]
pub struct AssetConfig {
    /// Directory bare paths and loopback URLs are resolved against
    pub local_root: PathBuf,
    /// `host:port` authorities treated as this server
    pub loopback_hosts: Vec<String>,
    pub fetch_timeout: Duration,
    /// Where resolved `.jpg` copies are written
    pub output_dir: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            local_root: PathBuf::from("."),
            loopback_hosts: vec!["localhost:8000".to_string(), "127.0.0.1:8000".to_string()],
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            output_dir: default_output_dir(),
        }
    }
}

/// Fixed output format of a relumination video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoParams {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration_secs: u32,
}

impl VideoParams {
    pub fn frame_count(&self) -> u32 {
        self.fps * self.duration_secs
    }
}

impl Default for VideoParams {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 24,
            duration_secs: 10,
        }
    }
}

/// Renderer settings
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub output_dir: PathBuf,
    /// URL path the output directory is served under
    pub public_path: String,
    pub font_path: PathBuf,
    pub font_size: f32,
    pub ffmpeg_binary: String,
    pub video: VideoParams,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            public_path: "media/reluminations".to_string(),
            font_path: PathBuf::from("arial.ttf"),
            font_size: 50.0,
            ffmpeg_binary: "ffmpeg".to_string(),
            video: VideoParams::default(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("media").join("reluminations")
}

fn default_cors_origins() -> Vec<String> {
    [
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "https://relluna.me",
        "https://www.relluna.me",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Complete, immutable service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub public_base_url: String,
    pub database_path: PathBuf,
    pub log_level: String,
    pub cors_origins: Vec<String>,
    pub quota: QuotaConfig,
    pub assets: AssetConfig,
    pub render: RenderConfig,
}

impl ServiceConfig {
    /// Defaults rooted at `root_folder`, used by tests and as the base of `resolve`
    pub fn with_root(root_folder: PathBuf) -> Self {
        let initializer = RootFolderInitializer::new(root_folder.clone());
        Self {
            root_folder,
            bind_address: "127.0.0.1:8000".to_string(),
            public_base_url: "http://localhost:8000".to_string(),
            database_path: initializer.database_path(),
            log_level: "info".to_string(),
            cors_origins: default_cors_origins(),
            quota: QuotaConfig::default(),
            assets: AssetConfig::default(),
            render: RenderConfig::default(),
        }
    }

    /// Resolve from CLI/ENV arguments and the TOML file they point to
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let toml_path = cli.config.clone().or_else(|| default_config_path(SERVICE_NAME));
        let toml: ApiTomlConfig = load_toml_or_default(toml_path.as_deref());
        Self::from_sources(cli, toml)
    }

    /// Merge already-loaded sources (CLI wins over TOML wins over defaults)
    pub fn from_sources(cli: &Cli, toml: ApiTomlConfig) -> Result<Self> {
        let root_folder = RootFolderResolver::new(SERVICE_NAME)
            .with_cli_arg(cli.root_folder.clone())
            .with_toml(&toml.bootstrap)
            .resolve();
        let initializer = RootFolderInitializer::new(root_folder.clone())
            .with_database_file(toml.bootstrap.database_file.clone());

        let mut config = Self::with_root(root_folder);
        config.database_path = initializer.database_path();
        config.log_level = toml.bootstrap.logging.level.clone();

        if let Some(bind) = cli.bind.clone().or(toml.server.bind_address) {
            config.bind_address = bind;
        }
        if let Some(url) = cli.public_base_url.clone().or(toml.server.public_base_url) {
            config.public_base_url = url;
        }
        if let Some(origins) = toml.cors.allowed_origins {
            config.cors_origins = origins;
        }

        // Quota
        if let Some(limit) = cli.monthly_limit.or(toml.quota.monthly_limit) {
            if limit < 0 {
                return Err(Error::Config(format!("monthly_limit must be >= 0, got {}", limit)));
            }
            config.quota.monthly_limit = limit;
        }
        if let Some(attempts) = toml.quota.max_cas_attempts {
            config.quota.max_cas_attempts = attempts.max(1);
        }

        // Assets
        if let Some(root) = toml.assets.local_root {
            config.assets.local_root = root;
        }
        if let Some(hosts) = toml.assets.loopback_hosts {
            config.assets.loopback_hosts = hosts;
        }
        if let Some(secs) = toml.assets.fetch_timeout_secs {
            config.assets.fetch_timeout = Duration::from_secs(secs);
        }

        // Render
        let render = toml.render;
        if let Some(dir) = render.output_dir {
            config.render.output_dir = dir;
        }
        if let Some(path) = render.public_path {
            config.render.public_path = path;
        }
        if let Some(font) = cli.font_path.clone().or(render.font_path) {
            config.render.font_path = font;
        }
        if let Some(size) = render.font_size {
            config.render.font_size = size;
        }
        if let Some(binary) = cli.ffmpeg.clone().or(render.ffmpeg_binary) {
            config.render.ffmpeg_binary = binary;
        }
        let video = &mut config.render.video;
        video.width = render.width.unwrap_or(video.width);
        video.height = render.height.unwrap_or(video.height);
        video.fps = render.fps.unwrap_or(video.fps);
        video.duration_secs = render.duration_secs.unwrap_or(video.duration_secs);
        if video.width == 0 || video.height == 0 || video.fps == 0 || video.duration_secs == 0 {
            return Err(Error::Config(format!("Invalid video parameters: {:?}", video)));
        }

        // Resolved copies land next to the rendered videos
        config.assets.output_dir = config.render.output_dir.clone();

        Ok(config)
    }
}
