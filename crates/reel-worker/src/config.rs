//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reel_media::{DEFAULT_FADE_WINDOW, DEFAULT_FRAME_RATE};

/// Montage worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Frame rate that region boundaries are snapped to
    pub frame_rate: f64,
    /// Length of the closing fade in seconds
    pub fade_window: f64,
    /// How long a finished run (and its files) is kept
    pub run_retention: Duration,
    /// How long an analysis response is reused for the same source
    pub analysis_cache_ttl: Duration,
    /// Maximum runs rendering at the same time
    pub max_concurrent_runs: usize,
    /// Render timeout
    pub render_timeout: Duration,
    /// Root of the `videos/` and `music/` libraries
    pub assets_dir: PathBuf,
    /// Directory rendered montages are written to
    pub output_dir: PathBuf,
    /// Bucket holding the source renditions the analysis service reads
    pub source_bucket: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            fade_window: DEFAULT_FADE_WINDOW,
            run_retention: Duration::from_secs(600), // 10 minutes
            analysis_cache_ttl: Duration::from_secs(3600), // 1 hour
            max_concurrent_runs: 2,
            render_timeout: Duration::from_secs(1800),
            assets_dir: PathBuf::from("assets"),
            output_dir: PathBuf::from("downloads"),
            source_bucket: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            frame_rate: env_or("MONTAGE_FRAME_RATE", defaults.frame_rate),
            fade_window: env_or("MONTAGE_FADE_SECS", defaults.fade_window),
            run_retention: Duration::from_secs(env_or("MONTAGE_RETENTION_SECS", 600)),
            analysis_cache_ttl: Duration::from_secs(env_or("ANALYSIS_CACHE_TTL_SECS", 3600)),
            max_concurrent_runs: env_or("WORKER_MAX_RUNS", defaults.max_concurrent_runs),
            render_timeout: Duration::from_secs(env_or("WORKER_RENDER_TIMEOUT", 1800)),
            assets_dir: std::env::var("MONTAGE_ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.assets_dir),
            output_dir: std::env::var("MONTAGE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            source_bucket: std::env::var("MONTAGE_SOURCE_BUCKET")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }
}

/// Gemini analysis client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    /// Models tried in order until one answers
    pub models: Vec<String>,
    pub base_url: String,
    /// File holding the system instruction; a built-in prompt is used when absent
    pub system_prompt_file: PathBuf,
    pub request_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            models: vec!["gemini-2.5-flash".to_string(), "gemini-2.0-flash".to_string()],
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            system_prompt_file: PathBuf::from("assets/system-prompt.txt"),
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY").ok().filter(|s| !s.is_empty()),
            models: std::env::var("GEMINI_MODELS")
                .ok()
                .map(|s| parse_model_list(&s))
                .filter(|models| !models.is_empty())
                .unwrap_or(defaults.models),
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            system_prompt_file: std::env::var("MONTAGE_SYSTEM_PROMPT")
                .map(PathBuf::from)
                .unwrap_or(defaults.system_prompt_file),
            request_timeout: Duration::from_secs(env_or("GEMINI_TIMEOUT_SECS", 300)),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
