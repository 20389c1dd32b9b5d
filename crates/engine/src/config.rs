//! TOML configuration with environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use runsight_cache::TtlPolicy;
use runsight_composer::ComposerConfig;
use runsight_interpreter::InterpreterConfig;
use runsight_llm::OpenAiConfig;
use runsight_session::SessionConfig;
use runsight_upstream::ReportApiConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration. Every section and field is optional; missing
/// values fall back to the adapter defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunsightConfig {
    pub upstream: UpstreamSection,
    pub model: ModelSection,
    pub cache: CacheSection,
    pub session: SessionSection,
    pub interpreter: InterpreterSection,
    pub composer: ComposerSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamSection {
    pub base_url: String,
    pub project: String,
    pub auth_token: String,
    pub timeout_secs: u64,
    pub page_size: u32,
    pub max_launches: usize,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        let d = ReportApiConfig::default();
        Self {
            base_url: d.base_url,
            project: d.default_project,
            auth_token: d.auth_token,
            timeout_secs: d.timeout.as_secs(),
            page_size: d.page_size,
            max_launches: d.max_launches,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSection {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ModelSection {
    fn default() -> Self {
        let d = OpenAiConfig::default();
        Self {
            base_url: d.base_url,
            api_key: d.api_key,
            model: d.model,
            temperature: d.temperature,
            max_tokens: d.max_tokens,
            timeout_secs: d.timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    pub flaky_ttl_secs: u64,
    pub raw_count_ttl_secs: u64,
    pub default_ttl_secs: u64,
    /// In-memory entry bound; ignored when `directory` selects disk storage.
    pub capacity: usize,
    pub directory: Option<PathBuf>,
}

impl Default for CacheSection {
    fn default() -> Self {
        let d = TtlPolicy::default();
        Self {
            flaky_ttl_secs: d.flaky_detection.as_secs(),
            raw_count_ttl_secs: d.raw_count.as_secs(),
            default_ttl_secs: d.default.as_secs(),
            capacity: 256,
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
    pub directory: Option<PathBuf>,
    pub idle_timeout_secs: u64,
    pub max_history: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        let d = SessionConfig::default();
        Self {
            directory: None,
            idle_timeout_secs: d.idle_timeout.as_secs(),
            max_history: d.max_history,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterpreterSection {
    pub confidence_threshold: f32,
    pub default_days_back: i64,
}

impl Default for InterpreterSection {
    fn default() -> Self {
        let d = InterpreterConfig::default();
        Self {
            confidence_threshold: d.confidence_threshold,
            default_days_back: d.default_days_back,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComposerSection {
    pub narration_budget_chars: usize,
}

impl Default for ComposerSection {
    fn default() -> Self {
        Self {
            narration_budget_chars: ComposerConfig::default().narration_budget_chars,
        }
    }
}

impl RunsightConfig {
    /// Read a config file and apply `RUNSIGHT_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&text)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides, no file involved.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Secrets and deployment-specific endpoints usually come from the
    /// environment rather than the checked-in file; these run last and win.
    pub fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 6] = [
            ("RUNSIGHT_UPSTREAM_URL", &mut self.upstream.base_url),
            ("RUNSIGHT_UPSTREAM_PROJECT", &mut self.upstream.project),
            ("RUNSIGHT_UPSTREAM_TOKEN", &mut self.upstream.auth_token),
            ("RUNSIGHT_MODEL_URL", &mut self.model.base_url),
            ("RUNSIGHT_MODEL_NAME", &mut self.model.model),
            ("RUNSIGHT_MODEL_KEY", &mut self.model.api_key),
        ];
        for (var, slot) in overrides {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    *slot = value;
                }
            }
        }
        if let Ok(dir) = std::env::var("RUNSIGHT_CACHE_DIR") {
            if !dir.is_empty() {
                self.cache.directory = Some(PathBuf::from(dir));
            }
        }
        if let Ok(dir) = std::env::var("RUNSIGHT_SESSION_DIR") {
            if !dir.is_empty() {
                self.session.directory = Some(PathBuf::from(dir));
            }
        }
    }

    pub fn upstream_config(&self) -> ReportApiConfig {
        ReportApiConfig {
            base_url: self.upstream.base_url.clone(),
            default_project: self.upstream.project.clone(),
            auth_token: self.upstream.auth_token.clone(),
            timeout: Duration::from_secs(self.upstream.timeout_secs),
            page_size: self.upstream.page_size,
            max_launches: self.upstream.max_launches,
            ..Default::default()
        }
    }

    pub fn model_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            base_url: self.model.base_url.clone(),
            api_key: self.model.api_key.clone(),
            model: self.model.model.clone(),
            temperature: self.model.temperature,
            max_tokens: self.model.max_tokens,
            timeout: Duration::from_secs(self.model.timeout_secs),
        }
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            flaky_detection: Duration::from_secs(self.cache.flaky_ttl_secs),
            raw_count: Duration::from_secs(self.cache.raw_count_ttl_secs),
            default: Duration::from_secs(self.cache.default_ttl_secs),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            idle_timeout: Duration::from_secs(self.session.idle_timeout_secs),
            max_history: self.session.max_history,
            persist_dir: self.session.directory.clone(),
        }
    }

    pub fn interpreter_config(&self) -> InterpreterConfig {
        InterpreterConfig {
            confidence_threshold: self.interpreter.confidence_threshold,
            default_days_back: self.interpreter.default_days_back,
        }
    }

    pub fn composer_config(&self) -> ComposerConfig {
        ComposerConfig {
            narration_budget_chars: self.composer.narration_budget_chars,
            ..Default::default()
        }
    }
}
