use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::bots::BotId;
use crate::error::ExitError;

/// Config file name constants.
pub const CONFIG_TOML: &str = ".pitchdesk.toml";
pub const CONFIG_JSON: &str = ".pitchdesk.json";

/// Find the config file in `dir`, preferring .pitchdesk.toml over .pitchdesk.json.
/// Returns None if neither exists.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    let toml_path = dir.join(CONFIG_TOML);
    if toml_path.exists() {
        return Some(toml_path);
    }
    let json_path = dir.join(CONFIG_JSON);
    if json_path.exists() {
        return Some(json_path);
    }
    None
}

/// Per-user config path: `<config_dir>/pitchdesk/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pitchdesk").join("config.toml"))
}

/// Top-level pitchdesk config.
///
/// Every field has a default, so an empty file (or no file) is valid.
/// The API key itself is never stored here, only the name of the
/// environment variable that holds it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub consultation: ConsultationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ApiConfig {
    /// Base URL of the generative-language API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env", alias = "apiKeyEnv")]
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout", alias = "timeoutSecs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ApiConfig {
    /// Full `generateContent` URL for the configured model.
    pub fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RetryConfig {
    /// Attempts per question, counting the first one.
    #[serde(default = "default_max_attempts", alias = "maxAttempts")]
    pub max_attempts: u32,
    /// Backoff before retry n is `base_delay_ms * 2^n`.
    #[serde(default = "default_base_delay_ms", alias = "baseDelayMs")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConsultationConfig {
    /// Shortest accepted pitch, in characters after trimming.
    #[serde(default = "default_min_idea_chars", alias = "minIdeaChars")]
    pub min_idea_chars: usize,
    /// Bot selected when a session starts.
    #[serde(default, alias = "defaultBot")]
    pub default_bot: BotId,
}

impl Default for ConsultationConfig {
    fn default() -> Self {
        Self {
            min_idea_chars: default_min_idea_chars(),
            default_bot: BotId::default(),
        }
    }
}

// Default value functions for serde
fn default_endpoint() -> String { "https://generativelanguage.googleapis.com/v1beta".into() }
fn default_model() -> String { "gemini-2.5-flash-preview-09-2025".into() }
fn default_api_key_env() -> String { "GEMINI_API_KEY".into() }
fn default_timeout() -> u64 { 60 }
fn default_max_attempts() -> u32 { 5 }
fn default_base_delay_ms() -> u64 { 1000 }
fn default_min_idea_chars() -> usize { 20 }

impl Config {
    /// Load config from a file (TOML or JSON, auto-detected by extension).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "toml" => Self::parse_toml(&contents),
            "json" => Self::parse_json(&contents),
            _ => {
                // Try TOML first, then JSON
                Self::parse_toml(&contents).or_else(|_| Self::parse_json(&contents))
            }
        }
    }

    /// Resolve the effective config.
    ///
    /// Order: explicit path, project file in `cwd`, per-user file, defaults.
    /// An explicit path that does not exist is an error; the others are optional.
    pub fn resolve(
        explicit: Option<&Path>,
        cwd: &Path,
    ) -> anyhow::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(
                    ExitError::Config(format!("{} does not exist", path.display())).into(),
                );
            }
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        if let Some(path) = find_config(cwd) {
            return Ok((Self::load(&path)?, Some(path)));
        }

        if let Some(path) = user_config_path().filter(|p| p.exists()) {
            return Ok((Self::load(&path)?, Some(path)));
        }

        tracing::debug!("no config file found, using defaults");
        Ok((Self::default(), None))
    }

    /// Parse config from a TOML string.
    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            anyhow::Error::from(ExitError::Config(format!("invalid {CONFIG_TOML}: {e}")))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a JSON string.
    pub fn parse_json(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            anyhow::Error::from(ExitError::Config(format!("invalid {CONFIG_JSON}: {e}")))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(ExitError::Config("retry.max_attempts must be at least 1".into()).into());
        }
        if self.api.endpoint.trim().is_empty() || self.api.model.trim().is_empty() {
            return Err(ExitError::Config("api.endpoint and api.model must be set".into()).into());
        }
        Ok(())
    }

    /// Serialize config to a TOML string with helpful comments.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        let raw = toml::to_string_pretty(self)
            .context("serializing config to TOML")?;

        // Use toml_edit to add comments for each section
        let mut doc: toml_edit::DocumentMut = raw.parse()
            .context("parsing generated TOML for comment injection")?;

        doc.decor_mut().set_prefix("# pitchdesk configuration\n\n");

        fn set_table_comment(doc: &mut toml_edit::DocumentMut, key: &str, comment: &str) {
            if let Some(item) = doc.get_mut(key)
                && let Some(tbl) = item.as_table_mut()
            {
                tbl.decor_mut().set_prefix(comment);
            }
        }

        set_table_comment(
            &mut doc,
            "api",
            "# Generative-language endpoint. The key is read from the environment\n# variable named by api_key_env, never from this file.\n",
        );
        set_table_comment(
            &mut doc,
            "retry",
            "\n# Rate-limit (HTTP 429) retries: wait base_delay_ms * 2^attempt between tries\n",
        );
        set_table_comment(&mut doc, "consultation", "\n# Consultation defaults\n");

        Ok(doc.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_toml_config() {
        let toml_str = r#"
[api]
endpoint = "http://localhost:9999/v1/"
model = "gemini-test"
api_key_env = "TEST_KEY"
timeout_secs = 5

[retry]
max_attempts = 3
base_delay_ms = 10

[consultation]
min_idea_chars = 30
default_bot = "financial"
"#;
        let config = Config::parse_toml(toml_str).unwrap();
        assert_eq!(config.api.model, "gemini-test");
        assert_eq!(config.api.api_key_env, "TEST_KEY");
        assert_eq!(
            config.api.generate_url(),
            "http://localhost:9999/v1/models/gemini-test:generateContent"
        );
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay(), Duration::from_millis(10));
        assert_eq!(config.consultation.min_idea_chars, 30);
        assert_eq!(config.consultation.default_bot, BotId::Financial);
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.consultation.min_idea_chars, 20);
        assert_eq!(config.consultation.default_bot, BotId::Structure);
        assert_eq!(config.api.api_key_env, "GEMINI_API_KEY");
        assert!(
            config
                .api
                .generate_url()
                .starts_with("https://generativelanguage.googleapis.com/")
        );
    }

    #[test]
    fn parse_json_with_camel_case() {
        let json = r#"{"retry": {"maxAttempts": 2}, "consultation": {"defaultBot": "mvp"}}"#;
        let config = Config::parse_json(json).unwrap();
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.consultation.default_bot, BotId::Mvp);
    }

    #[test]
    fn parse_malformed_toml() {
        let err = Config::parse_toml("[api\nmodel = ").unwrap_err();
        let exit = err.downcast_ref::<ExitError>().unwrap();
        assert!(matches!(exit, ExitError::Config(_)));
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = Config::parse_toml("[retry]\nmax_attempts = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn unknown_bot_rejected() {
        assert!(Config::parse_toml("[consultation]\ndefault_bot = \"legal\"\n").is_err());
    }

    #[test]
    fn roundtrip_toml() {
        let mut config = Config::default();
        config.retry.max_attempts = 7;
        config.consultation.default_bot = BotId::Marketing;
        let rendered = config.to_toml().unwrap();
        assert!(rendered.starts_with("# pitchdesk configuration"));
        assert!(rendered.contains("# Rate-limit (HTTP 429) retries"));
        let parsed = Config::parse_toml(&rendered).unwrap();
        assert_eq!(parsed.retry.max_attempts, 7);
        assert_eq!(parsed.consultation.default_bot, BotId::Marketing);
    }

    #[test]
    fn find_config_prefers_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_TOML), "").unwrap();
        std::fs::write(dir.path().join(CONFIG_JSON), "{}").unwrap();
        assert_eq!(find_config(dir.path()), Some(dir.path().join(CONFIG_TOML)));
    }

    #[test]
    fn find_config_falls_back_to_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_JSON), "{}").unwrap();
        assert_eq!(find_config(dir.path()), Some(dir.path().join(CONFIG_JSON)));
    }

    #[test]
    fn resolve_explicit_missing_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::resolve(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExitError>(),
            Some(ExitError::Config(_))
        ));
    }

    #[test]
    fn resolve_project_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_TOML), "[retry]\nmax_attempts = 2\n").unwrap();
        let (config, path) = Config::resolve(None, dir.path()).unwrap();
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(path, Some(dir.path().join(CONFIG_TOML)));
    }
}
