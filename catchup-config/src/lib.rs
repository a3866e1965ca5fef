use std::{
    env, fs,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 100;
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatchupConfig {
    pub youtrack_url: Option<String>,
    pub youtrack_token: Option<String>,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub insecure: bool,
    pub user_context: Option<String>,
    pub llm: LlmConfig,
}

#[derive(Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    general: RawGeneral,
    #[serde(default)]
    llm: RawLlm,
    youtrack_url: Option<String>,
    youtrack_token: Option<String>,
    default_page_size: Option<usize>,
    max_page_size: Option<usize>,
    insecure: Option<bool>,
    user_context: Option<String>,
}

#[derive(Default, Deserialize)]
struct RawGeneral {
    youtrack_url: Option<String>,
    youtrack_token: Option<String>,
    default_page_size: Option<usize>,
    max_page_size: Option<usize>,
    insecure: Option<bool>,
    user_context: Option<String>,
}

#[derive(Default, Deserialize)]
struct RawLlm {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
}

impl Default for CatchupConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig::default())
    }
}

impl CatchupConfig {
    pub fn load_default() -> Result<Self> {
        let path = default_config_path();
        let base = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            Self::default()
        };
        dotenv::dotenv().ok();
        Ok(base.with_env_overrides(|key| env::var(key).ok()))
    }

    pub fn load_with_file(path: &Path) -> Result<Self> {
        let base = Self::load_from_path(path)?;
        dotenv::dotenv().ok();
        Ok(base.with_env_overrides(|key| env::var(key).ok()))
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let payload = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let raw: RawConfig =
            serde_yaml::from_str(&payload).with_context(|| "invalid YAML config format")?;
        Ok(Self::from_raw(raw))
    }

    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("YOUTRACK_URL").and_then(normalize_server_url) {
            self.youtrack_url = Some(url);
        }
        if let Some(token) = lookup("YOUTRACK_TOKEN").and_then(resolve_secret) {
            self.youtrack_token = Some(token);
        }
        if let Some(api_key) = lookup("OPENAI_API_KEY").and_then(resolve_secret) {
            self.llm.api_key = Some(api_key);
        }
        if let Some(model) = lookup("OPENAI_MODEL").and_then(non_empty) {
            self.llm.model = model;
        }
        self
    }

    pub fn require_url(&self) -> Result<&str> {
        self.youtrack_url
            .as_deref()
            .ok_or_else(|| missing_setting("YOUTRACK_URL"))
    }

    pub fn require_token(&self) -> Result<&str> {
        self.youtrack_token
            .as_deref()
            .ok_or_else(|| missing_setting("YOUTRACK_TOKEN"))
    }

    pub fn api_base_url(&self) -> Result<String> {
        Ok(format!("{}/api", self.require_url()?))
    }

    pub fn issue_url(&self, id: &str) -> Result<String> {
        Ok(format!("{}/issue/{id}", self.require_url()?))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let youtrack_url = first_some(raw.general.youtrack_url, raw.youtrack_url)
            .and_then(normalize_server_url);
        let youtrack_token =
            first_some(raw.general.youtrack_token, raw.youtrack_token).and_then(resolve_secret);
        let max_page_size = first_some(raw.general.max_page_size, raw.max_page_size)
            .filter(|size| *size > 0)
            .unwrap_or(MAX_PAGE_SIZE);
        let default_page_size = first_some(raw.general.default_page_size, raw.default_page_size)
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(max_page_size);
        let insecure = raw.general.insecure.or(raw.insecure).unwrap_or(false);
        let user_context =
            first_some(raw.general.user_context, raw.user_context).and_then(non_empty);

        let llm = LlmConfig {
            api_key: raw.llm.api_key.and_then(resolve_secret),
            model: raw
                .llm
                .model
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            base_url: raw
                .llm
                .base_url
                .and_then(non_empty)
                .map(|url| url.trim_end_matches('/').to_string()),
        };

        Self {
            youtrack_url,
            youtrack_token,
            default_page_size,
            max_page_size,
            insecure,
            user_context,
            llm,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(override_path) = env::var_os("CATCHUP_CONFIG_FILE") {
        return PathBuf::from(override_path);
    }

    let mut base = env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    base.push(".config");
    base.push("youtrack-catchup");
    base.push("config.yaml");
    base
}

fn missing_setting(key: &str) -> anyhow::Error {
    anyhow!(
        "Required environment variable {key} is not set. \
         Please check your .env file or environment configuration."
    )
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

fn normalize_server_url(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Some(trimmed.trim_end_matches('/').to_string())
    } else {
        Some(format!("https://{}", trimmed.trim_end_matches('/')))
    }
}

fn first_some<T>(first: Option<T>, second: Option<T>) -> Option<T> {
    first.or(second)
}

fn resolve_secret(value: String) -> Option<String> {
    resolve_secret_with(value, fetch_secret_from_manager)
}

fn resolve_secret_with<F>(value: String, fetch: F) -> Option<String>
where
    F: Fn(&str, &str) -> Option<String>,
{
    let secret = non_empty(value)?;
    let Some((provider, key)) = parse_secret_reference(secret.as_str()) else {
        return Some(secret);
    };
    fetch(provider, key)
}

fn parse_secret_reference(value: &str) -> Option<(&str, &str)> {
    let (provider, key) = value.split_once("::")?;
    if key.trim().is_empty() {
        return None;
    }
    if provider == "pass" || provider == "passage" {
        Some((provider, key.trim()))
    } else {
        None
    }
}

fn fetch_secret_from_manager(provider: &str, key: &str) -> Option<String> {
    let output = Command::new(provider).arg("show").arg(key).output().ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    non_empty(stdout.trim().to_string())
}
