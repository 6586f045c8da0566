use std::{fs, io, path::Path};

use anyhow::{anyhow, bail, Context};
use console_core::{
    http::{DEFAULT_ADMIN_API_URL, DEFAULT_RECHARGE_API_URL},
    ListConfig, StaleResponsePolicy, TimestampFormatter,
};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "console.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub admin_api_url: String,
    pub recharge_api_url: String,
    pub page_size: usize,
    pub window_size: usize,
    pub stale_policy: StaleResponsePolicy,
    pub utc_offset_minutes: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            admin_api_url: DEFAULT_ADMIN_API_URL.into(),
            recharge_api_url: DEFAULT_RECHARGE_API_URL.into(),
            page_size: 10,
            window_size: 10,
            stale_policy: StaleResponsePolicy::LastResolvedWins,
            utc_offset_minutes: 8 * 60,
        }
    }
}

impl Settings {
    pub fn list_config(&self) -> ListConfig {
        ListConfig {
            page_size: self.page_size,
            window_size: self.window_size,
            stale_policy: self.stale_policy,
        }
    }

    pub fn timestamps(&self) -> anyhow::Result<TimestampFormatter> {
        TimestampFormatter::from_offset_minutes(self.utc_offset_minutes).ok_or_else(|| {
            anyhow!(
                "utc offset of {} minutes is out of range",
                self.utc_offset_minutes
            )
        })
    }
}

/// Keys accepted in `console.toml`; all optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    admin_api_url: Option<String>,
    recharge_api_url: Option<String>,
    page_size: Option<usize>,
    window_size: Option<usize>,
    stale_policy: Option<String>,
    utc_offset_minutes: Option<i32>,
}

/// Defaults, then the config file, then environment overrides. A missing file
/// is only an error when the path was given explicitly.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let (path, explicit) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_PATH), false),
    };
    let raw = match fs::read_to_string(path) {
        Ok(raw) => Some(raw),
        Err(err) if err.kind() == io::ErrorKind::NotFound && !explicit => None,
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };
    settings_from(raw.as_deref(), |key| std::env::var(key).ok())
        .with_context(|| format!("invalid console settings (config file '{}')", path.display()))
}

fn settings_from(
    raw: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Some(raw) = raw {
        let file_cfg: FileSettings = toml::from_str(raw).context("malformed config file")?;
        if let Some(v) = file_cfg.admin_api_url {
            settings.admin_api_url = v;
        }
        if let Some(v) = file_cfg.recharge_api_url {
            settings.recharge_api_url = v;
        }
        if let Some(v) = file_cfg.page_size {
            settings.page_size = v;
        }
        if let Some(v) = file_cfg.window_size {
            settings.window_size = v;
        }
        if let Some(v) = file_cfg.stale_policy {
            settings.stale_policy = v.parse()?;
        }
        if let Some(v) = file_cfg.utc_offset_minutes {
            settings.utc_offset_minutes = v;
        }
    }

    if let Some(v) = env("ADMIN_API_URL") {
        settings.admin_api_url = v;
    }
    if let Some(v) = env("RECHARGE_API_URL") {
        settings.recharge_api_url = v;
    }
    if let Some(v) = env("APP__PAGE_SIZE") {
        settings.page_size = parse_env("APP__PAGE_SIZE", &v)?;
    }
    if let Some(v) = env("APP__WINDOW_SIZE") {
        settings.window_size = parse_env("APP__WINDOW_SIZE", &v)?;
    }
    if let Some(v) = env("APP__STALE_POLICY") {
        settings.stale_policy = v.parse()?;
    }
    if let Some(v) = env("APP__UTC_OFFSET_MINUTES") {
        settings.utc_offset_minutes = parse_env("APP__UTC_OFFSET_MINUTES", &v)?;
    }

    settings.page_size = settings.page_size.max(1);
    settings.window_size = settings.window_size.max(1);
    settings.admin_api_url = validate_api_url("admin_api_url", &settings.admin_api_url)?;
    settings.recharge_api_url = validate_api_url("recharge_api_url", &settings.recharge_api_url)?;
    settings.timestamps()?;

    Ok(settings)
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> anyhow::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("{key} must be a number, got '{value}'"))
}

fn validate_api_url(key: &str, raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    let url = Url::parse(raw).with_context(|| format!("{key} '{raw}' is not a valid url"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{key} must use http or https, got '{}'", url.scheme());
    }
    Ok(raw.trim_end_matches('/').to_string())
}
