use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::CliError;

pub const DEFAULT_PROXY_URL: &str = "http://localhost:8787";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_CATALOG: &str = "products.json";
pub const PROXY_URL_ENV: &str = "GLOWGUIDE_PROXY_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfig {
    pub proxy_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            model: default_model(),
            persona: None,
            catalog: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub profile: String,
    pub profiles: HashMap<String, ProfileConfig>,
}

impl Default for CliConfig {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert("default".to_string(), ProfileConfig::default());
        Self {
            profile: "default".to_string(),
            profiles,
        }
    }
}

pub fn config_path() -> Result<PathBuf, CliError> {
    let base = dirs::config_dir().ok_or_else(|| {
        CliError::Generic("Could not resolve config directory for this OS.".to_string())
    })?;
    Ok(base.join("glowguide").join("config.json"))
}

/// Directory holding the persisted selection, conversation and log file.
pub fn default_data_dir() -> Result<PathBuf, CliError> {
    let base = dirs::data_dir().ok_or_else(|| {
        CliError::Generic("Could not resolve data directory for this OS.".to_string())
    })?;
    Ok(base.join("glowguide"))
}

pub fn load_config(path: &Path) -> Result<CliConfig, CliError> {
    if !path.exists() {
        return Ok(CliConfig::default());
    }

    let text = fs::read_to_string(path)?;
    parse_config(&text)
}

fn parse_config(text: &str) -> Result<CliConfig, CliError> {
    let mut config: CliConfig = serde_json::from_str(text)?;
    let profile = config.profile.clone();
    ensure_profile(&mut config, &profile);
    Ok(config)
}

pub fn save_config(path: &Path, config: &CliConfig) -> Result<(), CliError> {
    let parent = path
        .parent()
        .ok_or_else(|| CliError::Generic("Invalid config path.".to_string()))?;
    fs::create_dir_all(parent)?;
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

pub fn active_profile_name(config: &CliConfig, profile_override: Option<&str>) -> String {
    profile_override
        .map(|s| s.to_string())
        .unwrap_or_else(|| config.profile.clone())
}

pub fn ensure_profile(config: &mut CliConfig, profile_name: &str) {
    if !config.profiles.contains_key(profile_name) {
        config
            .profiles
            .insert(profile_name.to_string(), ProfileConfig::default());
    }
}

pub fn profile_ref<'a>(config: &'a CliConfig, profile_name: &str) -> Option<&'a ProfileConfig> {
    config.profiles.get(profile_name)
}

pub fn profile_mut<'a>(
    config: &'a mut CliConfig,
    profile_name: &str,
) -> Option<&'a mut ProfileConfig> {
    config.profiles.get_mut(profile_name)
}

fn existing_profile<'a>(
    config: &'a CliConfig,
    profile_name: &str,
) -> Result<&'a ProfileConfig, CliError> {
    profile_ref(config, profile_name)
        .ok_or_else(|| CliError::Usage(format!("Profile '{profile_name}' does not exist.")))
}

/// Flag beats environment, environment beats the profile.
pub fn resolve_proxy_url(
    config: &CliConfig,
    profile_name: &str,
    url_override: Option<&str>,
) -> Result<String, CliError> {
    if let Some(url) = url_override {
        validate_url(url)?;
        return Ok(url.to_string());
    }

    if let Ok(env_url) = std::env::var(PROXY_URL_ENV) {
        let env_url = env_url.trim();
        if !env_url.is_empty() {
            validate_url(env_url)?;
            return Ok(env_url.to_string());
        }
    }

    let profile = existing_profile(config, profile_name)?;
    validate_url(&profile.proxy_url)?;
    Ok(profile.proxy_url.clone())
}

pub fn resolve_catalog(
    config: &CliConfig,
    profile_name: &str,
    catalog_override: Option<&str>,
) -> String {
    catalog_override
        .map(|s| s.to_string())
        .or_else(|| profile_ref(config, profile_name).and_then(|p| p.catalog.clone()))
        .unwrap_or_else(|| DEFAULT_CATALOG.to_string())
}

pub fn resolve_persona(
    config: &CliConfig,
    profile_name: &str,
    persona_override: Option<&str>,
) -> Option<String> {
    persona_override
        .map(|s| s.to_string())
        .or_else(|| profile_ref(config, profile_name).and_then(|p| p.persona.clone()))
}

pub fn resolve_model(config: &CliConfig, profile_name: &str) -> String {
    profile_ref(config, profile_name)
        .map(|p| p.model.clone())
        .unwrap_or_else(default_model)
}

pub fn validate_url(value: &str) -> Result<(), CliError> {
    let parsed = Url::parse(value)?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(CliError::Usage(
            "Proxy URL must use http:// or https://.".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fills_missing_active_profile() {
        let config = parse_config(r#"{"profile":"work","profiles":{}}"#).unwrap();
        assert_eq!(
            profile_ref(&config, "work"),
            Some(&ProfileConfig::default())
        );
    }

    #[test]
    fn profile_without_model_uses_default_model() {
        let config = parse_config(
            r#"{"profile":"default","profiles":{"default":{"proxyUrl":"https://proxy.example"}}}"#,
        )
        .unwrap();
        assert_eq!(resolve_model(&config, "default"), DEFAULT_MODEL);
    }

    #[test]
    fn override_beats_profile_catalog() {
        let mut config = CliConfig::default();
        profile_mut(&mut config, "default").unwrap().catalog = Some("remote.json".into());
        assert_eq!(resolve_catalog(&config, "default", None), "remote.json");
        assert_eq!(resolve_catalog(&config, "default", Some("x.json")), "x.json");
        assert_eq!(resolve_catalog(&config, "missing", None), DEFAULT_CATALOG);
    }

    #[test]
    fn proxy_override_must_be_http() {
        let config = CliConfig::default();
        assert!(resolve_proxy_url(&config, "default", Some("ftp://x")).is_err());
        assert_eq!(
            resolve_proxy_url(&config, "default", Some("https://p.example/chat")).unwrap(),
            "https://p.example/chat"
        );
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        assert_eq!(load_config(&path).unwrap().profile, "default");

        let mut config = CliConfig::default();
        ensure_profile(&mut config, "work");
        profile_mut(&mut config, "work").unwrap().persona = Some("luxe".into());
        config.profile = "work".into();
        save_config(&path, &config).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.profile, "work");
        assert_eq!(
            resolve_persona(&loaded, "work", None).as_deref(),
            Some("luxe")
        );
    }

    #[test]
    fn unknown_profile_is_usage_error() {
        let err = existing_profile(&CliConfig::default(), "nope").unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }
}
