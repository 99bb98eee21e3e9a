use clap::{Subcommand, ValueEnum};
use serde_json::json;

use crate::app::Runtime;
use crate::config::{ensure_profile, profile_mut, profile_ref, save_config, validate_url};
use crate::errors::CliError;
use crate::persona::Persona;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Initialize config file and profile
    Init {
        /// Chat proxy endpoint
        #[arg(long = "url")]
        url: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Read a config key from the active profile
    Get { key: ConfigKey },
    /// Set a config key on the active profile
    Set { key: ConfigKey, value: String },
    /// List all profiles
    Profiles,
    /// Switch active profile
    Use { profile: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigKey {
    #[value(name = "proxyUrl")]
    ProxyUrl,
    #[value(name = "model")]
    Model,
    #[value(name = "persona")]
    Persona,
    #[value(name = "catalog")]
    Catalog,
}

impl ConfigKey {
    fn name(self) -> &'static str {
        match self {
            ConfigKey::ProxyUrl => "proxyUrl",
            ConfigKey::Model => "model",
            ConfigKey::Persona => "persona",
            ConfigKey::Catalog => "catalog",
        }
    }
}

pub async fn handle(runtime: &mut Runtime, command: ConfigCommand) -> Result<(), CliError> {
    match command {
        ConfigCommand::Init { url, model } => init(runtime, url, model),
        ConfigCommand::Get { key } => get(runtime, key),
        ConfigCommand::Set { key, value } => set(runtime, key, value),
        ConfigCommand::Profiles => profiles(runtime),
        ConfigCommand::Use { profile } => use_profile(runtime, profile),
    }
}

fn init(runtime: &mut Runtime, url: Option<String>, model: Option<String>) -> Result<(), CliError> {
    let profile_name = runtime.active_profile();
    ensure_profile(&mut runtime.config, &profile_name);
    if let Some(profile) = profile_mut(&mut runtime.config, &profile_name) {
        if let Some(url) = url.or_else(|| runtime.proxy_url_override.clone()) {
            validate_url(&url)?;
            profile.proxy_url = url;
        }
        if let Some(model) = model {
            profile.model = model;
        }
        if let Some(persona) = runtime.persona_override.as_deref() {
            profile.persona = Some(parse_persona(persona)?.key().to_string());
        }
        if let Some(catalog) = runtime.catalog_override.clone() {
            profile.catalog = Some(catalog);
        }
    }

    runtime.config.profile = profile_name;
    save_config(&runtime.config_path, &runtime.config)?;

    let path = runtime.config_path.display().to_string();
    runtime
        .output
        .emit(&json!({ "ok": true, "path": path }), || {
            vec![format!("Config initialized: {path}")]
        })
}

fn get(runtime: &Runtime, key: ConfigKey) -> Result<(), CliError> {
    let profile_name = runtime.active_profile();
    let profile = profile_ref(&runtime.config, &profile_name).ok_or_else(|| {
        CliError::Usage(format!(
            "Profile '{profile_name}' not found. Run `glowguide config init` first."
        ))
    })?;

    let value = match key {
        ConfigKey::ProxyUrl => Some(profile.proxy_url.clone()),
        ConfigKey::Model => Some(profile.model.clone()),
        ConfigKey::Persona => profile.persona.clone(),
        ConfigKey::Catalog => profile.catalog.clone(),
    };

    runtime
        .output
        .emit(&json!({ "key": key.name(), "value": value }), || {
            vec![value.clone().unwrap_or_else(|| "(not set)".to_string())]
        })
}

fn set(runtime: &mut Runtime, key: ConfigKey, value: String) -> Result<(), CliError> {
    let profile_name = runtime.active_profile();
    ensure_profile(&mut runtime.config, &profile_name);
    let profile = profile_mut(&mut runtime.config, &profile_name).ok_or_else(|| {
        CliError::Generic(format!(
            "Failed to resolve profile '{profile_name}' while setting config."
        ))
    })?;

    match key {
        ConfigKey::ProxyUrl => {
            validate_url(&value)?;
            profile.proxy_url = value;
        }
        ConfigKey::Model => {
            if value.trim().is_empty() {
                return Err(CliError::Usage("Model must not be empty.".to_string()));
            }
            profile.model = value.trim().to_string();
        }
        ConfigKey::Persona => {
            profile.persona = Some(parse_persona(&value)?.key().to_string());
        }
        ConfigKey::Catalog => {
            profile.catalog = Some(value);
        }
    }

    save_config(&runtime.config_path, &runtime.config)?;
    runtime
        .output
        .emit(&json!({ "ok": true }), || vec!["Config updated.".to_string()])
}

fn profiles(runtime: &Runtime) -> Result<(), CliError> {
    let active = runtime.active_profile();
    let mut names: Vec<String> = runtime.config.profiles.keys().cloned().collect();
    names.sort();

    let payload = names
        .iter()
        .map(|name| {
            let profile = runtime.config.profiles.get(name);
            json!({
                "name": name,
                "active": name == &active,
                "proxyUrl": profile.map(|p| p.proxy_url.clone()).unwrap_or_default(),
                "model": profile.map(|p| p.model.clone()).unwrap_or_default(),
            })
        })
        .collect::<Vec<_>>();

    runtime.output.emit(&json!({ "profiles": payload }), || {
        names
            .iter()
            .map(|name| {
                let marker = if *name == active { "*" } else { " " };
                format!("{marker} {name}")
            })
            .collect()
    })
}

fn use_profile(runtime: &mut Runtime, profile_name: String) -> Result<(), CliError> {
    ensure_profile(&mut runtime.config, &profile_name);
    runtime.config.profile = profile_name.clone();
    save_config(&runtime.config_path, &runtime.config)?;
    runtime
        .output
        .emit(&json!({ "ok": true, "profile": profile_name }), || {
            vec![format!("Active profile: {profile_name}")]
        })
}

fn parse_persona(value: &str) -> Result<Persona, CliError> {
    Persona::parse(value).ok_or_else(|| {
        CliError::Usage(format!(
            "Unknown persona '{value}'. Expected one of: glow, derm, minimal, luxe."
        ))
    })
}
