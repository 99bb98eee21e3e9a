use std::path::PathBuf;

use crate::api::ApiClient;
use crate::catalog::CatalogSource;
use crate::config::{
    CliConfig, active_profile_name, default_data_dir, resolve_catalog, resolve_model,
    resolve_persona, resolve_proxy_url,
};
use crate::errors::CliError;
use crate::orchestrator::ChatOrchestrator;
use crate::output::OutputMode;
use crate::persona::Persona;
use crate::store::{ConversationStore, FileStore, SelectionStore};

#[derive(Debug, Clone)]
pub struct Runtime {
    pub output: OutputMode,
    pub config: CliConfig,
    pub config_path: PathBuf,
    pub profile_override: Option<String>,
    pub proxy_url_override: Option<String>,
    pub catalog_override: Option<String>,
    pub data_dir_override: Option<PathBuf>,
    pub persona_override: Option<String>,
    pub timeout_ms: u64,
}

impl Runtime {
    pub fn active_profile(&self) -> String {
        active_profile_name(&self.config, self.profile_override.as_deref())
    }

    pub fn resolved_proxy_url(&self) -> Result<String, CliError> {
        resolve_proxy_url(
            &self.config,
            &self.active_profile(),
            self.proxy_url_override.as_deref(),
        )
    }

    pub fn api_client(&self) -> Result<ApiClient, CliError> {
        ApiClient::new(
            self.resolved_proxy_url()?,
            self.timeout_ms,
            self.output.debug,
        )
    }

    pub fn catalog_source(&self) -> CatalogSource {
        CatalogSource::parse(&resolve_catalog(
            &self.config,
            &self.active_profile(),
            self.catalog_override.as_deref(),
        ))
    }

    pub fn persona(&self) -> Result<Persona, CliError> {
        // A bad flag is a usage error; a stale profile value quietly falls back.
        if let Some(key) = self.persona_override.as_deref() {
            return Persona::parse(key).ok_or_else(|| {
                CliError::Usage(format!(
                    "Unknown persona '{key}'. Expected one of: glow, derm, minimal, luxe."
                ))
            });
        }
        let key = resolve_persona(&self.config, &self.active_profile(), None);
        Ok(Persona::from_key(key.as_deref()))
    }

    pub fn orchestrator(&self) -> Result<ChatOrchestrator, CliError> {
        Ok(ChatOrchestrator::new(
            resolve_model(&self.config, &self.active_profile()),
            self.persona()?,
        ))
    }

    pub fn data_dir(&self) -> Result<PathBuf, CliError> {
        match &self.data_dir_override {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    pub fn storage(&self) -> Result<FileStore, CliError> {
        Ok(FileStore::new(self.data_dir()?))
    }

    pub fn selection_store(&self) -> Result<SelectionStore, CliError> {
        Ok(SelectionStore::restore(Box::new(self.storage()?)))
    }

    pub fn conversation_store(&self) -> Result<ConversationStore, CliError> {
        Ok(ConversationStore::replay(Box::new(self.storage()?)))
    }
}

#[cfg(test)]
pub(crate) fn test_runtime(data_dir: &std::path::Path) -> Runtime {
    Runtime {
        output: OutputMode {
            json: false,
            quiet: true,
            verbose: false,
            debug: false,
        },
        config: CliConfig::default(),
        config_path: data_dir.join("config.json"),
        profile_override: None,
        proxy_url_override: None,
        catalog_override: None,
        data_dir_override: Some(data_dir.to_path_buf()),
        persona_override: None,
        timeout_ms: 5_000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persona_flag_must_be_known() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = test_runtime(dir.path());
        runtime.persona_override = Some("pirate".into());
        assert!(matches!(runtime.persona(), Err(CliError::Usage(_))));

        runtime.persona_override = Some("derm".into());
        assert_eq!(runtime.persona().unwrap(), Persona::Dermatologist);
    }

    #[test]
    fn stale_profile_persona_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = test_runtime(dir.path());
        if let Some(profile) = runtime.config.profiles.get_mut("default") {
            profile.persona = Some("retired".into());
        }
        assert_eq!(runtime.persona().unwrap(), Persona::default());
    }

    #[test]
    fn stores_share_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = test_runtime(dir.path());
        let mut selection = runtime.selection_store().unwrap();
        selection
            .toggle(&crate::catalog::sample_product(4, "Mist", "toner"))
            .unwrap();
        let reloaded = runtime.selection_store().unwrap();
        assert!(reloaded.contains(crate::catalog::ProductId(4)));
    }
}
