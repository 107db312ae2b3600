use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::artifacts::FsArtifactStore;
use crate::error::Error;
use crate::fonts::{FontBook, FontSet};
use crate::format::MoneyFormat;
use crate::numbering::NumberingConfig;
use crate::render::{DEFAULT_DEADLINE, RenderOptions, Renderer};
use crate::store::JsonStore;
use crate::theme::{Issuer, Labels, Theme, ThemeVariant};

pub const ENV_DATA: &str = "FACTURE_DATA";
pub const ENV_ARTIFACTS: &str = "FACTURE_ARTIFACTS";
pub const ENV_BIND: &str = "FACTURE_BIND";

/// Application configuration. Every field has a default, so an empty file
/// (or no file at all) is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub issuer: Issuer,
    pub render: RenderConfig,
    pub fonts: FontSet,
    pub storage: StorageConfig,
    pub numbering: NumberingConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub theme: ThemeVariant,
    pub deadline_ms: u64,
    pub quote_validity_days: u32,
    /// Empty string disables the note.
    pub legal_note: Option<String>,
    pub labels: Labels,
    pub money: MoneyFormat,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let theme = Theme::default();
        RenderConfig {
            theme: ThemeVariant::default(),
            deadline_ms: DEFAULT_DEADLINE.as_millis() as u64,
            quote_validity_days: theme.quote_validity_days,
            legal_note: theme.legal_note,
            labels: theme.labels,
            money: theme.money,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_file: PathBuf,
    /// No directory means rendered files are not kept.
    pub artifact_dir: Option<PathBuf>,
    pub public_base_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_file: PathBuf::from("data/facture.json"),
            artifact_dir: Some(PathBuf::from("data/artifacts")),
            public_base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read `path` when given, then apply the environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
                let config = AppConfig::from_toml_str(&text)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
                log::debug!("loaded configuration from {}", path.display());
                config
            }
            None => AppConfig::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override storage and bind settings from `lookup` (the environment in practice).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(data) = lookup(ENV_DATA) {
            self.storage.data_file = PathBuf::from(data);
        }
        if let Some(dir) = lookup(ENV_ARTIFACTS) {
            self.storage.artifact_dir = Some(PathBuf::from(dir));
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.server.bind = bind;
        }
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.render.deadline_ms)
    }

    pub fn theme(&self) -> Theme {
        let mut theme = Theme::new(self.render.theme);
        theme.labels = self.render.labels.clone();
        theme.money = self.render.money.clone();
        theme.quote_validity_days = self.render.quote_validity_days;
        theme.legal_note = self
            .render
            .legal_note
            .clone()
            .filter(|note| !note.trim().is_empty());
        theme
    }

    /// Loads the configured fonts, falling back to Helvetica.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            theme: self.theme(),
            issuer: self.issuer.clone(),
            fonts: FontBook::load(&self.fonts),
            deadline: self.deadline(),
        }
    }

    pub fn open_store(&self) -> Result<JsonStore, Error> {
        JsonStore::open(&self.storage.data_file)
    }

    pub fn artifact_store(&self) -> Option<FsArtifactStore> {
        let dir = self.storage.artifact_dir.as_ref()?;
        let store = FsArtifactStore::new(dir);
        Some(match &self.storage.public_base_url {
            Some(url) => store.with_base_url(url),
            None => store,
        })
    }

    /// Renderer wired to `store` and the configured artifact directory.
    pub fn renderer(&self, store: Arc<JsonStore>) -> Renderer {
        let renderer = Renderer::new(store, self.render_options());
        match self.artifact_store() {
            Some(artifacts) => renderer.with_artifacts(Arc::new(artifacts)),
            None => renderer,
        }
    }
}
