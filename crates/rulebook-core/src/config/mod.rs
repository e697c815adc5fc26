mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use rulebook_index::{IndexSettings, RetrievalConfig, SplitterConfig};

use crate::vault::{Secret, VaultProvider};

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to sensible defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve sensitive configuration values through the vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        if let Some(val) = vault.get_secret(OPENAI_API_KEY).await? {
            self.secrets.openai_api_key = Some(Secret::new(val));
        }
        Ok(())
    }

    /// The provider credential, which the service cannot start without.
    ///
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` was not resolved or is blank.
    pub fn require_api_key(&self) -> anyhow::Result<&Secret> {
        match &self.secrets.openai_api_key {
            Some(key) if !key.expose().trim().is_empty() => Ok(key),
            _ => bail!("{OPENAI_API_KEY} not set. Please set it before running."),
        }
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.splitter_config()
            .validate()
            .context("invalid [index] chunking settings")?;
        if self.index.top_k == 0 {
            bail!("index.top_k must be greater than zero");
        }
        if self.index.embed_batch_size == 0 {
            bail!("index.embed_batch_size must be greater than zero");
        }
        if self.llm.model.trim().is_empty() {
            bail!("llm.model must not be empty");
        }
        if self.llm.embedding_model.trim().is_empty() {
            bail!("llm.embedding_model must not be empty");
        }
        if self.llm.timeout_secs == 0 {
            bail!("llm.timeout_secs must be greater than zero");
        }
        if self.gateway.max_body_size == 0 {
            bail!("gateway.max_body_size must be greater than zero");
        }
        Ok(())
    }

    #[must_use]
    pub fn splitter_config(&self) -> SplitterConfig {
        SplitterConfig {
            chunk_size: self.index.chunk_size,
            chunk_overlap: self.index.chunk_overlap,
        }
    }

    #[must_use]
    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            document_path: PathBuf::from(&self.document.path),
            splitter: self.splitter_config(),
            embed_batch_size: self.index.embed_batch_size,
            max_file_size: self.document.max_file_size,
        }
    }

    #[must_use]
    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            top_k: self.index.top_k,
        }
    }
}
