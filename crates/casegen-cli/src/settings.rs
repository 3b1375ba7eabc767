//! Layered settings: environment over TOML file over defaults

use anyhow::Context;
use casegen_core::PipelineConfig;
use casegen_llm::LlmConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the binary can configure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `[llm]` section
    pub llm: LlmConfig,
    /// `[pipeline]` section
    pub pipeline: PipelineConfig,
}

impl Settings {
    /// Parse a TOML document
    ///
    /// # Errors
    /// Returns an error if the document is not valid TOML for these sections.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid settings TOML")
    }

    /// Load from an optional file, then apply process environment overrides
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Load with a custom environment lookup
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading settings from {}", path.display()))?;
                Self::from_toml_str(&text)
                    .with_context(|| format!("parsing settings from {}", path.display()))?
            }
            None => Self::default(),
        };
        settings.llm = settings.llm.merge_vars(lookup);
        tracing::debug!(
            base_url = %settings.llm.base_url,
            model = settings.llm.model.as_deref().unwrap_or("<unset>"),
            "settings loaded"
        );
        Ok(settings)
    }
}
