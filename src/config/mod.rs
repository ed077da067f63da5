use crate::core::error::DochatError;
use crate::providers::ModelProvider;
use crate::providers::gemini::{self, GeminiProvider};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Config {
    fn config_dir() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join(".dochat").join("config.yaml")
    }

    pub fn load() -> Result<Config, DochatError> {
        let path = Self::config_path();

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config = serde_yml::from_str::<Config>(&contents)
                .map_err(|e| DochatError::Config(format!("Parse {}: {}", path.display(), e)))?;
            return Ok(config);
        }

        let config = Config::default();
        let _ = config.save();
        Ok(config)
    }

    pub fn save(&self) -> Result<(), DochatError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(&path, yaml_content)?;
        Ok(())
    }

    /// Model identifier to submit with, falling back to the Gemini default.
    pub fn model(&self) -> String {
        self.provider
            .model
            .clone()
            .unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string())
    }

    /// Build the provider this config describes, scoped to one session.
    pub fn create_provider(&self) -> Result<Box<dyn ModelProvider>, DochatError> {
        let api_key = self.provider.api_key.clone();
        if api_key.as_deref().unwrap_or_default().is_empty() {
            return Err(DochatError::Config(
                "No API key configured for Gemini".to_string(),
            ));
        }
        let provider = match &self.provider.base_url {
            Some(base_url) => GeminiProvider::with_endpoint(base_url.clone(), api_key),
            None => GeminiProvider::new(api_key),
        };
        Ok(Box::new(provider))
    }
}
