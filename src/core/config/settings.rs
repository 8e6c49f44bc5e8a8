use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use super::defaults;
use super::paths::AppPaths;
use crate::core::errors::ConfigError;
use crate::llm::SamplingOptions;

/// Typed application settings, loaded from `config.yml` with environment
/// overrides applied on top. Every field has a default so a missing file is
/// a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub ollama: OllamaSettings,
    pub models: ModelSettings,
    pub persona: PersonaSettings,
    pub retrieval: RetrievalSettings,
    pub chat: ChatSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub api_token: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: defaults::DEFAULT_PORT,
            api_token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: defaults::DEFAULT_OLLAMA_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub chat: String,
    pub embedding: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            chat: defaults::DEFAULT_CHAT_MODEL.to_string(),
            embedding: defaults::DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersonaSettings {
    pub system_prompt: String,
}

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            system_prompt: defaults::DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Path to the prebuilt chunk index. Resolved against the data dir when
    /// unset.
    pub index_path: Option<PathBuf>,
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            index_path: None,
            top_k: defaults::DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Non-system messages kept in the window sent to the model.
    pub history_limit: usize,
    /// Wall-clock bound on a single inference call.
    pub timeout_secs: u64,
    pub sampling: SamplingOptions,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_limit: defaults::DEFAULT_HISTORY_LIMIT,
            timeout_secs: defaults::DEFAULT_TIMEOUT_SECS,
            sampling: SamplingOptions::default(),
        }
    }
}

impl Settings {
    pub fn load(paths: &AppPaths) -> Result<Self, ConfigError> {
        let path = config_path(paths);
        let mut settings = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            Settings::default()
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    pub fn index_path(&self, paths: &AppPaths) -> PathBuf {
        self.retrieval
            .index_path
            .clone()
            .unwrap_or_else(|| paths.data_dir.join("chunks.db"))
    }

    fn apply_env_overrides(&mut self) {
        if let Some(port) = env_var("ANVIL_PORT")
            .or_else(|| env_var("PORT"))
            .and_then(|val| val.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Some(token) = env_var("ANVIL_API_TOKEN") {
            self.server.api_token = Some(token);
        }
        if let Some(url) = env_var("ANVIL_OLLAMA_URL") {
            self.ollama.base_url = url;
        }
        if let Some(model) = env_var("ANVIL_MODEL") {
            self.models.chat = model;
        }
        if let Some(model) = env_var("ANVIL_EMBEDDING_MODEL") {
            self.models.embedding = model;
        }
        if let Some(prompt) = env_var("ANVIL_SYSTEM_PROMPT") {
            self.persona.system_prompt = prompt;
        }
        if let Some(path) = env_var("ANVIL_INDEX_PATH") {
            self.retrieval.index_path = Some(PathBuf::from(path));
        }
    }
}

fn config_path(paths: &AppPaths) -> PathBuf {
    if let Ok(path) = env::var("ANVIL_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    let user_config = paths.data_dir.join("config.yml");
    if user_config.exists() {
        return user_config;
    }

    PathBuf::from("config.yml")
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|val| !val.trim().is_empty())
}
