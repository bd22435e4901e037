use serde::Deserialize;
use std::{env, path::PathBuf};

use atelier_gateway::{DEFAULT_CHAT_MODEL, DEFAULT_IMAGE_MODEL};

/// On-disk configuration at `~/.atelier/config.toml`.
///
/// ```toml
/// [api]
/// key = "${GEMINI_API_KEY}"
///
/// [models]
/// chat = "gemini-2.5-flash"
/// image = "imagen-4.0-generate-001"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct AtelierConfig {
    pub api: Option<ApiConfig>,
    pub models: Option<ModelConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiConfig {
    pub key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelConfig {
    pub chat: Option<String>,
    pub image: Option<String>,
}

/// Resolved settings after merging the config file with the environment.
#[derive(Debug)]
pub struct Settings {
    pub api_key: Option<String>,
    pub chat_model: String,
    pub image_model: String,
}

impl AtelierConfig {
    pub fn load() -> Option<Self> {
        let path = config_path()?;
        if !path.exists() {
            return None;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return None;
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                None
            }
        }
    }

    /// Merge with the environment. The `GEMINI_API_KEY` variable wins
    /// over the config file so a shell export always takes effect.
    pub fn resolve(self) -> Settings {
        let file_key = self
            .api
            .and_then(|api| api.key)
            .map(|raw| expand_env_vars(&raw))
            .filter(|key| !key.is_empty());
        let env_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        let models = self.models.unwrap_or_default();

        Settings {
            api_key: env_key.or(file_key),
            chat_model: models.chat.unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            image_model: models
                .image
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
        }
    }
}

pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".atelier"))
}

fn config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("config.toml"))
}

/// Expand `${VAR}` references against the process environment. Unknown
/// variables expand to the empty string.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut i = 0;

    while i < value.len() {
        if value[i..].starts_with("${") {
            let start = i + 2;
            if let Some(end_rel) = value[start..].find('}') {
                let end = start + end_rel;
                let var = &value[start..end];
                if !var.is_empty() {
                    let replacement = env::var(var).unwrap_or_default();
                    out.push_str(&replacement);
                }
                i = end + 1;
                continue;
            }
        }

        let ch = value[i..].chars().next().unwrap_or('\u{fffd}');
        out.push(ch);
        i += ch.len_utf8();
    }

    out
}
