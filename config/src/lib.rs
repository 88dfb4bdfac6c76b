//! Configuration for Sylvia.
//!
//! Read once at startup from `~/.sylvia/config.toml`. Every section and field
//! is optional; a missing file means "all defaults".
//!
//! ```toml
//! [app]
//! model = "gemini-flash-lite-latest"
//! identity_path = "identity.txt"
//! sessions_dir = "~/.sylvia/sessions"
//!
//! [api_keys]
//! google = "${GEMINI_API_KEY}"
//!
//! [generation]
//! temperature = 0.9
//! max_output_tokens = 2048
//! thinking_budget = -1
//!
//! [tools]
//! search = false
//! code_execution = false
//! ```

mod identity;

use std::fmt;
use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use sylvia_types::{ThinkingBudget, ToolToggles};
use thiserror::Error;

pub use identity::{DEFAULT_IDENTITY, IdentityPrompt, IdentitySource};

/// Environment variable consulted when the config file has no key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_IDENTITY_FILE: &str = "identity.txt";

#[derive(Debug, Default, Deserialize)]
pub struct SylviaConfig {
    pub app: Option<AppConfig>,
    pub api_keys: Option<ApiKeys>,
    pub generation: Option<GenerationConfig>,
    pub tools: Option<ToolsConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    pub model: Option<String>,
    pub identity_path: Option<String>,
    pub sessions_dir: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct ApiKeys {
    pub google: Option<String>,
}

// Manual Debug impl to prevent leaking API keys in logs.
impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let google = if self.google.is_some() {
            "[REDACTED]"
        } else {
            "None"
        };
        f.debug_struct("ApiKeys").field("google", &google).finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerationConfig {
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
    /// `-1` dynamic, `0` off, `n` tokens.
    pub thinking_budget: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub search: bool,
    #[serde(default)]
    pub code_execution: bool,
}

/// Replace `${VAR}` references with the variable's value (empty if unset).
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// `~/` prefix expanded against the home directory.
fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(raw)
}

impl SylviaConfig {
    /// Load from the default location. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {}: {err}", path.display());
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {}: {err}", path.display());
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.app
            .as_ref()
            .and_then(|app| app.model.as_deref())
            .map(str::trim)
            .filter(|model| !model.is_empty())
    }

    #[must_use]
    pub fn identity_path(&self) -> PathBuf {
        self.app
            .as_ref()
            .and_then(|app| app.identity_path.as_deref())
            .map_or_else(|| PathBuf::from(DEFAULT_IDENTITY_FILE), expand_home)
    }

    /// Archive directory; `None` only when no home directory can be found.
    #[must_use]
    pub fn sessions_dir(&self) -> Option<PathBuf> {
        match self.app.as_ref().and_then(|app| app.sessions_dir.as_deref()) {
            Some(dir) => Some(expand_home(dir)),
            None => sylvia_home().map(|home| home.join("sessions")),
        }
    }

    /// Starting tool toggles and sampling values.
    #[must_use]
    pub fn tool_toggles(&self) -> ToolToggles {
        let defaults = ToolToggles::default();
        let generation = self.generation.as_ref();
        let tools = self.tools.as_ref();
        ToolToggles {
            search_enabled: tools.is_some_and(|tools| tools.search),
            code_exec_enabled: tools.is_some_and(|tools| tools.code_execution),
            temperature: generation
                .and_then(|g| g.temperature)
                .unwrap_or(defaults.temperature),
            max_tokens: generation
                .and_then(|g| g.max_output_tokens)
                .unwrap_or(defaults.max_tokens),
        }
    }

    #[must_use]
    pub fn thinking_budget(&self) -> ThinkingBudget {
        self.generation
            .as_ref()
            .and_then(|g| g.thinking_budget)
            .map(ThinkingBudget::from_wire)
            .unwrap_or_default()
    }

    /// Google API key: the config value (after `${VAR}` expansion) if
    /// non-blank, else `GEMINI_API_KEY`.
    #[must_use]
    pub fn google_api_key(&self) -> Option<String> {
        resolve_api_key(self.api_keys.as_ref(), |name| env::var(name).ok())
    }
}

fn resolve_api_key(
    keys: Option<&ApiKeys>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let configured = keys
        .and_then(|keys| keys.google.as_deref())
        .map(expand_env_vars)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty());
    configured.or_else(|| {
        lookup(API_KEY_ENV)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    })
}

/// `~/.sylvia`
#[must_use]
pub fn sylvia_home() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sylvia"))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    sylvia_home().map(|home| home.join("config.toml"))
}
