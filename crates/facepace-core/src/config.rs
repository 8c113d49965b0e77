use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use facepace_signals::OcularConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacepaceConfig {
    pub ocular: OcularConfig,
    pub orchestrator: OrchestratorConfig,
    pub annotator: AnnotatorConfig,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Size of the estimation worker pool
    pub worker_threads: usize,
    /// Rates below this are displayed as `display_floor_bpm`
    pub display_min_bpm: f64,
    pub display_floor_bpm: f64,
    /// Rates above this are displayed as `display_ceiling_bpm`
    pub display_max_bpm: f64,
    pub display_ceiling_bpm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// OpenAI-compatible API root, e.g. `https://api.mistral.ai/v1`
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// JSON-lines output file; results are discarded when unset
    pub path: Option<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            display_min_bpm: 45.0,
            display_floor_bpm: 45.0,
            display_max_bpm: 100.0,
            display_ceiling_bpm: 98.0,
        }
    }
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mistral.ai/v1".to_string(),
            model: "pixtral-12b".to_string(),
            timeout_secs: 290,
            api_key_env: "MISTRAL_API_KEY".to_string(),
        }
    }
}

impl FacepaceConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: FacepaceConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    /// Environment variables should be prefixed with FACEPACE_
    /// Example: FACEPACE_ORCHESTRATOR_WORKER_THREADS=4
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. User config file (if exists), merged key by key
    /// 3. Default config file
    /// 4. Built-in defaults (lowest priority)
    pub fn load_layered(
        default_path: Option<&Path>,
        user_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut layered = toml::Value::try_from(FacepaceConfig::default())
            .map_err(|e| ConfigError::Validation(format!("TOML serialization error: {}", e)))?;

        for path in [default_path, user_path].into_iter().flatten() {
            if path.exists() {
                let layer: toml::Value = toml::from_str(&fs::read_to_string(path)?)?;
                merge_values(&mut layered, layer);
            }
        }

        let mut config: FacepaceConfig = layered.try_into()?;
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        override_from_env(
            "FACEPACE_ORCHESTRATOR_WORKER_THREADS",
            &mut self.orchestrator.worker_threads,
        )?;
        override_from_env(
            "FACEPACE_ANNOTATOR_BASE_URL",
            &mut self.annotator.base_url,
        )?;
        override_from_env("FACEPACE_ANNOTATOR_MODEL", &mut self.annotator.model)?;
        override_from_env(
            "FACEPACE_ANNOTATOR_TIMEOUT_SECS",
            &mut self.annotator.timeout_secs,
        )?;
        override_from_env(
            "FACEPACE_ANNOTATOR_API_KEY_ENV",
            &mut self.annotator.api_key_env,
        )?;
        override_from_env(
            "FACEPACE_OCULAR_PUPIL_THRESHOLD",
            &mut self.ocular.pupil_threshold,
        )?;

        if let Ok(val) = std::env::var("FACEPACE_SINK_PATH") {
            self.sink.path = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Ocular validation
        let ocular = &self.ocular;
        if ocular.blur_kernel % 2 == 0 {
            return Err(ConfigError::Validation(
                "ocular.blur_kernel must be odd".to_string(),
            ));
        }
        if ocular.block_size < 3 || ocular.block_size % 2 == 0 {
            return Err(ConfigError::Validation(
                "ocular.block_size must be odd and >= 3".to_string(),
            ));
        }
        if ocular.min_eye_area >= ocular.max_eye_area {
            return Err(ConfigError::Validation(
                "ocular.min_eye_area must be < max_eye_area".to_string(),
            ));
        }
        if ocular.min_aspect_ratio <= 0.0 || ocular.min_aspect_ratio > ocular.max_aspect_ratio {
            return Err(ConfigError::Validation(
                "ocular aspect ratio range must be positive and ordered".to_string(),
            ));
        }

        // Orchestrator validation
        let orch = &self.orchestrator;
        if orch.worker_threads == 0 {
            return Err(ConfigError::Validation(
                "orchestrator.worker_threads must be > 0".to_string(),
            ));
        }
        if orch.display_min_bpm >= orch.display_max_bpm {
            return Err(ConfigError::Validation(
                "orchestrator.display_min_bpm must be < display_max_bpm".to_string(),
            ));
        }
        if orch.display_floor_bpm > orch.display_ceiling_bpm {
            return Err(ConfigError::Validation(
                "orchestrator.display_floor_bpm must be <= display_ceiling_bpm".to_string(),
            ));
        }

        // Annotator validation
        if self.annotator.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "annotator.base_url must not be empty".to_string(),
            ));
        }
        if self.annotator.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "annotator.model must not be empty".to_string(),
            ));
        }
        if self.annotator.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "annotator.timeout_secs must be > 0".to_string(),
            ));
        }
        if self.annotator.api_key_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "annotator.api_key_env must name an environment variable".to_string(),
            ));
        }

        Ok(())
    }

    /// Export configuration to TOML string
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self
            .to_toml_string()
            .map_err(|e| ConfigError::Validation(format!("TOML serialization error: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}

fn override_from_env<T: std::str::FromStr>(key: &str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(val) = std::env::var(key) {
        *target = val
            .parse()
            .map_err(|_| ConfigError::Validation(format!("Invalid {}", key)))?;
    }
    Ok(())
}

/// Recursively overlay `layer` onto `base`; tables merge, everything else replaces.
fn merge_values(base: &mut toml::Value, layer: toml::Value) {
    match (base, layer) {
        (toml::Value::Table(base), toml::Value::Table(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}
