use crate::SessionError;
use anyhow::{Context, Result};
use command_resolver::{CascadeConfig, CascadeOrder, ClassifierConfig};
use serde::{Deserialize, Serialize};
use serial_link::LinkSettings;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a session needs at startup, stored as pretty JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Minimum classifier confidence, in [0, 1]
    pub threshold: f64,
    pub cascade_order: CascadeOrder,
    /// Naive Bayes smoothing
    pub alpha: f64,
    pub max_features: Option<usize>,
    /// Where the trained model is cached. `None` always retrains.
    pub model_path: Option<PathBuf>,
    pub save_model: bool,
    pub history_capacity: usize,
    /// Serial endpoint to open at startup
    pub port: Option<String>,
    pub baud_rate: u32,
    /// Look for an Arduino when no port is given
    pub auto_detect: bool,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            cascade_order: CascadeOrder::ClassifierFirst,
            alpha: 0.1,
            max_features: None,
            model_path: Some(PathBuf::from("models/intent_model.json")),
            save_model: true,
            history_capacity: 10,
            port: None,
            baud_rate: 9600,
            auto_detect: true,
        }
    }
}

impl RobotConfig {
    /// Read `path`, or write the defaults there when it does not exist yet.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config: Self = serde_json::from_str(&contents)
                .with_context(|| format!("parsing config {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            tracing::info!(path = %path.display(), "wrote default config");
            Ok(config)
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SessionError::InvalidConfig(format!(
                "threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        if self.alpha <= 0.0 || !self.alpha.is_finite() {
            return Err(SessionError::InvalidConfig(format!(
                "alpha must be positive, got {}",
                self.alpha
            )));
        }
        if self.history_capacity == 0 {
            return Err(SessionError::InvalidConfig(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(SessionError::InvalidConfig("baud_rate must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn cascade_config(&self) -> CascadeConfig {
        CascadeConfig {
            threshold: self.threshold,
            order: self.cascade_order,
        }
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            alpha: self.alpha,
            max_features: self.max_features,
        }
    }

    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            baud_rate: self.baud_rate,
            ..LinkSettings::default()
        }
    }
}
