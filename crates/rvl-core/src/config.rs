use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Environment variable listing features to disable, comma separated.
pub const DISABLES_ENV: &str = "RVL_DISABLES";
/// Environment variable listing features to enable, comma separated.
pub const ENABLES_ENV: &str = "RVL_ENABLES";
/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "RVL_CONFIG";

/// A switchable part of the layer. Handle wrapping is the chassis itself; the
/// rest name the validation objects that can be plugged into the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerFeature {
    HandleWrapping,
    ThreadSafety,
    StatelessChecks,
    ObjectLifetimes,
    CoreChecks,
    BestPractices,
    GpuAssisted,
    DebugPrintf,
    SyncValidation,
}

impl LayerFeature {
    pub const ALL: [LayerFeature; 9] = [
        LayerFeature::HandleWrapping,
        LayerFeature::ThreadSafety,
        LayerFeature::StatelessChecks,
        LayerFeature::ObjectLifetimes,
        LayerFeature::CoreChecks,
        LayerFeature::BestPractices,
        LayerFeature::GpuAssisted,
        LayerFeature::DebugPrintf,
        LayerFeature::SyncValidation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerFeature::HandleWrapping => "handle_wrapping",
            LayerFeature::ThreadSafety => "thread_safety",
            LayerFeature::StatelessChecks => "stateless_checks",
            LayerFeature::ObjectLifetimes => "object_lifetimes",
            LayerFeature::CoreChecks => "core_checks",
            LayerFeature::BestPractices => "best_practices",
            LayerFeature::GpuAssisted => "gpu_assisted",
            LayerFeature::DebugPrintf => "debug_printf",
            LayerFeature::SyncValidation => "sync_validation",
        }
    }

    /// Whether the feature is active when no setting mentions it.
    pub fn on_by_default(&self) -> bool {
        matches!(
            self,
            LayerFeature::HandleWrapping
                | LayerFeature::ThreadSafety
                | LayerFeature::StatelessChecks
                | LayerFeature::ObjectLifetimes
                | LayerFeature::CoreChecks
        )
    }
}

impl FromStr for LayerFeature {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        LayerFeature::ALL
            .into_iter()
            .find(|f| f.as_str() == name)
            .ok_or_else(|| CoreError::UnknownSetting(s.trim().to_string()))
    }
}

/// Layer settings, loaded from rvl.toml and overridden by the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSettings {
    /// Features switched off
    #[serde(default)]
    pub disables: Vec<LayerFeature>,
    /// Features switched on
    #[serde(default)]
    pub enables: Vec<LayerFeature>,
    /// Filter used when RVL_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            disables: Vec::new(),
            enables: Vec::new(),
            log_filter: default_log_filter(),
        }
    }
}

impl LayerSettings {
    /// Load settings from a TOML file.
    pub fn load(path: &str) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CoreError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from file if it exists, otherwise return defaults.
    pub fn load_or_default(path: &str) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(CoreError::Io(_)) => Self::default(),
            Err(e) => {
                tracing::warn!("ignoring settings file {}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Settings as the layer sees them at instance creation: file first,
    /// then RVL_DISABLES / RVL_ENABLES on top.
    pub fn from_environment() -> Self {
        let mut settings = Self::load_or_default(&default_config_path());
        let disables = std::env::var(DISABLES_ENV).unwrap_or_default();
        let enables = std::env::var(ENABLES_ENV).unwrap_or_default();
        if let Err(e) = settings.apply_overrides(&disables, &enables) {
            tracing::warn!("ignoring environment override: {}", e);
        }
        settings
    }

    /// Apply comma separated disable/enable lists. Disables win over enables.
    /// Unknown names are rejected before anything is applied.
    pub fn apply_overrides(&mut self, disables: &str, enables: &str) -> Result<(), CoreError> {
        let disables = parse_list(disables)?;
        let enables = parse_list(enables)?;
        for feature in enables {
            self.disables.retain(|f| *f != feature);
            if !self.enables.contains(&feature) {
                self.enables.push(feature);
            }
        }
        for feature in disables {
            self.enables.retain(|f| *f != feature);
            if !self.disables.contains(&feature) {
                self.disables.push(feature);
            }
        }
        Ok(())
    }

    /// Whether `feature` ends up active.
    pub fn is_active(&self, feature: LayerFeature) -> bool {
        if self.disables.contains(&feature) {
            return false;
        }
        feature.on_by_default() || self.enables.contains(&feature)
    }

    pub fn handle_wrapping(&self) -> bool {
        self.is_active(LayerFeature::HandleWrapping)
    }
}

fn parse_list(list: &str) -> Result<Vec<LayerFeature>, CoreError> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(LayerFeature::from_str)
        .collect()
}

/// Returns the settings file path.
/// Search order:
/// 1. `RVL_CONFIG` if set
/// 2. System-wide config: `%PROGRAMDATA%\RVL\rvl.toml` (Windows) or `/etc/rvl/rvl.toml` (Linux/macOS)
/// 3. Local fallback: `./rvl.toml`
pub fn default_config_path() -> String {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return path;
    }
    #[cfg(windows)]
    {
        let programdata = std::env::var("PROGRAMDATA")
            .unwrap_or_else(|_| r"C:\ProgramData".to_string());
        let system_path = format!(r"{}\RVL\rvl.toml", programdata);
        if std::path::Path::new(&system_path).exists() {
            return system_path;
        }
    }
    #[cfg(not(windows))]
    {
        let system_path = "/etc/rvl/rvl.toml";
        if std::path::Path::new(system_path).exists() {
            return system_path.to_string();
        }
    }
    "rvl.toml".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}
