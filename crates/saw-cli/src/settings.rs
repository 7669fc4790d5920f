//! User settings, loaded from `settings.toml`.
//!
//! Settings live in the platform-specific config folder:
//! - macOS: ~/Library/Application Support/org.survey-analysis.Survey Analysis Workbench/
//! - Windows: %APPDATA%/survey-analysis/Survey Analysis Workbench/config/
//! - Linux: ~/.config/surveyanalysisworkbench/
//!
//! A missing or unreadable file never stops the program: defaults are used
//! and a warning is logged.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use saw_persistence::AutoSaveConfig;
use saw_resilience::{AnalyticsClientConfig, CircuitBreakerConfig, RetryPolicy};
use saw_suggest::{DEFAULT_DEBOUNCE, GroupingOptions};
use saw_workflow::SessionOptions;
use serde::{Deserialize, Serialize};

const APP_QUALIFIER: &str = "org";
const APP_ORG: &str = "survey-analysis";
const APP_NAME: &str = "Survey Analysis Workbench";
const CONFIG_FILENAME: &str = "settings.toml";
const STATE_DIRNAME: &str = "projects";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub autosave: AutoSaveConfig,
    pub analytics: AnalyticsSettings,
    pub suggestions: SuggestionSettings,
}

/// Remote analytics engine connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub reset_timeout_secs: u64,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_secs: 30,
            max_attempts: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout_secs: 60,
        }
    }
}

impl AnalyticsSettings {
    pub fn client_config(&self) -> AnalyticsClientConfig {
        AnalyticsClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            retry: RetryPolicy {
                max_attempts: self.max_attempts.max(1),
                initial_delay: Duration::from_millis(self.initial_delay_ms),
                max_delay: Duration::from_millis(self.max_delay_ms),
                backoff_multiplier: self.backoff_multiplier,
            },
            breaker: CircuitBreakerConfig {
                failure_threshold: self.failure_threshold.max(1),
                success_threshold: self.success_threshold.max(1),
                reset_timeout: Duration::from_secs(self.reset_timeout_secs),
            },
        }
    }
}

/// Tuning for the suggestion engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionSettings {
    pub min_group_confidence: f32,
    pub demographic_confidence: f32,
    /// Quiet period before a change triggers an extra save.
    pub debounce_ms: u64,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            min_group_confidence: GroupingOptions::default().min_confidence(),
            demographic_confidence: 0.5,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
        }
    }
}

impl SuggestionSettings {
    pub fn session_options(&self) -> anyhow::Result<SessionOptions> {
        Ok(SessionOptions {
            grouping: GroupingOptions::new(self.min_group_confidence)?,
            demographic_confidence: self.demographic_confidence,
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Default location of the settings file.
///
/// Returns `None` if the platform-specific directory cannot be determined.
pub fn settings_path() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

/// Default folder for saved workflow progress.
pub fn default_state_dir() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.data_dir().join(STATE_DIRNAME))
}

/// Load settings from `path`, or from the default location.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let Some(path) = settings_path() else {
                tracing::warn!("Could not determine settings path, using defaults");
                return Settings::default();
            };
            path
        }
    };
    load_settings_from(&path)
}

pub fn load_settings_from(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                tracing::debug!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                tracing::warn!("Failed to parse settings file: {e}, using defaults");
                Settings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            Settings::default()
        }
        Err(e) => {
            tracing::warn!("Failed to read settings file: {e}, using defaults");
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_round_trip() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(settings, parsed);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: Settings = toml::from_str(
            r#"
            [autosave]
            interval_secs = 10

            [analytics]
            base_url = "https://stats.example.org/v1"
            "#,
        )
        .unwrap();
        assert!(parsed.autosave.enabled);
        assert_eq!(parsed.autosave.interval_secs, 10);
        assert_eq!(parsed.analytics.base_url, "https://stats.example.org/v1");
        assert_eq!(parsed.analytics.failure_threshold, 5);
        assert_eq!(parsed.suggestions.debounce_ms, 300);
    }

    #[test]
    fn test_unparseable_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[autosave\nenabled = yes").unwrap();
        assert_eq!(load_settings(Some(&path)), Settings::default());
    }

    #[test]
    fn test_client_config_conversion() {
        let config = AnalyticsSettings::default().client_config();
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.breaker, CircuitBreakerConfig::default());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_negative_group_threshold_rejected() {
        let settings = SuggestionSettings {
            min_group_confidence: -0.1,
            ..Default::default()
        };
        assert!(settings.session_options().is_err());
    }
}
