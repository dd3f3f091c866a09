//! Configuration for imreview-core
//!
//! Windows and thresholds used by the invitation, review, revision and
//! publication workflows. Values are loaded from TOML with defaults for
//! anything left unset.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Engine-wide configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Reviewer invitation windows
    pub invitation: InvitationConfig,
    /// Review period and completion rules
    pub review: ReviewPeriodConfig,
    /// Author revision deadlines
    pub revision: RevisionConfig,
    /// Publication metadata
    pub publication: PublicationConfig,
    /// Workflow switches
    pub workflow: WorkflowConfig,
}

/// Reviewer invitation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvitationConfig {
    /// Window used when the editor gives no due days
    pub default_window_days: u32,
    /// Longest window an editor may choose
    pub max_window_days: u32,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            default_window_days: 14,
            max_window_days: 60,
        }
    }
}

/// Review period configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewPeriodConfig {
    /// Days a reviewer has after accepting
    pub review_period_days: u32,
    /// Grace days after the due date before an unfinished review expires;
    /// `None` disables overdue expiry
    pub overdue_expiry_days: Option<u32>,
    /// Completed reviews needed before accept or revision decisions
    pub min_completed_reviews: usize,
    /// Ratings run from 1 to this value
    pub rating_scale_max: u8,
}

impl Default for ReviewPeriodConfig {
    fn default() -> Self {
        Self {
            review_period_days: 21,
            overdue_expiry_days: Some(14),
            min_completed_reviews: 1,
            rating_scale_max: 5,
        }
    }
}

/// Revision deadline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionConfig {
    pub minor_deadline_days: u32,
    pub major_deadline_days: u32,
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            minor_deadline_days: 14,
            major_deadline_days: 60,
        }
    }
}

/// Publication configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationConfig {
    /// DOI registrant prefix, e.g. `10.5555`
    pub doi_prefix: String,
}

impl Default for PublicationConfig {
    fn default() -> Self {
        Self {
            doi_prefix: "10.5555".to_string(),
        }
    }
}

/// Workflow switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Send a resubmitted manuscript straight back to review
    pub auto_return_to_review: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            auto_return_to_review: true,
        }
    }
}

impl ReviewConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from standard locations
    ///
    /// Reads `~/.imreview/config.toml`, then `<project>/.imreview/config.toml`.
    /// Keys in later files override the same keys in earlier ones; anything
    /// unset keeps its default.
    pub fn load_standard(project_root: Option<&Path>) -> Result<Self, ConfigError> {
        let mut paths = Vec::new();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".imreview").join("config.toml"));
        }
        if let Some(root) = project_root {
            paths.push(root.join(".imreview").join("config.toml"));
        }

        let mut merged = toml::Table::new();
        for path in paths.iter().filter(|p| p.is_file()) {
            let layer = read_table(path)?;
            merge_tables(&mut merged, layer);
            tracing::debug!(path = %path.display(), "Loaded config layer");
        }

        let config: ReviewConfig =
            toml::Value::Table(merged)
                .try_into()
                .map_err(|e: toml::de::Error| ConfigError::Parse {
                    path: "merged configuration".to_string(),
                    message: e.to_string(),
                })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a single configuration file
    ///
    /// Files ending in `.json` are read as JSON, anything else as TOML.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let parse_error = |message: String| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        };
        let config = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&content).map_err(|e| parse_error(e.to_string()))?
        } else {
            Self::from_toml(&content).map_err(|e| parse_error(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.invitation.default_window_days == 0 {
            return Err(ConfigError::OutOfRange(
                "invitation.default_window_days must be positive".to_string(),
            ));
        }

        if self.invitation.default_window_days > self.invitation.max_window_days {
            return Err(ConfigError::Inconsistent(
                "invitation.default_window_days must not exceed max_window_days".to_string(),
            ));
        }

        if self.review.review_period_days == 0 {
            return Err(ConfigError::OutOfRange(
                "review.review_period_days must be positive".to_string(),
            ));
        }

        if self.review.rating_scale_max < 2 {
            return Err(ConfigError::OutOfRange(
                "review.rating_scale_max must be at least 2".to_string(),
            ));
        }

        if self.revision.minor_deadline_days == 0 || self.revision.major_deadline_days == 0 {
            return Err(ConfigError::OutOfRange(
                "revision deadlines must be positive".to_string(),
            ));
        }

        if self.revision.minor_deadline_days > self.revision.major_deadline_days {
            return Err(ConfigError::Inconsistent(
                "revision.minor_deadline_days must not exceed major_deadline_days".to_string(),
            ));
        }

        let prefix = self.publication.doi_prefix.trim();
        if !prefix.starts_with("10.") || prefix.len() < 4 || prefix.contains('/') {
            return Err(ConfigError::OutOfRange(
                "publication.doi_prefix must look like 10.NNNN".to_string(),
            ));
        }

        Ok(())
    }
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    content.parse::<toml::Table>().map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReviewConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.invitation.default_window_days, 14);
        assert_eq!(config.review.overdue_expiry_days, Some(14));
        assert!(config.workflow.auto_return_to_review);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ReviewConfig::from_toml(
            r#"
            [review]
            min_completed_reviews = 2

            [publication]
            doi_prefix = "10.1234"
            "#,
        )
        .unwrap();
        assert_eq!(config.review.min_completed_reviews, 2);
        assert_eq!(config.review.review_period_days, 21);
        assert_eq!(config.publication.doi_prefix, "10.1234");
        assert_eq!(config.invitation.max_window_days, 60);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ReviewConfig::default();
        let toml = config.to_toml().unwrap();
        assert_eq!(ReviewConfig::from_toml(&toml).unwrap(), config);
    }

    #[test]
    fn test_inconsistent_windows() {
        let mut config = ReviewConfig::default();
        config.invitation.default_window_days = 90;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_bad_doi_prefix() {
        let mut config = ReviewConfig::default();
        config.publication.doi_prefix = "doi:5555".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review.toml");
        std::fs::write(&path, "[review]\nrating_scale_max = 10\n").unwrap();
        assert_eq!(ReviewConfig::load_file(&path).unwrap().review.rating_scale_max, 10);

        std::fs::write(&path, "[review]\nrating_scale_max = 1\n").unwrap();
        assert!(matches!(
            ReviewConfig::load_file(&path),
            Err(ConfigError::OutOfRange(_))
        ));
        assert!(matches!(
            ReviewConfig::load_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review.json");
        let mut config = ReviewConfig::default();
        config.publication.doi_prefix = "10.1234".to_string();
        std::fs::write(&path, config.to_json().unwrap()).unwrap();
        assert_eq!(ReviewConfig::load_file(&path).unwrap(), config);

        std::fs::write(&path, "{\"review\": ").unwrap();
        assert!(matches!(
            ReviewConfig::load_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_project_layer_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".imreview");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            "[invitation]\ndefault_window_days = 7\n",
        )
        .unwrap();

        let config = ReviewConfig::load_standard(Some(dir.path())).unwrap();
        assert_eq!(config.invitation.default_window_days, 7);
    }

    #[test]
    fn test_merge_is_deep() {
        let mut base: toml::Table = "[review]\nreview_period_days = 30\nmin_completed_reviews = 2"
            .parse()
            .unwrap();
        let overlay: toml::Table = "[review]\nmin_completed_reviews = 3".parse().unwrap();
        merge_tables(&mut base, overlay);

        let config: ReviewConfig = toml::Value::Table(base).try_into().unwrap();
        assert_eq!(config.review.review_period_days, 30);
        assert_eq!(config.review.min_completed_reviews, 3);
    }
}
