use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::fs::try_exists;

use richtext_core::{Allowlist, AllowlistExtension, MarkdownConverter, MentionContext, Sanitizer};

pub const DEFAULT_MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;
const MAX_INPUT_BYTES_CEILING: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Entries merged into the standard allowlist.
    pub sanitizer: AllowlistExtension,
    /// Known people and topics for `@mention` and `#tag` conversion.
    pub mentions: MentionContext,
    pub limits: Limits,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_input_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl Config {
    pub async fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path).await,
            None => {
                log::warn!("No configuration directory available, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reads `path`. A missing or empty file gives the defaults; a broken
    /// file is copied to `.bak` and the defaults are used instead.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !try_exists(path).await? {
            log::debug!("Config file {} does not exist, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        if content.trim().is_empty() {
            log::warn!("Config file {} is empty, using defaults", path.display());
            return Ok(Self::default());
        }

        match serde_json::from_str::<Self>(&content) {
            Ok(mut config) => {
                config.validate()?;
                log::info!("Loaded config from: {}", path.display());
                Ok(config)
            }
            Err(json_err) => {
                log::error!("Failed to parse config file: {}", json_err);

                let backup_path = path.with_extension("bak");
                if let Err(e) = tokio::fs::copy(path, &backup_path).await {
                    log::warn!("Failed to backup broken config: {}", e);
                } else {
                    log::info!("Backed up broken config to: {}", backup_path.display());
                }

                Ok(Self::default())
            }
        }
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let mut config_to_save = self.clone();
        config_to_save.validate()?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create config directory {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(&config_to_save)
            .context("failed to serialize config")?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("failed to write config file {}", path.display()))?;

        log::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values and fix invalid ones
    pub fn validate(&mut self) -> Result<()> {
        let mut has_issues = false;

        if self.limits.max_input_bytes == 0 {
            log::warn!("Invalid max_input_bytes: 0, using default");
            self.limits.max_input_bytes = DEFAULT_MAX_INPUT_BYTES;
            has_issues = true;
        } else if self.limits.max_input_bytes > MAX_INPUT_BYTES_CEILING {
            log::warn!(
                "max_input_bytes {} is too large, capping at {}",
                self.limits.max_input_bytes,
                MAX_INPUT_BYTES_CEILING
            );
            self.limits.max_input_bytes = MAX_INPUT_BYTES_CEILING;
            has_issues = true;
        }

        for items in [&mut self.mentions.mentions, &mut self.mentions.tags] {
            let before = items.len();
            items.retain(|item| !item.value.trim().is_empty());
            if items.len() != before {
                log::warn!("Dropped {} mention entries without a value", before - items.len());
                has_issues = true;
            }
        }

        if has_issues {
            log::info!("Configuration validation completed with corrections");
        }

        Ok(())
    }

    /// Builds the converter described by this configuration.
    pub fn build_converter(&self) -> Result<MarkdownConverter> {
        let mut allowlist = Allowlist::standard();
        if !self.sanitizer.is_empty() {
            allowlist
                .extend(&self.sanitizer)
                .context("invalid sanitizer configuration")?;
        }
        Ok(MarkdownConverter::new(Sanitizer::new(allowlist)).with_mentions(self.mentions.clone()))
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("RICHTEXT_CONFIG_PATH") {
            return Some(PathBuf::from(path));
        }

        if let Ok(dir) = std::env::var("RICHTEXT_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("config.json"));
        }

        ProjectDirs::from("com", "richtext", "richtext")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }
}
