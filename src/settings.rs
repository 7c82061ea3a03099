use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::Document;

pub const SETTINGS_KEY: &str = "readwise-stats-settings";

const TOKEN_MIN_LEN: usize = 2;
const TOKEN_MAX_LEN: usize = 50;

/// The one persisted record: the access token and the last fetched
/// document list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readwise_access_token: Option<String>,
    pub data: Vec<Document>,
}

impl Settings {
    pub fn token(&self) -> Option<&str> {
        self.readwise_access_token
            .as_deref()
            .filter(|t| !t.is_empty())
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Merge `patch` over this record. Fields the patch leaves out keep
    /// their current value.
    pub fn merged(&self, patch: SettingsPatch) -> Settings {
        Settings {
            readwise_access_token: match patch.readwise_access_token {
                Some(token) => token,
                None => self.readwise_access_token.clone(),
            },
            data: patch.data.unwrap_or_else(|| self.data.clone()),
        }
    }

    /// Size of the serialized record in kilobytes.
    pub fn approximate_size_kb(&self) -> f64 {
        serde_json::to_vec(self)
            .map(|bytes| bytes.len() as f64 / 1024.0)
            .unwrap_or(0.0)
    }
}

/// A partial update. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub readwise_access_token: Option<Option<String>>,
    pub data: Option<Vec<Document>>,
}

impl SettingsPatch {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            readwise_access_token: Some(Some(token.into())),
            data: None,
        }
    }

    pub fn data(data: Vec<Document>) -> Self {
        Self {
            readwise_access_token: None,
            data: Some(data),
        }
    }
}

/// Check a token typed into the settings form. The length is counted on
/// the input as typed; the returned token is trimmed.
pub fn validate_token(input: &str) -> Result<String> {
    let len = input.chars().count();
    if len < TOKEN_MIN_LEN {
        return Err(AppError::InvalidToken(format!(
            "Access token must be at least {} characters long.",
            TOKEN_MIN_LEN
        )));
    }
    if len > TOKEN_MAX_LEN {
        return Err(AppError::InvalidToken(format!(
            "Access token must not exceed {} characters.",
            TOKEN_MAX_LEN
        )));
    }
    Ok(input.trim().to_string())
}

/// Reads and writes the settings record. Storage failures never reach the
/// caller: a failed read is "nothing stored" and a failed write is logged
/// and dropped, leaving the in-memory record authoritative.
pub struct SettingsStore {
    repository: Repository,
}

impl SettingsStore {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn open(db_path: &str) -> Result<Self> {
        Ok(Self::new(Repository::new(db_path).await?))
    }

    pub async fn load(&self) -> Settings {
        match self.try_load().await {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                tracing::error!("Error reading settings from storage: {}", e);
                Settings::default()
            }
        }
    }

    async fn try_load(&self) -> Result<Option<Settings>> {
        let Some(raw) = self.repository.get_item(SETTINGS_KEY).await? else {
            return Ok(None);
        };
        let settings = serde_json::from_str(&raw)?;
        Ok(Some(settings))
    }

    pub async fn save(&self, settings: &Settings) {
        if let Err(e) = self.try_save(settings).await {
            tracing::error!("Error saving settings to storage: {}", e);
        }
    }

    async fn try_save(&self, settings: &Settings) -> Result<()> {
        let raw = serde_json::to_string(settings)?;
        self.repository.set_item(SETTINGS_KEY, raw).await?;
        tracing::debug!("Saved settings with {} documents", settings.data.len());
        Ok(())
    }

    pub async fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.repository
            .updated_at(SETTINGS_KEY)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Could not read settings timestamp: {}", e);
                None
            })
    }
}
