//! Persisted user settings.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// User-facing toggles. Unknown or missing keys fall back to defaults so
/// settings written by older versions still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Score the room the creature is in now instead of the room it was
    /// tended in.
    pub use_current_room_for_infection: bool,
    /// Keep sweeping on cadence while the health panel is closed.
    pub sweep_when_panel_hidden: bool,
}

impl Settings {
    /// Label shown next to the room toggle.
    pub const ROOM_TOGGLE_LABEL: &'static str = "Use current room for infection chance";
    /// Tooltip for the room toggle.
    pub const ROOM_TOGGLE_TOOLTIP: &'static str = "Base game uses room cleanliness at tend time to adjust infection chance. This option makes the game consider the current room instead.";

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into settings.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Flip the room toggle and return its new value.
    pub fn toggle_current_room(&mut self) -> bool {
        self.use_current_room_for_infection = !self.use_current_room_for_infection;
        log::info!(
            "woundwatch: use_current_room_for_infection = {}",
            self.use_current_room_for_infection
        );
        self.use_current_room_for_infection
    }
}

/// Errors raised while reading or writing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trait for abstracting where settings are persisted.
pub trait SettingsStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load saved settings, `None` when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be read.
    fn load_settings(&self) -> Result<Option<Settings>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the settings cannot be written.
    fn save_settings(&self, settings: &Settings) -> Result<(), Self::Error>;
}

/// Load settings from storage, falling back to defaults when none exist.
///
/// # Errors
///
/// Propagates the storage error.
pub fn load_or_default<S>(storage: &S) -> Result<Settings, S::Error>
where
    S: SettingsStorage,
{
    Ok(storage.load_settings()?.unwrap_or_default())
}

/// Settings storage backed by a shared JSON string.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStorage {
    blob: Rc<RefCell<Option<String>>>,
}

impl MemorySettingsStorage {
    #[must_use]
    pub fn with_json(json: &str) -> Self {
        Self {
            blob: Rc::new(RefCell::new(Some(json.to_string()))),
        }
    }

    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.blob.borrow().clone()
    }
}

impl SettingsStorage for MemorySettingsStorage {
    type Error = SettingsError;

    fn load_settings(&self) -> Result<Option<Settings>, Self::Error> {
        self.blob
            .borrow()
            .as_deref()
            .map(Settings::from_json)
            .transpose()
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), Self::Error> {
        let json = settings.to_json()?;
        *self.blob.borrow_mut() = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_tend_room() {
        let settings = Settings::default();
        assert!(!settings.use_current_room_for_infection);
        assert!(!settings.sweep_when_panel_hidden);
    }

    #[test]
    fn missing_keys_use_defaults() {
        let settings = Settings::from_json(r#"{"use_current_room_for_infection":true}"#).unwrap();
        assert!(settings.use_current_room_for_infection);
        assert!(!settings.sweep_when_panel_hidden);
        assert_eq!(Settings::from_json("{}").unwrap(), Settings::default());
    }

    #[test]
    fn storage_round_trips_toggle() {
        let storage = MemorySettingsStorage::default();
        let mut settings = load_or_default(&storage).unwrap();
        assert!(settings.toggle_current_room());
        storage.save_settings(&settings).unwrap();

        let reloaded = load_or_default(&storage).unwrap();
        assert!(reloaded.use_current_room_for_infection);
        assert!(storage.raw().unwrap().contains("use_current_room_for_infection"));
    }

    #[test]
    fn corrupt_storage_reports_json_error() {
        let storage = MemorySettingsStorage::with_json("not json");
        assert!(matches!(
            load_or_default(&storage),
            Err(SettingsError::Json(_))
        ));
    }
}
