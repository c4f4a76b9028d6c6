use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EditorTheme {
    Cobalt,
    Espresso,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReportFormat {
    Simplified,
    Full,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisModel {
    SpeedPriority,
    PerformancePriority,
    AccuracyPriority,
    Custom,
}

/// User-configurable options, persisted under the well-known `setting` key.
/// The core stores the credential and model fields without interpreting
/// them; they are passed through to a future real analysis backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub image_gen_enabled: bool,
    pub editor_theme: EditorTheme,
    pub output_format: ReportFormat,
    pub model: AnalysisModel,
    pub tos_accepted: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            image_gen_enabled: true,
            editor_theme: EditorTheme::Cobalt,
            output_format: ReportFormat::Full,
            model: AnalysisModel::AccuracyPriority,
            tos_accepted: false,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> Settings {
        self.data.read().unwrap().clone()
    }

    pub fn update(&self, settings: Settings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            *guard = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("setting.json")).unwrap();
        assert_eq!(store.get(), Settings::default());
    }

    #[test]
    fn update_persists_and_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setting.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        let mut settings = store.get();
        settings.api_key = Some("sk-test".into());
        settings.output_format = ReportFormat::Simplified;
        settings.tos_accepted = true;
        store.update(settings.clone()).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.get(), settings);
    }

    #[test]
    fn unknown_or_partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setting.json");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.get(), Settings::default());
    }

    #[test]
    fn settings_serialize_with_camel_case_keys() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["imageGenEnabled"], true);
        assert_eq!(json["editorTheme"], "cobalt");
        assert_eq!(json["outputFormat"], "full");
        assert_eq!(json["model"], "accuracyPriority");
        assert_eq!(json["tosAccepted"], false);
    }
}
