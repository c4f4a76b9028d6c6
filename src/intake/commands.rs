use std::path::PathBuf;

use serde::Serialize;
use tauri::State;

use crate::AppState;

use super::{
    staging::BatchView,
    validator::{self, IntakeConfig, RejectedFile},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeOutcome {
    /// The committed batch, when at least one file was accepted. `None`
    /// leaves any previously staged batch in place.
    pub batch: Option<BatchView>,
    pub rejected: Vec<RejectedFile>,
}

#[tauri::command]
pub async fn stage_files(
    paths: Vec<String>,
    state: State<'_, AppState>,
) -> Result<IntakeOutcome, String> {
    let paths: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();
    let config = IntakeConfig::default();

    let screened = validator::screen(&paths, &config)
        .await
        .map_err(|e| e.to_string())?;

    let mut batch = None;
    if !screened.accepted.is_empty() {
        let committed = validator::convert(screened.accepted, state.staging.preview_dir())
            .await
            .map_err(|e| e.to_string())?;
        batch = Some(committed.view());
        state.staging.replace(committed);
    }

    Ok(IntakeOutcome {
        batch,
        rejected: screened.rejected,
    })
}

#[tauri::command]
pub async fn get_staged_batch(state: State<'_, AppState>) -> Result<Option<BatchView>, String> {
    Ok(state.staging.view())
}

#[tauri::command]
pub async fn clear_staged_batch(state: State<'_, AppState>) -> Result<(), String> {
    state.staging.clear();
    Ok(())
}
