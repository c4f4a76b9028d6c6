use tauri::State;

use crate::{
    intake::StagingStore,
    report::{render_report, ReportSection},
    session::SessionContext,
    AppState,
};

use super::AnalysisState;

/// Start gate: the user must be signed in and a non-empty batch must be
/// staged. Kept out of the command wrapper so the gate itself is testable.
fn ensure_can_start(session: &SessionContext, staging: &StagingStore) -> Result<(), String> {
    if !session.is_authenticated() {
        return Err("Sign in before starting an analysis".into());
    }
    if staging.is_empty() {
        return Err("Stage at least one drawing before starting an analysis".into());
    }
    Ok(())
}

#[tauri::command]
pub async fn get_analysis_state(state: State<'_, AppState>) -> Result<AnalysisState, String> {
    Ok(state.analysis.get_state().await)
}

/// Calling this mid-run is a harmless no-op that returns the current
/// snapshot.
#[tauri::command]
pub async fn start_analysis(state: State<'_, AppState>) -> Result<AnalysisState, String> {
    ensure_can_start(&state.session, &state.staging)?;

    // The run handle only matters to callers that want early cancellation;
    // the chrome drives the run through restart_analysis instead.
    let _ = state.analysis.start_run().await;
    Ok(state.analysis.get_state().await)
}

#[tauri::command]
pub async fn view_result(state: State<'_, AppState>) -> Result<AnalysisState, String> {
    Ok(state.analysis.view_result().await)
}

#[tauri::command]
pub async fn restart_analysis(
    clear_batch: Option<bool>,
    state: State<'_, AppState>,
) -> Result<AnalysisState, String> {
    let snapshot = state.analysis.restart().await;
    if clear_batch.unwrap_or(false) {
        state.staging.clear();
    }
    Ok(snapshot)
}

#[tauri::command]
pub async fn render_result(state: State<'_, AppState>) -> Result<Vec<ReportSection>, String> {
    let snapshot = state.analysis.get_state().await;
    let report = snapshot
        .report
        .ok_or_else(|| "No analysis report available yet".to_string())?;
    Ok(render_report(&report, state.settings.get().output_format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::validator::{convert, screen, IntakeConfig};
    use crate::session::User;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    fn signed_in() -> SessionContext {
        let session = SessionContext::new();
        session.login(User {
            username: "inspector".into(),
            display_name: None,
        });
        session
    }

    async fn staged_store(dir: &std::path::Path) -> StagingStore {
        let path = dir.join("a.png");
        std::fs::write(&path, PNG_HEADER).unwrap();
        let screened = screen(&[path], &IntakeConfig::default()).await.unwrap();
        let batch = convert(screened.accepted, dir).await.unwrap();
        let store = StagingStore::new(dir.to_path_buf());
        store.replace(batch);
        store
    }

    #[test]
    fn start_is_refused_without_a_signed_in_user() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingStore::new(dir.path().to_path_buf());

        let err = ensure_can_start(&SessionContext::new(), &staging).unwrap_err();
        assert!(err.contains("Sign in"));
    }

    #[test]
    fn start_is_refused_with_an_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingStore::new(dir.path().to_path_buf());

        let err = ensure_can_start(&signed_in(), &staging).unwrap_err();
        assert!(err.contains("Stage at least one drawing"));
    }

    #[tokio::test]
    async fn start_proceeds_when_signed_in_and_staged() {
        let dir = tempfile::tempdir().unwrap();
        let staging = staged_store(dir.path()).await;

        assert!(ensure_can_start(&signed_in(), &staging).is_ok());
    }

    #[tokio::test]
    async fn logging_out_closes_the_gate_again() {
        let dir = tempfile::tempdir().unwrap();
        let staging = staged_store(dir.path()).await;
        let session = signed_in();
        assert!(ensure_can_start(&session, &staging).is_ok());

        session.logout();
        assert!(ensure_can_start(&session, &staging).is_err());
    }
}
