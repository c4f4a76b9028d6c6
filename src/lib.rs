mod analysis;
mod intake;
mod report;
mod session;
mod settings;

use analysis::{
    commands::{get_analysis_state, render_result, restart_analysis, start_analysis, view_result},
    AnalysisController, AnalysisEvent,
};
use intake::{
    commands::{clear_staged_batch, get_staged_batch, stage_files},
    StagingStore,
};
use log::warn;
use session::{SessionContext, User};
use settings::{Settings, SettingsStore};
use tauri::{Emitter, Manager, State};

pub(crate) struct AppState {
    pub(crate) settings: SettingsStore,
    pub(crate) session: SessionContext,
    pub(crate) staging: StagingStore,
    pub(crate) analysis: AnalysisController,
}

#[tauri::command]
fn get_settings(state: State<AppState>) -> Result<Settings, String> {
    Ok(state.settings.get())
}

#[tauri::command]
fn update_settings(settings: Settings, state: State<AppState>) -> Result<(), String> {
    state.settings.update(settings).map_err(|e| e.to_string())
}

#[tauri::command]
fn login(username: String, password: String, state: State<AppState>) -> Result<User, String> {
    // Placeholder auth: any non-empty credentials pass. A real identity
    // provider slots in behind this command without changing the gate.
    if username.trim().is_empty() || password.is_empty() {
        return Err("Username and password are required".into());
    }
    let user = User {
        username: username.trim().to_string(),
        display_name: None,
    };
    state.session.login(user.clone());
    Ok(user)
}

#[tauri::command]
fn logout(state: State<AppState>) -> Result<(), String> {
    state.session.logout();
    Ok(())
}

#[tauri::command]
fn get_current_user(state: State<AppState>) -> Result<Option<User>, String> {
    Ok(state.session.current_user())
}

fn forward_analysis_event(app_handle: &tauri::AppHandle, event: AnalysisEvent) {
    let result = match event {
        AnalysisEvent::StateChanged { state } => app_handle.emit("analysis-state-changed", state),
        AnalysisEvent::Progress { run_id, progress } => app_handle.emit(
            "analysis-progress",
            serde_json::json!({ "runId": run_id, "progress": progress }),
        ),
        AnalysisEvent::Completed { run_id } => app_handle.emit(
            "analysis-completed",
            serde_json::json!({ "runId": run_id }),
        ),
    };

    if let Err(err) = result {
        warn!("failed to forward analysis event: {}", err);
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("pipereview starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                // Previews left behind by a crashed process are stale; the
                // staging store re-creates everything it needs.
                let preview_dir = app_data_dir.join("previews");
                if preview_dir.exists() {
                    if let Err(err) = std::fs::remove_dir_all(&preview_dir) {
                        warn!("could not clear stale previews: {}", err);
                    }
                }
                std::fs::create_dir_all(&preview_dir)?;

                let settings_path = app_data_dir.join("setting.json");
                let settings_store = SettingsStore::new(settings_path)?;

                let controller = AnalysisController::new();
                let mut analysis_events = controller.subscribe();
                let app_handle = app.handle().clone();
                tauri::async_runtime::spawn(async move {
                    use tokio::sync::broadcast::error::RecvError;
                    loop {
                        match analysis_events.recv().await {
                            Ok(event) => forward_analysis_event(&app_handle, event),
                            Err(RecvError::Lagged(skipped)) => {
                                warn!("dropped {} analysis events", skipped);
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                });

                app.manage(AppState {
                    settings: settings_store,
                    session: SessionContext::new(),
                    staging: StagingStore::new(preview_dir),
                    analysis: controller,
                });

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            stage_files,
            get_staged_batch,
            clear_staged_batch,
            get_analysis_state,
            start_analysis,
            view_result,
            restart_analysis,
            render_result,
            get_settings,
            update_settings,
            login,
            logout,
            get_current_user,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
