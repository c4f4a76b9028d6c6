use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::debug;
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::report::AnalysisReport;

use super::{AnalysisStage, AnalysisState};

/// Cadence of the simulated analysis pass.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum AnalysisEvent {
    StateChanged { state: AnalysisState },
    Progress { run_id: String, progress: u8 },
    Completed { run_id: String },
}

struct RunTicker {
    task: JoinHandle<()>,
    cancel: CancellationToken,
}

impl RunTicker {
    fn cancel(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// Cancellable handle for one analysis run, returned by `start_run`.
pub struct RunHandle {
    run_id: String,
    cancel: CancellationToken,
    events: broadcast::Receiver<AnalysisEvent>,
}

impl RunHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Stop the run's ticker. Progress freezes where it is; the state
    /// machine stays in `Processing` until the caller restarts.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Resolves once this run's progress has saturated.
    pub async fn completed(&mut self) {
        loop {
            match self.events.recv().await {
                Ok(AnalysisEvent::Completed { run_id }) if run_id == self.run_id => break,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

/// Owns the three-stage analysis state machine and the progress ticker.
/// Collaborators observe it through snapshots and the event channel; the
/// auth gate and batch precondition live with the command layer.
#[derive(Clone)]
pub struct AnalysisController {
    state: Arc<Mutex<AnalysisState>>,
    ticker: Arc<Mutex<Option<RunTicker>>>,
    tick_interval: Duration,
    events: broadcast::Sender<AnalysisEvent>,
}

impl AnalysisController {
    pub fn new() -> Self {
        Self::with_tick_interval(DEFAULT_TICK_INTERVAL)
    }

    pub fn with_tick_interval(tick_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Arc::new(Mutex::new(AnalysisState::new())),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.events.subscribe()
    }

    pub async fn get_state(&self) -> AnalysisState {
        self.state.lock().await.clone()
    }

    /// `initial -> processing`. In any other stage the action is a no-op and
    /// no handle is returned.
    pub async fn start_run(&self) -> Option<RunHandle> {
        let run_id = {
            let mut state = self.state.lock().await;
            if state.stage != AnalysisStage::Initial {
                debug!("start ignored: analysis already in {:?}", state.stage);
                return None;
            }
            let run_id = Uuid::new_v4().to_string();
            state.begin_run(run_id.clone(), Utc::now());
            run_id
        };

        let cancel = self.spawn_ticker().await;
        self.emit_state_changed().await;

        Some(RunHandle {
            run_id,
            cancel,
            events: self.events.subscribe(),
        })
    }

    /// `processing -> result`, gated on completion. Early calls are no-ops;
    /// the returned snapshot tells the caller what actually happened.
    pub async fn view_result(&self) -> AnalysisState {
        let shown = {
            let mut state = self.state.lock().await;
            state.show_result(AnalysisReport::pipeline_comparison())
        };

        if shown {
            self.cancel_ticker().await;
            self.emit_state_changed().await;
        } else {
            debug!("view result ignored: analysis not complete");
        }

        self.get_state().await
    }

    /// Back to `initial` from any stage, discarding progress and report.
    /// The staged batch is the caller's to keep or clear.
    pub async fn restart(&self) -> AnalysisState {
        self.cancel_ticker().await;
        {
            let mut state = self.state.lock().await;
            state.restart();
        }
        self.emit_state_changed().await;
        self.get_state().await
    }

    async fn spawn_ticker(&self) -> CancellationToken {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.cancel();
        }

        let state = self.state.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;
        let cancel = CancellationToken::new();
        let handle_token = cancel.clone();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            // First tick fires one full interval after the run starts, so a
            // snapshot taken right after start still reads progress 0.
            let mut interval =
                time::interval_at(time::Instant::now() + tick_interval, tick_interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let (snapshot, saturated) = {
                    let mut guard = state.lock().await;
                    if guard.stage != AnalysisStage::Processing {
                        break;
                    }
                    let saturated = guard.advance();
                    (guard.clone(), saturated)
                };

                if let Some(run_id) = snapshot.run_id.clone() {
                    let _ = events.send(AnalysisEvent::Progress {
                        run_id: run_id.clone(),
                        progress: snapshot.progress,
                    });
                    if saturated {
                        let _ = events.send(AnalysisEvent::Completed { run_id });
                    }
                }

                if saturated {
                    break;
                }
            }
        });

        *ticker_guard = Some(RunTicker { task, cancel });
        handle_token
    }

    async fn cancel_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel();
        }
    }

    async fn emit_state_changed(&self) {
        let state = self.get_state().await;
        let _ = self.events.send(AnalysisEvent::StateChanged { state });
    }
}

impl Default for AnalysisController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout};

    const TICK: Duration = Duration::from_millis(25);

    fn controller() -> AnalysisController {
        AnalysisController::with_tick_interval(TICK)
    }

    #[tokio::test]
    async fn full_run_reaches_result_and_restarts() {
        let controller = controller();

        let mut handle = controller.start_run().await.expect("run should start");
        let state = controller.get_state().await;
        assert_eq!(state.stage, AnalysisStage::Processing);
        assert_eq!(state.progress, 0);
        assert!(!state.is_complete);

        timeout(Duration::from_secs(2), handle.completed())
            .await
            .expect("run should complete");
        let state = controller.get_state().await;
        assert_eq!(state.progress, 100);
        assert!(state.is_complete);

        let state = controller.view_result().await;
        assert_eq!(state.stage, AnalysisStage::Result);
        assert!(state.report.is_some());

        let state = controller.restart().await;
        assert_eq!(state.stage, AnalysisStage::Initial);
        assert_eq!(state.progress, 0);
        assert!(!state.is_complete);
        assert!(state.report.is_none());
    }

    #[tokio::test]
    async fn view_result_before_completion_is_a_no_op() {
        let controller = controller();
        let _handle = controller.start_run().await.unwrap();

        let state = controller.view_result().await;
        assert_eq!(state.stage, AnalysisStage::Processing);
        assert!(state.report.is_none());
    }

    #[tokio::test]
    async fn starting_twice_keeps_the_first_run() {
        let controller = controller();
        let handle = controller.start_run().await.unwrap();
        let first_run_id = handle.run_id().to_string();

        assert!(controller.start_run().await.is_none());
        let state = controller.get_state().await;
        assert_eq!(state.run_id.as_deref(), Some(first_run_id.as_str()));
    }

    #[tokio::test]
    async fn progress_is_monotonic_in_steps_of_ten() {
        let controller = controller();
        let mut events = controller.subscribe();
        let mut handle = controller.start_run().await.unwrap();

        timeout(Duration::from_secs(2), handle.completed())
            .await
            .unwrap();

        let mut expected = 10u8;
        loop {
            match events.try_recv() {
                Ok(AnalysisEvent::Progress { progress, .. }) => {
                    assert_eq!(progress, expected);
                    expected += 10;
                }
                Ok(AnalysisEvent::Completed { .. }) => break,
                Ok(_) => continue,
                Err(err) => panic!("event stream ended early: {err}"),
            }
        }
        assert_eq!(expected, 110, "expected exactly ten progress steps");
    }

    #[tokio::test]
    async fn no_ticks_fire_after_restart() {
        let controller = controller();
        let _handle = controller.start_run().await.unwrap();

        sleep(TICK * 3).await;
        let state = controller.restart().await;
        assert_eq!(state.progress, 0);

        sleep(TICK * 5).await;
        let state = controller.get_state().await;
        assert_eq!(state.stage, AnalysisStage::Initial);
        assert_eq!(state.progress, 0);
    }

    #[tokio::test]
    async fn no_ticks_fire_after_saturation() {
        let controller = controller();
        let mut handle = controller.start_run().await.unwrap();
        timeout(Duration::from_secs(2), handle.completed())
            .await
            .unwrap();

        let before = controller.get_state().await;
        sleep(TICK * 5).await;
        let after = controller.get_state().await;
        assert_eq!(before.progress, after.progress);
        assert_eq!(after.progress, 100);
    }

    #[tokio::test]
    async fn cancelling_the_handle_freezes_progress() {
        let controller = controller();
        let handle = controller.start_run().await.unwrap();

        sleep(TICK * 3).await;
        handle.cancel();
        sleep(TICK).await;

        let frozen = controller.get_state().await;
        assert!(frozen.progress < 100);
        assert_eq!(frozen.stage, AnalysisStage::Processing);

        sleep(TICK * 5).await;
        let later = controller.get_state().await;
        assert_eq!(frozen.progress, later.progress);
    }
}
