pub mod commands;
pub mod controller;
pub mod state;

pub use controller::{AnalysisController, AnalysisEvent, RunHandle};
pub use state::{AnalysisStage, AnalysisState};
