pub mod commands;
pub mod staging;
pub mod validator;

pub use staging::{BatchView, IntakeBatch, StagedFile, StagingStore};
pub use validator::{FileKind, InputMode, IntakeConfig, RejectReason, RejectedFile};
