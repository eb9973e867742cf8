use pagelm_core::{StepKey, TaskId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MindmapError {
    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),
    #[error("Unknown step: {0}")]
    UnknownStep(StepKey),
    #[error("Unknown idea bubble: {0}")]
    UnknownIdea(String),
    #[error("Planner rejected action: {0}")]
    ActionRejected(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Malformed settings JSON: {0}")]
    SettingsJson(#[from] serde_json::Error),
}
