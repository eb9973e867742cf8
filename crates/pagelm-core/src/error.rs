use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid step key: {0:?} (expected \"taskId::label\")")]
    InvalidStepKey(String),
}
