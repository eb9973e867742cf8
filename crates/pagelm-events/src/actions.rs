use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, unbounded};
use pagelm_core::{AssistKind, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Requests the mindmap hands back to the planner subsystem on user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MindmapAction {
    RequestPlan { id: TaskId },
    RequestAssist { id: TaskId, kind: AssistKind },
    ChangeStatus { id: TaskId, status: TaskStatus },
    UploadFile { id: TaskId, path: PathBuf },
    DeleteTask { id: TaskId },
    StartNow { id: TaskId },
    UpdateNotes { id: TaskId, text: String },
}

impl MindmapAction {
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::RequestPlan { id }
            | Self::RequestAssist { id, .. }
            | Self::ChangeStatus { id, .. }
            | Self::UploadFile { id, .. }
            | Self::DeleteTask { id }
            | Self::StartNow { id }
            | Self::UpdateNotes { id, .. } => id,
        }
    }
}

pub trait ActionSink {
    fn submit(&self, action: MindmapAction) -> Result<()>;
}

#[derive(Clone)]
pub struct ActionBus {
    tx: Sender<MindmapAction>,
    rx: Receiver<MindmapAction>,
}

impl Default for ActionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn receiver(&self) -> Receiver<MindmapAction> {
        self.rx.clone()
    }

    pub fn drain(&self) -> Vec<MindmapAction> {
        self.rx.try_iter().collect()
    }
}

impl ActionSink for ActionBus {
    fn submit(&self, action: MindmapAction) -> Result<()> {
        self.tx
            .send(action)
            .map_err(|error| anyhow::anyhow!(error.to_string()))
    }
}

/// Discards every action. Useful for headless hosts with no planner attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullActionSink;

impl ActionSink for NullActionSink {
    fn submit(&self, action: MindmapAction) -> Result<()> {
        tracing::debug!("Dropping mindmap action for task {}", action.task_id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_bus_roundtrip() {
        let bus = ActionBus::new();
        bus.submit(MindmapAction::RequestAssist {
            id: TaskId::new("t1"),
            kind: AssistKind::StudyGuide,
        })
        .expect("submit action");
        bus.submit(MindmapAction::StartNow {
            id: TaskId::new("t2"),
        })
        .expect("submit action");

        let received = bus.drain();
        assert_eq!(received.len(), 2);
        assert!(matches!(
            received[0],
            MindmapAction::RequestAssist {
                kind: AssistKind::StudyGuide,
                ..
            }
        ));
        assert_eq!(received[1].task_id().as_str(), "t2");
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn action_json_uses_tagged_shape() {
        let action = MindmapAction::ChangeStatus {
            id: TaskId::new("t3"),
            status: TaskStatus::Done,
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"type":"changeStatus","id":"t3","status":"done"}"#);
    }
}
