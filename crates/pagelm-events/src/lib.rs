use crossbeam_channel::{Receiver, Sender, unbounded};
use pagelm_core::{Task, TaskId, WeeklySchedule};
use serde::{Deserialize, Serialize};

pub mod actions;

pub use actions::{ActionBus, ActionSink, MindmapAction, NullActionSink};

/// Changes pushed by the planner subsystem. The mindmap re-derives its node set from
/// these; it never owns the task list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlannerEvent {
    TaskCreated { task: Task },
    TaskUpdated { task: Task },
    TaskDeleted { id: TaskId },
    PlanUpdated { schedule: WeeklySchedule },
    /// Full snapshot, sent on (re)connect.
    Snapshot {
        tasks: Vec<Task>,
        schedule: WeeklySchedule,
    },
}

impl PlannerEvent {
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Self::TaskCreated { task } | Self::TaskUpdated { task } => Some(&task.id),
            Self::TaskDeleted { id } => Some(id),
            Self::PlanUpdated { .. } | Self::Snapshot { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<PlannerEvent>,
    rx: Receiver<PlannerEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<PlannerEvent> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<PlannerEvent> {
        self.rx.clone()
    }

    pub fn publish(&self, event: PlannerEvent) {
        let _ = self.tx.send(event);
    }

    /// Dispatch all pending events to a listener, returning how many were delivered.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
            delivered += 1;
        }
        delivered
    }
}

/// Trait for components that respond to planner events.
pub trait EventListener {
    fn handle_event(&mut self, event: &PlannerEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<Option<TaskId>>,
    }

    impl EventListener for Recorder {
        fn handle_event(&mut self, event: &PlannerEvent) {
            self.seen.push(event.task_id().cloned());
        }
    }

    #[test]
    fn test_event_bus_publish_receive() {
        let bus = EventBus::new();
        bus.sender()
            .send(PlannerEvent::TaskDeleted {
                id: TaskId::new("t1"),
            })
            .unwrap();

        match bus.receiver().recv().unwrap() {
            PlannerEvent::TaskDeleted { id } => assert_eq!(id.as_str(), "t1"),
            other => panic!("Expected TaskDeleted, got {other:?}"),
        }
    }

    #[test]
    fn test_dispatch_drains_in_order() {
        let bus = EventBus::new();
        bus.publish(PlannerEvent::TaskCreated {
            task: Task::new("a", "Essay"),
        });
        bus.publish(PlannerEvent::PlanUpdated {
            schedule: WeeklySchedule::new(),
        });
        bus.publish(PlannerEvent::TaskDeleted {
            id: TaskId::new("a"),
        });

        let mut recorder = Recorder::default();
        assert_eq!(bus.dispatch_to(&mut recorder), 3);
        assert_eq!(
            recorder.seen,
            vec![Some(TaskId::new("a")), None, Some(TaskId::new("a"))]
        );
        assert_eq!(bus.dispatch_to(&mut recorder), 0);
    }

    #[test]
    fn test_planner_event_json_shape() {
        let json = r#"{"type":"taskUpdated","task":{"id":"t9","title":"Problem set 2"}}"#;
        let event: PlannerEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, PlannerEvent::TaskUpdated { ref task } if task.title == "Problem set 2"));
    }
}
