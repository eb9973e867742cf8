//! Background fetching of AI-derived step labels.

use crossbeam_channel::{Receiver, Sender, unbounded};
use pagelm_core::{Task, TaskId};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Produces study-guide concepts for a task. Called at most once per task, off the
/// controller thread.
pub trait StepLabelSource: Send + Sync {
    fn fetch_concepts(&self, task: &Task) -> anyhow::Result<Vec<String>>;
}

/// Labels that came back for a task. Only non-empty results are reported.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelFetchResult {
    pub task_id: TaskId,
    pub labels: Vec<String>,
}

struct FetchMessage {
    task_id: TaskId,
    outcome: anyhow::Result<Vec<String>>,
}

/// Trim, drop blanks and drop repeats, keeping first-seen order.
pub fn clean_labels(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty() && seen.insert(label.clone()))
        .collect()
}

/// Runs label fetches on worker threads and hands results back over a channel.
///
/// Each task is requested at most once per fetcher, whatever the outcome; callers check
/// the durable label cache before calling [`LabelFetcher::request`].
pub struct LabelFetcher {
    source: Arc<dyn StepLabelSource>,
    tx: Sender<FetchMessage>,
    rx: Receiver<FetchMessage>,
    requested: HashSet<TaskId>,
    in_flight: HashSet<TaskId>,
}

impl LabelFetcher {
    pub fn new(source: Arc<dyn StepLabelSource>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            source,
            tx,
            rx,
            requested: HashSet::new(),
            in_flight: HashSet::new(),
        }
    }

    pub fn was_requested(&self, task_id: &TaskId) -> bool {
        self.requested.contains(task_id)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Start a fetch for `task`. Returns `false` when this task was already requested.
    pub fn request(&mut self, task: &Task) -> bool {
        if !self.requested.insert(task.id.clone()) {
            return false;
        }

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let task = task.clone();
        let task_id = task.id.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("step-labels-{task_id}"))
            .spawn(move || {
                let outcome = source.fetch_concepts(&task);
                let _ = tx.send(FetchMessage {
                    task_id: task.id,
                    outcome,
                });
            });

        match spawned {
            Ok(_) => {
                self.in_flight.insert(task_id);
                true
            }
            Err(err) => {
                tracing::warn!("Could not start label fetch for {}: {}", task_id, err);
                false
            }
        }
    }

    /// Collect every finished fetch without blocking.
    pub fn poll(&mut self) -> Vec<LabelFetchResult> {
        let messages: Vec<FetchMessage> = self.rx.try_iter().collect();
        messages
            .into_iter()
            .filter_map(|message| self.finish(message))
            .collect()
    }

    /// Block until nothing is in flight or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Vec<LabelFetchResult> {
        let deadline = Instant::now() + timeout;
        let mut results = Vec::new();
        while !self.in_flight.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(message) => results.extend(self.finish(message)),
                Err(_) => break,
            }
        }
        results.extend(self.poll());
        results
    }

    fn finish(&mut self, message: FetchMessage) -> Option<LabelFetchResult> {
        self.in_flight.remove(&message.task_id);
        match message.outcome {
            Ok(raw) => {
                let labels = clean_labels(raw);
                if labels.is_empty() {
                    tracing::debug!("Label source returned nothing for {}", message.task_id);
                    return None;
                }
                Some(LabelFetchResult {
                    task_id: message.task_id,
                    labels,
                })
            }
            Err(err) => {
                tracing::debug!("Label fetch for {} failed: {:#}", message.task_id, err);
                None
            }
        }
    }
}
