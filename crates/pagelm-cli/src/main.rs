use anyhow::{Context, Result};
use clap::Parser;
use pagelm_core::{Size, Task, TaskId, WeeklySchedule};
use pagelm_events::{EventBus, NullActionSink, PlannerEvent};
use pagelm_mindmap::{
    DefaultMeasure, MindmapController, MindmapScene, MindmapSettings, StepLabelSource,
};
use pagelm_storage::{MindmapStore, Storage};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Lay out a planner snapshot as a task mindmap", long_about = None)]
struct Args {
    /// Planner snapshot: `{"tasks": [...], "schedule": {...}}`
    #[arg(short, long)]
    input: PathBuf,

    /// Path to the SQLite database holding the persisted layout
    #[arg(short, long, default_value = "pagelm-mindmap.db")]
    db: PathBuf,

    /// Mindmap settings JSON; missing fields use defaults
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Step labels per task id (`{"taskId": ["label", ...]}`), standing in for the
    /// study-guide generator
    #[arg(short, long)]
    labels: Option<PathBuf>,

    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    #[arg(long, default_value_t = 800.0)]
    height: f64,

    /// Stop after this many ticks even if the layout is still moving
    #[arg(long, default_value_t = 600)]
    max_ticks: usize,

    /// Write the scene here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct PlannerSnapshot {
    tasks: Vec<Task>,
    #[serde(default)]
    schedule: WeeklySchedule,
}

/// Serves labels from a JSON file.
struct FileLabelSource {
    labels: HashMap<TaskId, Vec<String>>,
}

impl StepLabelSource for FileLabelSource {
    fn fetch_concepts(&self, task: &Task) -> Result<Vec<String>> {
        self.labels
            .get(&task.id)
            .cloned()
            .with_context(|| format!("no labels listed for task {}", task.id))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn run(args: &Args) -> Result<MindmapScene> {
    let settings = match &args.settings {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            MindmapSettings::from_json(&raw)?
        }
        None => MindmapSettings::default(),
    };
    let snapshot: PlannerSnapshot = read_json(&args.input)?;
    tracing::info!(
        "Loaded {} tasks from {}",
        snapshot.tasks.len(),
        args.input.display()
    );

    let storage = Storage::open(&args.db)?;
    let mut controller = MindmapController::new(
        settings,
        MindmapStore::new(storage),
        DefaultMeasure,
        NullActionSink,
    );
    if let Some(path) = &args.labels {
        let labels: HashMap<TaskId, Vec<String>> = read_json(path)?;
        controller = controller.with_label_source(Arc::new(FileLabelSource { labels }));
    }
    controller.set_canvas_size(Size::new(args.width, args.height));

    let events = EventBus::new();
    events.publish(PlannerEvent::Snapshot {
        tasks: snapshot.tasks,
        schedule: snapshot.schedule,
    });
    events.dispatch_to(&mut controller);
    controller.wait_for_labels(Duration::from_secs(10));

    let mut ticks = 0;
    while ticks < args.max_ticks && controller.tick() {
        ticks += 1;
    }
    if controller.is_settled() {
        tracing::info!("Layout settled after {} ticks", ticks);
    } else {
        tracing::warn!("Layout still moving after {} ticks", ticks);
    }

    controller.shutdown();
    Ok(controller.scene())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let scene = run(&args)?;
    let json = serde_json::to_string_pretty(&scene)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("Wrote scene to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
