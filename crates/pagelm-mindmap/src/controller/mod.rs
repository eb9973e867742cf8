//! Owns the mindmap state and applies planner updates and pointer input to it.

use crate::camera::Camera;
use crate::error::MindmapError;
use crate::geometry::{anchor_line, ellipse_contains};
use crate::gesture::{Gesture, GrabOffset, HitTarget};
use crate::ideas::{idea_links, new_idea, palette_color};
use crate::labels::{LabelFetchResult, LabelFetcher, StepLabelSource};
use crate::scene::{
    ConnectorView, IdeaLinkView, IdeaView, MindmapScene, ScreenRect, StepBubbleView, TaskNodeView,
};
use crate::settings::MindmapSettings;
use crate::simulation::{SimulationEngine, TaskSimSpec, TickReport, circle_positions};
use crate::steps::{StepPlan, StepSource};
use pagelm_core::{
    AssistKind, IdeaNode, Size, StepKey, Task, TaskId, TaskStatus, Vec2, WeeklySchedule,
};
use pagelm_events::{ActionSink, EventListener, MindmapAction, PlannerEvent};
use pagelm_storage::{CAMERA_KEY, MindmapStore};
use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;


/// Reports the rendered size of a task node, in world units.
pub trait NodeMeasure {
    fn measure(&self, task_id: &TaskId) -> Option<Size>;
}

/// Never measures anything, so every task uses the configured default size.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMeasure;

impl NodeMeasure for DefaultMeasure {
    fn measure(&self, _task_id: &TaskId) -> Option<Size> {
        None
    }
}

impl<F> NodeMeasure for F
where
    F: Fn(&TaskId) -> Option<Size>,
{
    fn measure(&self, task_id: &TaskId) -> Option<Size> {
        self(task_id)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Dirty {
    tasks: bool,
    steps: bool,
    ideas: bool,
    camera: bool,
}

pub struct MindmapController {
    settings: MindmapSettings,
    store: MindmapStore,
    measure: Box<dyn NodeMeasure>,
    actions: Box<dyn ActionSink>,
    labels: Option<LabelFetcher>,
    camera: Camera,
    canvas: Size,
    tasks: Vec<Task>,
    schedule: WeeklySchedule,
    task_positions: HashMap<TaskId, Vec2>,
    step_positions: HashMap<StepKey, Vec2>,
    ideas: Vec<IdeaNode>,
    plans: HashMap<TaskId, StepPlan>,
    engine: SimulationEngine,
    gesture: Gesture,
    dirty: Dirty,
}

impl MindmapController {
    pub fn new(
        settings: MindmapSettings,
        store: MindmapStore,
        measure: impl NodeMeasure + 'static,
        actions: impl ActionSink + 'static,
    ) -> Self {
        let camera_settings = &settings.camera;
        let mut camera = Camera::new(camera_settings);
        if camera_settings.persist {
            if let Some(saved) = store.load::<Camera>(CAMERA_KEY) {
                camera = saved.with_bounds(camera_settings.min_zoom, camera_settings.max_zoom);
            }
        }

        let ideas = store.load_ideas();
        let step_positions = store.load_step_positions();
        let task_positions = store.load_task_positions();
        tracing::debug!(
            "Loaded mindmap state: {} ideas, {} step positions, {} task positions",
            ideas.len(),
            step_positions.len(),
            task_positions.len()
        );

        Self {
            engine: SimulationEngine::new(settings.simulation.clone()),
            settings,
            store,
            measure: Box::new(measure),
            actions: Box::new(actions),
            labels: None,
            camera,
            canvas: Size::default(),
            tasks: Vec::new(),
            schedule: WeeklySchedule::new(),
            task_positions,
            step_positions,
            ideas,
            plans: HashMap::new(),
            gesture: Gesture::Idle,
            dirty: Dirty::default(),
        }
    }

    /// Fetch AI step labels for tasks that have none stored.
    pub fn with_label_source(mut self, source: Arc<dyn StepLabelSource>) -> Self {
        self.labels = Some(LabelFetcher::new(source));
        self
    }

    pub fn settings(&self) -> &MindmapSettings {
        &self.settings
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn ideas(&self) -> &[IdeaNode] {
        &self.ideas
    }

    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    pub fn plan(&self, task_id: &TaskId) -> Option<&StepPlan> {
        self.plans.get(task_id)
    }

    pub fn task_position(&self, task_id: &TaskId) -> Option<Vec2> {
        self.task_positions.get(task_id).copied()
    }

    pub fn step_position(&self, key: &StepKey) -> Option<Vec2> {
        self.step_positions.get(key).copied()
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas
    }

    pub fn set_canvas_size(&mut self, size: Size) {
        self.canvas = size;
    }

    fn is_visible(&self, task_id: &TaskId) -> bool {
        self.tasks.iter().any(|task| &task.id == task_id)
    }

    fn task_size(&self, task_id: &TaskId) -> Size {
        self.measure
            .measure(task_id)
            .filter(|size| {
                size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0
            })
            .unwrap_or(self.settings.layout.default_task_size)
    }

    /// World-space center of a task node.
    pub fn task_center(&self, task_id: &TaskId) -> Option<Vec2> {
        self.task_positions
            .get(task_id)
            .map(|pos| *pos + self.task_size(task_id).half())
    }

    fn visible_task_center(&self, task_id: &TaskId) -> Result<Vec2, MindmapError> {
        self.task_center(task_id)
            .filter(|_| self.is_visible(task_id))
            .ok_or_else(|| MindmapError::UnknownTask(task_id.clone()))
    }

    fn step_radii(&self) -> Vec2 {
        let (rx, ry) = self.settings.layout.step_radii;
        Vec2::new(rx, ry)
    }

    /// World point under the middle of the canvas.
    pub fn canvas_center_world(&self) -> Vec2 {
        self.camera.screen_to_world(self.canvas.half())
    }

    /// Re-derive the node set from the planner's task list.
    pub fn sync_tasks(&mut self, tasks: Vec<Task>, schedule: WeeklySchedule) {
        let count = tasks.len();
        let ring_center = self.canvas_center_world();
        let ring_radius = self.settings.layout.task_ring_radius;
        for (idx, task) in tasks.iter().enumerate() {
            if self.task_positions.contains_key(&task.id) {
                continue;
            }
            let center = ring_center.on_circle(ring_radius, TAU * idx as f64 / count as f64);
            let top_left = center - self.task_size(&task.id).half();
            self.task_positions.insert(task.id.clone(), top_left);
            self.dirty.tasks = true;
        }

        let mut plans_changed = false;
        let mut plans = HashMap::with_capacity(count);
        for task in &tasks {
            // Labels applied this session outlive a store that cannot hand them back.
            let stored = self.store.load_step_labels(&task.id).or_else(|| {
                self.plans
                    .get(&task.id)
                    .filter(|plan| plan.source != StepSource::Heuristic)
                    .map(|plan| plan.labels.clone())
            });
            if stored.is_none() {
                if let Some(fetcher) = self.labels.as_mut() {
                    fetcher.request(task);
                }
            }
            let mut plan = StepPlan::resolve(task, stored);
            match self.plans.get(&task.id) {
                Some(existing) if existing.labels == plan.labels => {
                    if existing.source == StepSource::Override {
                        plan.source = StepSource::Override;
                    }
                }
                _ => plans_changed = true,
            }
            plans.insert(task.id.clone(), plan);
        }

        let previous: HashSet<&TaskId> = self.tasks.iter().map(|task| &task.id).collect();
        let next: HashSet<&TaskId> = tasks.iter().map(|task| &task.id).collect();
        let visible_changed = previous != next;

        self.tasks = tasks;
        self.schedule = schedule;
        self.plans = plans;
        self.drop_orphaned_gesture();

        if visible_changed || plans_changed {
            self.rebuild_simulations();
        } else {
            for task_id in self.tasks.iter().map(|task| task.id.clone()).collect::<Vec<_>>() {
                if let Some(center) = self.task_center(&task_id) {
                    self.engine.set_center(&task_id, center);
                }
            }
        }
    }

    fn drop_orphaned_gesture(&mut self) {
        let orphaned = match &self.gesture {
            Gesture::DraggingTask { task, .. } => !self.is_visible(task),
            Gesture::DraggingStep { key, .. } => !self
                .plans
                .get(&key.task_id)
                .is_some_and(|plan| plan.contains(&key.label)),
            Gesture::DraggingIdea { id, .. } => !self.ideas.iter().any(|idea| &idea.id == id),
            Gesture::Idle | Gesture::Panning { .. } => false,
        };
        if orphaned {
            tracing::debug!("Cancelling drag of a node that no longer exists");
            self.gesture = Gesture::Idle;
        }
    }

    /// Replace every task simulation with fresh ones built from the current plans.
    fn rebuild_simulations(&mut self) {
        let radius = self.settings.simulation.radial_radius;
        let specs: Vec<TaskSimSpec> = self
            .tasks
            .iter()
            .filter_map(|task| {
                let center = self.task_center(&task.id)?;
                let labels = self
                    .plans
                    .get(&task.id)
                    .map(|plan| plan.labels.as_slice())
                    .unwrap_or(&[]);
                let ring = circle_positions(center, labels.len(), radius);
                let steps = labels
                    .iter()
                    .zip(ring)
                    .map(|(label, fallback)| {
                        let key = StepKey::new(task.id.clone(), label.clone());
                        let pos = self.step_positions.get(&key).copied().unwrap_or(fallback);
                        (label.clone(), pos)
                    })
                    .collect();
                Some(TaskSimSpec {
                    task_id: task.id.clone(),
                    center,
                    steps,
                })
            })
            .collect();

        for spec in &specs {
            for (label, pos) in &spec.steps {
                self.step_positions
                    .entry(StepKey::new(spec.task_id.clone(), label.clone()))
                    .or_insert(*pos);
            }
        }
        self.engine.rebuild(specs);

        match self.gesture.clone() {
            Gesture::DraggingTask { task, .. } => self.engine.hold(&task),
            Gesture::DraggingStep { key, .. } => {
                if let Some(pos) = self.step_position(&key) {
                    self.engine.pin(&key, pos);
                }
                self.engine.hold(&key.task_id);
            }
            _ => {}
        }
    }

    /// Apply finished label fetches. Returns whether any plan changed.
    pub fn poll_labels(&mut self) -> bool {
        let results = match self.labels.as_mut() {
            Some(fetcher) => fetcher.poll(),
            None => return false,
        };
        self.apply_label_results(results)
    }

    /// Block until outstanding label fetches finish or `timeout` passes, then apply them.
    pub fn wait_for_labels(&mut self, timeout: Duration) -> bool {
        let results = match self.labels.as_mut() {
            Some(fetcher) => fetcher.wait(timeout),
            None => return false,
        };
        self.apply_label_results(results)
    }

    fn apply_label_results(&mut self, results: Vec<LabelFetchResult>) -> bool {
        let mut changed = false;
        for result in results {
            // A list stored in the meantime (e.g. a deletion) takes precedence.
            let overridden = self
                .plans
                .get(&result.task_id)
                .is_some_and(|plan| plan.source == StepSource::Override);
            if overridden || self.store.has_step_labels(&result.task_id) {
                continue;
            }
            self.store.save_step_labels(&result.task_id, &result.labels);

            let Some(task) = self.tasks.iter().find(|task| task.id == result.task_id) else {
                continue;
            };
            let plan = StepPlan::from_labels(task, result.labels, StepSource::Ai);
            tracing::debug!("Using {} AI step labels for {}", plan.len(), result.task_id);
            self.plans.insert(result.task_id, plan);
            changed = true;
        }
        if changed {
            self.drop_orphaned_gesture();
            self.rebuild_simulations();
        }
        changed
    }

    /// Advance the simulations one step. Returns whether anything moved.
    pub fn tick(&mut self) -> bool {
        let mut changed = self.poll_labels();
        let report = self.engine.tick();
        changed |= self.apply_tick_report(report);

        if self.dirty.steps && self.gesture.is_idle() && self.engine.is_settled() {
            self.flush();
        }
        changed
    }

    /// Copy simulated step positions into the layout, ignoring reports produced by a
    /// superseded set of simulations.
    pub fn apply_tick_report(&mut self, report: TickReport) -> bool {
        if report.generation != self.engine.generation() {
            tracing::debug!(
                "Dropping tick report from generation {} (current {})",
                report.generation,
                self.engine.generation()
            );
            return false;
        }
        if report.is_empty() {
            return false;
        }
        for (key, pos) in report.positions {
            if pos.is_finite() {
                self.step_positions.insert(key, pos);
            }
        }
        self.dirty.steps = true;
        true
    }

    /// True once every simulation has cooled and no labels are on their way.
    pub fn is_settled(&self) -> bool {
        self.engine.is_settled() && self.labels.as_ref().is_none_or(|f| f.in_flight() == 0)
    }

    pub fn on_pointer_down(&mut self, screen: Vec2, target: HitTarget) -> Result<(), MindmapError> {
        if !self.gesture.is_idle() {
            self.on_pointer_up();
        }

        self.gesture = match target {
            HitTarget::Canvas => Gesture::Panning {
                start_pan: self.camera.pan,
                start_cursor: screen,
            },
            HitTarget::Task(task) => {
                let pos = self
                    .task_position(&task)
                    .filter(|_| self.is_visible(&task))
                    .ok_or_else(|| MindmapError::UnknownTask(task.clone()))?;
                let grab = GrabOffset::new(screen, self.camera.world_to_screen(pos));
                self.engine.hold(&task);
                Gesture::DraggingTask { task, grab }
            }
            HitTarget::Step(key) => {
                let pos = self
                    .step_position(&key)
                    .filter(|_| self.plans.get(&key.task_id).is_some_and(|p| p.contains(&key.label)))
                    .ok_or_else(|| MindmapError::UnknownStep(key.clone()))?;
                let grab = GrabOffset::new(screen, self.camera.world_to_screen(pos));
                self.engine.pin(&key, pos);
                self.engine.hold(&key.task_id);
                Gesture::DraggingStep { key, grab }
            }
            HitTarget::Idea(id) => {
                let pos = self
                    .ideas
                    .iter()
                    .find(|idea| idea.id == id)
                    .map(IdeaNode::position)
                    .ok_or_else(|| MindmapError::UnknownIdea(id.clone()))?;
                let grab = GrabOffset::new(screen, self.camera.world_to_screen(pos));
                Gesture::DraggingIdea { id, grab }
            }
        };
        Ok(())
    }

    /// Returns whether the pointer move changed anything.
    pub fn on_pointer_move(&mut self, screen: Vec2) -> bool {
        match self.gesture.clone() {
            Gesture::Idle => false,
            Gesture::Panning { .. } => {
                let Some(pan) = self.gesture.pan_for(screen) else {
                    return false;
                };
                self.camera.pan = pan;
                self.dirty.camera = true;
                true
            }
            Gesture::DraggingTask { task, grab } => {
                let target = grab.entity_world(screen, &self.camera);
                self.move_task(&task, target)
            }
            Gesture::DraggingStep { key, grab } => {
                let target = grab.entity_world(screen, &self.camera);
                self.step_positions.insert(key.clone(), target);
                self.engine.pin(&key, target);
                self.dirty.steps = true;
                true
            }
            Gesture::DraggingIdea { id, grab } => {
                let target = grab.entity_world(screen, &self.camera);
                match self.ideas.iter_mut().find(|idea| idea.id == id) {
                    Some(idea) => {
                        idea.set_position(target);
                        self.dirty.ideas = true;
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Move a task node; its steps ride along and its simulation center follows.
    fn move_task(&mut self, task_id: &TaskId, target: Vec2) -> bool {
        let Some(previous) = self.task_position(task_id) else {
            return false;
        };
        let delta = target - previous;
        self.task_positions.insert(task_id.clone(), target);
        for (key, pos) in self.step_positions.iter_mut() {
            if &key.task_id == task_id {
                *pos += delta;
            }
        }
        self.engine.translate_steps(task_id, delta);
        if let Some(center) = self.task_center(task_id) {
            self.engine.set_center(task_id, center);
        }
        self.dirty.tasks = true;
        self.dirty.steps = true;
        true
    }

    /// Ends whatever gesture is active and releases any pin it held.
    pub fn on_pointer_up(&mut self) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => return,
            Gesture::Panning { .. } => {}
            Gesture::DraggingTask { task, .. } => self.engine.release(&task),
            Gesture::DraggingStep { key, .. } => {
                self.engine.unpin(&key);
                self.engine.release(&key.task_id);
            }
            Gesture::DraggingIdea { .. } => {}
        }
        self.flush();
    }

    pub fn on_wheel(&mut self, cursor: Vec2, delta_y: f64) {
        self.camera.wheel(cursor, delta_y, self.settings.camera.wheel_step);
        self.dirty.camera = true;
    }

    /// Zoom in on a task and center it on the canvas.
    pub fn on_double_click(&mut self, task_id: &TaskId) -> Result<(), MindmapError> {
        let center = self.visible_task_center(task_id)?;
        self.camera.focus(center, self.canvas, self.settings.camera.focus_zoom);
        self.dirty.camera = true;
        Ok(())
    }

    pub fn reset_camera(&mut self) {
        self.camera.reset();
        self.dirty.camera = true;
    }

    /// Spread a task's steps evenly around it again, dropping manual placement.
    pub fn recenter(&mut self, task_id: &TaskId) -> Result<(), MindmapError> {
        if !self.is_visible(task_id) {
            return Err(MindmapError::UnknownTask(task_id.clone()));
        }
        for (key, pos) in self.engine.recenter(task_id) {
            self.step_positions.insert(key, pos);
        }
        self.dirty.steps = true;
        self.flush();
        Ok(())
    }

    /// Remove a step from its task's effective label list, durably.
    pub fn delete_step(&mut self, key: &StepKey) -> Result<(), MindmapError> {
        if !self.is_visible(&key.task_id) {
            return Err(MindmapError::UnknownTask(key.task_id.clone()));
        }
        let next = self
            .plans
            .get(&key.task_id)
            .filter(|plan| plan.contains(&key.label))
            .map(|plan| plan.without(&key.label))
            .ok_or_else(|| MindmapError::UnknownStep(key.clone()))?;

        self.store.save_step_labels(&key.task_id, &next.labels);
        self.plans.insert(key.task_id.clone(), next);
        self.step_positions.remove(key);

        if matches!(&self.gesture, Gesture::DraggingStep { key: dragged, .. } if dragged == key) {
            self.gesture = Gesture::Idle;
        }
        self.rebuild_simulations();
        self.dirty.steps = true;
        self.flush();
        Ok(())
    }

    /// Add an idea bubble at the middle of the canvas. Returns its id.
    pub fn add_idea(&mut self, label: impl Into<String>) -> String {
        let color = palette_color(&self.settings.ideas.palette, self.ideas.len());
        let idea = new_idea(label, self.canvas_center_world(), color);
        let id = idea.id.clone();
        self.ideas.push(idea);
        self.dirty.ideas = true;
        self.flush();
        id
    }

    fn idea_mut(&mut self, id: &str) -> Result<&mut IdeaNode, MindmapError> {
        self.ideas
            .iter_mut()
            .find(|idea| idea.id == id)
            .ok_or_else(|| MindmapError::UnknownIdea(id.to_string()))
    }

    pub fn rename_idea(&mut self, id: &str, label: impl Into<String>) -> Result<(), MindmapError> {
        self.idea_mut(id)?.label = label.into();
        self.dirty.ideas = true;
        self.flush();
        Ok(())
    }

    pub fn recolor_idea(&mut self, id: &str, color: impl Into<String>) -> Result<(), MindmapError> {
        self.idea_mut(id)?.color = color.into();
        self.dirty.ideas = true;
        self.flush();
        Ok(())
    }

    pub fn delete_idea(&mut self, id: &str) -> Result<(), MindmapError> {
        let before = self.ideas.len();
        self.ideas.retain(|idea| idea.id != id);
        if self.ideas.len() == before {
            return Err(MindmapError::UnknownIdea(id.to_string()));
        }
        if matches!(&self.gesture, Gesture::DraggingIdea { id: dragged, .. } if dragged == id) {
            self.gesture = Gesture::Idle;
        }
        self.dirty.ideas = true;
        self.flush();
        Ok(())
    }

    fn submit(&self, action: MindmapAction) -> Result<(), MindmapError> {
        if !self.is_visible(action.task_id()) {
            return Err(MindmapError::UnknownTask(action.task_id().clone()));
        }
        self.actions
            .submit(action)
            .map_err(|err| MindmapError::ActionRejected(format!("{err:#}")))
    }

    pub fn request_plan(&self, id: &TaskId) -> Result<(), MindmapError> {
        self.submit(MindmapAction::RequestPlan { id: id.clone() })
    }

    pub fn request_assist(&self, id: &TaskId, kind: AssistKind) -> Result<(), MindmapError> {
        self.submit(MindmapAction::RequestAssist {
            id: id.clone(),
            kind,
        })
    }

    pub fn request_status_change(
        &self,
        id: &TaskId,
        status: TaskStatus,
    ) -> Result<(), MindmapError> {
        self.submit(MindmapAction::ChangeStatus {
            id: id.clone(),
            status,
        })
    }

    pub fn request_file_upload(
        &self,
        id: &TaskId,
        path: impl Into<PathBuf>,
    ) -> Result<(), MindmapError> {
        self.submit(MindmapAction::UploadFile {
            id: id.clone(),
            path: path.into(),
        })
    }

    pub fn request_task_deletion(&self, id: &TaskId) -> Result<(), MindmapError> {
        self.submit(MindmapAction::DeleteTask { id: id.clone() })
    }

    pub fn request_start_now(&self, id: &TaskId) -> Result<(), MindmapError> {
        self.submit(MindmapAction::StartNow { id: id.clone() })
    }

    pub fn request_notes_update(
        &self,
        id: &TaskId,
        text: impl Into<String>,
    ) -> Result<(), MindmapError> {
        self.submit(MindmapAction::UpdateNotes {
            id: id.clone(),
            text: text.into(),
        })
    }

    /// What the pointer is over, topmost first: steps, then ideas, then tasks.
    pub fn hit_test(&self, screen: Vec2) -> HitTarget {
        let world = self.camera.screen_to_world(screen);
        let step_radii = self.step_radii();

        for task in self.tasks.iter().rev() {
            let Some(plan) = self.plans.get(&task.id) else {
                continue;
            };
            for label in plan.labels.iter().rev() {
                let key = StepKey::new(task.id.clone(), label.clone());
                if let Some(pos) = self.step_positions.get(&key) {
                    if ellipse_contains(*pos, step_radii, world) {
                        return HitTarget::Step(key);
                    }
                }
            }
        }

        let idea_radius = self.settings.ideas.radius;
        if let Some(idea) = self
            .ideas
            .iter()
            .rev()
            .find(|idea| idea.position().distance(world) <= idea_radius)
        {
            return HitTarget::Idea(idea.id.clone());
        }

        for task in self.tasks.iter().rev() {
            let Some(pos) = self.task_position(&task.id) else {
                continue;
            };
            let size = self.task_size(&task.id);
            if world.x >= pos.x
                && world.x <= pos.x + size.width
                && world.y >= pos.y
                && world.y <= pos.y + size.height
            {
                return HitTarget::Task(task.id.clone());
            }
        }
        HitTarget::Canvas
    }

    /// Everything the host needs to draw a frame, in screen coordinates.
    pub fn scene(&self) -> MindmapScene {
        let camera = &self.camera;
        let step_radii = self.step_radii();
        let mut scene = MindmapScene {
            pan: camera.pan,
            zoom: camera.zoom,
            ..MindmapScene::default()
        };

        for task in &self.tasks {
            let Some(pos) = self.task_position(&task.id) else {
                continue;
            };
            let size = self.task_size(&task.id);
            let top_left = camera.world_to_screen(pos);
            let screen_size = camera.world_to_screen_size(size);
            let total = self.schedule.slot_count(&task.id);
            scene.tasks.push(TaskNodeView {
                id: task.id.clone(),
                title: task.title.clone(),
                status: task.status,
                priority: task.priority,
                rect: ScreenRect {
                    x: top_left.x,
                    y: top_left.y,
                    width: screen_size.width,
                    height: screen_size.height,
                },
                slot_count: total,
            });

            let Some(plan) = self.plans.get(&task.id) else {
                continue;
            };
            let center = pos + size.half();
            let counts = plan.slot_counts(total);
            for (idx, label) in plan.labels.iter().enumerate() {
                let key = StepKey::new(task.id.clone(), label.clone());
                let Some(step) = self.step_position(&key) else {
                    continue;
                };
                let line = anchor_line(center, size.half(), step, step_radii);
                scene.connectors.push(ConnectorView {
                    key: key.clone(),
                    from: camera.world_to_screen(line.a),
                    to: camera.world_to_screen(line.b),
                });
                scene.steps.push(StepBubbleView {
                    key,
                    label: label.clone(),
                    center: camera.world_to_screen(step),
                    radii: step_radii * camera.zoom,
                    slot_count: counts.get(idx).copied(),
                });
            }
        }

        let idea_radius = self.settings.ideas.radius * camera.zoom;
        let mut idea_screen = HashMap::with_capacity(self.ideas.len());
        for idea in &self.ideas {
            let center = camera.world_to_screen(idea.position());
            idea_screen.insert(idea.id.as_str(), center);
            scene.ideas.push(IdeaView {
                id: idea.id.clone(),
                label: idea.label.clone(),
                color: idea.color.clone(),
                center,
                radius: idea_radius,
            });
        }
        for link in idea_links(&self.ideas, self.settings.ideas.link_neighbors) {
            if let (Some(from), Some(to)) = (
                idea_screen.get(link.a.as_str()).copied(),
                idea_screen.get(link.b.as_str()).copied(),
            ) {
                scene.idea_links.push(IdeaLinkView {
                    a: link.a,
                    b: link.b,
                    from,
                    to,
                });
            }
        }
        scene
    }

    /// Persist every section changed since the last flush. Failures are logged by the
    /// store; the in-memory layout keeps working either way.
    pub fn flush(&mut self) {
        let dirty = std::mem::take(&mut self.dirty);
        if dirty.tasks {
            self.store.save_task_positions(&self.task_positions);
        }
        if dirty.steps {
            self.store.save_step_positions(&self.step_positions);
        }
        if dirty.ideas {
            self.store.save_ideas(&self.ideas);
        }
        if dirty.camera && self.settings.camera.persist {
            self.store.save(CAMERA_KEY, &self.camera);
        }
    }

    /// Stop every simulation and persist what is left.
    pub fn shutdown(&mut self) {
        self.gesture = Gesture::Idle;
        self.engine.stop_all();
        self.flush();
    }
}

impl EventListener for MindmapController {
    fn handle_event(&mut self, event: &PlannerEvent) {
        let mut tasks = self.tasks.clone();
        let mut schedule = self.schedule.clone();
        match event {
            PlannerEvent::TaskCreated { task } | PlannerEvent::TaskUpdated { task } => {
                match tasks.iter_mut().find(|existing| existing.id == task.id) {
                    Some(existing) => *existing = task.clone(),
                    None => tasks.push(task.clone()),
                }
            }
            PlannerEvent::TaskDeleted { id } => tasks.retain(|task| &task.id != id),
            PlannerEvent::PlanUpdated { schedule: next } => schedule = next.clone(),
            PlannerEvent::Snapshot {
                tasks: next_tasks,
                schedule: next_schedule,
            } => {
                tasks = next_tasks.clone();
                schedule = next_schedule.clone();
            }
        }
        self.sync_tasks(tasks, schedule);
    }
}
