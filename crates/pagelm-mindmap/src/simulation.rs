//! Per-task force layout.
//!
//! Each task gets its own small simulation: node 0 is the task's center, always pinned,
//! and the remaining nodes are that task's step bubbles. Every tick accumulates
//! many-body repulsion, a radial pull toward a fixed ring around the center and a
//! collision correction into node velocities, then integrates with velocity decay.
//! A cooling factor (alpha) scales the first two forces and decays geometrically toward
//! `alpha_target`; once it drops below `alpha_min` with no target holding it up, ticks
//! become no-ops until something reheats the simulation.

use crate::settings::SimulationSettings;
use pagelm_core::{StepKey, TaskId, Vec2};
use std::collections::BTreeMap;
use std::f64::consts::TAU;

const CENTER: usize = 0;
/// Squared distance floor for the many-body force.
const DISTANCE_MIN2: f64 = 1.0;

/// Evenly spaced points on a circle, at angles `2π·i/n`.
pub fn circle_positions(center: Vec2, count: usize, radius: f64) -> Vec<Vec2> {
    (0..count)
        .map(|i| center.on_circle(radius, TAU * i as f64 / count as f64))
        .collect()
}

#[derive(Debug, Clone)]
pub struct SimNode {
    /// `None` for the center node.
    pub label: Option<String>,
    pub pos: Vec2,
    pub vel: Vec2,
    pub fixed: Option<Vec2>,
}

impl SimNode {
    fn step(label: String, pos: Vec2) -> Self {
        Self {
            label: Some(label),
            pos,
            vel: Vec2::ZERO,
            fixed: None,
        }
    }
}

/// Deterministic generator used to separate exactly coincident nodes.
#[derive(Debug, Clone)]
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.0 as f64 / 4_294_967_296.0
    }

    fn jiggle(&mut self) -> f64 {
        (self.next() - 0.5) * 1e-6
    }
}

#[derive(Debug, Clone)]
pub struct TaskSimulation {
    task_id: TaskId,
    nodes: Vec<SimNode>,
    params: SimulationSettings,
    alpha: f64,
    alpha_target: f64,
    rng: Lcg,
    stopped: bool,
}

impl TaskSimulation {
    pub fn new(
        task_id: TaskId,
        center: Vec2,
        steps: Vec<(String, Vec2)>,
        params: &SimulationSettings,
    ) -> Self {
        let mut nodes = Vec::with_capacity(steps.len() + 1);
        nodes.push(SimNode {
            label: None,
            pos: center,
            vel: Vec2::ZERO,
            fixed: Some(center),
        });
        nodes.extend(
            steps
                .into_iter()
                .map(|(label, pos)| SimNode::step(label, pos)),
        );

        Self {
            task_id,
            nodes,
            params: params.clone(),
            alpha: params.initial_alpha,
            alpha_target: 0.0,
            rng: Lcg(1),
            stopped: false,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    pub fn center(&self) -> Vec2 {
        self.nodes[CENTER].pos
    }

    pub fn step_count(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < self.params.alpha_min && self.alpha_target < self.params.alpha_min
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Sum of squared step velocities.
    pub fn kinetic_energy(&self) -> f64 {
        self.nodes[1..]
            .iter()
            .map(|node| node.vel.x * node.vel.x + node.vel.y * node.vel.y)
            .sum()
    }

    pub fn step_position(&self, label: &str) -> Option<Vec2> {
        self.step_index(label).map(|idx| self.nodes[idx].pos)
    }

    pub fn step_positions(&self) -> impl Iterator<Item = (StepKey, Vec2)> + '_ {
        self.nodes[1..].iter().filter_map(|node| {
            node.label
                .as_ref()
                .map(|label| (StepKey::new(self.task_id.clone(), label.clone()), node.pos))
        })
    }

    fn step_index(&self, label: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|node| node.label.as_deref() == Some(label))
    }

    /// Raise alpha to at least `alpha`, waking a settled simulation.
    pub fn reheat(&mut self, alpha: f64) {
        self.alpha = self.alpha.max(alpha);
    }

    pub fn set_alpha_target(&mut self, target: f64) {
        self.alpha_target = target;
    }

    /// Move the pinned center (and the radial origin with it). Returns whether it moved.
    pub fn set_center(&mut self, center: Vec2) -> bool {
        let node = &mut self.nodes[CENTER];
        let moved = node.pos != center;
        node.pos = center;
        node.fixed = Some(center);
        node.vel = Vec2::ZERO;
        moved
    }

    /// Shift every step node, pinned ones included, by `delta`.
    pub fn translate_steps(&mut self, delta: Vec2) {
        for node in &mut self.nodes[1..] {
            node.pos += delta;
            if let Some(fixed) = node.fixed.as_mut() {
                *fixed += delta;
            }
        }
    }

    pub fn pin(&mut self, label: &str, pos: Vec2) -> bool {
        let Some(idx) = self.step_index(label) else {
            return false;
        };
        let node = &mut self.nodes[idx];
        node.fixed = Some(pos);
        node.pos = pos;
        node.vel = Vec2::ZERO;
        true
    }

    pub fn unpin(&mut self, label: &str) -> bool {
        let Some(idx) = self.step_index(label) else {
            return false;
        };
        self.nodes[idx].fixed = None;
        true
    }

    /// Redistribute every step evenly on the radial ring around the current center.
    /// Pins are dropped.
    pub fn recenter(&mut self) -> Vec<(StepKey, Vec2)> {
        let ring = circle_positions(self.center(), self.step_count(), self.params.radial_radius);
        for (node, pos) in self.nodes[1..].iter_mut().zip(ring) {
            node.pos = pos;
            node.vel = Vec2::ZERO;
            node.fixed = None;
        }
        self.step_positions().collect()
    }

    /// Advance one step. Returns `false` without touching anything when stopped or
    /// settled.
    pub fn tick(&mut self) -> bool {
        if self.stopped || self.is_settled() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;

        self.apply_many_body();
        self.apply_radial();
        self.apply_collide();

        let keep = 1.0 - self.params.velocity_decay;
        for node in &mut self.nodes {
            match node.fixed {
                Some(fixed) => {
                    node.pos = fixed;
                    node.vel = Vec2::ZERO;
                }
                None => {
                    node.vel = node.vel * keep;
                    node.pos += node.vel;
                }
            }
        }
        true
    }

    fn apply_many_body(&mut self) {
        let strength = self.params.charge_strength;
        let alpha = self.alpha;
        let count = self.nodes.len();

        for i in 0..count {
            if self.nodes[i].fixed.is_some() {
                continue;
            }
            let mut dv = Vec2::ZERO;
            for j in 0..count {
                if i == j {
                    continue;
                }
                let mut x = self.nodes[j].pos.x - self.nodes[i].pos.x;
                let mut y = self.nodes[j].pos.y - self.nodes[i].pos.y;
                if x == 0.0 {
                    x = self.rng.jiggle();
                }
                if y == 0.0 {
                    y = self.rng.jiggle();
                }
                let mut l = x * x + y * y;
                if l < DISTANCE_MIN2 {
                    l = (DISTANCE_MIN2 * l).sqrt();
                }
                let w = strength * alpha / l;
                dv += Vec2::new(x * w, y * w);
            }
            self.nodes[i].vel += dv;
        }
    }

    fn apply_radial(&mut self) {
        let center = self.nodes[CENTER].pos;
        let radius = self.params.radial_radius;
        let factor = self.params.radial_strength * self.alpha;

        for node in &mut self.nodes[1..] {
            if node.fixed.is_some() {
                continue;
            }
            let mut dx = node.pos.x - center.x;
            let mut dy = node.pos.y - center.y;
            if dx == 0.0 {
                dx = 1e-6;
            }
            if dy == 0.0 {
                dy = 1e-6;
            }
            let r = dx.hypot(dy);
            let k = (radius - r) * factor / r;
            node.vel += Vec2::new(dx * k, dy * k);
        }
    }

    fn apply_collide(&mut self) {
        let radius = self.params.collide_separation / 2.0;
        if radius <= 0.0 {
            return;
        }
        let strength = self.params.collide_strength;
        let min_dist = radius * 2.0;
        // Equal radii split every correction evenly.
        let share = 0.5;
        let count = self.nodes.len();

        for i in 0..count {
            let predicted_i = self.nodes[i].pos + self.nodes[i].vel;
            for j in (i + 1)..count {
                let predicted_j = self.nodes[j].pos + self.nodes[j].vel;
                let mut x = predicted_i.x - predicted_j.x;
                let mut y = predicted_i.y - predicted_j.y;
                let mut l = x * x + y * y;
                if l >= min_dist * min_dist {
                    continue;
                }
                if x == 0.0 {
                    x = self.rng.jiggle();
                    l += x * x;
                }
                if y == 0.0 {
                    y = self.rng.jiggle();
                    l += y * y;
                }
                let dist = l.sqrt();
                let k = (min_dist - dist) / dist * strength;
                let correction = Vec2::new(x * k, y * k);

                if self.nodes[i].fixed.is_none() {
                    self.nodes[i].vel += correction * share;
                }
                if self.nodes[j].fixed.is_none() {
                    self.nodes[j].vel -= correction * (1.0 - share);
                }
            }
        }
    }
}

/// Step positions produced by one engine tick, tagged with the engine generation that
/// produced them.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub generation: u64,
    pub positions: Vec<(StepKey, Vec2)>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// What a task simulation is built from.
#[derive(Debug, Clone)]
pub struct TaskSimSpec {
    pub task_id: TaskId,
    pub center: Vec2,
    pub steps: Vec<(String, Vec2)>,
}

/// Owns one simulation per visible task.
///
/// Rebuilding stops every existing instance and bumps the generation; reports carry the
/// generation they were produced under so a consumer can drop anything produced by a
/// superseded set of simulations.
#[derive(Debug)]
pub struct SimulationEngine {
    params: SimulationSettings,
    generation: u64,
    sims: BTreeMap<TaskId, TaskSimulation>,
}

impl SimulationEngine {
    pub fn new(params: SimulationSettings) -> Self {
        Self {
            params,
            generation: 0,
            sims: BTreeMap::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn params(&self) -> &SimulationSettings {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.sims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sims.is_empty()
    }

    pub fn simulation(&self, task_id: &TaskId) -> Option<&TaskSimulation> {
        self.sims.get(task_id)
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.sims.keys()
    }

    pub fn stop_all(&mut self) {
        for sim in self.sims.values_mut() {
            sim.stop();
        }
    }

    /// Discard every simulation and build one per `TaskSimSpec`.
    pub fn rebuild(&mut self, specs: Vec<TaskSimSpec>) {
        self.stop_all();
        self.sims.clear();
        self.generation += 1;
        for spec in specs {
            let sim = TaskSimulation::new(spec.task_id.clone(), spec.center, spec.steps, &self.params);
            self.sims.insert(spec.task_id, sim);
        }
        tracing::debug!(
            "Rebuilt {} task simulations (generation {})",
            self.sims.len(),
            self.generation
        );
    }

    pub fn tick(&mut self) -> TickReport {
        let mut positions = Vec::new();
        for sim in self.sims.values_mut() {
            if sim.tick() {
                positions.extend(sim.step_positions());
            }
        }
        TickReport {
            generation: self.generation,
            positions,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.sims.values().all(|sim| sim.is_settled() || sim.is_stopped())
    }

    /// Move a task's hub. A moved hub wakes the simulation so its steps follow.
    pub fn set_center(&mut self, task_id: &TaskId, center: Vec2) -> bool {
        let moved = match self.sims.get_mut(task_id) {
            Some(sim) => sim.set_center(center),
            None => return false,
        };
        if moved {
            self.reheat(task_id, self.params.drag_alpha_target);
        }
        true
    }

    pub fn translate_steps(&mut self, task_id: &TaskId, delta: Vec2) -> bool {
        match self.sims.get_mut(task_id) {
            Some(sim) => {
                sim.translate_steps(delta);
                true
            }
            None => false,
        }
    }

    /// Hold a task's simulation warm while an interaction is live.
    pub fn hold(&mut self, task_id: &TaskId) {
        let target = self.params.drag_alpha_target;
        if let Some(sim) = self.sims.get_mut(task_id) {
            sim.set_alpha_target(target);
        }
    }

    /// Let a held simulation cool down again.
    pub fn release(&mut self, task_id: &TaskId) {
        if let Some(sim) = self.sims.get_mut(task_id) {
            sim.set_alpha_target(0.0);
        }
    }

    pub fn reheat(&mut self, task_id: &TaskId, alpha: f64) {
        if let Some(sim) = self.sims.get_mut(task_id) {
            sim.reheat(alpha);
        }
    }

    pub fn pin(&mut self, key: &StepKey, pos: Vec2) -> bool {
        self.sims
            .get_mut(&key.task_id)
            .is_some_and(|sim| sim.pin(&key.label, pos))
    }

    pub fn unpin(&mut self, key: &StepKey) -> bool {
        self.sims
            .get_mut(&key.task_id)
            .is_some_and(|sim| sim.unpin(&key.label))
    }

    pub fn recenter(&mut self, task_id: &TaskId) -> Vec<(StepKey, Vec2)> {
        let reheat = self.params.drag_alpha_target;
        match self.sims.get_mut(task_id) {
            Some(sim) => {
                let positions = sim.recenter();
                sim.reheat(reheat);
                positions
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SimulationSettings {
        SimulationSettings::default()
    }

    fn essay_steps() -> Vec<String> {
        ["Research", "Outline", "Draft", "Revise", "Proofread", "Submit"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn scattered_sim(center: Vec2) -> TaskSimulation {
        let offsets = [
            (250.0, -30.0),
            (-10.0, 5.0),
            (3.0, 290.0),
            (-260.0, -200.0),
            (40.0, 42.0),
            (-80.0, 150.0),
        ];
        let steps = essay_steps()
            .into_iter()
            .zip(offsets)
            .map(|(label, (dx, dy))| (label, center + Vec2::new(dx, dy)))
            .collect();
        TaskSimulation::new(TaskId::new("t1"), center, steps, &params())
    }

    fn run_until_settled(sim: &mut TaskSimulation, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while sim.tick() {
            ticks += 1;
            assert!(ticks <= max_ticks, "simulation did not settle in {max_ticks} ticks");
        }
        ticks
    }

    #[test]
    fn test_circle_positions_are_evenly_spaced() {
        let points = circle_positions(Vec2::new(10.0, 10.0), 4, 120.0);
        assert_eq!(points.len(), 4);
        assert!((points[0].x - 130.0).abs() < 1e-9 && (points[0].y - 10.0).abs() < 1e-9);
        assert!((points[1].x - 10.0).abs() < 1e-9 && (points[1].y - 130.0).abs() < 1e-9);
        for p in &points {
            assert!((p.distance(Vec2::new(10.0, 10.0)) - 120.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_alpha_decays_and_settles() {
        let mut sim = scattered_sim(Vec2::new(0.0, 0.0));
        let mut previous = sim.alpha();
        for _ in 0..60 {
            assert!(sim.tick());
            assert!(sim.alpha() < previous);
            previous = sim.alpha();
        }
        assert!(sim.alpha() < 0.005);

        let remaining = run_until_settled(&mut sim, 40);
        assert!(remaining > 0);
        assert!(sim.is_settled());
    }

    #[test]
    fn test_settled_ticks_are_no_ops() {
        let mut sim = scattered_sim(Vec2::new(50.0, -20.0));
        run_until_settled(&mut sim, 200);

        let before: Vec<Vec2> = sim.nodes().iter().map(|n| n.pos).collect();
        assert!(!sim.tick());
        let after: Vec<Vec2> = sim.nodes().iter().map(|n| n.pos).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_motion_dies_out() {
        let mut sim = scattered_sim(Vec2::new(0.0, 0.0));
        for _ in 0..5 {
            sim.tick();
        }
        let early = sim.kinetic_energy();
        run_until_settled(&mut sim, 200);
        let late = sim.kinetic_energy();
        assert!(early > 0.0);
        assert!(late < 1e-3, "residual energy {late}");
        assert!(late < early);
    }

    #[test]
    fn test_center_never_moves() {
        let center = Vec2::new(400.0, 300.0);
        let mut sim = scattered_sim(center);
        run_until_settled(&mut sim, 200);
        assert_eq!(sim.center(), center);
    }

    #[test]
    fn test_steps_spread_around_ring() {
        let center = Vec2::new(0.0, 0.0);
        let steps = essay_steps()
            .into_iter()
            .zip(circle_positions(center, 6, 120.0))
            .collect();
        let mut sim = TaskSimulation::new(TaskId::new("t"), center, steps, &params());
        run_until_settled(&mut sim, 200);

        let positions: Vec<Vec2> = sim.step_positions().map(|(_, p)| p).collect();
        for p in &positions {
            let r = p.distance(center);
            assert!((90.0..180.0).contains(&r), "step at radius {r}");
        }
        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                assert!(a.distance(*b) >= 36.0 - 1e-6);
            }
        }
    }

    #[test]
    fn test_collision_separates_overlapping_steps() {
        let center = Vec2::new(0.0, 0.0);
        let steps = vec![
            ("A".to_string(), Vec2::new(120.0, 0.0)),
            ("B".to_string(), Vec2::new(120.0, 0.0)),
        ];
        let mut sim = TaskSimulation::new(TaskId::new("t"), center, steps, &params());
        run_until_settled(&mut sim, 200);

        let a = sim.step_position("A").unwrap();
        let b = sim.step_position("B").unwrap();
        assert!(a.distance(b) > 30.0, "steps still overlap: {a:?} {b:?}");
    }

    #[test]
    fn test_pinned_step_holds_position_until_unpinned() {
        let mut sim = scattered_sim(Vec2::new(0.0, 0.0));
        let pin = Vec2::new(500.0, 500.0);
        assert!(sim.pin("Draft", pin));
        sim.set_alpha_target(0.7);
        for _ in 0..30 {
            sim.tick();
        }
        assert_eq!(sim.step_position("Draft"), Some(pin));
        assert!(!sim.is_settled());

        assert!(sim.unpin("Draft"));
        sim.set_alpha_target(0.0);
        run_until_settled(&mut sim, 300);
        assert_ne!(sim.step_position("Draft"), Some(pin));
        assert!(!sim.pin("Missing", pin));
    }

    #[test]
    fn test_alpha_target_reheats_settled_simulation() {
        let mut sim = scattered_sim(Vec2::new(0.0, 0.0));
        run_until_settled(&mut sim, 200);
        assert!(!sim.tick());

        sim.set_alpha_target(0.7);
        assert!(sim.tick());
        assert!(sim.alpha() > 0.001);
        sim.set_alpha_target(0.0);
        run_until_settled(&mut sim, 200);
    }

    #[test]
    fn test_translate_moves_pins_too() {
        let mut sim = scattered_sim(Vec2::new(0.0, 0.0));
        sim.pin("Submit", Vec2::new(10.0, 10.0));
        let before = sim.step_position("Research").unwrap();
        sim.translate_steps(Vec2::new(5.0, -5.0));
        assert_eq!(sim.step_position("Research").unwrap(), before + Vec2::new(5.0, -5.0));
        sim.tick();
        assert_eq!(sim.step_position("Submit"), Some(Vec2::new(15.0, 5.0)));
    }

    #[test]
    fn test_recenter_places_steps_on_ring() {
        let center = Vec2::new(-40.0, 70.0);
        let mut sim = scattered_sim(center);
        sim.pin("Draft", Vec2::new(900.0, 900.0));
        let positions = sim.recenter();
        assert_eq!(positions.len(), 6);
        for (i, (key, pos)) in positions.iter().enumerate() {
            let expected = center.on_circle(120.0, TAU * i as f64 / 6.0);
            assert_eq!(key.task_id.as_str(), "t1");
            assert!(pos.distance(expected) < 1e-9);
        }
        assert!(sim.nodes()[1..].iter().all(|n| n.fixed.is_none()));
    }

    #[test]
    fn test_stopped_simulation_never_ticks() {
        let mut sim = scattered_sim(Vec2::new(0.0, 0.0));
        sim.stop();
        assert!(!sim.tick());
    }

    #[test]
    fn test_engine_rebuild_bumps_generation_and_stops_old() {
        let mut engine = SimulationEngine::new(params());
        let spec = |id: &str| TaskSimSpec {
            task_id: TaskId::new(id),
            center: Vec2::ZERO,
            steps: vec![("Plan".to_string(), Vec2::new(120.0, 0.0))],
        };
        engine.rebuild(vec![spec("a"), spec("b")]);
        assert_eq!(engine.generation(), 1);
        assert_eq!(engine.len(), 2);

        let report = engine.tick();
        assert_eq!(report.generation, 1);
        assert_eq!(report.positions.len(), 2);

        engine.rebuild(vec![spec("b")]);
        assert_eq!(engine.generation(), 2);
        assert!(engine.simulation(&TaskId::new("a")).is_none());
        assert_eq!(engine.tick().generation, 2);
    }

    #[test]
    fn test_moved_center_wakes_settled_simulation() {
        let mut engine = SimulationEngine::new(params());
        let id = TaskId::new("a");
        let steps = essay_steps()
            .into_iter()
            .zip(circle_positions(Vec2::ZERO, 6, 120.0))
            .collect();
        engine.rebuild(vec![TaskSimSpec {
            task_id: id.clone(),
            center: Vec2::ZERO,
            steps,
        }]);
        let mut ticks = 0;
        while !engine.tick().is_empty() {
            ticks += 1;
            assert!(ticks < 500);
        }

        assert!(engine.set_center(&id, Vec2::ZERO));
        assert!(engine.is_settled());
        assert!(engine.tick().is_empty());

        let moved = Vec2::new(200.0, 0.0);
        assert!(engine.set_center(&id, moved));
        assert!(!engine.is_settled());
        let mut ticks = 0;
        while !engine.tick().is_empty() {
            ticks += 1;
            assert!(ticks < 500);
        }
        let sim = engine.simulation(&id).unwrap();
        let mean = sim.step_positions().map(|(_, pos)| pos.distance(moved)).sum::<f64>() / 6.0;
        assert!((90.0..=180.0).contains(&mean), "mean radius {mean}");
    }

    #[test]
    fn test_engine_pin_routes_by_task() {
        let mut engine = SimulationEngine::new(params());
        engine.rebuild(vec![TaskSimSpec {
            task_id: TaskId::new("a"),
            center: Vec2::ZERO,
            steps: vec![("Read".to_string(), Vec2::new(120.0, 0.0))],
        }]);
        let key = StepKey::new(TaskId::new("a"), "Read");
        assert!(engine.pin(&key, Vec2::new(1.0, 2.0)));
        assert!(!engine.pin(&StepKey::new(TaskId::new("zzz"), "Read"), Vec2::ZERO));
        engine.hold(&key.task_id);
        engine.tick();
        assert_eq!(
            engine.simulation(&key.task_id).unwrap().step_position("Read"),
            Some(Vec2::new(1.0, 2.0))
        );
        assert!(engine.unpin(&key));
        engine.release(&key.task_id);
    }
}
