//! Step labels for a task and the per-step slot annotation.

use pagelm_core::Task;
use serde::{Deserialize, Serialize};

struct StepTemplate {
    keywords: &'static [&'static str],
    steps: &'static [(&'static str, u32)],
}

// Checked in order; the first template with a matching keyword wins.
const TEMPLATES: &[StepTemplate] = &[
    StepTemplate {
        keywords: &["essay", "paper", "report", "write"],
        steps: &[
            ("Research", 2),
            ("Outline", 1),
            ("Draft", 3),
            ("Revise", 2),
            ("Proofread", 1),
            ("Submit", 1),
        ],
    },
    StepTemplate {
        keywords: &["exam", "test", "midterm", "final", "quiz"],
        steps: &[
            ("Gather materials", 1),
            ("Review notes", 3),
            ("Practice questions", 3),
            ("Mock test", 2),
            ("Final review", 1),
        ],
    },
    StepTemplate {
        keywords: &["read", "reading", "chapter"],
        steps: &[("Skim", 1), ("Read", 3), ("Annotate", 2), ("Summarize", 1)],
    },
    StepTemplate {
        keywords: &["problem set", "pset", "homework", "exercises", "assignment"],
        steps: &[
            ("Review concepts", 1),
            ("Attempt problems", 3),
            ("Check answers", 1),
            ("Write up", 2),
        ],
    },
];

const FALLBACK: &[(&str, u32)] = &[("Plan", 1), ("Work", 3), ("Review", 1)];

/// Default workflow steps for a task, inferred from keywords in its title and kind.
pub fn classify(task: &Task) -> &'static [(&'static str, u32)] {
    let text = task.classification_text().to_lowercase();
    TEMPLATES
        .iter()
        .find(|template| template.keywords.iter().any(|kw| text.contains(kw)))
        .map_or(FALLBACK, |template| template.steps)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepSource {
    Heuristic,
    Ai,
    /// The stored list after the user removed a step.
    Override,
}

/// The effective step list for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepPlan {
    pub labels: Vec<String>,
    pub weights: Vec<u32>,
    pub source: StepSource,
}

impl StepPlan {
    pub fn heuristic(task: &Task) -> Self {
        let steps = classify(task);
        Self {
            labels: steps.iter().map(|(label, _)| label.to_string()).collect(),
            weights: steps.iter().map(|(_, weight)| *weight).collect(),
            source: StepSource::Heuristic,
        }
    }

    /// A plan from an explicit label list. Labels the classifier also knows keep its
    /// weight; anything else weighs 1.
    pub fn from_labels(task: &Task, labels: Vec<String>, source: StepSource) -> Self {
        let defaults = classify(task);
        let weights = labels
            .iter()
            .map(|label| {
                defaults
                    .iter()
                    .find(|(known, _)| known.eq_ignore_ascii_case(label))
                    .map_or(1, |(_, weight)| *weight)
            })
            .collect();
        Self {
            labels,
            weights,
            source,
        }
    }

    /// Stored labels win over the classifier whenever they exist, even if empty.
    pub fn resolve(task: &Task, stored: Option<Vec<String>>) -> Self {
        match stored {
            Some(labels) => Self::from_labels(task, labels, StepSource::Ai),
            None => Self::heuristic(task),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// The plan with `label` removed, marked as a user override.
    pub fn without(&self, label: &str) -> Self {
        let (labels, weights) = self
            .labels
            .iter()
            .zip(&self.weights)
            .filter(|(l, _)| l.as_str() != label)
            .map(|(l, w)| (l.clone(), *w))
            .unzip();
        Self {
            labels,
            weights,
            source: StepSource::Override,
        }
    }

    /// Estimated slots per step for a task with `total` scheduled slots.
    pub fn slot_counts(&self, total: u32) -> Vec<u32> {
        distribute_slots(total, &self.weights)
    }
}

/// Split `total` into integer parts proportional to `weights` with the largest-remainder
/// method. Parts always sum to `total`. Leftover units go to the largest fractional
/// parts, ties broken by larger weight and then by position. Returns nothing for a zero
/// total or an empty weight list; an all-zero weight list is split evenly.
pub fn distribute_slots(total: u32, weights: &[u32]) -> Vec<u32> {
    if total == 0 || weights.is_empty() {
        return Vec::new();
    }

    let sum: u64 = weights.iter().map(|&w| u64::from(w)).sum();
    let (weights, sum): (Vec<u64>, u64) = if sum == 0 {
        (vec![1; weights.len()], weights.len() as u64)
    } else {
        (weights.iter().map(|&w| u64::from(w)).collect(), sum)
    };

    let total = u64::from(total);
    let mut counts = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for (idx, &weight) in weights.iter().enumerate() {
        let share = total * weight;
        counts.push(share / sum);
        remainders.push((share % sum, weight, idx));
    }

    let assigned: u64 = counts.iter().sum();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));
    for &(_, _, idx) in remainders.iter().take((total - assigned) as usize) {
        counts[idx] += 1;
    }

    counts.into_iter().map(|c| c as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn labels(plan: &StepPlan) -> Vec<&str> {
        plan.labels.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_essay_scenario() {
        let task = Task::new("t1", "Write essay on climate change");
        let plan = StepPlan::heuristic(&task);
        assert_eq!(
            labels(&plan),
            ["Research", "Outline", "Draft", "Revise", "Proofread", "Submit"]
        );
        assert_eq!(plan.weights, [2, 1, 3, 2, 1, 1]);
        assert_eq!(plan.source, StepSource::Heuristic);

        let counts = plan.slot_counts(10);
        assert_eq!(counts.iter().sum::<u32>(), 10);
        assert_eq!(counts, [2, 1, 3, 2, 1, 1]);
    }

    #[test]
    fn test_classifier_patterns() {
        let first = |title: &str| StepPlan::heuristic(&Task::new("t", title)).labels[0].clone();
        assert_eq!(first("Midterm prep"), "Gather materials");
        assert_eq!(first("Read chapter 4"), "Skim");
        assert_eq!(first("Physics pset 3"), "Review concepts");
        assert_eq!(first("Groceries"), "Plan");
        assert_eq!(
            StepPlan::heuristic(&Task::new("t", "Biology").with_kind("Quiz")).labels[0],
            "Gather materials"
        );
        // Essay keywords are checked before exam keywords.
        assert_eq!(first("Write test report"), "Research");
    }

    #[test]
    fn test_ai_labels_reuse_known_weights() {
        let task = Task::new("t1", "Essay draft");
        let plan = StepPlan::from_labels(
            &task,
            vec!["Draft".into(), "Find sources".into(), "research".into()],
            StepSource::Ai,
        );
        assert_eq!(plan.weights, [3, 1, 2]);
    }

    #[test]
    fn test_stored_empty_list_overrides_heuristic() {
        let task = Task::new("t1", "Write essay");
        let plan = StepPlan::resolve(&task, Some(Vec::new()));
        assert!(plan.is_empty());
        assert!(plan.slot_counts(5).is_empty());
        assert_eq!(StepPlan::resolve(&task, None).len(), 6);
    }

    #[test]
    fn test_without_marks_override() {
        let plan = StepPlan::heuristic(&Task::new("t1", "Reading"));
        let trimmed = plan.without("Annotate");
        assert_eq!(labels(&trimmed), ["Skim", "Read", "Summarize"]);
        assert_eq!(trimmed.weights, [1, 3, 1]);
        assert_eq!(trimmed.source, StepSource::Override);
    }

    #[test]
    fn test_distribute_edge_cases() {
        assert!(distribute_slots(0, &[1, 2]).is_empty());
        assert!(distribute_slots(5, &[]).is_empty());
        assert_eq!(distribute_slots(3, &[0, 0, 0]), [1, 1, 1]);
        assert_eq!(distribute_slots(2, &[0, 0, 0]), [1, 1, 0]);
        // 7 * [1,3,1] / 5 = [1.4, 4.2, 1.4]; the leftover unit goes to the first tie.
        assert_eq!(distribute_slots(7, &[1, 3, 1]), [2, 4, 1]);
        // 2 * [1,3] / 4 = [0.5, 1.5]; equal remainders prefer the heavier step.
        assert_eq!(distribute_slots(2, &[1, 3]), [0, 2]);
    }

    proptest! {
        #[test]
        fn prop_counts_sum_to_total(
            total in 1u32..500,
            weights in prop::collection::vec(0u32..20, 1..12),
        ) {
            let counts = distribute_slots(total, &weights);
            prop_assert_eq!(counts.len(), weights.len());
            prop_assert_eq!(counts.iter().sum::<u32>(), total);
        }

        #[test]
        fn prop_counts_follow_weight_order(
            total in 1u32..500,
            weights in prop::collection::vec(1u32..20, 1..12),
        ) {
            let counts = distribute_slots(total, &weights);
            for i in 0..weights.len() {
                for j in 0..weights.len() {
                    if weights[i] > weights[j] {
                        prop_assert!(counts[i] >= counts[j]);
                    }
                }
            }
        }
    }
}
