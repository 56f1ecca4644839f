use serde::{Deserialize, Serialize};

use crate::capture::DEFAULT_TERMINATION_KEY;

pub const DEFAULT_SENTENCES: [&str; 5] = [
    "My zealous puppy quickly vexed the judge",
    "How jumping frogs can level six piqued gymnasts",
    "A wizard's job is to vex chumps quickly in fog",
    "Pack my box with five dozen liquor jugs",
    "The five boxing wizards jump quickly",
];

/// Which stage of enrollment a user is in, derived from their sample count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Diverse,
    Free,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: Phase,
    pub diverse_done: usize,
    pub free_done: usize,
}

/// Everything a client run needs to know about how samples are collected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingPlan {
    pub diverse_sentences: Vec<String>,
    pub free_samples_required: usize,
    pub min_training_events: usize,
    pub min_prediction_events: usize,
    pub termination_key: String,
}

impl Default for TrainingPlan {
    fn default() -> Self {
        Self {
            diverse_sentences: DEFAULT_SENTENCES.iter().map(|s| s.to_string()).collect(),
            free_samples_required: 5,
            min_training_events: 10,
            min_prediction_events: 15,
            termination_key: DEFAULT_TERMINATION_KEY.to_string(),
        }
    }
}

impl TrainingPlan {
    pub fn diverse_samples_required(&self) -> usize {
        self.diverse_sentences.len()
    }

    pub fn total_samples_required(&self) -> usize {
        self.diverse_samples_required() + self.free_samples_required
    }

    /// Sentence for the given diverse sample index, clamped to the last one
    pub fn sentence(&self, idx: usize) -> &str {
        let last = self.diverse_sentences.len().saturating_sub(1);
        self.diverse_sentences
            .get(idx.min(last))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn progress_for(&self, sample_count: usize) -> Progress {
        let diverse = self.diverse_samples_required();
        if sample_count >= self.total_samples_required() {
            Progress {
                phase: Phase::Ready,
                diverse_done: diverse,
                free_done: sample_count - diverse,
            }
        } else if sample_count < diverse {
            Progress {
                phase: Phase::Diverse,
                diverse_done: sample_count,
                free_done: 0,
            }
        } else {
            Progress {
                phase: Phase::Free,
                diverse_done: diverse,
                free_done: sample_count - diverse,
            }
        }
    }
}
