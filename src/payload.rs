//! Wire shapes exchanged with the classification backend.

use serde::{Deserialize, Serialize};

use crate::capture::KeyEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SampleType {
    /// Typed against a known reference sentence
    Diverse,
    /// Typed freely, no reference available
    Free,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SamplePayload<'a> {
    pub events: &'a [KeyEvent],
    pub accuracy: Option<f64>,
    pub sample_type: SampleType,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PredictionRequest<'a> {
    pub events: &'a [KeyEvent],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub predicted_user: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub username: String,
    pub samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub username: String,
    pub avg_accuracy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    pub username: String,
    pub total_samples: usize,
    #[serde(default)]
    pub avg_wpm: f64,
    #[serde(default)]
    pub avg_accuracy: Option<f64>,
    #[serde(default)]
    pub avg_hold_time_ms: f64,
    #[serde(default)]
    pub avg_hold_std_ms: f64,
    #[serde(default)]
    pub avg_latency_ms: f64,
}

/// Body of a non-2xx response
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
    pub msg: Option<String>,
}

impl ErrorBody {
    pub fn message(self) -> Option<String> {
        self.error.or(self.msg)
    }
}
