use itertools::Itertools;

use crate::capture::KeyEvent;

/// Local timing figures for one captured attempt, shown after a sample is saved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSummary {
    pub press_count: usize,
    pub release_count: usize,
    pub mean_hold_ms: Option<f64>,
    pub hold_std_dev_ms: Option<f64>,
    pub mean_latency_ms: Option<f64>,
    pub wpm: Option<f64>,
}

impl SessionSummary {
    pub fn from_events(events: &[KeyEvent]) -> Self {
        let press_times: Vec<f64> = events
            .iter()
            .filter(|e| e.is_press())
            .map(KeyEvent::time_ms)
            .collect();

        let holds: Vec<f64> = events.iter().filter_map(KeyEvent::hold_time_ms).collect();

        let latencies: Vec<f64> = press_times
            .iter()
            .tuple_windows()
            .map(|(a, b)| b - a)
            .collect();

        let printable_presses = events
            .iter()
            .filter(|e| e.is_press() && e.key().chars().count() == 1)
            .count();

        let span_ms = match (press_times.first(), events.last()) {
            (Some(first), Some(last)) => last.time_ms() - first,
            _ => 0.0,
        };
        let wpm = if span_ms > 0.0 {
            Some((printable_presses as f64 / 5.0) / (span_ms / 60_000.0))
        } else {
            None
        };

        Self {
            press_count: press_times.len(),
            release_count: events.len() - press_times.len(),
            mean_hold_ms: mean(&holds),
            hold_std_dev_ms: std_dev(&holds),
            mean_latency_ms: mean(&latencies),
            wpm,
        }
    }
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = data_mean - *value;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;

    Some(variance.sqrt())
}
