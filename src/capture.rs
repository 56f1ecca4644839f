use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

pub const DEFAULT_TERMINATION_KEY: &str = "Enter";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Press,
    Release,
}

/// One observation in a typing session's timeline.
///
/// Serializes as `{"event": "press" | "release", "key", "time_ms"}`, with
/// `hold_time_ms` (number or null) on releases only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum KeyEvent {
    Press {
        key: String,
        time_ms: f64,
    },
    Release {
        key: String,
        time_ms: f64,
        hold_time_ms: Option<f64>,
    },
}

impl KeyEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            KeyEvent::Press { .. } => EventKind::Press,
            KeyEvent::Release { .. } => EventKind::Release,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            KeyEvent::Press { key, .. } | KeyEvent::Release { key, .. } => key,
        }
    }

    pub fn time_ms(&self) -> f64 {
        match self {
            KeyEvent::Press { time_ms, .. } | KeyEvent::Release { time_ms, .. } => *time_ms,
        }
    }

    /// Always `None` for presses.
    pub fn hold_time_ms(&self) -> Option<f64> {
        match self {
            KeyEvent::Press { .. } => None,
            KeyEvent::Release { hold_time_ms, .. } => *hold_time_ms,
        }
    }

    pub fn is_press(&self) -> bool {
        self.kind() == EventKind::Press
    }
}

/// Captures key press/release timing for a single typing attempt.
///
/// Timestamps passed in are absolute milliseconds from any monotonic clock;
/// recorded offsets are relative to the first key-down since the last reset.
#[derive(Debug, Clone)]
pub struct Recorder {
    events: Vec<KeyEvent>,
    open_presses: HashMap<String, f64>,
    session_start: Option<f64>,
    termination_key: String,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self::with_termination_key(DEFAULT_TERMINATION_KEY)
    }

    pub fn with_termination_key(key: impl Into<String>) -> Self {
        Self {
            events: Vec::new(),
            open_presses: HashMap::new(),
            session_start: None,
            termination_key: key.into(),
        }
    }

    pub fn termination_key(&self) -> &str {
        &self.termination_key
    }

    pub fn reset(&mut self) {
        self.events.clear();
        self.open_presses.clear();
        self.session_start = None;
    }

    pub fn on_key_down(&mut self, key: &str, at_ms: f64) {
        let start = *self.session_start.get_or_insert(at_ms);

        self.events.push(KeyEvent::Press {
            key: key.to_string(),
            time_ms: (at_ms - start).max(0.0),
        });

        // key-repeat keeps the first press time for hold computation
        if !self.open_presses.contains_key(key) {
            self.open_presses.insert(key.to_string(), at_ms);
        }
    }

    /// Records a release. Returns the whole log when `key` is the
    /// termination key, signalling that the attempt is complete.
    pub fn on_key_up(&mut self, key: &str, at_ms: f64) -> Option<&[KeyEvent]> {
        let start = self.session_start?;

        let hold_time_ms = self
            .open_presses
            .remove(key)
            .map(|pressed_at| (at_ms - pressed_at).max(0.0));

        if hold_time_ms.is_none() {
            trace!(key, "release without a pending press");
        }

        self.events.push(KeyEvent::Release {
            key: key.to_string(),
            time_ms: (at_ms - start).max(0.0),
            hold_time_ms,
        });

        if key == self.termination_key {
            Some(&self.events)
        } else {
            None
        }
    }

    pub fn events(&self) -> &[KeyEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn has_started(&self) -> bool {
        self.session_start.is_some()
    }

    pub fn open_press_count(&self) -> usize {
        self.open_presses.len()
    }
}
