use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyboardEnhancementFlags,
};
use tracing::error;

/// A terminal key event stamped with the instant it was read
#[derive(Clone, Debug)]
pub struct TimedKey {
    pub event: KeyEvent,
    pub at: Instant,
}

impl TimedKey {
    pub fn new(event: KeyEvent) -> Self {
        Self {
            event,
            at: Instant::now(),
        }
    }

    /// Milliseconds since `epoch`, as fed to the recorder
    pub fn millis_since(&self, epoch: Instant) -> f64 {
        self.at.saturating_duration_since(epoch).as_secs_f64() * 1000.0
    }

    /// Key-repeat is reported as another press
    pub fn is_press(&self) -> bool {
        matches!(self.event.kind, KeyEventKind::Press | KeyEventKind::Repeat)
    }
}

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(TimedKey),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait KeyEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        // stamp as close to the read as possible; the main loop may be busy
        // with a backend call when the key arrives
        std::thread::spawn(move || loop {
            let evt = match event::read() {
                Ok(CtEvent::Key(key)) => AppEvent::Key(TimedKey::new(key)),
                Ok(CtEvent::Resize(_, _)) => AppEvent::Resize,
                Ok(_) => continue,
                Err(e) => {
                    error!(error = %e, "terminal event read failed");
                    break;
                }
            };
            if tx.send(evt).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl KeyEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: KeyEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: KeyEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> AppEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => AppEvent::Tick,
        }
    }
}

/// Progressive-enhancement flags pushed on terminals that support them.
///
/// Release events for text keys, Enter, Tab and Backspace, and modifier key
/// events, are only reported when every key is sent as an escape code.
/// Alternate keys keep shifted characters reported as the shifted glyph.
pub fn keyboard_enhancement_flags() -> KeyboardEnhancementFlags {
    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
        | KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS
}

/// Browser-style key identity for a terminal key code.
///
/// Returns `None` for codes with no sensible identity (media keys, etc.).
pub fn key_name(code: &KeyCode) -> Option<String> {
    let name = match code {
        KeyCode::Char(c) => return Some(c.to_string()),
        KeyCode::Enter => "Enter",
        KeyCode::Backspace => "Backspace",
        KeyCode::Tab | KeyCode::BackTab => "Tab",
        KeyCode::Delete => "Delete",
        KeyCode::Esc => "Escape",
        KeyCode::Left => "ArrowLeft",
        KeyCode::Right => "ArrowRight",
        KeyCode::Up => "ArrowUp",
        KeyCode::Down => "ArrowDown",
        KeyCode::Home => "Home",
        KeyCode::End => "End",
        KeyCode::PageUp => "PageUp",
        KeyCode::PageDown => "PageDown",
        KeyCode::Insert => "Insert",
        KeyCode::CapsLock => "CapsLock",
        KeyCode::F(n) => return Some(format!("F{}", n)),
        KeyCode::Modifier(m) => {
            use crossterm::event::ModifierKeyCode::*;
            match m {
                LeftShift | RightShift => "Shift",
                LeftControl | RightControl => "Control",
                LeftAlt | RightAlt => "Alt",
                LeftSuper | RightSuper => "Meta",
                _ => return None,
            }
        }
        _ => return None,
    };
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventState, KeyModifiers, ModifierKeyCode};
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            AppEvent::Tick => {}
            _ => panic!("expected Tick on timeout"),
        }
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(AppEvent::Key(TimedKey::new(KeyEvent::new(
            KeyCode::Char('q'),
            KeyModifiers::NONE,
        ))))
        .unwrap();
        let es = TestEventSource::new(rx);
        let runner = Runner::new(es, FixedTicker::new(Duration::from_millis(10)));

        match runner.step() {
            AppEvent::Key(k) => assert_eq!(k.event.code, KeyCode::Char('q')),
            _ => panic!("expected Key event"),
        }
    }

    #[test]
    fn key_names_follow_browser_identities() {
        assert_eq!(key_name(&KeyCode::Char('a')).as_deref(), Some("a"));
        assert_eq!(key_name(&KeyCode::Char('A')).as_deref(), Some("A"));
        assert_eq!(key_name(&KeyCode::Char(' ')).as_deref(), Some(" "));
        assert_eq!(key_name(&KeyCode::Enter).as_deref(), Some("Enter"));
        assert_eq!(key_name(&KeyCode::Backspace).as_deref(), Some("Backspace"));
        assert_eq!(key_name(&KeyCode::F(5)).as_deref(), Some("F5"));
        assert_eq!(
            key_name(&KeyCode::Modifier(ModifierKeyCode::RightShift)).as_deref(),
            Some("Shift")
        );
        assert_eq!(key_name(&KeyCode::Null), None);
    }

    #[test]
    fn repeat_counts_as_press() {
        let mut ev = KeyEvent::new_with_kind_and_state(
            KeyCode::Char('a'),
            KeyModifiers::NONE,
            KeyEventKind::Repeat,
            KeyEventState::NONE,
        );
        assert!(TimedKey::new(ev).is_press());
        ev.kind = KeyEventKind::Release;
        assert!(!TimedKey::new(ev).is_press());
    }

    #[test]
    fn millis_since_epoch_is_non_negative() {
        let key = TimedKey::new(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        let later_epoch = key.at + Duration::from_millis(5);
        assert_eq!(key.millis_since(later_epoch), 0.0);
        if let Some(earlier_epoch) = key.at.checked_sub(Duration::from_millis(20)) {
            assert!(key.millis_since(earlier_epoch) >= 20.0);
        }
    }

    #[test]
    fn enhancement_flags_report_all_releases() {
        let flags = keyboard_enhancement_flags();
        assert!(flags.contains(KeyboardEnhancementFlags::REPORT_EVENT_TYPES));
        assert!(flags.contains(KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES));
        assert!(flags.contains(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES));
        assert!(flags.contains(KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS));
    }
}
