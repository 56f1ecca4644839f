use std::cell::RefCell;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers, ModifierKeyCode,
};
use keyprint::backend::BackendResult;
use keyprint::input::{dispatch, Flow};
use keyprint::payload::{
    Credentials, LeaderboardEntry, Prediction, SampleType, UserStats, UserSummary,
};
use keyprint::runtime::{AppEvent, FixedTicker, Runner, TestEventSource, TimedKey};
use keyprint::session::{TrainingPlan, DEFAULT_SENTENCES};
use keyprint::workflow::Overlay;
use keyprint::{AppState, Backend, Controller};

// In-memory stand-in for the classification service.
#[derive(Debug, Default)]
struct FakeService {
    trained_samples: usize,
    samples: RefCell<Vec<(usize, Option<f64>, SampleType)>>,
    trained: RefCell<bool>,
    predicted_with: RefCell<Vec<usize>>,
}

impl Backend for FakeService {
    fn signup(&self, _creds: &Credentials) -> BackendResult<()> {
        Ok(())
    }

    fn login(&self, _creds: &Credentials) -> BackendResult<String> {
        Ok("token-1".into())
    }

    fn users(&self) -> BackendResult<Vec<UserSummary>> {
        Ok(vec![UserSummary {
            username: "ada".into(),
            samples: self.trained_samples + self.samples.borrow().len(),
        }])
    }

    fn add_sample(
        &self,
        token: &str,
        events: &[keyprint::KeyEvent],
        accuracy: Option<f64>,
        sample_type: SampleType,
    ) -> BackendResult<()> {
        assert_eq!(token, "token-1");
        self.samples
            .borrow_mut()
            .push((events.len(), accuracy, sample_type));
        Ok(())
    }

    fn train(&self, _token: &str) -> BackendResult<()> {
        *self.trained.borrow_mut() = true;
        Ok(())
    }

    fn predict(&self, events: &[keyprint::KeyEvent]) -> BackendResult<Prediction> {
        self.predicted_with.borrow_mut().push(events.len());
        Ok(Prediction {
            predicted_user: "ada".into(),
            confidence: 0.91,
        })
    }

    fn accuracy_leaderboard(&self) -> BackendResult<Vec<LeaderboardEntry>> {
        Ok(vec![LeaderboardEntry {
            username: "ada".into(),
            avg_accuracy: 1.0,
        }])
    }

    fn user_stats(&self, username: &str) -> BackendResult<UserStats> {
        Ok(UserStats {
            username: username.into(),
            total_samples: self.samples.borrow().len(),
            avg_wpm: 40.0,
            avg_accuracy: Some(1.0),
            avg_hold_time_ms: 90.0,
            avg_hold_std_ms: 10.0,
            avg_latency_ms: 120.0,
        })
    }
}

/// Feeds synthetic key events through the real runner and dispatcher.
struct Harness {
    controller: Controller<FakeService>,
    tx: mpsc::Sender<AppEvent>,
    runner: Runner<TestEventSource, FixedTicker>,
    epoch: Instant,
    clock: Duration,
    synthesize_release: bool,
}

impl Harness {
    fn new(synthesize_release: bool) -> Self {
        Self::with_service(FakeService::default(), synthesize_release)
    }

    fn with_service(service: FakeService, synthesize_release: bool) -> Self {
        let (tx, rx) = mpsc::channel();
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(5)),
        );
        Self {
            controller: Controller::new(service, TrainingPlan::default()),
            tx,
            runner,
            epoch: Instant::now(),
            clock: Duration::ZERO,
            synthesize_release,
        }
    }

    fn send(&mut self, code: KeyCode, kind: KeyEventKind) -> Flow {
        let modifiers = match code {
            KeyCode::Char(c) if c.is_uppercase() => KeyModifiers::SHIFT,
            _ => KeyModifiers::NONE,
        };
        let event = KeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        };
        self.tx
            .send(AppEvent::Key(TimedKey {
                event,
                at: self.epoch + self.clock,
            }))
            .unwrap();

        match self.runner.step() {
            AppEvent::Key(key) => dispatch(
                &mut self.controller,
                &key,
                self.epoch,
                self.synthesize_release,
            ),
            other => panic!("expected a key event, got {:?}", other),
        }
    }

    /// Press and (unless synthesized) release `code` 40ms later.
    fn tap(&mut self, code: KeyCode) -> Flow {
        let flow = self.send(code, KeyEventKind::Press);
        if flow == Flow::Quit {
            return flow;
        }
        if !self.synthesize_release {
            self.clock += Duration::from_millis(40);
            self.send(code, KeyEventKind::Release);
        }
        self.clock += Duration::from_millis(60);
        flow
    }

    fn type_str(&mut self, text: &str) {
        for c in text.chars() {
            self.tap(KeyCode::Char(c));
        }
    }

    fn login(&mut self) {
        self.type_str("ada");
        self.tap(KeyCode::Tab);
        self.type_str("secret");
        self.tap(KeyCode::Enter);
    }
}

#[test]
fn runner_yields_tick_when_idle() {
    let h = Harness::new(false);
    assert!(matches!(h.runner.step(), AppEvent::Tick));
}

#[test]
fn full_enrollment_and_prediction_flow() {
    let mut h = Harness::new(false);
    h.login();
    assert_eq!(h.controller.state(), AppState::TrainDiverse);
    assert!(h.controller.events().is_empty());

    for sentence in DEFAULT_SENTENCES {
        h.type_str(sentence);
    }
    {
        let samples = h.controller.backend().samples.borrow();
        assert_eq!(samples.len(), 5);
        assert!(samples
            .iter()
            .all(|(n, acc, t)| *n >= 10 && *acc == Some(1.0) && *t == SampleType::Diverse));
    }
    assert_eq!(h.controller.state(), AppState::TrainFree);

    for i in 0..5 {
        h.type_str(&format!("free text sample number {}", i));
        h.tap(KeyCode::Enter);
    }
    assert_eq!(h.controller.free_count(), 5);
    assert!(h.controller.can_train());

    h.tap(KeyCode::F(6));
    assert!(*h.controller.backend().trained.borrow());
    assert_eq!(h.controller.state(), AppState::Predicting);

    h.type_str("who is typing this now");
    h.tap(KeyCode::Enter);
    assert_eq!(h.controller.prediction(), Some("ada"));
    assert_eq!(h.controller.confidence(), Some(0.91));
    // every char pressed and released, plus the Enter pair
    assert_eq!(
        h.controller.backend().predicted_with.borrow().as_slice(),
        &["who is typing this now".len() * 2 + 2]
    );
    assert!(h.controller.free_text().is_empty());
}

#[test]
fn misspelled_attempt_is_scored_on_enter() {
    let mut h = Harness::new(false);
    h.login();
    h.type_str("My zealous puppy quickly vexed the jduge");
    assert!(h.controller.backend().samples.borrow().is_empty());
    h.tap(KeyCode::Enter);

    let samples = h.controller.backend().samples.borrow();
    assert_eq!(samples.len(), 1);
    let accuracy = samples[0].1.unwrap();
    assert!(accuracy < 1.0 && accuracy > 0.9, "accuracy {}", accuracy);
}

#[test]
fn hold_times_come_from_release_events() {
    let mut h = Harness::new(false);
    h.login();
    h.type_str("abc");

    let holds: Vec<_> = h
        .controller
        .events()
        .iter()
        .filter_map(|e| e.hold_time_ms())
        .collect();
    assert_eq!(holds.len(), 3);
    assert!(holds.iter().all(|h| (h - 40.0).abs() < 1e-6));
}

#[test]
fn synthesized_releases_pair_every_press() {
    let mut h = Harness::new(true);
    h.login();
    h.type_str("abc");

    let events = h.controller.events();
    assert_eq!(events.len(), 6);
    assert!(events
        .iter()
        .filter_map(|e| e.hold_time_ms())
        .all(|hold| hold == 0.0));
}

#[test]
fn command_keys_are_not_recorded() {
    let mut h = Harness::new(false);
    h.login();
    h.type_str("ab");
    let before = h.controller.events().len();

    h.tap(KeyCode::F(4));
    assert!(matches!(
        h.controller.overlay(),
        Some(Overlay::Leaderboard(_))
    ));
    // typing while an overlay is open is swallowed
    h.type_str("zz");
    assert_eq!(h.controller.events().len(), before);

    assert_eq!(h.tap(KeyCode::Esc), Flow::Continue);
    assert!(h.controller.overlay().is_none());
    assert_eq!(h.controller.events().len(), before);
}

#[test]
fn user_list_navigation_opens_details() {
    let mut h = Harness::new(false);
    h.login();
    h.tap(KeyCode::F(3));
    assert!(matches!(h.controller.overlay(), Some(Overlay::Users { .. })));

    h.tap(KeyCode::Enter);
    assert!(matches!(
        h.controller.overlay(),
        Some(Overlay::UserDetail(stats)) if stats.username == "ada"
    ));

    h.tap(KeyCode::Char('b'));
    assert!(matches!(h.controller.overlay(), Some(Overlay::Users { .. })));
}

#[test]
fn escape_quits_without_overlay() {
    let mut h = Harness::new(false);
    assert_eq!(h.tap(KeyCode::Esc), Flow::Quit);
}

#[test]
fn ctrl_c_quits() {
    let mut h = Harness::new(false);
    h.tx
        .send(AppEvent::Key(TimedKey::new(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        ))))
        .unwrap();
    let AppEvent::Key(key) = h.runner.step() else {
        panic!("expected a key event");
    };
    assert_eq!(dispatch(&mut h.controller, &key, h.epoch, false), Flow::Quit);
}

#[test]
fn logout_returns_to_sign_in() {
    let mut h = Harness::new(false);
    h.login();
    h.tap(KeyCode::F(10));
    assert_eq!(h.controller.state(), AppState::Auth);
    assert!(!h.controller.is_logged_in());
}

#[test]
fn enter_release_flushes_prediction() {
    let mut h = Harness::with_service(
        FakeService {
            trained_samples: 10,
            ..Default::default()
        },
        false,
    );
    h.login();
    assert_eq!(h.controller.state(), AppState::Predicting);

    // shifted capital: the modifier key has its own press and release
    let shift = KeyCode::Modifier(ModifierKeyCode::LeftShift);
    h.send(shift, KeyEventKind::Press);
    h.tap(KeyCode::Char('H'));
    h.send(shift, KeyEventKind::Release);
    h.type_str("ello there world");

    h.send(KeyCode::Enter, KeyEventKind::Press);
    assert_eq!(h.controller.prediction(), None);
    let pending = h.controller.events();
    assert_eq!(pending.iter().filter(|e| e.is_press()).count(), 19);
    assert_eq!(pending.iter().filter(|e| !e.is_press()).count(), 18);
    assert!(pending
        .iter()
        .filter(|e| e.key() == "Shift")
        .any(|e| e.hold_time_ms().is_some()));

    h.send(KeyCode::Enter, KeyEventKind::Release);
    assert_eq!(h.controller.prediction(), Some("ada"));
    assert_eq!(
        h.controller.backend().predicted_with.borrow().as_slice(),
        &[38]
    );
    assert!(h.controller.events().is_empty());
    assert!(h.controller.free_text().is_empty());
}
