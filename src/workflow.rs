use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::capture::{KeyEvent, Recorder};
use crate::payload::{Credentials, LeaderboardEntry, SampleType, UserStats, UserSummary};
use crate::scoring;
use crate::session::{Phase, TrainingPlan};
use crate::summary::SessionSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AppState {
    #[strum(serialize = "Sign In")]
    Auth,
    #[strum(serialize = "Phase 1: Diverse Sentences")]
    TrainDiverse,
    #[strum(serialize = "Phase 2: Free Text")]
    TrainFree,
    #[strum(serialize = "Real-Time Prediction")]
    Predicting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AuthMode {
    #[strum(serialize = "Log In")]
    Login,
    #[strum(serialize = "Sign Up")]
    Signup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Username,
    Password,
}

#[derive(Debug, Clone)]
pub struct AuthForm {
    pub username: String,
    pub password: String,
    pub focus: AuthField,
    pub mode: AuthMode,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            focus: AuthField::Username,
            mode: AuthMode::Login,
        }
    }
}

impl AuthForm {
    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            AuthField::Username => &mut self.username,
            AuthField::Password => &mut self.password,
        }
    }
}

/// Stats views layered over the current screen
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Users {
        users: Vec<UserSummary>,
        selected: usize,
    },
    Leaderboard(Vec<LeaderboardEntry>),
    UserDetail(UserStats),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Saved,
    TooShort,
    Failed,
}

/// Applies a key identity to a text buffer the way a text area would.
/// Returns whether the buffer changed.
fn edit_text(buf: &mut String, key: &str) -> bool {
    if key == "Backspace" {
        buf.pop().is_some()
    } else if key.chars().count() == 1 {
        buf.push_str(key);
        true
    } else {
        false
    }
}

/// Drives authentication, enrollment and prediction around one `Recorder`.
#[derive(Debug)]
pub struct Controller<B: Backend> {
    backend: B,
    plan: TrainingPlan,
    recorder: Recorder,
    state: AppState,
    auth: AuthForm,
    token: Option<String>,
    user: Option<String>,
    typed_text: String,
    free_text: String,
    diverse_count: usize,
    free_count: usize,
    message: String,
    prediction: Option<String>,
    confidence: Option<f64>,
    last_summary: Option<SessionSummary>,
    overlay: Option<Overlay>,
}

impl<B: Backend> Controller<B> {
    pub fn new(backend: B, plan: TrainingPlan) -> Self {
        let recorder = Recorder::with_termination_key(plan.termination_key.clone());
        Self {
            backend,
            plan,
            recorder,
            state: AppState::Auth,
            auth: AuthForm::default(),
            token: None,
            user: None,
            typed_text: String::new(),
            free_text: String::new(),
            diverse_count: 0,
            free_count: 0,
            message: "Please log in or sign up.".to_string(),
            prediction: None,
            confidence: None,
            last_summary: None,
            overlay: None,
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn plan(&self) -> &TrainingPlan {
        &self.plan
    }

    pub fn auth(&self) -> &AuthForm {
        &self.auth
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn typed_text(&self) -> &str {
        &self.typed_text
    }

    pub fn free_text(&self) -> &str {
        &self.free_text
    }

    pub fn diverse_count(&self) -> usize {
        self.diverse_count
    }

    pub fn free_count(&self) -> usize {
        self.free_count
    }

    pub fn prediction(&self) -> Option<&str> {
        self.prediction.as_deref()
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn events(&self) -> &[KeyEvent] {
        self.recorder.events()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn current_sentence(&self) -> &str {
        self.plan.sentence(self.diverse_count)
    }

    /// Whether the typing area of the current screen accepts input
    pub fn input_enabled(&self) -> bool {
        match self.state {
            AppState::Auth | AppState::Predicting => true,
            AppState::TrainDiverse => self.diverse_count < self.plan.diverse_samples_required(),
            AppState::TrainFree => self.free_count < self.plan.free_samples_required,
        }
    }

    pub fn can_train(&self) -> bool {
        self.state == AppState::TrainFree && self.free_count >= self.plan.free_samples_required
    }

    // --- auth ---

    pub fn toggle_auth_mode(&mut self) {
        self.auth.mode = match self.auth.mode {
            AuthMode::Login => {
                self.message = "Create a new account.".to_string();
                AuthMode::Signup
            }
            AuthMode::Signup => {
                self.message = "Log in to an existing account.".to_string();
                AuthMode::Login
            }
        };
        self.auth.password.clear();
    }

    pub fn submit_auth(&mut self) {
        let username = self.auth.username.trim().to_string();
        if username.is_empty() || self.auth.password.trim().is_empty() {
            self.message = "Username and password are required.".to_string();
            return;
        }
        let creds = Credentials {
            username: username.clone(),
            password: self.auth.password.clone(),
        };

        match self.auth.mode {
            AuthMode::Signup => match self.backend.signup(&creds) {
                Ok(()) => {
                    info!(%username, "signed up");
                    self.message = "Sign up successful! Please log in.".to_string();
                    self.auth.mode = AuthMode::Login;
                    self.auth.password.clear();
                }
                Err(e) => {
                    warn!(error = %e, "signup failed");
                    self.message = e.to_string();
                }
            },
            AuthMode::Login => {
                if let Err(e) = self.login(creds) {
                    warn!(error = %e, "login failed");
                    self.token = None;
                    self.user = None;
                    self.message = e.to_string();
                }
            }
        }
    }

    fn login(&mut self, creds: Credentials) -> Result<(), crate::error::BackendError> {
        let token = self.backend.login(&creds)?;
        let username = creds.username;
        self.token = Some(token);
        self.user = Some(username.clone());

        let sample_count = self
            .backend
            .users()?
            .into_iter()
            .find(|u| u.username == username)
            .map(|u| u.samples)
            .unwrap_or(0);

        let progress = self.plan.progress_for(sample_count);
        info!(%username, sample_count, phase = ?progress.phase, "logged in");

        self.diverse_count = 0;
        self.free_count = 0;
        match progress.phase {
            Phase::Ready => {
                self.state = AppState::Predicting;
                self.message = format!("Welcome back, {}! Model is ready.", username);
            }
            Phase::Diverse => {
                self.state = AppState::TrainDiverse;
                self.diverse_count = progress.diverse_done;
                self.message = format!(
                    "Welcome, {}! Let's continue your diverse sentence training.",
                    username
                );
            }
            Phase::Free => {
                self.state = AppState::TrainFree;
                self.diverse_count = progress.diverse_done;
                self.free_count = progress.free_done;
                self.message = format!("Welcome, {}! Let's continue your free-text training.", username);
            }
        }
        self.auth.password.clear();
        self.typed_text.clear();
        self.free_text.clear();
        self.recorder.reset();
        Ok(())
    }

    pub fn logout(&mut self) {
        info!(user = ?self.user, "logged out");
        self.token = None;
        self.user = None;
        self.state = AppState::Auth;
        self.message = "You have been logged out.".to_string();
        self.prediction = None;
        self.confidence = None;
        self.overlay = None;
        self.last_summary = None;
        self.typed_text.clear();
        self.free_text.clear();
        self.recorder.reset();
    }

    // --- key input ---

    pub fn key_down(&mut self, key: &str, at_ms: f64) {
        if self.overlay.is_some() || !self.input_enabled() {
            return;
        }
        match self.state {
            AppState::Auth => self.auth_key(key),
            AppState::TrainDiverse => {
                self.recorder.on_key_down(key, at_ms);
                let changed = edit_text(&mut self.typed_text, key);
                if changed && scoring::is_exact_match(&self.typed_text, self.current_sentence()) {
                    debug!("typed text matches target, submitting");
                    self.submit_training(SampleType::Diverse);
                }
            }
            AppState::TrainFree => {
                self.recorder.on_key_down(key, at_ms);
                edit_text(&mut self.typed_text, key);
            }
            AppState::Predicting => {
                if self.recorder.is_empty() {
                    self.recorder.reset();
                }
                self.recorder.on_key_down(key, at_ms);
                edit_text(&mut self.free_text, key);
            }
        }
    }

    pub fn key_up(&mut self, key: &str, at_ms: f64) {
        if self.overlay.is_some() || !self.input_enabled() {
            return;
        }
        match self.state {
            AppState::Auth => {}
            AppState::TrainDiverse => {
                if self.recorder.on_key_up(key, at_ms).is_some() {
                    self.submit_training(SampleType::Diverse);
                }
            }
            AppState::TrainFree => {
                if self.recorder.on_key_up(key, at_ms).is_some() {
                    self.submit_training(SampleType::Free);
                }
            }
            AppState::Predicting => {
                let flushed = self.recorder.on_key_up(key, at_ms).map(<[KeyEvent]>::to_vec);
                if let Some(events) = flushed {
                    self.predict(&events);
                    self.free_text.clear();
                    self.recorder.reset();
                }
            }
        }
    }

    fn auth_key(&mut self, key: &str) {
        match key {
            "Tab" => {
                self.auth.focus = match self.auth.focus {
                    AuthField::Username => AuthField::Password,
                    AuthField::Password => AuthField::Username,
                }
            }
            "Enter" => self.submit_auth(),
            _ => {
                edit_text(self.auth.focused_mut(), key);
            }
        }
    }

    // --- training ---

    /// Sends the captured attempt as a training sample.
    pub fn submit_training(&mut self, sample_type: SampleType) -> SubmitOutcome {
        let event_count = self.recorder.len();
        if event_count < self.plan.min_training_events {
            debug!(event_count, "sample too short, discarded");
            return SubmitOutcome::TooShort;
        }
        let Some(token) = self.token.clone() else {
            self.message = "Please log in first.".to_string();
            return SubmitOutcome::Failed;
        };

        let accuracy = match sample_type {
            SampleType::Diverse => Some(scoring::accuracy(
                &self.typed_text,
                self.current_sentence(),
            )),
            SampleType::Free => None,
        };

        let result =
            self.backend
                .add_sample(&token, self.recorder.events(), accuracy, sample_type);
        if let Err(e) = result {
            warn!(error = %e, %sample_type, "failed to save sample");
            self.message = format!("Error: {}. Is the server running?", e);
            return SubmitOutcome::Failed;
        }

        info!(%sample_type, event_count, ?accuracy, "sample saved");
        self.last_summary = Some(SessionSummary::from_events(self.recorder.events()));

        match sample_type {
            SampleType::Free => {
                self.free_count += 1;
                let required = self.plan.free_samples_required;
                self.message = if self.free_count >= required {
                    format!(
                        "All {} free samples collected! Press F6 to train the model.",
                        required
                    )
                } else {
                    format!("Free sample {}/{} saved.", self.free_count, required)
                };
            }
            SampleType::Diverse => {
                self.diverse_count += 1;
                let required = self.plan.diverse_samples_required();
                if self.diverse_count >= required {
                    self.state = AppState::TrainFree;
                    self.free_count = 0;
                    self.message = format!(
                        "Great! Now type {} free-text sentences.",
                        self.plan.free_samples_required
                    );
                } else {
                    self.message = format!(
                        "Sample {}/{} saved. Next sentence!",
                        self.diverse_count, required
                    );
                }
            }
        }

        self.typed_text.clear();
        self.recorder.reset();
        SubmitOutcome::Saved
    }

    pub fn train_model(&mut self) -> bool {
        if !self.can_train() {
            self.message = format!(
                "Collect {} free samples before training.",
                self.plan.free_samples_required
            );
            return false;
        }
        let Some(token) = self.token.clone() else {
            return false;
        };

        match self.backend.train(&token) {
            Ok(()) => {
                info!("model trained");
                self.state = AppState::Predicting;
                self.message = "Model trained! Now, type anything to predict.".to_string();
                self.free_text.clear();
                self.recorder.reset();
                true
            }
            Err(e) => {
                warn!(error = %e, "training failed");
                self.message = if e.is_transport() {
                    "Server error. Is the server running?".to_string()
                } else {
                    format!("Training failed: {}", e)
                };
                false
            }
        }
    }

    // --- prediction ---

    pub fn predict(&mut self, events: &[KeyEvent]) {
        self.confidence = None;
        if events.len() < self.plan.min_prediction_events {
            debug!(events = events.len(), "prediction sample too short");
            self.prediction = Some("Sample too short".to_string());
            return;
        }

        match self.backend.predict(events) {
            Ok(p) => {
                info!(predicted_user = %p.predicted_user, confidence = p.confidence, "prediction");
                self.prediction = Some(p.predicted_user);
                self.confidence = Some(p.confidence);
            }
            Err(e) => {
                warn!(error = %e, "prediction failed");
                self.prediction = Some(if e.is_transport() {
                    "Server Error".to_string()
                } else {
                    "Error".to_string()
                });
            }
        }
    }

    // --- stats overlays ---

    pub fn show_users(&mut self) {
        match self.backend.users() {
            Ok(users) => {
                self.overlay = Some(Overlay::Users { users, selected: 0 });
                self.message.clear();
            }
            Err(e) => {
                warn!(error = %e, "could not fetch users");
                self.message = "Could not fetch stats. Server offline?".to_string();
            }
        }
    }

    pub fn show_leaderboard(&mut self) {
        match self.backend.accuracy_leaderboard() {
            Ok(entries) => {
                self.overlay = Some(Overlay::Leaderboard(entries));
                self.message.clear();
            }
            Err(e) => {
                warn!(error = %e, "could not fetch leaderboard");
                self.message = "Could not fetch stats. Server offline?".to_string();
            }
        }
    }

    pub fn show_user_stats(&mut self, username: &str) {
        match self.backend.user_stats(username) {
            Ok(stats) => self.overlay = Some(Overlay::UserDetail(stats)),
            Err(e) => {
                warn!(error = %e, username, "could not fetch user detail");
                self.message = "Could not fetch user detail.".to_string();
            }
        }
    }

    pub fn show_my_profile(&mut self) {
        if let Some(user) = self.user.clone() {
            self.show_user_stats(&user);
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        if let Some(Overlay::Users { users, selected }) = &mut self.overlay {
            let max = users.len().saturating_sub(1) as isize;
            *selected = (*selected as isize + delta).clamp(0, max) as usize;
        }
    }

    pub fn open_selected_user(&mut self) {
        let username = match &self.overlay {
            Some(Overlay::Users { users, selected }) => users.get(*selected).map(|u| u.username.clone()),
            _ => None,
        };
        if let Some(username) = username {
            self.show_user_stats(&username);
        }
    }

    /// From a user detail view, go back to the user list
    pub fn overlay_back(&mut self) {
        if matches!(self.overlay, Some(Overlay::UserDetail(_))) {
            self.show_users();
        }
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    /// Only offered on the logged-in user's own detail view
    pub fn add_more_samples(&mut self) -> bool {
        let own_profile = match (&self.overlay, &self.user) {
            (Some(Overlay::UserDetail(stats)), Some(user)) => &stats.username == user,
            _ => false,
        };
        if !own_profile {
            return false;
        }
        self.overlay = None;
        self.state = AppState::TrainFree;
        self.free_count = 0;
        self.typed_text.clear();
        self.message = format!(
            "Let's add {} more free-text samples.",
            self.plan.free_samples_required
        );
        self.recorder.reset();
        true
    }
}
