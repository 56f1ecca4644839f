use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::capture::KeyEvent;
use crate::error::BackendError;
use crate::payload::{
    Credentials, ErrorBody, LeaderboardEntry, LoginResponse, Prediction, PredictionRequest,
    SamplePayload, SampleType, UserStats, UserSummary,
};

pub type BackendResult<T> = Result<T, BackendError>;

/// The remote training/prediction service
pub trait Backend {
    fn signup(&self, creds: &Credentials) -> BackendResult<()>;
    /// Returns the bearer token for the session
    fn login(&self, creds: &Credentials) -> BackendResult<String>;
    fn users(&self) -> BackendResult<Vec<UserSummary>>;
    fn add_sample(
        &self,
        token: &str,
        events: &[KeyEvent],
        accuracy: Option<f64>,
        sample_type: SampleType,
    ) -> BackendResult<()>;
    fn train(&self, token: &str) -> BackendResult<()>;
    fn predict(&self, events: &[KeyEvent]) -> BackendResult<Prediction>;
    fn accuracy_leaderboard(&self) -> BackendResult<Vec<LeaderboardEntry>>;
    fn user_stats(&self, username: &str) -> BackendResult<UserStats>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> BackendResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `username` is pushed as one percent-encoded path segment
    fn user_stats_url(&self, username: &str) -> BackendResult<Url> {
        let mut url = Url::parse(&self.url("/user_stats"))
            .map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl(self.base_url.clone()))?
            .push(username);
        Ok(url)
    }

    fn send(&self, req: RequestBuilder) -> BackendResult<Response> {
        let resp = req.send()?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = resp
            .json::<ErrorBody>()
            .ok()
            .and_then(ErrorBody::message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        debug!(status = status.as_u16(), %message, "backend rejected request");
        Err(BackendError::api(status.as_u16(), message))
    }

    fn decode<T: DeserializeOwned>(resp: Response) -> BackendResult<T> {
        let bytes = resp.bytes()?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

impl Backend for HttpBackend {
    #[instrument(skip_all, fields(username = %creds.username))]
    fn signup(&self, creds: &Credentials) -> BackendResult<()> {
        self.send(self.client.post(self.url("/signup")).json(creds))?;
        Ok(())
    }

    #[instrument(skip_all, fields(username = %creds.username))]
    fn login(&self, creds: &Credentials) -> BackendResult<String> {
        let resp = self.send(self.client.post(self.url("/login")).json(creds))?;
        let login: LoginResponse = Self::decode(resp)?;
        Ok(login.access_token)
    }

    fn users(&self) -> BackendResult<Vec<UserSummary>> {
        Self::decode(self.send(self.client.get(self.url("/users")))?)
    }

    #[instrument(skip(self, token, events), fields(events = events.len()))]
    fn add_sample(
        &self,
        token: &str,
        events: &[KeyEvent],
        accuracy: Option<f64>,
        sample_type: SampleType,
    ) -> BackendResult<()> {
        let body = SamplePayload {
            events,
            accuracy,
            sample_type,
        };
        self.send(
            self.client
                .post(self.url("/add_sample"))
                .bearer_auth(token)
                .json(&body),
        )?;
        Ok(())
    }

    #[instrument(skip_all)]
    fn train(&self, token: &str) -> BackendResult<()> {
        self.send(self.client.post(self.url("/train")).bearer_auth(token))?;
        Ok(())
    }

    #[instrument(skip_all, fields(events = events.len()))]
    fn predict(&self, events: &[KeyEvent]) -> BackendResult<Prediction> {
        let body = PredictionRequest { events };
        Self::decode(self.send(self.client.post(self.url("/predict")).json(&body))?)
    }

    fn accuracy_leaderboard(&self) -> BackendResult<Vec<LeaderboardEntry>> {
        Self::decode(self.send(self.client.get(self.url("/accuracy_leaderboard")))?)
    }

    fn user_stats(&self, username: &str) -> BackendResult<UserStats> {
        let url = self.user_stats_url(username)?;
        Self::decode(self.send(self.client.get(url))?)
    }
}
