use crate::model::tune::{NewTune, Tune};
use log::debug;
use std::time::Duration;

pub const TUNES_PATH: &str = "/api/v1/tunes";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Could not reach {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("Unreadable response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("Tune '{0}' not found")]
    TuneNotFound(String),
}

/// Remote list of tunes. Calls are never retried; callers decide what a failure means.
pub trait TuneStore {
    fn fetch_tunes(&self) -> Result<Vec<Tune>, StoreError>;

    fn save_tune(&self, tune: &NewTune) -> Result<(), StoreError>;

    /// Fetches the whole list and picks one tune out of it.
    fn find_tune(&self, id: &str) -> Result<Tune, StoreError> {
        self.fetch_tunes()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::TuneNotFound(id.to_owned()))
    }
}

#[derive(Debug, Clone)]
pub struct HttpTuneStore {
    url: String,
    agent: ureq::Agent,
}

impl HttpTuneStore {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();

        Self {
            url: format!("{}{}", base_url.trim_end_matches('/'), TUNES_PATH),
            agent,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_err(&self, err: ureq::Error) -> StoreError {
        match err {
            ureq::Error::Status(status, _) => StoreError::Status {
                url: self.url.clone(),
                status,
            },
            ureq::Error::Transport(t) => StoreError::Transport {
                url: self.url.clone(),
                reason: t.to_string(),
            },
        }
    }
}

impl TuneStore for HttpTuneStore {
    fn fetch_tunes(&self) -> Result<Vec<Tune>, StoreError> {
        debug!("GET {}", self.url);
        let response = self
            .agent
            .get(&self.url)
            .call()
            .map_err(|e| self.map_err(e))?;

        response
            .into_json::<Vec<Tune>>()
            .map_err(|e| StoreError::Decode {
                url: self.url.clone(),
                reason: e.to_string(),
            })
    }

    fn save_tune(&self, tune: &NewTune) -> Result<(), StoreError> {
        debug!("POST {} ({} notes)", self.url, tune.tune.len());
        self.agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_json(tune)
            .map_err(|e| self.map_err(e))?;

        Ok(())
    }
}
