//! Persistence of computed experiments.
//!
//! Experiments are stored in their JSON form under the SHA-256 of that
//! form, so storing the same result twice yields the same id.
use crate::error::{QpcrError, Result};
use crate::export::json::ensure_finite;
use crate::Experiment;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How long a stored experiment stays retrievable.
pub const EXPERIMENT_TTL: Duration = Duration::from_secs(7200);

pub trait ExperimentStore {
    /// Stores `experiment` and returns its id.
    fn save(&self, experiment: &Experiment) -> Result<String>;

    /// Returns the serialized experiment stored under `id`.
    fn load(&self, id: &str) -> Result<String>;

    fn load_experiment(&self, id: &str) -> Result<Experiment> {
        Ok(serde_json::from_str(&self.load(id)?)?)
    }
}

/// Content address of a serialized experiment, as lowercase hex.
pub fn experiment_id(serialized: &str) -> String {
    format!("{:x}", Sha256::digest(serialized.as_bytes()))
}

/// Keeps experiments in memory until their time to live runs out.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    ttl: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_ttl(EXPERIMENT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }
}

impl ExperimentStore for MemoryStore {
    fn save(&self, experiment: &Experiment) -> Result<String> {
        ensure_finite(experiment)?;
        let serialized = serde_json::to_string(experiment)?;
        let id = experiment_id(&serialized);
        let now = Instant::now();

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = entries.len();
        entries.retain(|_, (_, expires)| now < *expires);
        if entries.len() < stored {
            log::debug!("[store] dropped {} expired experiments", stored - entries.len());
        }
        entries.insert(id.clone(), (serialized, now + self.ttl));
        log::info!("[store] experiment saved, key {}", id);
        Ok(id)
    }

    fn load(&self, id: &str) -> Result<String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(id) {
            Some((serialized, expires)) if Instant::now() < *expires => Ok(serialized.clone()),
            Some(_) => {
                entries.remove(id);
                log::debug!("[store] experiment {} expired", id);
                Err(QpcrError::NotFound(id.to_string()))
            }
            None => Err(QpcrError::NotFound(id.to_string())),
        }
    }
}
