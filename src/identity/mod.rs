//! Identity registry for workers
//!
//! Every worker is tagged with an opaque identity string (a user agent) for
//! its whole lifetime. The registry is keyed by worker id and owned by the
//! pool that created the workers, so separate pools never share identities.

mod agents;

pub use agents::{random_user_agent, USER_AGENTS};

use std::collections::HashMap;
use std::sync::Mutex;

/// Maps worker ids to their identity strings
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    identities: Mutex<HashMap<String, String>>,
    fixed_identity: Option<String>,
}

impl IdentityRegistry {
    /// Creates a registry that draws a random identity for every worker
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that hands the same identity to every worker
    pub fn with_fixed_identity(identity: impl Into<String>) -> Self {
        Self {
            identities: Mutex::new(HashMap::new()),
            fixed_identity: Some(identity.into()),
        }
    }

    /// Builds a registry from an optional fixed identity
    pub fn from_option(identity: Option<String>) -> Self {
        match identity {
            Some(identity) => Self::with_fixed_identity(identity),
            None => Self::new(),
        }
    }

    /// Generates and stores a new identity, replacing any previous one for `worker_id`
    pub fn create(&self, worker_id: &str) -> String {
        let identity = self
            .fixed_identity
            .clone()
            .unwrap_or_else(random_user_agent);

        self.lock().insert(worker_id.to_string(), identity.clone());
        identity
    }

    /// Returns the identity bound to `worker_id`, if any
    pub fn get(&self, worker_id: &str) -> Option<String> {
        self.lock().get(worker_id).cloned()
    }

    /// Returns the existing identity or creates one
    pub fn create_or_get(&self, worker_id: &str) -> String {
        match self.get(worker_id) {
            Some(identity) => identity,
            None => self.create(worker_id),
        }
    }

    /// Removes the identity for `worker_id`; returns whether one existed
    pub fn clear(&self, worker_id: &str) -> bool {
        self.lock().remove(worker_id).is_some()
    }

    /// Number of live identities
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // The map holds plain strings, so a poisoned lock still has consistent data
        self.identities
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
