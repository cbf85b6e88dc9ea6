use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

/// Users with a mutating call running. Reads never consult this, so they wait
/// on the per-user lock instead of being turned away.
#[derive(Debug, Default, Clone)]
pub struct InFlight {
    users: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the user busy until the guard is dropped. `None` if a call is
    /// already running for them.
    pub fn begin(&self, user_id: &str) -> Option<InFlightGuard> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if !users.insert(user_id.to_string()) {
            debug!("Call already in flight for user {}", user_id);
            return None;
        }
        Some(InFlightGuard {
            users: self.users.clone(),
            user_id: user_id.to_string(),
        })
    }

    pub fn is_busy(&self, user_id: &str) -> bool {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(user_id)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    users: Arc<Mutex<HashSet<String>>>,
    user_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user_id);
    }
}
