//! In-memory correlation of consent events with their PKCE verifiers
//!
//! Each consent URL carries a unique `state`. The verifier minted alongside
//! it is parked here until the identity provider redirects back with that
//! state, or until the entry expires. Entries are single use.
//!
//! The map never holds more than `max_entries` verifiers. When it is full
//! after purging expired entries, the oldest entry is evicted.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::constants::{MAX_PENDING_CONSENTS, STATE_PREFIX};
use crate::pkce::PkceParameters;

struct PendingConsent {
    verifier: String,
    created_at: Instant,
}

/// Time-bounded `state -> verifier` store.
pub struct PendingConsents {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, PendingConsent>>,
}

impl PendingConsents {
    pub fn new(ttl: Duration) -> Self {
        Self::with_limit(ttl, MAX_PENDING_CONSENTS)
    }

    /// Store holding at most `max_entries` verifiers (minimum 1).
    pub fn with_limit(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Start a consent event: mint a state value and PKCE pair, park the verifier.
    pub async fn begin(&self) -> (String, PkceParameters) {
        let state = format!("{STATE_PREFIX}{}", uuid::Uuid::new_v4().as_simple());
        let pkce = PkceParameters::generate();

        let mut entries = self.entries.lock().await;
        // Lazy cleanup: drop expired entries while holding the lock
        entries.retain(|_, e| e.created_at.elapsed() < self.ttl);
        while entries.len() >= self.max_entries {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            entries.remove(&oldest);
            warn!(state = %oldest, "pending consent store full, evicted oldest entry");
        }
        entries.insert(
            state.clone(),
            PendingConsent {
                verifier: pkce.verifier.clone(),
                created_at: Instant::now(),
            },
        );
        debug!(pending = entries.len(), "consent event recorded");

        (state, pkce)
    }

    /// Remove the entry for `state`, returning its verifier if it has not expired.
    pub async fn take(&self, state: &str) -> Option<String> {
        let entry = self.entries.lock().await.remove(state)?;
        if entry.created_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.verifier)
    }

    /// Number of entries currently held, including ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
