use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// Per-host rate-limit cooldowns.
///
/// After a 429 the host is parked until the server's Retry-After elapses, and
/// requests in the meantime fail fast instead of hitting the network.
#[derive(Clone, Default)]
pub struct HostCooldown {
    until: Arc<DashMap<String, Instant>>,
}

impl HostCooldown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, host: &str, wait: Duration) {
        let deadline = Instant::now() + wait;
        self.until
            .entry(host.to_string())
            .and_modify(|current| {
                if *current < deadline {
                    *current = deadline;
                }
            })
            .or_insert(deadline);
        tracing::debug!("{} cooling down for {:.1}s", host, wait.as_secs_f64());
    }

    /// Time left before `host` may be contacted again, if it is cooling down
    pub fn remaining(&self, host: &str) -> Option<Duration> {
        let deadline = *self.until.get(host)?;
        let now = Instant::now();
        if deadline > now {
            Some(deadline - now)
        } else {
            self.until.remove(host);
            None
        }
    }
}
