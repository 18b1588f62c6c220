//! Delivery deduplication for webhook notifications.

use std::sync::Mutex;

/// Remembers which posts have been seen.
pub trait SeenStore: Send + Sync {
    /// Records `url`; returns `true` if it was not already known.
    fn remember(&self, url: &str) -> bool;
}

/// Remembers only the most recent URL, so it catches a delivery repeated
/// back to back but not an older one arriving late.
#[derive(Debug, Default)]
pub struct LastSeenUrl {
    last: Mutex<Option<String>>,
}

impl LastSeenUrl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<String> {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SeenStore for LastSeenUrl {
    fn remember(&self, url: &str) -> bool {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if last.as_deref() == Some(url) {
            return false;
        }
        *last = Some(url.to_string());
        true
    }
}
