// Per-connection sequential ID, used only to prefix log lines

use std::sync::atomic::{AtomicU64, Ordering};

pub struct SessionIdGenerator {
    next_id: AtomicU64,
}

impl SessionIdGenerator {
    pub fn new() -> SessionIdGenerator {
        SessionIdGenerator {
            next_id: AtomicU64::new(1),
        }
    }

    pub fn generate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
