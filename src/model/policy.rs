use std::sync::Arc;

use parking_lot::RwLock;

/// How generation requests are routed. Editable from the settings window at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequestPolicy {
    pub allow_primary_endpoint: bool,

    /// Empty means no Authorization header. Never written to disk.
    pub bearer_token: String,
}

impl Default for GenerationRequestPolicy {
    fn default() -> Self {
        Self {
            allow_primary_endpoint: true,
            bearer_token: String::new(),
        }
    }
}

impl GenerationRequestPolicy {
    pub fn bearer(&self) -> Option<&str> {
        let token = self.bearer_token.trim();
        (!token.is_empty()).then_some(token)
    }
}

/// Policy shared between the UI (writer) and the engine thread (reader).
#[derive(Debug, Clone, Default)]
pub struct SharedPolicy {
    inner: Arc<RwLock<GenerationRequestPolicy>>,
}

impl SharedPolicy {
    pub fn new(policy: GenerationRequestPolicy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(policy)),
        }
    }

    /// Current policy. Callers take a fresh snapshot right before each request.
    pub fn snapshot(&self) -> GenerationRequestPolicy {
        self.inner.read().clone()
    }

    pub fn set(&self, policy: GenerationRequestPolicy) {
        *self.inner.write() = policy;
    }
}
