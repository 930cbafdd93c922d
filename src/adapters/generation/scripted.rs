//! Scripted generator for tests and offline runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{GenerationOptions, TextGenerator};

type Script = dyn Fn(&str, &GenerationOptions) -> DomainResult<String> + Send + Sync;

/// Generator whose replies come from a closure.
///
/// Counts calls and can delay each reply to exercise timeouts.
pub struct ScriptedGenerator {
    script: Arc<Script>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str, &GenerationOptions) -> DomainResult<String> + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always reply with `reply`.
    pub fn constant(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::new(move |_, _| Ok(reply.clone()))
    }

    /// Always fail as unavailable.
    pub fn unavailable() -> Self {
        Self::new(|_, _| Err(DomainError::Unavailable("scripted generator is offline".to_string())))
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> DomainResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.script)(prompt, options)
    }
}
