//! Model resource lifecycle
//!
//! Wraps a `GenerationClient` with an explicit init / ready / shutdown
//! lifecycle and a gate on concurrent completions. With the default of one
//! permit, concurrent requests queue here one completion at a time: that is
//! the throughput ceiling of the whole service when the engine is
//! single-threaded.

use crate::error::{AskError, Result};
use crate::llm::{GenerationClient, GenerationRequest};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Uninitialized,
    Ready,
    ShutDown,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelState::Uninitialized => "uninitialized",
            ModelState::Ready => "ready",
            ModelState::ShutDown => "shut_down",
        })
    }
}

pub struct InferenceHandle {
    inner: Arc<dyn GenerationClient>,
    ready: OnceCell<()>,
    permits: Semaphore,
}

impl InferenceHandle {
    pub fn new(inner: Arc<dyn GenerationClient>, max_in_flight: usize) -> Self {
        Self {
            inner,
            ready: OnceCell::new(),
            permits: Semaphore::new(max_in_flight.max(1)),
        }
    }

    pub fn state(&self) -> ModelState {
        if self.permits.is_closed() {
            ModelState::ShutDown
        } else if self.ready.initialized() {
            ModelState::Ready
        } else {
            ModelState::Uninitialized
        }
    }

    /// Eager initialization. Safe to call more than once.
    pub async fn init(&self) -> Result<()> {
        if self.permits.is_closed() {
            return Err(AskError::Generation("model has been shut down".to_string()));
        }
        self.ready
            .get_or_try_init(|| async {
                self.inner.warm_up().await?;
                info!("Model ready");
                Ok::<(), AskError>(())
            })
            .await?;
        Ok(())
    }

    /// Stop accepting completions; queued and future calls fail.
    pub fn shutdown(&self) {
        if !self.permits.is_closed() {
            self.permits.close();
            info!("Model shut down");
        }
    }
}

#[async_trait]
impl GenerationClient for InferenceHandle {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        self.init().await?;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AskError::Generation("model has been shut down".to_string()))?;
        debug!(max_tokens = request.max_tokens, "Completion slot acquired");
        self.inner.complete(request).await
    }

    async fn warm_up(&self) -> Result<()> {
        self.init().await
    }
}
