use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;

use crate::{
    error::{FlowError, Result},
    pacing::{Beat, Pacer},
    session::Session,
};

/// Cooperative cancellation flag shared between a running action and whoever may reset it.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// True when both handles point at the same flag.
    pub fn same_as(&self, other: &CancelSignal) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Receives intermediate session snapshots while an action is still running.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn publish(&self, session: &Session);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl ProgressSink for NoopSink {
    async fn publish(&self, _session: &Session) {}
}

/// Per-action context: where progress goes and how the action learns it was cancelled.
#[derive(Clone)]
pub struct ActionScope {
    cancel: CancelSignal,
    sink: Arc<dyn ProgressSink>,
}

impl ActionScope {
    pub fn new(cancel: CancelSignal, sink: Arc<dyn ProgressSink>) -> Self {
        Self { cancel, sink }
    }

    /// Scope for callers that drive the engine directly.
    pub fn detached() -> Self {
        Self::new(CancelSignal::new(), Arc::new(NoopSink))
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(FlowError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Publishes the current state, waits one beat, then checks for cancellation.
    pub async fn checkpoint(&self, pacer: &dyn Pacer, beat: Beat, session: &Session) -> Result<()> {
        self.ensure_active()?;
        self.sink.publish(session).await;
        pacer.pause(beat).await;
        self.ensure_active()
    }
}

impl Default for ActionScope {
    fn default() -> Self {
        Self::detached()
    }
}
