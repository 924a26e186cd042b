//! ConversationRunner – loads a session, applies exactly **one** user action through the
//! [`ConversationEngine`], and persists the result.
//!
//! The runner is also where the one-actor-per-session rule lives:
//! * a second action on a session whose previous action is still running is rejected with
//!   [`FlowError::SessionBusy`] instead of being queued;
//! * a reset is always accepted. It cancels the running action, whose later snapshots and
//!   final save are dropped, and commits a freshly started session;
//! * commits for one session are serialised, so a cancelled action can never overwrite the
//!   session that replaced it.
//!
//! While an action is running, every intermediate state the engine publishes is written to
//! storage, so readers polling the session see validation steps flip from `processing` to
//! `completed` one by one.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    engine::{Action, ConversationEngine, ExecutionResult, ExecutionStatus},
    error::{FlowError, Result},
    scope::{ActionScope, CancelSignal, ProgressSink},
    session::Session,
    storage::SessionStorage,
};

/// The stored session after an action, with what the action did.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub session: Session,
    pub result: ExecutionResult,
}

/// High-level helper that orchestrates _load → act → save_ for one session at a time.
#[derive(Clone)]
pub struct ConversationRunner {
    engine: Arc<ConversationEngine>,
    storage: Arc<dyn SessionStorage>,
    in_flight: Arc<DashMap<String, CancelSignal>>,
    commit_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationRunner {
    pub fn new(engine: Arc<ConversationEngine>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            engine,
            storage,
            in_flight: Arc::new(DashMap::new()),
            commit_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn engine(&self) -> &ConversationEngine {
        &self.engine
    }

    pub fn is_busy(&self, session_id: &str) -> bool {
        self.in_flight.contains_key(session_id)
    }

    pub async fn get(&self, session_id: &str) -> Result<Session> {
        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))
    }

    /// Starts a new session for `passenger_id`.
    pub async fn create(&self, passenger_id: &str) -> Result<RunOutcome> {
        let mut session = Session::with_generated_id(passenger_id);
        let ticket = self.claim(&session.id)?;
        let scope = ticket.scope();

        let before = session.timeline.len();
        let outcome = self.engine.start_in(&mut session, &scope).await;
        info!(session_id = %session.id, passenger_id, "Session created");
        self.commit(None, session, before, outcome, &ticket).await
    }

    /// Applies one action to a stored session.
    pub async fn run(&self, session_id: &str, action: Action) -> Result<RunOutcome> {
        let ticket = self.claim(session_id)?;
        let original = self.get(session_id).await?;
        let mut session = original.clone();
        let scope = ticket.scope();

        let name = action.name();
        let before = session.timeline.len();
        let outcome = self.engine.apply(&mut session, action, &scope).await;
        if let Err(e) = &outcome {
            warn!(session_id, action = name, error = %e, "Action failed");
        } else {
            info!(session_id, action = name, step = %session.step, "Action applied");
        }
        self.commit(Some(original), session, before, outcome, &ticket)
            .await
    }

    /// Cancels whatever is running on the session and starts it over.
    pub async fn reset(&self, session_id: &str) -> Result<RunOutcome> {
        let current = self.get(session_id).await?;
        let ticket = self.take_over(session_id);
        let mut session = current;
        let scope = ticket.scope();

        let outcome = self.engine.reset_in(&mut session, &scope).await;
        self.commit(None, session, 0, outcome, &ticket).await
    }

    fn claim(&self, session_id: &str) -> Result<Ticket> {
        match self.in_flight.entry(session_id.to_string()) {
            Entry::Occupied(_) => Err(FlowError::SessionBusy(session_id.to_string())),
            Entry::Vacant(slot) => {
                let signal = CancelSignal::new();
                slot.insert(signal.clone());
                Ok(self.ticket(session_id, signal))
            }
        }
    }

    fn take_over(&self, session_id: &str) -> Ticket {
        let signal = CancelSignal::new();
        if let Some(previous) = self.in_flight.insert(session_id.to_string(), signal.clone()) {
            info!(session_id, "Cancelling in-flight action");
            previous.cancel();
        }
        self.ticket(session_id, signal)
    }

    fn ticket(&self, session_id: &str, signal: CancelSignal) -> Ticket {
        let commit = self
            .commit_locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        Ticket {
            session_id: session_id.to_string(),
            signal: signal.clone(),
            in_flight: self.in_flight.clone(),
            commit_locks: self.commit_locks.clone(),
            sink: Arc::new(SnapshotSink {
                storage: self.storage.clone(),
                commit,
                signal,
                published: AtomicUsize::new(0),
            }),
        }
    }

    async fn commit(
        &self,
        original: Option<Session>,
        session: Session,
        before: usize,
        outcome: Result<ExecutionResult>,
        ticket: &Ticket,
    ) -> Result<RunOutcome> {
        let _guard = ticket.sink.commit.lock().await;
        if ticket.signal.is_cancelled() {
            info!(session_id = %session.id, "Dropping result of a cancelled action");
            return Err(FlowError::Cancelled);
        }

        match outcome {
            Ok(result) => {
                self.storage.save(session.clone()).await?;
                Ok(RunOutcome { session, result })
            }
            Err(e) if e.is_surfaced_in_timeline() => {
                let result = ExecutionResult {
                    step: session.step.clone(),
                    appended: session.timeline.len().saturating_sub(before),
                    status: ExecutionStatus::Error(e.to_string()),
                };
                self.storage.save(session.clone()).await?;
                Ok(RunOutcome { session, result })
            }
            Err(e) => {
                if ticket.sink.published() > 0 {
                    if let Some(original) = original {
                        self.storage.save(original).await?;
                    }
                }
                Err(e)
            }
        }
    }
}

/// Marks a session as having an action in flight until dropped.
struct Ticket {
    session_id: String,
    signal: CancelSignal,
    in_flight: Arc<DashMap<String, CancelSignal>>,
    commit_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    sink: Arc<SnapshotSink>,
}

impl Ticket {
    fn scope(&self) -> ActionScope {
        ActionScope::new(self.signal.clone(), self.sink.clone())
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        // a reset may already have installed its own signal
        self.in_flight
            .remove_if(&self.session_id, |_, current| current.same_as(&self.signal));
        // held by the map and this ticket only: no other action still needs it
        self.commit_locks
            .remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

struct SnapshotSink {
    storage: Arc<dyn SessionStorage>,
    commit: Arc<Mutex<()>>,
    signal: CancelSignal,
    published: AtomicUsize,
}

impl SnapshotSink {
    fn published(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressSink for SnapshotSink {
    async fn publish(&self, session: &Session) {
        let _guard = self.commit.lock().await;
        if self.signal.is_cancelled() {
            return;
        }
        match self.storage.save(session.clone()).await {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => warn!(session_id = %session.id, error = %e, "Failed to publish snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::FlowCatalog,
        config::EngineConfig,
        pacing::{Beat, Pacer},
        provider::StaticTravelProvider,
        session::OPTIONS,
        storage::InMemorySessionStorage,
    };
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;

    /// Blocks every pause while armed until the test opens it.
    #[derive(Default)]
    struct Gate {
        armed: AtomicBool,
        reached: Notify,
        open: Notify,
    }

    #[async_trait]
    impl Pacer for Gate {
        async fn pause(&self, _beat: Beat) {
            if self.armed.load(Ordering::SeqCst) {
                self.reached.notify_one();
                self.open.notified().await;
            }
        }
    }

    fn runner(gate: Arc<Gate>) -> ConversationRunner {
        let provider = Arc::new(StaticTravelProvider::new());
        let catalog = Arc::new(FlowCatalog::standard(&EngineConfig::default()).unwrap());
        let engine = ConversationEngine::new(catalog, provider.clone(), provider).with_pacer(gate);
        ConversationRunner::new(Arc::new(engine), Arc::new(InMemorySessionStorage::new()))
    }

    #[tokio::test]
    async fn test_run_persists_each_action() {
        let runner = runner(Arc::new(Gate::default()));
        let created = runner.create("CSGHY654JK").await.unwrap();
        let id = created.session.id.clone();

        let outcome = runner
            .run(&id, Action::SelectOption { option: "medical".to_string() })
            .await
            .unwrap();

        assert_eq!(outcome.result.step, "select-medical-type");
        assert_eq!(runner.get(&id).await.unwrap(), outcome.session);
        assert!(!runner.is_busy(&id));
        assert!(runner.commit_locks.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let runner = runner(Arc::new(Gate::default()));
        let err = runner.run("missing", Action::Proceed).await.unwrap_err();
        assert_eq!(err, FlowError::SessionNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_rejected_action_leaves_stored_session_untouched() {
        let runner = runner(Arc::new(Gate::default()));
        let created = runner.create("CSGHY654JK").await.unwrap();
        let id = created.session.id.clone();

        let err = runner.run(&id, Action::Proceed).await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidTransition { .. }));
        assert_eq!(runner.get(&id).await.unwrap(), created.session);
    }

    #[tokio::test]
    async fn test_overlapping_action_is_busy() {
        let gate = Arc::new(Gate::default());
        let runner = runner(gate.clone());
        let id = runner.create("CSGHY654JK").await.unwrap().session.id;

        gate.armed.store(true, Ordering::SeqCst);
        let background = {
            let runner = runner.clone();
            let id = id.clone();
            tokio::spawn(async move {
                runner
                    .run(&id, Action::SelectOption { option: "medical".to_string() })
                    .await
            })
        };
        gate.reached.notified().await;

        let err = runner
            .run(&id, Action::SelectReason { reason: "outpatient".to_string() })
            .await
            .unwrap_err();
        assert_eq!(err, FlowError::SessionBusy(id.clone()));

        gate.armed.store(false, Ordering::SeqCst);
        gate.open.notify_one();
        let outcome = background.await.unwrap().unwrap();
        assert_eq!(outcome.session.step, "select-medical-type");
        assert!(!runner.is_busy(&id));
    }

    #[tokio::test]
    async fn test_reset_cancels_running_validation() {
        let gate = Arc::new(Gate::default());
        let runner = runner(gate.clone());
        let id = runner.create("CSGHY654JK").await.unwrap().session.id;

        runner
            .run(&id, Action::SelectOption { option: "cancel-trip".to_string() })
            .await
            .unwrap();
        runner
            .run(&id, Action::SelectReason { reason: "natural-disaster".to_string() })
            .await
            .unwrap();
        for file in ["a.pdf", "b.pdf", "c.pdf", "d.pdf"] {
            runner
                .run(&id, Action::UploadDocument { filename: file.to_string() })
                .await
                .unwrap();
        }

        gate.armed.store(true, Ordering::SeqCst);
        let background = {
            let runner = runner.clone();
            let id = id.clone();
            tokio::spawn(async move { runner.run(&id, Action::Proceed).await })
        };

        // step through pauses until a processing validation step is visible
        loop {
            gate.reached.notified().await;
            let snapshot = runner.get(&id).await.unwrap();
            if snapshot.timeline.processing_steps() == 1 {
                break;
            }
            gate.open.notify_one();
        }

        gate.armed.store(false, Ordering::SeqCst);
        let reset = runner.reset(&id).await.unwrap();
        gate.open.notify_one();

        assert_eq!(background.await.unwrap().unwrap_err(), FlowError::Cancelled);
        let stored = runner.get(&id).await.unwrap();
        assert_eq!(stored, reset.session);
        assert_eq!(stored.step, OPTIONS);
        assert_eq!(stored.timeline.processing_steps(), 0);
        assert!(stored.claim_record.is_none());
        assert!(!runner.is_busy(&id));
        assert!(runner.commit_locks.is_empty());
    }
}
