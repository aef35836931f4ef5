//! Convergence polling over the versioned state store.
//!
//! The poller repeatedly probes one identifier until it observes state it
//! has not returned before (or state satisfying a caller predicate),
//! suspending the calling task between probes. Each probe is a single
//! backend call scoped to that probe and nothing is retained across exits,
//! so cancellation and deadline expiry release resources immediately.
//!
//! ## Monotonic reads
//!
//! The poller remembers the last token it returned per identifier and
//! only accepts a differing revision on subsequent waits. Because writes
//! to one identifier are linearized by the store, a differing revision is
//! never older than the remembered one.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use gridlink_core::{EntityId, VersionToken};

use crate::error::{Error, Result};
use crate::state::StateDocument;
use crate::store::StateReader;

/// Options for one poll operation.
///
/// Interval and deadline are caller policy; the poller hardcodes neither.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Delay between successive probes when no acceptable state is
    /// observed.
    pub interval: Duration,
    /// Overall deadline for the poll. `None` polls until cancelled.
    pub deadline: Option<Duration>,
    /// Cooperative cancellation signal, observed between probes.
    pub cancellation: CancellationToken,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            deadline: None,
            cancellation: CancellationToken::new(),
        }
    }
}

impl PollOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the probe interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the overall deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// Polling reader that converges on the freshest observable state.
pub struct StatePoller {
    reader: StateReader,
    /// Last token returned per identifier, for the monotonic-read
    /// guarantee.
    last_seen: Mutex<HashMap<EntityId, VersionToken>>,
}

impl StatePoller {
    /// Creates a poller over the given reader.
    #[must_use]
    pub fn new(reader: StateReader) -> Self {
        Self {
            reader,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the freshest observable document for `id`.
    ///
    /// The first call for an identifier returns as soon as any document
    /// is observed; subsequent calls suspend until the store holds a
    /// revision differing from the last one this poller returned.
    ///
    /// # Errors
    ///
    /// - [`gridlink_core::Error::NotFound`] if no document was observed
    ///   before the deadline
    /// - [`Error::Timeout`] if a document exists but no new revision
    ///   arrived before the deadline
    /// - [`Error::Cancelled`] if the cancellation token fired
    /// - transport failures pass through unmodified
    pub async fn get<D: StateDocument>(&self, id: &EntityId, options: &PollOptions) -> Result<D> {
        self.wait(id, options, true, |_: &D| true).await
    }

    /// Suspends until an observed document satisfies `predicate`.
    ///
    /// Unlike [`get`](Self::get), an already-returned revision is
    /// re-evaluated: the wait is for the condition, not for change.
    ///
    /// # Errors
    ///
    /// As for [`get`](Self::get), with [`Error::Timeout`] when no
    /// satisfying revision arrives in time.
    pub async fn get_when<D, F>(
        &self,
        id: &EntityId,
        predicate: F,
        options: &PollOptions,
    ) -> Result<D>
    where
        D: StateDocument,
        F: Fn(&D) -> bool + Send,
    {
        self.wait(id, options, false, predicate).await
    }

    fn last_token(&self, id: &EntityId) -> Result<Option<VersionToken>> {
        let last_seen = self.last_seen.lock().map_err(|_| {
            gridlink_core::Error::Internal {
                message: "poller lock poisoned".into(),
            }
        })?;
        Ok(last_seen.get(id).cloned())
    }

    fn remember(&self, id: &EntityId, version: VersionToken) -> Result<()> {
        let mut last_seen = self.last_seen.lock().map_err(|_| {
            gridlink_core::Error::Internal {
                message: "poller lock poisoned".into(),
            }
        })?;
        last_seen.insert(id.clone(), version);
        Ok(())
    }

    async fn wait<D, F>(
        &self,
        id: &EntityId,
        options: &PollOptions,
        require_change: bool,
        accept: F,
    ) -> Result<D>
    where
        D: StateDocument,
        F: Fn(&D) -> bool + Send,
    {
        let started = Instant::now();
        let baseline = self.last_token(id)?;
        // Revision already inspected this wait; probing it again is a no-op.
        let mut inspected = if require_change { baseline.clone() } else { None };
        let mut observed_any = false;

        loop {
            if options.cancellation.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let current = self.reader.head(id).await?;
            observed_any |= current.is_some();

            let fresh = match (&inspected, &current) {
                (_, None) => false,
                (Some(seen), Some(now)) => seen != now,
                (None, Some(_)) => true,
            };

            if fresh {
                match self.reader.get::<D>(id).await {
                    Ok((document, version)) => {
                        let changed = baseline.as_ref() != Some(&version);
                        if (!require_change || changed) && accept(&document) {
                            self.remember(id, version)?;
                            return Ok(document);
                        }
                        inspected = Some(version);
                    }
                    // Raced with a removal between probe and read; keep waiting.
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e),
                }
            }

            let elapsed = started.elapsed();
            if let Some(deadline) = options.deadline {
                if elapsed >= deadline {
                    return Err(if observed_any {
                        Error::Timeout { waited: elapsed }
                    } else {
                        gridlink_core::Error::NotFound(format!(
                            "no document at {id} after {elapsed:?}"
                        ))
                        .into()
                    });
                }
            }

            let step = options.deadline.map_or(options.interval, |deadline| {
                deadline.saturating_sub(elapsed).min(options.interval)
            });
            tokio::select! {
                () = options.cancellation.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(step) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TaskExecutorState;
    use crate::store::StateWriter;
    use gridlink_core::MemoryStateBackend;
    use std::sync::Arc;

    fn executor_id() -> EntityId {
        EntityId::parse("grid://test/executors/worker-1").unwrap()
    }

    fn wired() -> (StateWriter, StatePoller) {
        let backend = Arc::new(MemoryStateBackend::new());
        (
            StateWriter::new(backend.clone()),
            StatePoller::new(StateReader::new(backend)),
        )
    }

    fn fast() -> PollOptions {
        PollOptions::new().with_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn first_poll_returns_existing_document() {
        let (writer, poller) = wired();
        let id = executor_id();
        writer
            .put(&id, &TaskExecutorState::new(), &VersionToken::NotExists)
            .await
            .unwrap();

        let state: TaskExecutorState = poller
            .get(&id, &fast().with_deadline(Duration::from_millis(200)))
            .await
            .unwrap();
        assert!(state.is_idle());
    }

    #[tokio::test]
    async fn poll_observes_update_made_while_waiting() {
        let (writer, poller) = wired();
        let id = executor_id();
        let t1 = writer
            .put(&id, &TaskExecutorState::new(), &VersionToken::NotExists)
            .await
            .unwrap();

        // First poll pins the baseline revision.
        let _: TaskExecutorState = poller.get(&id, &fast()).await.unwrap();

        let writer_clone = writer.clone();
        let update_id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            let mut state = TaskExecutorState::new();
            state.begin(update_id.child("tasks/1").unwrap());
            writer_clone.put(&update_id, &state, &t1).await.unwrap();
        });

        let state: TaskExecutorState = poller
            .get(&id, &fast().with_deadline(Duration::from_secs(2)))
            .await
            .unwrap();
        assert!(!state.is_idle());
    }

    #[tokio::test]
    async fn unchanged_document_times_out_instead_of_repeating() {
        let (writer, poller) = wired();
        let id = executor_id();
        writer
            .put(&id, &TaskExecutorState::new(), &VersionToken::NotExists)
            .await
            .unwrap();

        let _: TaskExecutorState = poller.get(&id, &fast()).await.unwrap();

        let err = poller
            .get::<TaskExecutorState>(&id, &fast().with_deadline(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err}");
    }

    #[tokio::test]
    async fn missing_document_fails_not_found_at_deadline() {
        let (_, poller) = wired();

        let err = poller
            .get::<TaskExecutorState>(
                &executor_id(),
                &fast().with_deadline(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "expected not-found, got {err}");
    }

    #[tokio::test]
    async fn cancellation_is_observed_promptly() {
        let (_, poller) = wired();
        let token = CancellationToken::new();
        let options = fast().with_cancellation(token.clone());

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let started = std::time::Instant::now();
        let err = poller
            .get::<TaskExecutorState>(&executor_id(), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn get_when_waits_for_condition() {
        let (writer, poller) = wired();
        let id = executor_id();
        let t1 = writer
            .put(&id, &TaskExecutorState::new(), &VersionToken::NotExists)
            .await
            .unwrap();

        let writer_clone = writer.clone();
        let update_id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            let mut state = TaskExecutorState::new();
            state.begin(update_id.child("tasks/1").unwrap());
            state.complete();
            writer_clone.put(&update_id, &state, &t1).await.unwrap();
        });

        let state: TaskExecutorState = poller
            .get_when(
                &id,
                |s: &TaskExecutorState| !s.completed_tasks.is_empty(),
                &fast().with_deadline(Duration::from_secs(2)),
            )
            .await
            .unwrap();
        assert_eq!(state.completed_tasks.len(), 1);
    }

    #[tokio::test]
    async fn get_when_accepts_already_returned_revision() {
        let (writer, poller) = wired();
        let id = executor_id();
        writer
            .put(&id, &TaskExecutorState::new(), &VersionToken::NotExists)
            .await
            .unwrap();

        // get() pins the revision; get_when() must still evaluate it.
        let _: TaskExecutorState = poller.get(&id, &fast()).await.unwrap();

        let state: TaskExecutorState = poller
            .get_when(
                &id,
                TaskExecutorState::is_idle,
                &fast().with_deadline(Duration::from_millis(200)),
            )
            .await
            .unwrap();
        assert!(state.is_idle());
    }
}
