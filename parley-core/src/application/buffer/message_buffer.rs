use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::inbound::{InboundMessage, MergedBatch};
use super::processor::ConversationProcessor;
use super::state::{BufferState, SessionState};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);
pub const DEFAULT_QUEUE_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_QUEUE_CAP: usize = 20;
pub const DEFAULT_DEDUP_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSettings {
    /// Inbound coalescing window; zero dispatches every message on its own.
    pub debounce: Duration,
    /// Delay before a queued followup is dispatched.
    pub queue_debounce: Duration,
    /// Followups kept per session while it is busy.
    pub queue_cap: usize,
    pub dedup_capacity: usize,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            queue_debounce: DEFAULT_QUEUE_DEBOUNCE,
            queue_cap: DEFAULT_QUEUE_CAP,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
        }
    }
}

/// What happened to an enqueued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// Same (session, message id) already accepted.
    Duplicate,
    /// Waiting in the debounce batch.
    Buffered,
    /// Processor invoked right away.
    Dispatched,
    /// Session busy; added to the followup queue.
    Queued,
    /// Buffer was disposed.
    Rejected,
}

type Message<P> =
    InboundMessage<<P as ConversationProcessor>::Context, <P as ConversationProcessor>::Config>;
type Batch<P> =
    MergedBatch<<P as ConversationProcessor>::Context, <P as ConversationProcessor>::Config>;
type Session<P> =
    SessionState<<P as ConversationProcessor>::Context, <P as ConversationProcessor>::Config>;
type State<P> =
    BufferState<<P as ConversationProcessor>::Context, <P as ConversationProcessor>::Config>;

/// Front door for inbound traffic.
///
/// Deduplicates, debounces and serializes work per session before handing it
/// to the [`ConversationProcessor`]. Sessions run fully in parallel; within a
/// session at most one invocation is in flight and batches keep arrival order.
/// Must be used from within a Tokio runtime.
pub struct MessageBuffer<P: ConversationProcessor> {
    inner: Arc<Inner<P>>,
}

impl<P: ConversationProcessor> Clone for MessageBuffer<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<P: ConversationProcessor> {
    processor: Arc<P>,
    settings: BufferSettings,
    state: Mutex<State<P>>,
}

impl<P: ConversationProcessor> MessageBuffer<P> {
    pub fn new(processor: Arc<P>, settings: BufferSettings) -> Self {
        let state = BufferState::new(settings.dedup_capacity);
        Self {
            inner: Arc::new(Inner {
                processor,
                settings,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn settings(&self) -> &BufferSettings {
        &self.inner.settings
    }

    pub fn enqueue(&self, message: Message<P>) -> Enqueued {
        let inner = &self.inner;
        let mut state = inner.lock();
        if state.disposed {
            debug!(session = %message.session_key, "Buffer disposed, ignoring message");
            return Enqueued::Rejected;
        }
        if !state.seen.remember(&message.session_key, &message.message_id) {
            debug!(
                session = %message.session_key,
                message_id = %message.message_id,
                "Dropping duplicate message"
            );
            return Enqueued::Duplicate;
        }

        let immediate = inner.settings.debounce.is_zero() || message.is_media;
        let generation = state.next_generation();
        let session_key = message.session_key.clone();
        let session = state
            .sessions
            .entry(session_key.clone())
            .or_insert_with(SessionState::new);

        if immediate {
            if let Some(pending) = MergedBatch::merge(std::mem::take(&mut session.pending)) {
                session.cancel_debounce();
                debug!(session = %session_key, messages = pending.len(), "Flushing pending batch ahead of media");
                inner.dispatch_or_queue(session, pending, generation);
            }
            return inner.dispatch_or_queue(session, MergedBatch::single(message), generation);
        }

        session.pending.push(message);
        if let Some(timer) = session.debounce_timer.take() {
            timer.abort();
        }
        session.debounce_generation = generation;
        let delay = inner.settings.debounce;
        let timer_inner = Arc::clone(inner);
        session.debounce_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            timer_inner.flush_debounce(&session_key, generation);
        }));
        Enqueued::Buffered
    }

    /// Cancel every timer and drop all session state. Invocations already in
    /// flight run to completion but nothing further is dispatched.
    pub fn dispose(&self) {
        let mut state = self.inner.lock();
        state.disposed = true;
        for (_, mut session) in state.sessions.drain() {
            session.cancel_timers();
        }
        state.seen.clear();
        info!("Message buffer disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    pub fn is_busy(&self, session_key: &str) -> bool {
        self.inner
            .lock()
            .sessions
            .get(session_key)
            .map(|session| session.busy)
            .unwrap_or(false)
    }

    pub fn queued_len(&self, session_key: &str) -> usize {
        self.inner
            .lock()
            .sessions
            .get(session_key)
            .map(|session| session.followups.len())
            .unwrap_or(0)
    }

    pub fn pending_len(&self, session_key: &str) -> usize {
        self.inner
            .lock()
            .sessions
            .get(session_key)
            .map(|session| session.pending.len())
            .unwrap_or(0)
    }

    /// Sessions with pending, queued or in-flight work.
    pub fn pending_sessions(&self) -> Vec<String> {
        let state = self.inner.lock();
        let mut keys: Vec<_> = state
            .sessions
            .iter()
            .filter(|(_, session)| !session.is_idle())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

impl<P: ConversationProcessor> Inner<P> {
    fn lock(&self) -> MutexGuard<'_, State<P>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn dispatch_or_queue(
        self: &Arc<Self>,
        session: &mut Session<P>,
        batch: Batch<P>,
        generation: u64,
    ) -> Enqueued {
        if !session.busy {
            session.busy = true;
            self.spawn_invocation(batch);
            return Enqueued::Dispatched;
        }

        let cap = self.settings.queue_cap.max(1);
        while session.followups.len() >= cap {
            if let Some(dropped) = session.followups.pop_front() {
                warn!(
                    session = %dropped.session_key,
                    dropped_ids = ?dropped.message_ids,
                    cap,
                    "Followup queue full, dropping oldest message"
                );
            }
        }
        debug!(session = %batch.session_key, queued = session.followups.len() + 1, "Session busy, queued followup");
        let session_key = batch.session_key.clone();
        session.followups.push_back(batch);
        if session.drain_timer.is_some() {
            // a followup inside the drain window restarts it
            self.arm_drain(session, &session_key, generation);
        }
        Enqueued::Queued
    }

    fn spawn_invocation(self: &Arc<Self>, batch: Batch<P>) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let session_key = batch.session_key.clone();
            let messages = batch.len();
            let processor = Arc::clone(&inner.processor);
            debug!(session = %session_key, messages, "Invoking conversation processor");
            let outcome = tokio::spawn(async move { processor.process(batch).await }).await;
            match outcome {
                Ok(Ok(())) => debug!(session = %session_key, "Conversation processor finished"),
                Ok(Err(err)) => {
                    error!(session = %session_key, error = %err, "Conversation processor failed")
                }
                Err(err) => {
                    error!(session = %session_key, error = %err, "Conversation processor panicked")
                }
            }
            inner.settle(&session_key);
        });
    }

    fn flush_debounce(self: &Arc<Self>, session_key: &str, generation: u64) {
        let mut state = self.lock();
        if state.disposed {
            return;
        }
        let drain_generation = state.next_generation();
        let Some(session) = state.sessions.get_mut(session_key) else {
            return;
        };
        if session.debounce_generation != generation {
            return;
        }
        session.debounce_timer = None;
        session.debounce_generation = 0;
        let Some(batch) = MergedBatch::merge(std::mem::take(&mut session.pending)) else {
            return;
        };
        debug!(session = %session_key, messages = batch.len(), "Debounce window closed");
        self.dispatch_or_queue(session, batch, drain_generation);
    }

    fn settle(self: &Arc<Self>, session_key: &str) {
        let mut state = self.lock();
        if state.disposed {
            return;
        }
        let Some(session) = state.sessions.get_mut(session_key) else {
            return;
        };
        if session.followups.is_empty() {
            session.busy = false;
            if session.is_idle() && session.debounce_timer.is_none() {
                state.sessions.remove(session_key);
            }
            return;
        }

        if self.settings.queue_debounce.is_zero() {
            if let Some(next) = session.followups.pop_front() {
                self.spawn_invocation(next);
            }
            return;
        }
        let generation = state.next_generation();
        if let Some(session) = state.sessions.get_mut(session_key) {
            self.arm_drain(session, session_key, generation);
        }
    }

    /// (Re)start the queue debounce window; the oldest followup is
    /// dispatched once it closes.
    fn arm_drain(self: &Arc<Self>, session: &mut Session<P>, session_key: &str, generation: u64) {
        if let Some(timer) = session.drain_timer.take() {
            timer.abort();
        }
        session.drain_generation = generation;
        let delay = self.settings.queue_debounce;
        let inner = Arc::clone(self);
        let key = session_key.to_string();
        session.drain_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.drain(&key, generation);
        }));
    }

    fn drain(self: &Arc<Self>, session_key: &str, generation: u64) {
        let mut state = self.lock();
        if state.disposed {
            return;
        }
        let Some(session) = state.sessions.get_mut(session_key) else {
            return;
        };
        if session.drain_generation != generation {
            return;
        }
        session.drain_timer = None;
        session.drain_generation = 0;
        match session.followups.pop_front() {
            Some(next) => {
                debug!(session = %session_key, remaining = session.followups.len(), "Dispatching queued followup");
                self.spawn_invocation(next);
            }
            None => session.busy = false,
        }
    }
}
