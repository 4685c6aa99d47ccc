use std::collections::{HashMap, HashSet, VecDeque};
use tokio::task::JoinHandle;

use super::inbound::{InboundMessage, MergedBatch};

pub(super) struct SessionState<C, K> {
    pub busy: bool,
    pub pending: Vec<InboundMessage<C, K>>,
    pub debounce_generation: u64,
    pub debounce_timer: Option<JoinHandle<()>>,
    pub followups: VecDeque<MergedBatch<C, K>>,
    pub drain_generation: u64,
    pub drain_timer: Option<JoinHandle<()>>,
}

impl<C, K> SessionState<C, K> {
    pub fn new() -> Self {
        Self {
            busy: false,
            pending: Vec::new(),
            debounce_generation: 0,
            debounce_timer: None,
            followups: VecDeque::new(),
            drain_generation: 0,
            drain_timer: None,
        }
    }

    pub fn cancel_debounce(&mut self) {
        self.debounce_generation = 0;
        if let Some(timer) = self.debounce_timer.take() {
            timer.abort();
        }
    }

    pub fn cancel_timers(&mut self) {
        self.cancel_debounce();
        self.drain_generation = 0;
        if let Some(timer) = self.drain_timer.take() {
            timer.abort();
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.busy && self.pending.is_empty() && self.followups.is_empty()
    }
}

/// Bounded memory of (session, message id) pairs already accepted.
pub(super) struct SeenMessages {
    capacity: usize,
    ids: HashSet<(String, String)>,
    order: VecDeque<(String, String)>,
}

impl SeenMessages {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ids: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Returns `false` when the pair was already seen.
    pub fn remember(&mut self, session_key: &str, message_id: &str) -> bool {
        if message_id.is_empty() {
            return true;
        }
        let key = (session_key.to_string(), message_id.to_string());
        if !self.ids.insert(key.clone()) {
            return false;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.order.clear();
    }
}

pub(super) struct BufferState<C, K> {
    pub sessions: HashMap<String, SessionState<C, K>>,
    pub seen: SeenMessages,
    pub disposed: bool,
    generation: u64,
}

impl<C, K> BufferState<C, K> {
    pub fn new(dedup_capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            seen: SeenMessages::new(dedup_capacity),
            disposed: false,
            generation: 0,
        }
    }

    /// Timer generations are unique across sessions so a stale timer can
    /// never match a recreated session. Zero is never issued.
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}
