//! Request queue: one active call plus a FIFO of pending calls.
//!
//! The queue only does bookkeeping. Writing to the transport is the caller's
//! job, and happens exactly when [`RequestQueue::push`] or
//! [`RequestQueue::advance`] reports that a call became active.

use std::collections::VecDeque;

use serde_json::Value;

use crate::envelope::CallEnvelope;
use crate::types::CallType;

/// What the client is currently waiting for.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ActiveSlot {
    /// Nothing outstanding.
    #[default]
    Idle,
    /// A connect attempt is in progress; calls queue behind it.
    Handshake,
    /// A call has been written and awaits its reply.
    Call(CallEnvelope),
}

/// Pending calls and the counter that numbers them.
#[derive(Debug)]
pub struct RequestQueue {
    next_call_id: u64,
    active: ActiveSlot,
    pending: VecDeque<CallEnvelope>,
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestQueue {
    pub fn new() -> Self {
        Self {
            next_call_id: 1,
            active: ActiveSlot::Idle,
            pending: VecDeque::new(),
        }
    }

    /// Build an envelope with the next call id. Ids are never reused, even
    /// across `clear` and reconnects.
    pub fn envelope(
        &mut self,
        call_type: CallType,
        params: Vec<Value>,
        index: Option<usize>,
    ) -> CallEnvelope {
        let call_id = self.next_call_id;
        self.next_call_id += 1;
        CallEnvelope::new(call_id, call_type, params, index)
    }

    /// Add a call. Returns `true` when it became the active call and must be
    /// written now; otherwise it waits in the pending queue.
    pub fn push(&mut self, envelope: CallEnvelope) -> bool {
        if matches!(self.active, ActiveSlot::Idle) {
            self.active = ActiveSlot::Call(envelope);
            true
        } else {
            self.pending.push_back(envelope);
            false
        }
    }

    /// Mark the queue busy for the duration of a connect attempt.
    pub fn begin_handshake(&mut self) {
        self.active = ActiveSlot::Handshake;
    }

    /// Finish the active entry. Returns `true` when the next pending call
    /// became active and must be written; `false` when the queue went idle.
    pub fn advance(&mut self) -> bool {
        match self.pending.pop_front() {
            Some(next) => {
                self.active = ActiveSlot::Call(next);
                true
            }
            None => {
                self.active = ActiveSlot::Idle;
                false
            }
        }
    }

    /// Drop the active entry and every pending call. Returns how many calls
    /// were abandoned.
    pub fn clear(&mut self) -> usize {
        let active = usize::from(matches!(self.active, ActiveSlot::Call(_)));
        let dropped = active + self.pending.len();
        self.active = ActiveSlot::Idle;
        self.pending.clear();
        dropped
    }

    /// The call awaiting a reply, if any.
    pub fn active_call(&self) -> Option<&CallEnvelope> {
        match &self.active {
            ActiveSlot::Call(envelope) => Some(envelope),
            ActiveSlot::Idle | ActiveSlot::Handshake => None,
        }
    }

    pub fn active(&self) -> &ActiveSlot {
        &self.active
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self.active, ActiveSlot::Idle)
    }

    pub fn is_idle(&self) -> bool {
        !self.is_busy() && self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pending calls in the order they will be written.
    pub fn pending(&self) -> impl Iterator<Item = &CallEnvelope> {
        self.pending.iter()
    }
}
