//! Work list
//!
//! In-memory dispatch order over the selected plan's runnable observations.
//! The list is an index into repository state, not a copy of it: the service
//! re-reads each observation at dispatch time and an entry is removed only
//! once its observation was committed terminal (or found undispatchable).
//! A transient failure leaves the front entry in place for the next cycle.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

/// One dispatchable observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkEntry {
    pub observation_id: i64,
    /// 1 is the most urgent, 5 the least
    pub priority: i32,
}

impl Ord for WorkEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.priority, self.observation_id).cmp(&(other.priority, other.observation_id))
    }
}

impl PartialOrd for WorkEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Dispatch ordering for the loaded observations.
///
/// `Fifo` preserves insertion order, which is ascending observation id the
/// way [`load_work_list`](crate::orchestration::PlanSelector::load_work_list)
/// fills it. `Priority` dispatches the most urgent entry first, breaking ties
/// by ascending id; insertion re-heapifies, dispatch never re-sorts.
#[derive(Debug)]
pub enum WorkList {
    Fifo(VecDeque<WorkEntry>),
    Priority(BinaryHeap<Reverse<WorkEntry>>),
}

impl WorkList {
    /// Build the ordering selected by `queue.priority_ordering`.
    pub fn new(priority_ordering: bool) -> Self {
        if priority_ordering {
            Self::by_priority()
        } else {
            Self::fifo()
        }
    }

    pub fn fifo() -> Self {
        Self::Fifo(VecDeque::new())
    }

    pub fn by_priority() -> Self {
        Self::Priority(BinaryHeap::new())
    }

    pub fn push(&mut self, entry: WorkEntry) {
        match self {
            Self::Fifo(queue) => queue.push_back(entry),
            Self::Priority(heap) => heap.push(Reverse(entry)),
        }
    }

    /// The entry that would be dispatched next, without removing it.
    pub fn peek(&self) -> Option<WorkEntry> {
        match self {
            Self::Fifo(queue) => queue.front().copied(),
            Self::Priority(heap) => heap.peek().map(|r| r.0),
        }
    }

    /// Remove the front entry once its observation no longer needs dispatch.
    pub fn pop(&mut self) -> Option<WorkEntry> {
        match self {
            Self::Fifo(queue) => queue.pop_front(),
            Self::Priority(heap) => heap.pop().map(|r| r.0),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Fifo(queue) => queue.len(),
            Self::Priority(heap) => heap.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        match self {
            Self::Fifo(queue) => queue.clear(),
            Self::Priority(heap) => heap.clear(),
        }
    }
}
