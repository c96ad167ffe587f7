//! Priority levels and the dispatcher's priority lane
//!
//! Tasks that cannot be assigned to a worker right away wait in a
//! [`PriorityLane`]. The lane serves higher priorities first and keeps
//! arrival order within the same priority.

use crate::core::task::QueuedTask;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Task priority (higher number = served first)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Priority(pub i32);

impl Priority {
    /// Background work
    pub const LOW: Priority = Priority(-10);
    /// Default for plain `enqueue`
    pub const NORMAL: Priority = Priority(0);
    /// Important work
    pub const HIGH: Priority = Priority(10);
    /// Must run as soon as a worker frees up
    pub const CRITICAL: Priority = Priority(100);

    /// Get the numeric value of the priority
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Priority(value)
    }
}

/// A queued task with its arrival sequence number
struct LaneEntry {
    sequence: u64,
    task: QueuedTask,
}

/// Higher priority comes first; if equal, earlier sequence (FIFO)
impl PartialEq for LaneEntry {
    fn eq(&self, other: &Self) -> bool {
        self.task.priority == other.task.priority && self.sequence == other.sequence
    }
}

impl Eq for LaneEntry {}

impl PartialOrd for LaneEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LaneEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.task.priority.cmp(&other.task.priority) {
            // BinaryHeap is a max-heap, so the earlier sequence must compare greater
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            other => other,
        }
    }
}

/// Backlog of tasks waiting for a worker, owned by the dispatcher
#[derive(Default)]
pub(crate) struct PriorityLane {
    heap: BinaryHeap<LaneEntry>,
    next_sequence: u64,
}

impl PriorityLane {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Park a newly arrived task behind everything of equal or higher priority
    pub(crate) fn push(&mut self, task: QueuedTask) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(LaneEntry { sequence, task });
    }

    /// Put back a task taken with [`pop`](Self::pop), restoring its original place
    pub(crate) fn restore(&mut self, staged: StagedTask) {
        self.heap.push(staged.0);
    }

    /// Take the next task to assign
    pub(crate) fn pop(&mut self) -> Option<StagedTask> {
        self.heap.pop().map(StagedTask)
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remove every parked task
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = QueuedTask> + '_ {
        self.heap.drain().map(|entry| entry.task)
    }
}

/// A task taken off the lane that keeps its place until it is handed out
pub(crate) struct StagedTask(LaneEntry);

impl StagedTask {
    pub(crate) fn into_task(self) -> QueuedTask {
        self.0.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::TaskId;

    fn queued(priority: i32) -> QueuedTask {
        QueuedTask::new(TaskId::new(), Priority(priority), Box::new(|| Ok(())))
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::CRITICAL > Priority::HIGH);
        assert!(Priority::HIGH > Priority::NORMAL);
        assert!(Priority::NORMAL > Priority::LOW);
        assert_eq!(Priority::default(), Priority::NORMAL);
        assert_eq!(Priority::from(7).value(), 7);
    }

    #[test]
    fn test_lane_serves_highest_priority_first() {
        let mut lane = PriorityLane::new();
        for priority in [1, 8, 5, 10] {
            lane.push(queued(priority));
        }

        let order: Vec<i32> = std::iter::from_fn(|| lane.pop())
            .map(|staged| staged.into_task().priority.value())
            .collect();
        assert_eq!(order, vec![10, 8, 5, 1]);
        assert!(lane.is_empty());
    }

    #[test]
    fn test_lane_is_fifo_within_priority() {
        let mut lane = PriorityLane::new();
        let first = queued(1);
        let boosted = queued(5);
        let last = queued(1);
        let expected = vec![boosted.id, first.id, last.id];

        lane.push(first);
        lane.push(boosted);
        lane.push(last);

        let order: Vec<TaskId> = std::iter::from_fn(|| lane.pop())
            .map(|staged| staged.into_task().id)
            .collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_restore_keeps_original_place() {
        let mut lane = PriorityLane::new();
        let a = queued(0);
        let b = queued(0);
        let (a_id, b_id) = (a.id, b.id);
        lane.push(a);
        lane.push(b);

        let staged = lane.pop().expect("lane should not be empty");
        lane.push(queued(0));
        lane.restore(staged);

        assert_eq!(lane.len(), 3);
        assert_eq!(lane.pop().map(|s| s.into_task().id), Some(a_id));
        assert_eq!(lane.pop().map(|s| s.into_task().id), Some(b_id));
    }

    #[test]
    fn test_drain_empties_lane() {
        let mut lane = PriorityLane::new();
        lane.push(queued(1));
        lane.push(queued(2));

        assert_eq!(lane.drain().count(), 2);
        assert!(lane.is_empty());
    }
}
