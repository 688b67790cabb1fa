use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tracing::debug;

use crate::task::CleanupTask;

pub trait TaskScheduler {
    fn schedule_after(&mut self, delay_ticks: u64, task: CleanupTask);

    fn is_shutting_down(&self) -> bool;
}

#[derive(Debug)]
struct Scheduled {
    due_tick: u64,
    seq: u64,
    task: CleanupTask,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due_tick, self.seq).cmp(&(other.due_tick, other.seq))
    }
}

#[derive(Debug, Default)]
pub struct TickScheduler {
    current_tick: u64,
    next_seq: u64,
    queue: BinaryHeap<Reverse<Scheduled>>,
    shutting_down: bool,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn next_due_tick(&self) -> Option<u64> {
        self.queue.peek().map(|Reverse(entry)| entry.due_tick)
    }

    pub fn advance(&mut self) -> Vec<CleanupTask> {
        self.current_tick = self.current_tick.saturating_add(1);
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = self.queue.peek() {
            if entry.due_tick > self.current_tick {
                break;
            }
            if let Some(Reverse(entry)) = self.queue.pop() {
                due.push(entry.task);
            }
        }
        due
    }

    /// Drops everything pending and refuses new work. Returns how many tasks
    /// were dropped.
    pub fn shutdown(&mut self) -> usize {
        self.shutting_down = true;
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }
}

impl TaskScheduler for TickScheduler {
    fn schedule_after(&mut self, delay_ticks: u64, task: CleanupTask) {
        if self.shutting_down {
            debug!("schedule_rejected_during_shutdown");
            return;
        }
        let due_tick = self.current_tick.saturating_add(delay_ticks.max(1));
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.queue.push(Reverse(Scheduled {
            due_tick,
            seq,
            task,
        }));
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }
}
