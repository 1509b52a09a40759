use serde::{Deserialize, Serialize};

use crate::common::collections::VecDeque;

/// A named unit of deferred work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task<A> {
    pub name: String,
    pub action: A,
}

impl<A> Task<A> {
    pub fn new(name: impl Into<String>, action: A) -> Self {
        Task { name: name.into(), action }
    }
}

/// FIFO of deferred tasks. The host drains it one task per tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Queue<A> {
    tasks: VecDeque<Task<A>>,
}

impl<A> Default for Queue<A> {
    fn default() -> Self { Queue { tasks: VecDeque::new() } }
}

impl<A> Queue<A> {
    pub fn new() -> Self { Self::default() }

    pub fn enqueue(&mut self, task: Task<A>) { self.tasks.push_back(task); }

    pub fn dequeue(&mut self) -> Option<Task<A>> { self.tasks.pop_front() }

    /// Replaces the action of a pending task with the same name, keeping its
    /// place in line; enqueues `task` if there is none. Returns true when an
    /// existing task was replaced.
    pub fn coalesce(&mut self, task: Task<A>) -> bool {
        match self.tasks.iter_mut().find(|pending| pending.name == task.name) {
            Some(pending) => {
                pending.action = task.action;
                true
            }
            None => {
                self.tasks.push_back(task);
                false
            }
        }
    }

    pub fn len(&self) -> usize { self.tasks.len() }

    pub fn is_empty(&self) -> bool { self.tasks.is_empty() }
}
