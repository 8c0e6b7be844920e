use std::sync::{Mutex, MutexGuard, PoisonError};

use super::command::{Command, CommandKind};

/// Ordered command list built by one producer.
///
/// `push()` is O(1) and never rejects. Iteration yields commands in push order.
#[derive(Debug, Default, Clone)]
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Kinds in queue order.
    pub fn kinds(&self) -> impl Iterator<Item = CommandKind> + '_ {
        self.commands.iter().map(Command::kind)
    }

    /// Drops all commands. Keeps allocated capacity for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Moves all commands of `other` to the end of `self`, leaving `other` empty.
    #[inline]
    pub fn append(&mut self, other: &mut CommandQueue) {
        self.commands.append(&mut other.commands);
    }
}

impl<'a> IntoIterator for &'a CommandQueue {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

impl Extend<Command> for CommandQueue {
    fn extend<T: IntoIterator<Item = Command>>(&mut self, iter: T) {
        self.commands.extend(iter);
    }
}

impl FromIterator<Command> for CommandQueue {
    fn from_iter<T: IntoIterator<Item = Command>>(iter: T) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

/// Double-buffered hand-off between one producer and one consumer.
///
/// The producer records into its own [`CommandQueue`] without locking and calls
/// [`QueueSwap::submit`] when the batch is complete. The consumer calls
/// [`QueueSwap::acquire`] to take everything submitted so far. Both calls hold the lock
/// only for an append or a swap; neither side ever waits for the other to make progress.
#[derive(Debug, Default)]
pub struct QueueSwap {
    ready: Mutex<CommandQueue>,
}

impl QueueSwap {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CommandQueue> {
        self.ready.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands a completed batch to the consumer, preserving order across batches.
    /// `queue` is left empty with its capacity intact.
    pub fn submit(&self, queue: &mut CommandQueue) {
        if queue.is_empty() {
            return;
        }
        self.lock().append(queue);
    }

    /// Swaps the ready buffer into `out`. Whatever `out` held is discarded first.
    /// Returns `false` when nothing was pending.
    pub fn acquire(&self, out: &mut CommandQueue) -> bool {
        out.clear();
        let mut ready = self.lock();
        std::mem::swap(&mut *ready, out);
        !out.is_empty()
    }

    /// Number of commands submitted and not yet acquired.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::graphics::command::PushDebugMarkerCmd;

    fn marker(i: usize) -> Command {
        Command::PushDebugMarker(PushDebugMarkerCmd::new(i.to_string()))
    }

    #[test]
    fn submit_appends_batches_in_order() {
        let swap = QueueSwap::new();
        let mut q = CommandQueue::new();

        q.push(marker(0));
        q.push(marker(1));
        swap.submit(&mut q);
        assert!(q.is_empty());

        q.push(marker(2));
        swap.submit(&mut q);
        assert_eq!(swap.pending(), 3);

        let mut out = CommandQueue::new();
        assert!(swap.acquire(&mut out));
        let expected: CommandQueue = (0..3).map(marker).collect();
        assert_eq!(out.commands(), expected.commands());
        assert_eq!(swap.pending(), 0);
    }

    #[test]
    fn acquire_on_empty_returns_false() {
        let swap = QueueSwap::new();
        let mut out: CommandQueue = [marker(9)].into_iter().collect();
        assert!(!swap.acquire(&mut out));
        assert!(out.is_empty());
    }

    #[test]
    fn cross_thread_handoff_keeps_order() {
        let swap = Arc::new(QueueSwap::new());
        let producer = {
            let swap = Arc::clone(&swap);
            thread::spawn(move || {
                let mut q = CommandQueue::new();
                for i in 0..500 {
                    q.push(marker(i));
                    if i % 7 == 0 {
                        swap.submit(&mut q);
                    }
                }
                swap.submit(&mut q);
            })
        };

        let mut seen = Vec::new();
        let mut out = CommandQueue::new();
        while seen.len() < 500 {
            if swap.acquire(&mut out) {
                for cmd in &out {
                    if let Command::PushDebugMarker(m) = cmd {
                        seen.push(m.name.parse::<usize>().unwrap());
                    }
                }
            } else {
                thread::yield_now();
            }
        }
        producer.join().unwrap();

        assert_eq!(seen, (0..500).collect::<Vec<_>>());
    }
}
