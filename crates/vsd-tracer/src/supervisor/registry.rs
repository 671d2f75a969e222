use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::child::ChildProcess;
use crate::debugger::ProcessHandle;

/// Traced processes currently alive, keyed by process ID.
///
/// A process is registered when its creation is reported, and removed
/// once its exit has been processed. Removing a process drops its handle.
pub struct ProcessRegistry<P: ProcessHandle> {
    processes: HashMap<u32, ChildProcess<P>>,
}

impl<P: ProcessHandle> ProcessRegistry<P> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            processes: HashMap::new(),
        }
    }

    /// Registers a process.
    ///
    /// A stale entry with the same ID (whose exit was never reported) is
    /// replaced and dropped.
    pub fn insert(&mut self, child: ChildProcess<P>) -> &mut ChildProcess<P> {
        match self.processes.entry(child.id()) {
            Entry::Occupied(mut entry) => {
                let stale = entry.insert(child);
                tracing::warn!(pid = stale.id(), path = %stale.path().display(), "replacing stale process entry");
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(child),
        }
    }

    /// Returns the process with the given ID.
    pub fn get(&self, id: u32) -> Option<&ChildProcess<P>> {
        self.processes.get(&id)
    }

    /// Returns the process with the given ID.
    pub fn get_mut(&mut self, id: u32) -> Option<&mut ChildProcess<P>> {
        self.processes.get_mut(&id)
    }

    /// Unregisters the process with the given ID.
    pub fn remove(&mut self, id: u32) -> Option<ChildProcess<P>> {
        self.processes.remove(&id)
    }

    /// Returns whether a process with the given ID is registered.
    pub fn contains(&self, id: u32) -> bool {
        self.processes.contains_key(&id)
    }

    /// Returns the number of registered processes.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Returns whether no process is registered.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Returns an iterator over the registered processes.
    pub fn iter(&self) -> impl Iterator<Item = &ChildProcess<P>> {
        self.processes.values()
    }

    /// Forcibly terminates every registered process still running.
    pub fn stop_all(&self) {
        self.processes.values().for_each(ChildProcess::stop);
    }
}

impl<P: ProcessHandle> Default for ProcessRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}
