use std::collections::BTreeMap;

use crate::foundation::core::Time;

/// Identifier of one scheduled call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

#[derive(Clone, Debug)]
struct Entry<E> {
    id: TimerId,
    group: u64,
    at: Time,
    payload: E,
}

/// Call-at-offset queue.
///
/// Entries fire in `(time, insertion)` order. Every entry belongs to a group so that a whole
/// beat sequence can be cancelled at once when its scene is left.
#[derive(Clone, Debug)]
pub struct Timers<E> {
    entries: BTreeMap<(u64, u64), Entry<E>>,
    next_seq: u64,
}

impl<E> Default for Timers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Timers<E> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `payload` to fire at `at`.
    pub fn schedule(&mut self, at: Time, group: u64, payload: E) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = TimerId(seq);
        self.entries.insert(
            (time_key(at), seq),
            Entry {
                id,
                group,
                at,
                payload,
            },
        );
        id
    }

    /// Cancel one entry. Returns `true` when it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self
            .entries
            .iter()
            .find(|(_, e)| e.id == id)
            .map(|(k, _)| *k);
        match key {
            Some(k) => self.entries.remove(&k).is_some(),
            None => false,
        }
    }

    /// Cancel every entry in `group`, returning how many were dropped.
    pub fn cancel_group(&mut self, group: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.group != group);
        before - self.entries.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Return `true` when nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Time> {
        self.entries.values().next().map(|e| e.at)
    }

    /// Pop the earliest entry due at or before `now`, with its deadline and group.
    pub fn pop_due(&mut self, now: Time) -> Option<(Time, u64, E)> {
        let (&key, entry) = self.entries.iter().next()?;
        if entry.at > now {
            return None;
        }
        self.entries
            .remove(&key)
            .map(|e| (e.at, e.group, e.payload))
    }

    /// Pop every entry due at or before `now`, in firing order.
    pub fn due(&mut self, now: Time) -> Vec<E> {
        let mut out = Vec::new();
        while let Some((_, _, payload)) = self.pop_due(now) {
            out.push(payload);
        }
        out
    }
}

// Session times are non-negative, so the IEEE bit pattern orders the same way as the value.
fn time_key(at: Time) -> u64 {
    at.secs().max(0.0).to_bits()
}

#[cfg(test)]
#[path = "../../tests/unit/animation/timers.rs"]
mod tests;
