use std::collections::HashMap;
use std::hash::Hash;

use crate::animation::ease::{Ease, lerp};
use crate::foundation::core::Time;

/// Identifier of one scheduled tween.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(pub u64);

/// Completion notice emitted by [`Tweener::advance`].
#[derive(Clone, Debug, PartialEq)]
pub struct TweenDone<K> {
    /// Tween that finished.
    pub id: TweenId,
    /// Property key it animated.
    pub key: K,
    /// Exact timeline instant the tween reached its end value.
    pub at: Time,
}

#[derive(Clone, Debug)]
struct Tween<K> {
    id: TweenId,
    key: K,
    from: Option<f64>,
    to: f64,
    start: Time,
    duration: f64,
    ease: Ease,
}

/// Keyed scalar tween scheduler.
///
/// Each key names one animatable numeric property (a clip volume, a layer opacity). Starting a
/// tween on a key overwrites any tween already in flight on that key, so the newest request
/// always owns the end state. Start values are captured when a tween actually begins, after its
/// delay, which matches how timeline libraries chain fades.
#[derive(Clone, Debug)]
pub struct Tweener<K> {
    values: HashMap<K, f64>,
    active: Vec<Tween<K>>,
    finished: Vec<TweenDone<K>>,
    next_id: u64,
    now: Time,
}

impl<K> Default for Tweener<K>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Tweener<K>
where
    K: Clone + Eq + Hash,
{
    /// Create an empty scheduler positioned at [`Time::ZERO`].
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            active: Vec::new(),
            finished: Vec::new(),
            next_id: 0,
            now: Time::ZERO,
        }
    }

    /// Timeline position reached by the last [`Tweener::advance`] call.
    pub fn now(&self) -> Time {
        self.now
    }

    /// Current value of a property, if it was ever set or tweened.
    pub fn value(&self, key: &K) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Return `true` while any tween (running or delayed) targets `key`.
    pub fn is_tweening(&self, key: &K) -> bool {
        self.active.iter().any(|t| &t.key == key)
    }

    /// Number of tweens in flight.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Set a value immediately, killing any tween on the key.
    pub fn set(&mut self, key: K, value: f64) {
        self.kill(&key);
        self.values.insert(key, value);
    }

    /// Forget a property entirely: its value and any tween on it.
    pub fn remove(&mut self, key: &K) {
        self.kill(key);
        self.values.remove(key);
    }

    /// Tween `key` to `end` over `duration` seconds, starting `delay` seconds from now.
    pub fn to(&mut self, key: K, end: f64, duration: f64, ease: Ease, delay: f64) -> TweenId {
        let start = self.now + delay.max(0.0);
        self.to_at(key, end, duration, ease, start)
    }

    /// Tween `key` to `end` starting at an absolute instant.
    ///
    /// `start` may lie in the past: the tween then resumes already partially progressed, which
    /// lets chained fades keep exact timeline offsets even when frames are coarse.
    pub fn to_at(&mut self, key: K, end: f64, duration: f64, ease: Ease, start: Time) -> TweenId {
        self.kill(&key);
        let id = TweenId(self.next_id);
        self.next_id += 1;

        let duration = duration.max(0.0);
        if duration == 0.0 && start <= self.now {
            self.values.insert(key.clone(), end);
            self.finished.push(TweenDone {
                id,
                key,
                at: start,
            });
            return id;
        }

        self.active.push(Tween {
            id,
            key,
            from: None,
            to: end,
            start,
            duration,
            ease,
        });
        id
    }

    /// Kill every tween targeting `key`, leaving its current value in place.
    pub fn kill(&mut self, key: &K) {
        self.active.retain(|t| &t.key != key);
        self.finished.retain(|d| &d.key != key);
    }

    /// Kill every tween whose key matches `pred`.
    pub fn kill_where(&mut self, mut pred: impl FnMut(&K) -> bool) {
        self.active.retain(|t| !pred(&t.key));
        self.finished.retain(|d| !pred(&d.key));
    }

    /// Advance the timeline to `now`, updating values and returning finished tweens in
    /// scheduling order.
    pub fn advance(&mut self, now: Time) -> Vec<TweenDone<K>> {
        self.now = self.now.max(now);
        let now = self.now;
        let mut done = std::mem::take(&mut self.finished);

        let values = &mut self.values;
        self.active.retain_mut(|t| {
            if now < t.start {
                return true;
            }
            let from = *t
                .from
                .get_or_insert_with(|| values.get(&t.key).copied().unwrap_or(t.to));
            let progress = if t.duration == 0.0 {
                1.0
            } else {
                now.since(t.start) / t.duration
            };
            if progress >= 1.0 {
                values.insert(t.key.clone(), t.to);
                done.push(TweenDone {
                    id: t.id,
                    key: t.key.clone(),
                    at: t.start + t.duration,
                });
                return false;
            }
            values.insert(t.key.clone(), lerp(from, t.to, t.ease.apply(progress)));
            true
        });

        done
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/tween.rs"]
mod tests;
