/*
 * Created on Thu Jul 23 2026
 *
 * This file is a part of ferrumkv
 * ferrumkv is a free and open-source, single-node, in-memory key-value
 * store speaking a RESP-compatible wire protocol, built by Ferrum Labs.
 *
 * Copyright (c) 2026, Ferrum Labs <hello@ferrumlabs.dev>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

/*
 * Shared TTL reaper. A single background task owns one min-heap keyed
 * by deadline and a side table mapping each key to its current epoch.
 * Registering a new expiry for a key bumps its epoch; when the heap
 * pops an entry whose epoch no longer matches the table, that entry is
 * stale (the key was overwritten or re-expired since) and is silently
 * discarded rather than deleted -- overwriting a key always cancels
 * its previous expiry rather than leaving both timers live.
 */

use crate::store::Store;
use bytes::Bytes;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::time::sleep_until;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Deadline(Instant);

type HeapEntry = Reverse<(Deadline, u64, Bytes)>;

struct ReaperState {
    heap: BinaryHeap<HeapEntry>,
    epochs: HashMap<Bytes, u64>,
    next_epoch: u64,
}

impl ReaperState {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            epochs: HashMap::new(),
            next_epoch: 0,
        }
    }
}

/// Handle used by the command evaluator to register expirations. Clones
/// share the same underlying state; the background task owns the other
/// clone driving the heap.
#[derive(Clone)]
pub struct Reaper {
    state: Arc<Mutex<ReaperState>>,
    wake: Arc<Notify>,
}

impl Reaper {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ReaperState::new())),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Schedule `key` to expire at `deadline`. Any previously scheduled
    /// expiry for the same key is invalidated (its epoch no longer
    /// matches, so the reaper drops it when it eventually surfaces).
    pub fn schedule(&self, key: Bytes, deadline: Instant) {
        let mut state = self.state.lock();
        let epoch = state.next_epoch;
        state.next_epoch += 1;
        state.epochs.insert(key.clone(), epoch);
        state.heap.push(Reverse((Deadline(deadline), epoch, key)));
        drop(state);
        self.wake.notify_one();
    }

    /// Cancel any pending expiry for `key` (used when a key is deleted
    /// outright rather than overwritten with a fresh TTL).
    pub fn cancel(&self, key: &[u8]) {
        let mut state = self.state.lock();
        state.epochs.remove(key);
    }

    /// Whether `key` currently has a live TTL registration.
    pub fn has_pending(&self, key: &[u8]) -> bool {
        self.state.lock().epochs.contains_key(key)
    }

    /// Drive the reaper until `shutdown` fires. Pops expired entries off
    /// the heap and deletes them from `store`, skipping any whose epoch
    /// has been superseded.
    pub async fn run(self, store: Store, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        loop {
            let next_deadline = {
                let state = self.state.lock();
                state.heap.peek().map(|Reverse((d, _, _))| d.0)
            };

            let wait = async {
                match next_deadline {
                    Some(deadline) => sleep_until(deadline.into()).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = wait => {
                    self.reap_ready(&store);
                }
                _ = self.wake.notified() => {
                    // heap contents changed; loop around and recompute the deadline
                }
                _ = shutdown.recv() => {
                    return;
                }
            }
        }
    }

    fn reap_ready(&self, store: &Store) {
        let now = Instant::now();
        loop {
            let mut state = self.state.lock();
            let due = matches!(state.heap.peek(), Some(Reverse((deadline, _, _))) if deadline.0 <= now);
            if !due {
                return;
            }
            let Reverse((_, epoch, key)) = state.heap.pop().unwrap();
            let current = state.epochs.get(&key).copied();
            if current == Some(epoch) {
                // Keep the state lock held across the epoch re-check and
                // the delete itself: `cancel`/`schedule` also take this
                // lock before ever touching the store, so a re-SET on
                // another connection cannot land between "epoch still
                // matches" and "delete the key", and can never observe
                // this reaper deleting a value it just wrote.
                state.epochs.remove(&key);
                store.expire_now(&key);
            }
            // else: stale entry, already superseded or cancelled
        }
    }
}

impl Default for Reaper {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a Unix-seconds deadline (as used by `EXAT`) into an
/// `Instant`, clamping past deadlines to "now" so they reap immediately
/// rather than being rejected.
pub fn deadline_from_unix_seconds(unix_seconds: i64) -> Instant {
    let now_unix = crate::util::now_unix_seconds();
    let delta = unix_seconds - now_unix;
    if delta <= 0 {
        Instant::now()
    } else {
        Instant::now() + Duration::from_secs(delta as u64)
    }
}

/// Same as `deadline_from_unix_seconds` but for a millisecond Unix
/// timestamp (as used by `PXAT`).
pub fn deadline_from_unix_millis(unix_millis: i64) -> Instant {
    let now_millis = crate::util::now_unix_seconds() * 1000;
    let delta = unix_millis - now_millis;
    if delta <= 0 {
        Instant::now()
    } else {
        Instant::now() + Duration::from_millis(delta as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_then_cancel_removes_epoch() {
        let reaper = Reaper::new();
        reaper.schedule(Bytes::from_static(b"k"), Instant::now() + Duration::from_secs(60));
        assert!(reaper.state.lock().epochs.contains_key(&Bytes::from_static(b"k")));
        reaper.cancel(b"k");
        assert!(!reaper.state.lock().epochs.contains_key(&Bytes::from_static(b"k")));
    }

    #[test]
    fn rescheduling_bumps_epoch() {
        // overwriting a key's expiry must invalidate the earlier entry
        let reaper = Reaper::new();
        let key = Bytes::from_static(b"k");
        reaper.schedule(key.clone(), Instant::now() + Duration::from_secs(60));
        let first_epoch = *reaper.state.lock().epochs.get(&key).unwrap();
        reaper.schedule(key.clone(), Instant::now() + Duration::from_secs(120));
        let second_epoch = *reaper.state.lock().epochs.get(&key).unwrap();
        assert_ne!(first_epoch, second_epoch);
        assert_eq!(reaper.state.lock().heap.len(), 2);
    }

    #[test]
    fn past_deadline_clamped_to_now() {
        let past = crate::util::now_unix_seconds() - 3600;
        let deadline = deadline_from_unix_seconds(past);
        assert!(deadline <= Instant::now());
    }

    #[tokio::test]
    async fn reap_ready_deletes_expired_and_skips_stale() {
        let store = Store::new();
        store.set(Bytes::from_static(b"a"), Bytes::from_static(b"1"));
        store.set(Bytes::from_static(b"b"), Bytes::from_static(b"2"));
        let reaper = Reaper::new();
        reaper.schedule(Bytes::from_static(b"a"), Instant::now());
        // superseded entry for "b": reschedule further out, old heap entry stays but is stale
        reaper.schedule(Bytes::from_static(b"b"), Instant::now());
        reaper.schedule(Bytes::from_static(b"b"), Instant::now() + Duration::from_secs(60));
        reaper.reap_ready(&store);
        assert!(!store.exists(b"a"));
        assert!(store.exists(b"b"));
    }
}
