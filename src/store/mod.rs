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
 * The in-memory data model: a dual-keyspace map shared across
 * connections. A `Store` is cheap to clone -- clones share the same
 * backing `Arc`, so the handle can be copied into every connection
 * task without copying data.
 *
 * The string/list map pair lives behind a single `parking_lot::RwLock`
 * (readers: get/exists/lrange/keys/snapshotting; writers: set/delete/
 * incr/decr/left_push/right_push). The mutation counter is a
 * standalone atomic, not covered by that lock, so a saver reading it
 * never contends with writers.
 */

pub mod list;

use crate::error::{DbError, DbResult};
use bytes::Bytes;
use list::ListEntry;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Keyspace {
    strings: HashMap<Bytes, Bytes>,
    lists: HashMap<Bytes, ListEntry>,
}

struct Inner {
    data: RwLock<Keyspace>,
    changes: AtomicU64,
}

/// The shared key-value store. Clones are shallow references to the
/// same underlying state; there is no connection-local state here,
/// just the one process-wide pair of keyspaces.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                data: RwLock::new(Keyspace::default()),
                changes: AtomicU64::new(0),
            }),
        }
    }

    /// Current value of the process-wide mutation counter.
    pub fn change_count(&self) -> u64 {
        self.inner.changes.load(Ordering::SeqCst)
    }

    fn bump(&self, by: u64) {
        if by > 0 {
            self.inner.changes.fetch_add(by, Ordering::SeqCst);
        }
    }

    /// `SET k v`: always succeeds; clears any list previously stored
    /// under `k`. Counts as one change.
    pub fn set(&self, key: Bytes, value: Bytes) {
        let mut ks = self.inner.data.write();
        ks.lists.remove(&key);
        ks.strings.insert(key, value);
        drop(ks);
        self.bump(1);
    }

    /// `GET k`. `Ok(None)` is the "nil" case; `Err(WrongType)` if `k`
    /// names a list.
    pub fn get(&self, key: &[u8]) -> DbResult<Option<Bytes>> {
        let ks = self.inner.data.read();
        if ks.lists.contains_key(key) {
            return Err(DbError::WrongType);
        }
        Ok(ks.strings.get(key).cloned())
    }

    pub fn exists(&self, key: &[u8]) -> bool {
        let ks = self.inner.data.read();
        ks.strings.contains_key(key) || ks.lists.contains_key(key)
    }

    /// `DEL k1 k2 ...`: returns the count of keys that existed (in
    /// either map) before removal.
    pub fn delete<'a, I: IntoIterator<Item = &'a [u8]>>(&self, keys: I) -> u64 {
        let mut ks = self.inner.data.write();
        let mut removed = 0u64;
        for key in keys {
            let had_string = ks.strings.remove(key).is_some();
            let had_list = ks.lists.remove(key).is_some();
            if had_string || had_list {
                removed += 1;
            }
        }
        drop(ks);
        self.bump(removed);
        removed
    }

    fn incr_by(&self, key: &[u8], delta: i64) -> DbResult<i64> {
        let mut ks = self.inner.data.write();
        if ks.lists.contains_key(key) {
            return Err(DbError::NotInteger);
        }
        let current = match ks.strings.get(key) {
            Some(v) => std::str::from_utf8(v)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(DbError::NotInteger)?,
            None => 0,
        };
        let next = current
            .checked_add(delta)
            .ok_or(DbError::NotInteger)?;
        ks.strings
            .insert(Bytes::copy_from_slice(key), Bytes::from(next.to_string()));
        drop(ks);
        self.bump(1);
        Ok(next)
    }

    pub fn incr(&self, key: &[u8]) -> DbResult<i64> {
        self.incr_by(key, 1)
    }

    pub fn decr(&self, key: &[u8]) -> DbResult<i64> {
        self.incr_by(key, -1)
    }

    /// `LPUSH k v1 v2 ...`: returns the new length.
    pub fn left_push(&self, key: Bytes, values: Vec<Bytes>) -> DbResult<usize> {
        let mut ks = self.inner.data.write();
        if ks.strings.contains_key(&key) {
            return Err(DbError::WrongType);
        }
        let entry = ks.lists.entry(key).or_insert_with(ListEntry::new);
        entry.left_push(values);
        let len = entry.len();
        drop(ks);
        self.bump(1);
        Ok(len)
    }

    /// `RPUSH k v1 v2 ...`: returns the new length.
    pub fn right_push(&self, key: Bytes, values: Vec<Bytes>) -> DbResult<usize> {
        let mut ks = self.inner.data.write();
        if ks.strings.contains_key(&key) {
            return Err(DbError::WrongType);
        }
        let entry = ks.lists.entry(key).or_insert_with(ListEntry::new);
        entry.right_push(values);
        let len = entry.len();
        drop(ks);
        self.bump(1);
        Ok(len)
    }

    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> DbResult<Vec<Bytes>> {
        let ks = self.inner.data.read();
        if ks.strings.contains_key(key) {
            return Err(DbError::WrongType);
        }
        Ok(ks
            .lists
            .get(key)
            .map(|l| l.lrange(start, stop))
            .unwrap_or_default())
    }

    /// Union of both keyspaces' key sets (used by `SCAN`).
    pub fn keys(&self) -> Vec<Bytes> {
        let ks = self.inner.data.read();
        ks.strings
            .keys()
            .cloned()
            .chain(ks.lists.keys().cloned())
            .collect()
    }

    /// Run `f` against a read-locked, point-in-time view of both maps.
    /// Used by the snapshot engine so the whole dump is consistent.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&HashMap<Bytes, Bytes>, &HashMap<Bytes, ListEntry>) -> R) -> R {
        let ks = self.inner.data.read();
        f(&ks.strings, &ks.lists)
    }

    /// Insert a string entry without going through `set`'s change
    /// accounting -- used only while replaying a snapshot at startup.
    pub fn load_set(&self, key: Bytes, value: Bytes) {
        let mut ks = self.inner.data.write();
        ks.strings.insert(key, value);
    }

    /// Append to a list entry without change accounting -- used only
    /// while replaying a snapshot at startup.
    pub fn load_right_push(&self, key: Bytes, values: Vec<Bytes>) {
        let mut ks = self.inner.data.write();
        ks.lists.entry(key).or_insert_with(ListEntry::new).right_push(values);
    }

    /// Unconditional delete used by the TTL reaper: always removes the
    /// key from whichever map it happens to be in, if any.
    pub fn expire_now(&self, key: &[u8]) {
        let mut ks = self.inner.data.write();
        let had_string = ks.strings.remove(key).is_some();
        let had_list = ks.lists.remove(key).is_some();
        drop(ks);
        if had_string || had_list {
            self.bump(1);
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn set_overwrites_list_with_string() {
        let store = Store::new();
        store.right_push(b("k"), vec![b("a")]).unwrap();
        store.set(b("k"), b("v"));
        assert_eq!(store.get(b"k").unwrap(), Some(b("v")));
        assert!(store.lrange(b"k", 0, -1).unwrap().is_empty());
    }

    #[test]
    fn get_on_list_key_is_wrongtype() {
        let store = Store::new();
        store.right_push(b("k"), vec![b("a")]).unwrap();
        assert!(matches!(store.get(b"k"), Err(DbError::WrongType)));
    }

    #[test]
    fn lpush_on_string_key_is_wrongtype() {
        let store = Store::new();
        store.set(b("k"), b("v"));
        assert!(matches!(store.left_push(b("k"), vec![b("a")]), Err(DbError::WrongType)));
    }

    #[test]
    fn incr_decr_roundtrip() {
        let store = Store::new();
        assert_eq!(store.incr(b"n").unwrap(), 1);
        assert_eq!(store.incr(b"n").unwrap(), 2);
        assert_eq!(store.decr(b"n").unwrap(), 1);
    }

    #[test]
    fn incr_non_numeric_is_not_integer() {
        let store = Store::new();
        store.set(b("n"), b("abc"));
        assert!(matches!(store.incr(b"n"), Err(DbError::NotInteger)));
    }

    #[test]
    fn change_counter_tracks_mutations() {
        let store = Store::new();
        store.set(b("a"), b("1"));
        store.set(b("b"), b("2"));
        store.incr(b"c").unwrap();
        assert_eq!(store.change_count(), 3);
        let removed = store.delete([b"a".as_slice(), b"zzz".as_slice(), b"b".as_slice()]);
        assert_eq!(removed, 2);
        assert_eq!(store.change_count(), 5);
        // reads never bump the counter
        let _ = store.get(b"c");
        let _ = store.exists(b"c");
        assert_eq!(store.change_count(), 5);
    }

    #[test]
    fn delete_counts_only_existing_keys() {
        let store = Store::new();
        store.set(b("a"), b("1"));
        assert_eq!(store.delete([b"a".as_slice(), b"missing".as_slice()]), 1);
    }
}
