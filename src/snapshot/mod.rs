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
 * Snapshot subsystem: a self-owned binary file format, plus the saver
 * registry that drives periodic flushes. The framing is hand-rolled
 * length-prefixed binary rather than a delimited text format, so that
 * arbitrary key/value bytes (including embedded commas or newlines)
 * round-trip without ambiguity.
 */

pub mod saver;

use crate::error::{DbError, DbResult};
use crate::store::list::ListEntry;
use crate::store::Store;
use bytes::Bytes;
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"FKV1";
const TAG_STRING: u8 = 0;
const TAG_LIST: u8 = 1;

fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

/// Encode the store's current contents into the `FKV1` binary framing.
/// Emission order within each keyspace is unspecified.
fn encode(store: &Store) -> Vec<u8> {
    store.with_snapshot(|strings, lists| {
        let mut out = Vec::with_capacity(MAGIC.len());
        out.extend_from_slice(MAGIC);
        for (key, value) in strings.iter() {
            out.push(TAG_STRING);
            write_len_prefixed(&mut out, key);
            write_len_prefixed(&mut out, value);
        }
        for (key, entry) in lists.iter() {
            out.push(TAG_LIST);
            write_len_prefixed(&mut out, key);
            let items: Vec<&Bytes> = entry.iter().collect();
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items {
                write_len_prefixed(&mut out, item);
            }
        }
        out
    })
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> DbResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(DbError::SnapshotCorrupt("unexpected end of file".into()));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> DbResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u32(&mut self) -> DbResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn take_bytes(&mut self) -> DbResult<Bytes> {
        let len = self.take_u32()? as usize;
        Ok(Bytes::copy_from_slice(self.take(len)?))
    }
}

/// Decode the `FKV1` framing and replay every record into a fresh
/// `Store`, bypassing change-counter accounting (this is startup
/// replay, not a live mutation stream).
fn decode_into(store: &Store, buf: &[u8]) -> DbResult<()> {
    if buf.len() < MAGIC.len() || &buf[..MAGIC.len()] != MAGIC {
        return Err(DbError::SnapshotCorrupt("bad magic header".into()));
    }
    let mut cursor = Cursor::new(&buf[MAGIC.len()..]);
    while cursor.remaining() > 0 {
        let tag = cursor.take_u8()?;
        let key = cursor.take_bytes()?;
        match tag {
            TAG_STRING => {
                let value = cursor.take_bytes()?;
                store.load_set(key, value);
            }
            TAG_LIST => {
                let count = cursor.take_u32()?;
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(cursor.take_bytes()?);
                }
                store.load_right_push(key, values);
            }
            other => {
                return Err(DbError::SnapshotCorrupt(format!("unknown record tag {other}")));
            }
        }
    }
    Ok(())
}

/// Write the store's contents to `path`, creating the containing
/// directory if missing and truncating any existing file.
pub fn save_to_disk(store: &Store, path: &Path) -> DbResult<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(DbError::Snapshot)?;
        }
    }
    let encoded = encode(store);
    let mut file = fs::File::create(path).map_err(DbError::Snapshot)?;
    file.write_all(&encoded).map_err(DbError::Snapshot)?;
    Ok(())
}

/// Load `path` into `store` if it exists. A missing file is not an
/// error (fresh start); any other I/O or decode error is.
pub fn load_from_disk(store: &Store, path: &Path) -> DbResult<bool> {
    let mut file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(DbError::Snapshot(e)),
    };
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(DbError::Snapshot)?;
    decode_into(store, &buf)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn roundtrip_strings_and_lists() {
        let store = Store::new();
        store.set(b("a"), b("1"));
        store.set(b("b"), b("2"));
        store.right_push(b("L"), vec![b("x"), b("y"), b("z")]).unwrap();

        let encoded = encode(&store);
        let fresh = Store::new();
        decode_into(&fresh, &encoded).unwrap();

        assert_eq!(fresh.get(b"a").unwrap(), Some(b("1")));
        assert_eq!(fresh.get(b"b").unwrap(), Some(b("2")));
        assert!(fresh.exists(b"L"));
        assert_eq!(fresh.lrange(b"L", 0, -1).unwrap(), vec![b("x"), b("y"), b("z")]);
    }

    #[test]
    fn bad_magic_is_corrupt() {
        let err = decode_into(&Store::new(), b"nope").unwrap_err();
        assert!(matches!(err, DbError::SnapshotCorrupt(_)));
    }

    #[test]
    fn unknown_tag_is_corrupt() {
        let mut buf = MAGIC.to_vec();
        buf.push(9); // bad tag
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.push(b'k');
        let err = decode_into(&Store::new(), &buf).unwrap_err();
        assert!(matches!(err, DbError::SnapshotCorrupt(_)));
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let store = Store::new();
        store.set(b("a"), b("1"));
        let mut encoded = encode(&store);
        encoded.truncate(encoded.len() - 2);
        let err = decode_into(&Store::new(), &encoded).unwrap_err();
        assert!(matches!(err, DbError::SnapshotCorrupt(_)));
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = std::env::temp_dir().join(format!("ferrumkv-test-{}", std::process::id()));
        let path = dir.join("dump.fkv");
        let store = Store::new();
        store.set(b("k"), b("v"));
        save_to_disk(&store, &path).unwrap();

        let fresh = Store::new();
        assert!(load_from_disk(&fresh, &path).unwrap());
        assert_eq!(fresh.get(b"k").unwrap(), Some(b("v")));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_loads_nothing() {
        let path = Path::new("/tmp/ferrumkv-definitely-absent-snapshot.fkv");
        let fresh = Store::new();
        assert!(!load_from_disk(&fresh, path).unwrap());
    }
}
