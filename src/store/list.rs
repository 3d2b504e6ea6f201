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
 * The list container. Backed by a `VecDeque` rather than a linked
 * chain: push at either end is amortised O(1), `len` is O(1), and
 * range reads are contiguous slices rather than a pointer walk.
 */

use bytes::Bytes;
use std::collections::VecDeque;

#[derive(Debug, Default, Clone)]
pub struct ListEntry {
    items: VecDeque<Bytes>,
}

impl ListEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `LPUSH k a b c` on empty yields head-to-tail `c, b, a`: each
    /// value is pushed to the front in argument order, so the last
    /// argument ends up closest to the head.
    pub fn left_push<I: IntoIterator<Item = Bytes>>(&mut self, values: I) {
        for v in values {
            self.items.push_front(v);
        }
    }

    /// `RPUSH k a b c` on empty yields `a, b, c`.
    pub fn right_push<I: IntoIterator<Item = Bytes>>(&mut self, values: I) {
        for v in values {
            self.items.push_back(v);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Zero-based inclusive range with negative indices counting from
    /// the tail.
    pub fn lrange(&self, start: i64, stop: i64) -> Vec<Bytes> {
        let len = self.items.len() as i64;
        if len == 0 {
            return Vec::new();
        }
        let mut start = if start < -len {
            0
        } else if start < 0 {
            start + len
        } else {
            start
        };
        let mut stop = if stop < -len {
            0
        } else if stop < 0 {
            stop + len
        } else {
            stop
        };
        if start >= len {
            return Vec::new();
        }
        if stop >= len {
            stop = len - 1;
        }
        if stop < start {
            return Vec::new();
        }
        if start < 0 {
            start = 0;
        }
        self.items
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    fn list(vals: &[&str]) -> ListEntry {
        let mut l = ListEntry::new();
        l.right_push(vals.iter().map(|s| b(s)));
        l
    }

    #[test]
    fn lpush_ordering() {
        let mut l = ListEntry::new();
        l.left_push([b("a"), b("b"), b("c")]);
        assert_eq!(l.lrange(0, -1), vec![b("c"), b("b"), b("a")]);
    }

    #[test]
    fn rpush_ordering() {
        let l = list(&["a", "b", "c"]);
        assert_eq!(l.lrange(0, -1), vec![b("a"), b("b"), b("c")]);
    }

    #[test]
    fn lrange_negative_indices() {
        let l = list(&["a", "b", "c", "d", "e"]);
        assert_eq!(l.lrange(-2, -1), vec![b("d"), b("e")]);
        assert_eq!(l.lrange(-100, -1), vec![b("a"), b("b"), b("c"), b("d"), b("e")]);
        assert_eq!(l.lrange(0, 100), vec![b("a"), b("b"), b("c"), b("d"), b("e")]);
    }

    #[test]
    fn lrange_out_of_bounds_is_empty() {
        let l = list(&["a", "b"]);
        assert_eq!(l.lrange(5, 10), Vec::<Bytes>::new());
        assert_eq!(l.lrange(1, 0), Vec::<Bytes>::new());
    }

    #[test]
    fn lrange_empty_list() {
        let l = ListEntry::new();
        assert_eq!(l.lrange(0, -1), Vec::<Bytes>::new());
    }

    #[test]
    fn boundary_formula_matches_brute_force(
    ) {
        // compare against a naive reference implementation for a
        // spread of (start, stop) pairs around the list's bounds.
        let data: Vec<Bytes> = (0..7).map(|i| b(&i.to_string())).collect();
        let l = list(&["0", "1", "2", "3", "4", "5", "6"]);
        let n = data.len() as i64;
        for start in -2 * n..=2 * n {
            for stop in -2 * n..=2 * n {
                let got = l.lrange(start, stop);
                let expected = brute_force(&data, start, stop, n);
                assert_eq!(got, expected, "start={start} stop={stop}");
            }
        }
    }

    fn brute_force(data: &[Bytes], start: i64, stop: i64, len: i64) -> Vec<Bytes> {
        let mut start = if start < -len {
            0
        } else if start < 0 {
            start + len
        } else {
            start
        };
        let mut stop = if stop < -len {
            0
        } else if stop < 0 {
            stop + len
        } else {
            stop
        };
        if start >= len {
            return Vec::new();
        }
        if stop >= len {
            stop = len - 1;
        }
        if stop < start {
            return Vec::new();
        }
        if start < 0 {
            start = 0;
        }
        data[start as usize..=stop as usize].to_vec()
    }
}
