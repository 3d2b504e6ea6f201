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

//! Small general-purpose helpers shared across the crate.

/// Dark compiler arts: branch hints for the hot paths in the command
/// evaluator and the codec. These are no-ops on stable beyond nudging
/// the optimizer; they exist because the branches they mark really are
/// lopsided (a malformed frame or a missing key is the cold path).
pub mod compiler {
    #[cold]
    #[inline(never)]
    pub const fn cold() {}

    #[inline(always)]
    pub const fn likely(b: bool) -> bool {
        if !b {
            cold()
        }
        b
    }

    #[inline(always)]
    pub const fn unlikely(b: bool) -> bool {
        if b {
            cold()
        }
        b
    }
}

/// Current time as a Unix timestamp in seconds, used to resolve
/// `EXAT`/`PXAT` against wall-clock deadlines.
pub fn now_unix_seconds() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
