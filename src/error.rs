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
 * Error taxonomy for the key-value core.
 *
 * Mirrors the flat, hand-written error enum this codebase uses elsewhere:
 * no `thiserror`, just a `Display` impl and a couple of `From` conversions
 * at the boundaries that actually produce `io::Error`.
 */

use std::{fmt, io};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Malformed frame, unknown command, wrong arity, bad SET option, ...
    InvalidCommand(String),
    /// Cross-type access: a string op against a list key or vice versa.
    WrongType,
    /// INCR/DECR on a non-numeric string, or on a list key.
    NotInteger,
    /// I/O failure while reading or writing the snapshot file.
    Snapshot(io::Error),
    /// The snapshot file exists but its framing is invalid.
    SnapshotCorrupt(String),
    /// Transport-level failure on a connection.
    Io(io::Error),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCommand(msg) => write!(f, "{msg}"),
            Self::WrongType => {
                write!(f, "WRONGTYPE Operation against a key holding the wrong kind of value")
            }
            Self::NotInteger => write!(f, "ERR value is not an integer or out of range"),
            Self::Snapshot(e) => write!(f, "snapshot I/O error: {e}"),
            Self::SnapshotCorrupt(msg) => write!(f, "snapshot decode error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for DbError {}

impl From<io::Error> for DbError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Standard wire-facing error messages.
pub mod messages {
    pub const UNKNOWN_COMMAND: &str = "Unknown or disabled command";
    pub const WRONG_TYPE: &str =
        "WRONGTYPE Operation against a key holding the wrong kind of value";
    pub const NOT_INTEGER: &str = "ERR value is not an integer or out of range";
}
