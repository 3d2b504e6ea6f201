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
 * The RESP wire codec: decodes a single complete request buffer into
 * a `Command`, and encodes a `Reply` back into wire bytes.
 *
 * Pipelining is deliberately not supported: `decode_command` consumes
 * exactly one top-level frame per call, then waits for the next read.
 */

use crate::error::{DbError, DbResult};
use bytes::{Bytes, BytesMut};

/// A single RESP frame, covering all five wire types. Used both to
/// represent a decoded incoming command (as `Array(Some(bulk strings))`)
/// and an outgoing reply -- RESP is symmetric, so one type serves both
/// directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    SimpleString(Bytes),
    Error(Bytes),
    Integer(i64),
    BulkString(Option<Bytes>),
    Array(Option<Vec<Frame>>),
}

/// Alias used where a value plays the role of a *reply* rather than an
/// arbitrary frame -- purely a naming convenience at call sites.
pub type Reply = Frame;

/// A decoded, name-resolved command ready for dispatch.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub args: Vec<Bytes>,
}

/// Find the first `\r\n` in `buf` and split it off. Returns the line
/// content and the number of bytes consumed (including the CRLF).
fn read_line(buf: &[u8]) -> DbResult<(&[u8], usize)> {
    for i in 0..buf.len().saturating_sub(1) {
        if buf[i] == b'\r' && buf[i + 1] == b'\n' {
            return Ok((&buf[..i], i + 2));
        }
    }
    Err(DbError::InvalidCommand("missing CRLF terminator".into()))
}

fn parse_i64(bytes: &[u8]) -> DbResult<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| DbError::InvalidCommand("malformed integer in frame".into()))
}

/// Decode exactly one frame starting at `buf[0]`. Returns the frame
/// and the number of bytes consumed from `buf`.
pub fn decode_frame(buf: &[u8]) -> DbResult<(Frame, usize)> {
    if buf.is_empty() {
        return Err(DbError::InvalidCommand("empty buffer".into()));
    }
    let prefix = buf[0];
    let rest = &buf[1..];
    match prefix {
        b'+' => {
            let (line, used) = read_line(rest)?;
            Ok((Frame::SimpleString(Bytes::copy_from_slice(line)), 1 + used))
        }
        b'-' => {
            let (line, used) = read_line(rest)?;
            Ok((Frame::Error(Bytes::copy_from_slice(line)), 1 + used))
        }
        b':' => {
            let (line, used) = read_line(rest)?;
            Ok((Frame::Integer(parse_i64(line)?), 1 + used))
        }
        b'$' => {
            let (line, used) = read_line(rest)?;
            let len = parse_i64(line)?;
            if len == -1 {
                return Ok((Frame::BulkString(None), 1 + used));
            }
            if len < -1 {
                return Err(DbError::InvalidCommand("negative bulk length".into()));
            }
            let len = len as usize;
            let body_end = used + len;
            if rest.len() < body_end + 2 {
                return Err(DbError::InvalidCommand("truncated bulk string".into()));
            }
            if &rest[body_end..body_end + 2] != b"\r\n" {
                return Err(DbError::InvalidCommand("bulk string missing trailing CRLF".into()));
            }
            let body = Bytes::copy_from_slice(&rest[used..body_end]);
            Ok((Frame::BulkString(Some(body)), 1 + body_end + 2))
        }
        b'*' => {
            let (line, used) = read_line(rest)?;
            let count = parse_i64(line)?;
            if count == -1 {
                return Ok((Frame::Array(None), 1 + used));
            }
            if count < -1 {
                return Err(DbError::InvalidCommand("negative array length".into()));
            }
            let mut items = Vec::with_capacity(count as usize);
            let mut offset = 1 + used;
            for _ in 0..count {
                let (item, consumed) = decode_frame(&buf[offset..])?;
                items.push(item);
                offset += consumed;
            }
            Ok((Frame::Array(Some(items)), offset))
        }
        _ => Err(DbError::InvalidCommand(format!(
            "unrecognized frame prefix '{}'",
            prefix as char
        ))),
    }
}

/// Decode a full request buffer into a `Command`. Returns `Ok(None)`
/// for the Null sentinel (`$-1\r\n` or `*-1\r\n`).
pub fn decode_command(buf: &[u8]) -> DbResult<Option<Command>> {
    let (frame, _consumed) = decode_frame(buf)?;
    match frame {
        Frame::Array(None) | Frame::BulkString(None) => Ok(None),
        Frame::Array(Some(items)) => {
            if items.is_empty() {
                return Err(DbError::InvalidCommand("empty command array".into()));
            }
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Frame::BulkString(Some(b)) => parts.push(b),
                    _ => {
                        return Err(DbError::InvalidCommand(
                            "command array elements must be bulk strings".into(),
                        ))
                    }
                }
            }
            let name = String::from_utf8_lossy(&parts[0]).to_lowercase();
            let args = parts.into_iter().skip(1).collect();
            Ok(Some(Command { name, args }))
        }
        _ => Err(DbError::InvalidCommand(
            "expected a command array or a null sentinel".into(),
        )),
    }
}

impl Command {
    /// Round-trip helper: re-encode this command as the RESP array a
    /// real client would have sent.
    pub fn to_frame(&self) -> Frame {
        let mut items = Vec::with_capacity(self.args.len() + 1);
        items.push(Frame::BulkString(Some(Bytes::copy_from_slice(
            self.name.as_bytes(),
        ))));
        items.extend(
            self.args
                .iter()
                .map(|a| Frame::BulkString(Some(a.clone()))),
        );
        Frame::Array(Some(items))
    }
}

/// Encode a frame (reply or otherwise) into wire bytes.
pub fn encode_frame(frame: &Frame) -> Bytes {
    let mut out = BytesMut::new();
    write_frame(&mut out, frame);
    out.freeze()
}

fn write_frame(out: &mut BytesMut, frame: &Frame) {
    match frame {
        Frame::SimpleString(s) => {
            out.extend_from_slice(b"+");
            out.extend_from_slice(s);
            out.extend_from_slice(b"\r\n");
        }
        Frame::Error(e) => {
            out.extend_from_slice(b"-");
            out.extend_from_slice(e);
            out.extend_from_slice(b"\r\n");
        }
        Frame::Integer(n) => {
            out.extend_from_slice(b":");
            out.extend_from_slice(n.to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Frame::BulkString(None) => out.extend_from_slice(b"$-1\r\n"),
        Frame::BulkString(Some(b)) => {
            out.extend_from_slice(b"$");
            out.extend_from_slice(b.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(b);
            out.extend_from_slice(b"\r\n");
        }
        Frame::Array(None) => out.extend_from_slice(b"*-1\r\n"),
        Frame::Array(Some(items)) => {
            out.extend_from_slice(b"*");
            out.extend_from_slice(items.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            for item in items {
                write_frame(out, item);
            }
        }
    }
}

/// Convenience constructors for the reply variants.
pub mod reply {
    use super::*;

    pub fn simple(s: impl Into<Bytes>) -> Reply {
        Frame::SimpleString(s.into())
    }

    pub fn error(msg: impl Into<Bytes>) -> Reply {
        Frame::Error(msg.into())
    }

    pub fn integer(n: i64) -> Reply {
        Frame::Integer(n)
    }

    pub fn bulk(b: Bytes) -> Reply {
        Frame::BulkString(Some(b))
    }

    pub fn nil() -> Reply {
        Frame::BulkString(None)
    }

    pub fn array(items: Vec<Reply>) -> Reply {
        Frame::Array(Some(items))
    }

    pub fn bulk_array(items: Vec<Bytes>) -> Reply {
        Frame::Array(Some(items.into_iter().map(|b| Frame::BulkString(Some(b))).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk_cmd(parts: &[&str]) -> Bytes {
        let frame = Frame::Array(Some(
            parts
                .iter()
                .map(|p| Frame::BulkString(Some(Bytes::copy_from_slice(p.as_bytes()))))
                .collect(),
        ));
        encode_frame(&frame)
    }

    #[test]
    fn decodes_ping() {
        let buf = bulk_cmd(&["PING"]);
        let cmd = decode_command(&buf).unwrap().unwrap();
        assert_eq!(cmd.name, "ping");
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn decodes_set_with_args() {
        let buf = bulk_cmd(&["set", "k", "v"]);
        let cmd = decode_command(&buf).unwrap().unwrap();
        assert_eq!(cmd.name, "set");
        assert_eq!(cmd.args, vec![Bytes::from_static(b"k"), Bytes::from_static(b"v")]);
    }

    #[test]
    fn command_name_is_lowercased() {
        let buf = bulk_cmd(&["GeT", "k"]);
        let cmd = decode_command(&buf).unwrap().unwrap();
        assert_eq!(cmd.name, "get");
    }

    #[test]
    fn null_array_is_sentinel() {
        let buf = encode_frame(&Frame::Array(None));
        assert!(decode_command(&buf).unwrap().is_none());
    }

    #[test]
    fn null_bulk_is_sentinel() {
        let buf = encode_frame(&Frame::BulkString(None));
        assert!(decode_command(&buf).unwrap().is_none());
    }

    #[test]
    fn truncated_bulk_is_invalid_command() {
        let buf = b"*1\r\n$5\r\nabc\r\n";
        assert!(decode_command(buf).is_err());
    }

    #[test]
    fn unknown_prefix_is_invalid_command() {
        let buf = b"!oops\r\n";
        assert!(decode_command(buf).is_err());
    }

    #[test]
    fn resp_roundtrip_for_bulk_commands() {
        let cases: Vec<Vec<&str>> = vec![
            vec!["ping"],
            vec!["echo", "hello", "world"],
            vec!["set", "k", "v"],
            vec!["lpush", "L", "a", "b", "c"],
        ];
        for case in cases {
            let cmd = Command {
                name: case[0].to_owned(),
                args: case[1..].iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect(),
            };
            let encoded = encode_frame(&cmd.to_frame());
            let decoded = decode_command(&encoded).unwrap().unwrap();
            assert_eq!(decoded.name, cmd.name);
            assert_eq!(decoded.args, cmd.args);
        }
    }

    #[test]
    fn encodes_known_reply_shapes() {
        assert_eq!(encode_frame(&reply::simple("PONG")), Bytes::from_static(b"+PONG\r\n"));
        assert_eq!(encode_frame(&reply::nil()), Bytes::from_static(b"$-1\r\n"));
        assert_eq!(encode_frame(&reply::integer(1)), Bytes::from_static(b":1\r\n"));
        let arr = reply::bulk_array(vec![
            Bytes::from_static(b"c"),
            Bytes::from_static(b"b"),
            Bytes::from_static(b"a"),
        ]);
        assert_eq!(
            encode_frame(&arr),
            Bytes::from_static(b"*3\r\n$1\r\nc\r\n$1\r\nb\r\n$1\r\na\r\n")
        );
    }
}
