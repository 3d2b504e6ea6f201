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
 * Command evaluator: resolves a decoded `Command` by name, validates
 * arity, runs the operation against the `Store`, and produces a
 * `Reply`. Mutating commands register with the TTL reaper or the
 * saver registry where the command table calls for it.
 */

use crate::error::{DbError, DbResult};
use crate::protocol::{reply, Command, Reply};
use crate::snapshot::saver::SaverRegistry;
use crate::store::Store;
use crate::ttl::{deadline_from_unix_millis, deadline_from_unix_seconds, Reaper};
use crate::util::compiler::unlikely;
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything a command needs besides its own arguments.
pub struct Context<'a> {
    pub store: &'a Store,
    pub reaper: &'a Reaper,
    pub savers: &'a Arc<SaverRegistry>,
}

fn arity_error(name: &str) -> DbError {
    DbError::InvalidCommand(format!("ERR wrong number of arguments for '{name}' command"))
}

fn parse_i64_arg(arg: &Bytes) -> DbResult<i64> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| DbError::InvalidCommand("ERR value is not an integer or out of range".into()))
}

fn parse_u64_arg(arg: &Bytes) -> DbResult<u64> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| DbError::InvalidCommand("ERR value is not an integer or out of range".into()))
}

/// Evaluate one decoded command against the store, returning the
/// reply to write back on the connection.
pub fn evaluate(cmd: &Command, ctx: &Context) -> Reply {
    match run(cmd, ctx) {
        Ok(r) => r,
        Err(e) => reply::error(e.to_string()),
    }
}

fn run(cmd: &Command, ctx: &Context) -> DbResult<Reply> {
    match cmd.name.as_str() {
        "ping" => {
            if unlikely(!cmd.args.is_empty()) {
                return Err(arity_error("ping"));
            }
            Ok(reply::simple("PONG"))
        }
        "echo" => {
            if unlikely(cmd.args.is_empty()) {
                return Err(arity_error("echo"));
            }
            let joined = cmd
                .args
                .iter()
                .map(|a| String::from_utf8_lossy(a).into_owned())
                .collect::<Vec<_>>()
                .join(" ");
            Ok(reply::simple(joined))
        }
        "get" => {
            if unlikely(cmd.args.len() != 1) {
                return Err(arity_error("get"));
            }
            match ctx.store.get(&cmd.args[0])? {
                Some(v) => Ok(reply::simple(v.to_vec())),
                None => Ok(reply::nil()),
            }
        }
        "set" => cmd_set(cmd, ctx),
        "del" => {
            if unlikely(cmd.args.is_empty()) {
                return Err(arity_error("del"));
            }
            let keys: Vec<&[u8]> = cmd.args.iter().map(|b| b.as_ref()).collect();
            for key in &keys {
                ctx.reaper.cancel(key);
            }
            let n = ctx.store.delete(keys);
            Ok(reply::integer(n as i64))
        }
        "exists" => {
            if unlikely(cmd.args.len() != 1) {
                return Err(arity_error("exists"));
            }
            Ok(reply::integer(ctx.store.exists(&cmd.args[0]) as i64))
        }
        "incr" => {
            if unlikely(cmd.args.len() != 1) {
                return Err(arity_error("incr"));
            }
            Ok(reply::integer(ctx.store.incr(&cmd.args[0])?))
        }
        "decr" => {
            if unlikely(cmd.args.len() != 1) {
                return Err(arity_error("decr"));
            }
            Ok(reply::integer(ctx.store.decr(&cmd.args[0])?))
        }
        "lpush" => {
            if unlikely(cmd.args.len() < 2) {
                return Err(arity_error("lpush"));
            }
            let key = cmd.args[0].clone();
            let values = cmd.args[1..].to_vec();
            Ok(reply::integer(ctx.store.left_push(key, values)? as i64))
        }
        "rpush" => {
            if unlikely(cmd.args.len() < 2) {
                return Err(arity_error("rpush"));
            }
            let key = cmd.args[0].clone();
            let values = cmd.args[1..].to_vec();
            Ok(reply::integer(ctx.store.right_push(key, values)? as i64))
        }
        "lrange" => {
            if unlikely(cmd.args.len() != 3) {
                return Err(arity_error("lrange"));
            }
            let start = parse_i64_arg(&cmd.args[1])?;
            let stop = parse_i64_arg(&cmd.args[2])?;
            let items = ctx.store.lrange(&cmd.args[0], start, stop)?;
            Ok(reply::bulk_array(items))
        }
        "save" => cmd_save(cmd, ctx),
        "command" => {
            if unlikely(cmd.args.len() != 1) {
                return Err(arity_error("command"));
            }
            Ok(reply::simple("ferrumkv ready"))
        }
        "scan" => {
            if unlikely(!cmd.args.is_empty()) {
                return Err(arity_error("scan"));
            }
            Ok(reply::bulk_array(ctx.store.keys()))
        }
        _ => Err(DbError::InvalidCommand(crate::error::messages::UNKNOWN_COMMAND.into())),
    }
}

fn cmd_set(cmd: &Command, ctx: &Context) -> DbResult<Reply> {
    let args = &cmd.args;
    if args.len() != 2 && args.len() != 4 {
        return Err(arity_error("set"));
    }
    let key = args[0].clone();
    let value = args[1].clone();
    let deadline = if args.len() == 4 {
        let opt = String::from_utf8_lossy(&args[2]).to_ascii_uppercase();
        let n = &args[3];
        Some(match opt.as_str() {
            "EX" => Instant::now() + Duration::from_secs(parse_u64_arg(n)?),
            "PX" => Instant::now() + Duration::from_millis(parse_u64_arg(n)?),
            "EXAT" => deadline_from_unix_seconds(parse_i64_arg(n)?),
            "PXAT" => deadline_from_unix_millis(parse_i64_arg(n)?),
            other => {
                return Err(DbError::InvalidCommand(format!("ERR unsupported SET option '{other}'")))
            }
        })
    } else {
        None
    };

    // a fresh SET always invalidates any TTL previously registered for
    // this key before possibly registering a new one
    ctx.reaper.cancel(&key);
    ctx.store.set(key.clone(), value);
    if let Some(deadline) = deadline {
        ctx.reaper.schedule(key, deadline);
    }
    Ok(reply::simple("OK"))
}

fn cmd_save(cmd: &Command, ctx: &Context) -> DbResult<Reply> {
    if !cmd.args.is_empty() && cmd.args.len() != 2 {
        return Err(arity_error("save"));
    }
    if cmd.args.len() == 2 {
        let interval = parse_u64_arg(&cmd.args[0])?;
        let threshold = parse_u64_arg(&cmd.args[1])?;
        ctx.savers.admit(interval, threshold);
    }
    crate::snapshot::save_to_disk(ctx.store, ctx.savers.snapshot_path())?;
    Ok(reply::simple("OK"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Frame;
    use tokio::sync::broadcast;

    fn ctx_parts() -> (Store, Reaper, Arc<SaverRegistry>) {
        let store = Store::new();
        let reaper = Reaper::new();
        let (tx, _rx) = broadcast::channel(1);
        let savers = SaverRegistry::new(store.clone(), "/tmp/ferrumkv-cmdtest.fkv".into(), tx);
        (store, reaper, savers)
    }

    fn cmd(name: &str, args: &[&str]) -> Command {
        Command {
            name: name.to_owned(),
            args: args.iter().map(|a| Bytes::copy_from_slice(a.as_bytes())).collect(),
        }
    }

    #[test]
    fn ping_pong() {
        let (store, reaper, savers) = ctx_parts();
        let ctx = Context { store: &store, reaper: &reaper, savers: &savers };
        assert_eq!(evaluate(&cmd("ping", &[]), &ctx), Frame::SimpleString(Bytes::from_static(b"PONG")));
    }

    #[test]
    fn echo_joins_with_spaces() {
        let (store, reaper, savers) = ctx_parts();
        let ctx = Context { store: &store, reaper: &reaper, savers: &savers };
        let r = evaluate(&cmd("echo", &["a", "b", "c"]), &ctx);
        assert_eq!(r, Frame::SimpleString(Bytes::from_static(b"a b c")));
    }

    #[test]
    fn set_then_get() {
        let (store, reaper, savers) = ctx_parts();
        let ctx = Context { store: &store, reaper: &reaper, savers: &savers };
        evaluate(&cmd("set", &["k", "v"]), &ctx);
        let r = evaluate(&cmd("get", &["k"]), &ctx);
        assert_eq!(r, Frame::SimpleString(Bytes::from_static(b"v")));
    }

    #[test]
    fn get_missing_is_nil() {
        let (store, reaper, savers) = ctx_parts();
        let ctx = Context { store: &store, reaper: &reaper, savers: &savers };
        assert_eq!(evaluate(&cmd("get", &["nope"]), &ctx), Frame::BulkString(None));
    }

    #[test]
    fn wrong_arity_is_invalid_command() {
        let (store, reaper, savers) = ctx_parts();
        let ctx = Context { store: &store, reaper: &reaper, savers: &savers };
        match evaluate(&cmd("get", &["a", "b"]), &ctx) {
            Frame::Error(_) => {}
            other => panic!("expected error reply, got {other:?}"),
        }
    }

    #[test]
    fn cross_type_is_wrongtype_error() {
        let (store, reaper, savers) = ctx_parts();
        let ctx = Context { store: &store, reaper: &reaper, savers: &savers };
        evaluate(&cmd("set", &["x", "1"]), &ctx);
        let r = evaluate(&cmd("lpush", &["x", "y"]), &ctx);
        assert_eq!(
            r,
            Frame::Error(Bytes::from_static(
                b"WRONGTYPE Operation against a key holding the wrong kind of value"
            ))
        );
    }

    #[test]
    fn lpush_then_lrange_ordering() {
        let (store, reaper, savers) = ctx_parts();
        let ctx = Context { store: &store, reaper: &reaper, savers: &savers };
        evaluate(&cmd("lpush", &["L", "a", "b", "c"]), &ctx);
        let r = evaluate(&cmd("lrange", &["L", "0", "-1"]), &ctx);
        assert_eq!(
            r,
            Frame::Array(Some(vec![
                Frame::BulkString(Some(Bytes::from_static(b"c"))),
                Frame::BulkString(Some(Bytes::from_static(b"b"))),
                Frame::BulkString(Some(Bytes::from_static(b"a"))),
            ]))
        );
    }

    #[test]
    fn scan_returns_all_keys() {
        let (store, reaper, savers) = ctx_parts();
        let ctx = Context { store: &store, reaper: &reaper, savers: &savers };
        evaluate(&cmd("set", &["a", "1"]), &ctx);
        evaluate(&cmd("rpush", &["b", "x"]), &ctx);
        let r = evaluate(&cmd("scan", &[]), &ctx);
        match r {
            Frame::Array(Some(items)) => assert_eq!(items.len(), 2),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn unknown_command_is_invalid() {
        let (store, reaper, savers) = ctx_parts();
        let ctx = Context { store: &store, reaper: &reaper, savers: &savers };
        match evaluate(&cmd("nosuchcmd", &[]), &ctx) {
            Frame::Error(msg) => assert_eq!(msg, Bytes::from_static(b"Unknown or disabled command")),
            other => panic!("expected error reply, got {other:?}"),
        }
    }

    #[test]
    fn set_with_ex_registers_ttl() {
        let (store, reaper, savers) = ctx_parts();
        let ctx = Context { store: &store, reaper: &reaper, savers: &savers };
        evaluate(&cmd("set", &["k", "v", "EX", "100"]), &ctx);
        assert!(reaper.has_pending(b"k"));
    }

    #[test]
    fn re_set_cancels_prior_ttl() {
        let (store, reaper, savers) = ctx_parts();
        let ctx = Context { store: &store, reaper: &reaper, savers: &savers };
        evaluate(&cmd("set", &["k", "v1", "EX", "100"]), &ctx);
        evaluate(&cmd("set", &["k", "v2"]), &ctx);
        assert!(!reaper.has_pending(b"k"));
        assert_eq!(
            evaluate(&cmd("get", &["k"]), &ctx),
            Frame::SimpleString(Bytes::from_static(b"v2"))
        );
    }
}
