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
 * Per-connection read/decode/evaluate/encode loop. Commands on one
 * connection are strictly serialized: one read, one decode, one
 * evaluate, one write.
 */

use crate::commands::{self, Context};
use crate::protocol::{self, encode_frame, reply};
use crate::snapshot::saver::SaverRegistry;
use crate::store::Store;
use crate::ttl::Reaper;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

const READ_CHUNK: usize = 1024;

pub struct ConnectionHandler {
    pub store: Store,
    pub reaper: Reaper,
    pub savers: Arc<SaverRegistry>,
    pub shutdown: broadcast::Receiver<()>,
}

impl ConnectionHandler {
    /// Drive one accepted connection until it disconnects or the
    /// server shuts down. The `_permit` is held for the connection's
    /// whole lifetime and released on return, bounding concurrency at
    /// the configured `max_connections`.
    pub async fn run(mut self, mut stream: TcpStream, _permit: tokio::sync::OwnedSemaphorePermit) {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = tokio::select! {
                result = stream.read(&mut buf) => match result {
                    Ok(0) => {
                        log::debug!("connection closed by peer");
                        return;
                    }
                    Ok(n) => n,
                    Err(e) => {
                        log::debug!("connection read error: {e}");
                        return;
                    }
                },
                _ = self.shutdown.recv() => {
                    log::debug!("connection dropped for shutdown");
                    return;
                }
            };

            let reply = match protocol::decode_command(&buf[..n]) {
                Ok(Some(cmd)) => {
                    let ctx = Context {
                        store: &self.store,
                        reaper: &self.reaper,
                        savers: &self.savers,
                    };
                    commands::evaluate(&cmd, &ctx)
                }
                Ok(None) => continue,
                Err(e) => reply::error(e.to_string()),
            };

            if let Err(e) = stream.write_all(&encode_frame(&reply)).await {
                log::debug!("connection write error: {e}");
                return;
            }
        }
    }
}
