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
 * Connection server: binds the configured address, accepts connections
 * up to `max_connections` concurrently, and coordinates graceful
 * shutdown across the accept loop, every in-flight connection, the
 * saver registry, and the TTL reaper.
 *
 * Accept errors back off exponentially rather than busy-looping; the
 * connection limit is a semaphore; shutdown is a broadcast signal, and
 * drain-completion is detected by waiting for every `terminate_tx`
 * clone (one per in-flight connection) to be dropped, which closes the
 * channel. A single listener kind is all that's needed since TLS and
 * multi-protocol negotiation are out of scope.
 */

pub mod connection;

use crate::config::Config;
use crate::snapshot::saver::SaverRegistry;
use crate::store::Store;
use crate::ttl::Reaper;
use connection::ConnectionHandler;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::time::sleep;

struct Backoff {
    current: u8,
}

impl Backoff {
    const MAX: u8 = 64;

    fn new() -> Self {
        Self { current: 1 }
    }

    async fn spin(&mut self) {
        sleep(Duration::from_secs(self.current as u64)).await;
        self.current = self.current.saturating_mul(2);
    }

    fn exhausted(&self) -> bool {
        self.current > Self::MAX
    }
}

/// Runs the accept loop until `shutdown` fires. Returns once the
/// listener has stopped accepting; in-flight connection tasks may
/// still be draining -- the caller awaits `drain` separately.
pub async fn run(
    config: &Config,
    store: Store,
    reaper: Reaper,
    savers: Arc<SaverRegistry>,
    mut shutdown: broadcast::Receiver<()>,
    shutdown_tx: broadcast::Sender<()>,
) -> std::io::Result<mpsc::Receiver<()>> {
    let listener = TcpListener::bind((config.bind_host, config.bind_port)).await?;
    log::info!("listening on {}:{}", config.bind_host, config.bind_port);

    let climit = Arc::new(Semaphore::new(config.max_connections));
    let (terminate_tx, terminate_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        let mut backoff = Backoff::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            backoff = Backoff::new();
                            let permit = match climit.clone().try_acquire_owned() {
                                Ok(p) => p,
                                Err(_) => {
                                    log::debug!("connection limit reached, dropping {addr}");
                                    continue;
                                }
                            };
                            log::debug!("accepted connection from {addr}");
                            let handler = ConnectionHandler {
                                store: store.clone(),
                                reaper: reaper.clone(),
                                savers: savers.clone(),
                                shutdown: shutdown_tx.subscribe(),
                            };
                            let term_guard = terminate_tx.clone();
                            tokio::spawn(async move {
                                handler.run(stream, permit).await;
                                drop(term_guard);
                            });
                        }
                        Err(e) => {
                            log::error!("accept error: {e}");
                            if backoff.exhausted() {
                                log::error!("accept loop giving up after repeated failures");
                                return;
                            }
                            backoff.spin().await;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    log::info!("accept loop shutting down");
                    return;
                }
            }
        }
    });

    Ok(terminate_rx)
}

/// Wait for every in-flight connection to drop its terminate guard, up
/// to `deadline`. Connections that haven't drained by then are
/// abandoned.
pub async fn wait_for_drain(mut terminate_rx: mpsc::Receiver<()>, deadline: Duration) {
    let _ = tokio::time::timeout(deadline, terminate_rx.recv()).await;
}
