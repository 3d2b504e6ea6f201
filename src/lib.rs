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

//! A single-node, in-memory key-value store speaking a RESP-compatible
//! wire protocol. See each module for its slice of the design.

pub mod commands;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod snapshot;
pub mod store;
pub mod ttl;
pub mod util;

use config::Config;
use snapshot::saver::SaverRegistry;
use std::sync::Arc;
use std::time::Duration;
use store::Store;
use ttl::Reaper;

/// Bring up the store (replaying any snapshot on disk), the TTL
/// reaper, the saver registry with its pre-admitted defaults, and the
/// connection server, then run until `shutdown_tx` fires. Performs one
/// final synchronous save before returning.
pub async fn run(config: Config, shutdown_tx: tokio::sync::broadcast::Sender<()>) -> std::io::Result<()> {
    let store = Store::new();
    match snapshot::load_from_disk(&store, std::path::Path::new(&config.snapshot_path)) {
        Ok(true) => log::info!("loaded snapshot from {}", config.snapshot_path),
        Ok(false) => log::info!("no snapshot found at {}, starting empty", config.snapshot_path),
        Err(e) => {
            log::error!("failed to load snapshot: {e}");
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    }

    let reaper = Reaper::new();
    let reaper_task = {
        let reaper = reaper.clone();
        let store = store.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move { reaper.run(store, shutdown_rx).await })
    };

    let savers = SaverRegistry::new(
        store.clone(),
        std::path::PathBuf::from(&config.snapshot_path),
        shutdown_tx.clone(),
    );
    savers.admit_defaults(&config.default_savers);

    let terminate_rx = server::run(
        &config,
        store.clone(),
        reaper.clone(),
        savers.clone(),
        shutdown_tx.subscribe(),
        shutdown_tx.clone(),
    )
    .await?;

    // wait until the shutdown signal actually fires before draining;
    // `server::run` only spawns the accept loop and returns immediately
    let mut wait_shutdown = shutdown_tx.subscribe();
    let _ = wait_shutdown.recv().await;

    server::wait_for_drain(terminate_rx, config.shutdown_deadline).await;
    let _ = reaper_task.await;

    match snapshot::save_to_disk(&store, std::path::Path::new(&config.snapshot_path)) {
        Ok(()) => log::info!("final snapshot saved to {}", config.snapshot_path),
        Err(e) => log::error!("final snapshot save failed: {e}"),
    }

    Ok(())
}

/// Exposed for the integration test suite: run the server on an
/// ephemeral port without blocking on a shutdown signal, returning the
/// bound address.
pub async fn spawn_for_test(mut config: Config) -> (std::net::SocketAddr, tokio::sync::broadcast::Sender<()>) {
    let probe = tokio::net::TcpListener::bind((config.bind_host, 0))
        .await
        .expect("bind failed");
    let addr = probe.local_addr().expect("local_addr failed");
    drop(probe);
    config.bind_port = addr.port();

    let (shutdown_tx, _rx) = tokio::sync::broadcast::channel(1);
    let tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let _ = run(config, tx).await;
    });
    // give the accept loop a moment to rebind the same address
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown_tx)
}
