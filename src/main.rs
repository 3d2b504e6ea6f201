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

//! ferrumkv: a single-node, in-memory key-value store speaking a
//! RESP-compatible wire protocol.

use ferrumkv::config::Config;
use std::env;
use tokio::signal;

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() {
    env_logger::Builder::new()
        .parse_filters(&env::var("FKV_LOG").unwrap_or_else(|_| "info".to_owned()))
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            log::error!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("ferrumkv-worker")
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    runtime.block_on(async move {
        let (shutdown_tx, _rx) = tokio::sync::broadcast::channel(1);
        let tx = shutdown_tx.clone();
        let server = tokio::spawn(async move {
            if let Err(e) = ferrumkv::run(config, tx).await {
                log::error!("server exited with error: {e}");
            }
        });

        if signal::ctrl_c().await.is_err() {
            log::error!("failed to install Ctrl-C handler; shutting down immediately");
        }
        log::info!("received shutdown signal, draining connections");
        let _ = shutdown_tx.send(());
        let _ = server.await;
        log::info!("ferrumkv stopped");
    });
}
