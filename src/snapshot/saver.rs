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
 * Background saver registry: an admitted set of independent tickers
 * (one per interval), each racing a cancellation signal against its
 * own sleep. The set is capped at 5 and evicted oldest-first.
 */

use crate::config::SaverDefault;
use crate::store::Store;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Notify};
use tokio::time::{self, Duration};

const MAX_ACTIVE_SAVERS: usize = 5;

struct ActiveSaver {
    interval: u64,
    threshold: u64,
    created_at: Instant,
    cancel: Arc<Notify>,
}

/// The set of currently-admitted savers, behind its own mutex --
/// deliberately not the Store's data lock, so a slow saver never
/// blocks writers and vice versa.
pub struct SaverRegistry {
    active: parking_lot::Mutex<VecDeque<ActiveSaver>>,
    store: Store,
    snapshot_path: PathBuf,
    shutdown: broadcast::Sender<()>,
}

impl SaverRegistry {
    pub fn new(store: Store, snapshot_path: PathBuf, shutdown: broadcast::Sender<()>) -> Arc<Self> {
        Arc::new(Self {
            active: parking_lot::Mutex::new(VecDeque::new()),
            store,
            snapshot_path,
            shutdown,
        })
    }

    /// Admit a new saver spec (interval, min-change-threshold). If the
    /// cap is already at 5, evict the spec with the smallest
    /// `created_at` first.
    pub fn admit(self: &Arc<Self>, interval: u64, threshold: u64) {
        let cancel = Arc::new(Notify::new());
        {
            let mut active = self.active.lock();
            if active.len() >= MAX_ACTIVE_SAVERS {
                // VecDeque is kept sorted oldest-first by insertion order
                if let Some(evicted) = active.pop_front() {
                    log::warn!(
                        "evicting saver (interval={}s, threshold={}) to admit a new one; active saver cap is {}",
                        evicted.interval,
                        evicted.threshold,
                        MAX_ACTIVE_SAVERS
                    );
                    evicted.cancel.notify_one();
                }
            }
            active.push_back(ActiveSaver {
                interval,
                threshold,
                created_at: Instant::now(),
                cancel: cancel.clone(),
            });
        }
        let registry = self.clone();
        tokio::spawn(async move {
            registry.run_one(interval, threshold, cancel).await;
        });
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    pub fn snapshot_path(&self) -> &std::path::Path {
        &self.snapshot_path
    }

    async fn run_one(&self, interval: u64, threshold: u64, cancel: Arc<Notify>) {
        let mut shutdown = self.shutdown.subscribe();
        let duration = Duration::from_secs(interval);
        let mut baseline = self.store.change_count();
        loop {
            tokio::select! {
                _ = time::sleep(duration) => {
                    let current = self.store.change_count();
                    if current.saturating_sub(baseline) >= threshold {
                        match crate::snapshot::save_to_disk(&self.store, &self.snapshot_path) {
                            Ok(()) => {
                                log::info!("periodic save completed ({} changes since last save)", current - baseline);
                                baseline = current;
                            }
                            Err(e) => {
                                log::error!("periodic save failed: {e}");
                            }
                        }
                    }
                }
                _ = cancel.notified() => {
                    break;
                }
                _ = shutdown.recv() => {
                    break;
                }
            }
        }
        log::debug!("saver (interval={interval}s, threshold={threshold}) has exited");
    }

    /// Pre-admit the configured startup defaults.
    pub fn admit_defaults(self: &Arc<Self>, defaults: &[SaverDefault]) {
        for &(interval, threshold) in defaults {
            self.admit(interval, threshold);
        }
    }
}
