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
 * Configuration for the server. Built-in defaults, overridable by a
 * handful of environment variables. None of this gates the wire
 * protocol itself -- the RESP surface is fixed regardless of how the
 * process was configured.
 */

use std::{net::IpAddr, time::Duration};

/// One pre-admitted background saver: (interval, minimum change threshold).
pub type SaverDefault = (u64, u64);

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_host: IpAddr,
    pub bind_port: u16,
    pub snapshot_path: String,
    pub max_connections: usize,
    pub default_savers: Vec<SaverDefault>,
    pub shutdown_deadline: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::from([127, 0, 0, 1]),
            bind_port: 6379,
            snapshot_path: "tmp/dump.fkv".to_owned(),
            max_connections: 50_000,
            default_savers: vec![(900, 1), (300, 100)],
            shutdown_deadline: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Layer environment variables over the defaults. Any parse failure
    /// is a startup error; the caller is expected to log and exit.
    pub fn from_env() -> Result<Self, String> {
        let mut cfg = Self::default();
        if let Ok(host) = std::env::var("FKV_HOST") {
            cfg.bind_host = host
                .parse()
                .map_err(|e| format!("invalid FKV_HOST '{host}': {e}"))?;
        }
        if let Ok(port) = std::env::var("FKV_PORT") {
            cfg.bind_port = port
                .parse()
                .map_err(|e| format!("invalid FKV_PORT '{port}': {e}"))?;
        }
        if let Ok(path) = std::env::var("FKV_SNAPSHOT_PATH") {
            cfg.snapshot_path = path;
        }
        if let Ok(maxcon) = std::env::var("FKV_MAX_CONNECTIONS") {
            cfg.max_connections = maxcon
                .parse()
                .map_err(|e| format!("invalid FKV_MAX_CONNECTIONS '{maxcon}': {e}"))?;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.bind_port, 6379);
        assert_eq!(cfg.default_savers, vec![(900, 1), (300, 100)]);
        assert_eq!(cfg.shutdown_deadline, Duration::from_secs(5));
    }
}
