// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use wipecert_kernel::types::id::Principal;

use crate::errors::EngineError;

pub const EVENT_LOG_FILE: &str = "events.log";
pub const SNAPSHOT_FILE: &str = "snapshot.bin";

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    /// Owner seeded into an empty ledger. Ignored once the ledger records one.
    pub owner: Option<Principal>,
    /// Directory holding `events.log` and `snapshot.bin`. `None` keeps the ledger in memory.
    pub data_dir: Option<PathBuf>,
    pub auto_snapshot_interval_secs: Option<u64>,
    pub auth_token: Option<String>,
    /// Capacity of the audit broadcast channel.
    pub event_buffer: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            owner: None,
            data_dir: None,
            auto_snapshot_interval_secs: None,
            auth_token: None,
            event_buffer: 1024,
        }
    }
}

impl NodeConfig {
    /// Reads `WIPECERT_*` variables on top of the defaults.
    pub fn from_env() -> Result<Self, EngineError> {
        let mut cfg = Self::default();

        if let Some(addr) = env_var("WIPECERT_BIND_ADDR") {
            cfg.bind_addr = parse("WIPECERT_BIND_ADDR", &addr)?;
        }
        cfg.owner = env_var("WIPECERT_OWNER").map(Principal::new);
        cfg.data_dir = env_var("WIPECERT_DATA_DIR").map(PathBuf::from);
        if let Some(secs) = env_var("WIPECERT_SNAPSHOT_INTERVAL_SECS") {
            cfg.auto_snapshot_interval_secs = Some(parse("WIPECERT_SNAPSHOT_INTERVAL_SECS", &secs)?);
        }
        cfg.auth_token = env_var("WIPECERT_AUTH_TOKEN");
        if let Some(buffer) = env_var("WIPECERT_EVENT_BUFFER") {
            cfg.event_buffer = parse("WIPECERT_EVENT_BUFFER", &buffer)?;
            if cfg.event_buffer == 0 {
                return Err(EngineError::InvalidInput("WIPECERT_EVENT_BUFFER must be positive".to_string()));
            }
        }

        Ok(cfg)
    }

    pub fn event_log_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(EVENT_LOG_FILE))
    }

    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(SNAPSHOT_FILE))
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, EngineError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| EngineError::InvalidInput(format!("{}: {}", key, e)))
}
