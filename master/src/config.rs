use anyhow::{Context, Result};
use std::{env, time::Duration};

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_FILE_SERVER_BASE: &str = "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub addr: String,
    /// Cada cuánto se consulta el estado del ETL de las cargas
    pub poll_interval: Duration,
    /// Proporción máxima de filas anormales aceptada (0.0 = ninguna)
    pub max_filter_ratio: f64,
    /// Base para armar URLs de archivos que no vienen como URL
    pub file_server_base: String,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_filter_ratio: 0.0,
            file_server_base: DEFAULT_FILE_SERVER_BASE.to_string(),
        }
    }
}

impl MasterConfig {
    /// - MASTER_ADDR
    /// - ETL_POLL_INTERVAL_MS
    /// - MAX_FILTER_RATIO
    /// - FILE_SERVER_BASE
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let poll_interval = match lookup("ETL_POLL_INTERVAL_MS") {
            Some(raw) => {
                let ms = raw
                    .parse::<u64>()
                    .with_context(|| format!("ETL_POLL_INTERVAL_MS inválido: {raw}"))?;
                Duration::from_millis(ms.max(1))
            }
            None => defaults.poll_interval,
        };

        let max_filter_ratio = match lookup("MAX_FILTER_RATIO") {
            Some(raw) => {
                let ratio = raw
                    .parse::<f64>()
                    .with_context(|| format!("MAX_FILTER_RATIO inválido: {raw}"))?;
                anyhow::ensure!(
                    (0.0..=1.0).contains(&ratio),
                    "MAX_FILTER_RATIO debe estar entre 0 y 1, llegó {ratio}"
                );
                ratio
            }
            None => defaults.max_filter_ratio,
        };

        Ok(Self {
            addr: lookup("MASTER_ADDR").unwrap_or(defaults.addr),
            poll_interval,
            max_filter_ratio,
            file_server_base: lookup("FILE_SERVER_BASE").unwrap_or(defaults.file_server_base),
        })
    }
}
