use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

use crate::error::{EtlError, Result};
use crate::task::FileMap;

/// Estado externo del ETL, el que ve el supervisor de la carga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EtlState {
    Running,
    Finished,
    Cancelled,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtlStatus {
    pub state: EtlState,

    /// `None` hasta que el job termina y se consolidan sus tareas
    pub file_map: Option<FileMap>,
    pub counters: BTreeMap<String, String>,
    pub tracking_url: Option<String>,
}

impl Default for EtlStatus {
    fn default() -> Self {
        Self {
            state: EtlState::Unknown,
            file_map: None,
            counters: BTreeMap::new(),
            tracking_url: None,
        }
    }
}

impl EtlStatus {
    /// Valor numérico de un contador consolidado; si no está, cuenta como 0.
    pub fn rows(&self, counter: &str) -> Result<u64> {
        match self.counters.get(counter) {
            None => Ok(0),
            Some(value) => value.parse::<u64>().map_err(|_| EtlError::CounterParse {
                source_id: "etl status".to_string(),
                counter: counter.to_string(),
                value: value.clone(),
            }),
        }
    }
}

/// Lugar donde se publica el `EtlStatus` de una carga.
///
/// El estado nuevo se arma completo fuera del lock y se reemplaza de una vez,
/// así los lectores nunca ven FINISHED con un mapa de archivos viejo.
#[derive(Debug, Default)]
pub struct StatusSlot {
    current: RwLock<Arc<EtlStatus>>,
}

impl StatusSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Arc<EtlStatus> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn publish(&self, status: EtlStatus) -> Arc<EtlStatus> {
        let status = Arc::new(status);
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *current = status.clone();
        status
    }
}
