use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::file_key::ResolvedFileMap;
use crate::job::JobId;
use crate::status::EtlState;

/// Fase de una carga desde el punto de vista del supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadPhase {
    Etl,
    Loading,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSummary {
    pub id: JobId,
    pub label: String,
    pub phase: LoadPhase,
    pub etl_state: EtlState,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Un archivo a descargar y a qué partición/índice/bucket va.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEntry {
    pub partition_id: i64,
    pub index_id: i64,
    pub bucket: u32,
    pub file_key: String,
    pub size: u64,
    pub url: String,
}

/// Plan de descarga para la etapa de distribución.
///
/// Si la clave ya es una URL (`scheme://host:port/path`) se usa tal cual; si
/// no, se cuelga de `file_server_base`.
pub fn download_plan(resolved: &ResolvedFileMap, file_server_base: &str) -> Vec<DownloadEntry> {
    resolved
        .iter()
        .map(|(key, file)| DownloadEntry {
            partition_id: key.partition_id,
            index_id: key.index_id,
            bucket: key.bucket,
            file_key: file.file_key.clone(),
            size: file.size,
            url: file_url(&file.file_key, file_server_base),
        })
        .collect()
}

fn file_url(file_key: &str, file_server_base: &str) -> String {
    if file_key.contains("://") {
        return file_key.to_string();
    }
    format!(
        "{}/{}",
        file_server_base.trim_end_matches('/'),
        file_key.trim_start_matches('/')
    )
}
