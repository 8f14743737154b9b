use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::job::JobId;

pub type TaskId = String;

/// Archivo producido -> tamaño en bytes, en orden de inserción.
pub type FileMap = IndexMap<String, u64>;

/// Filas aceptadas por el ETL.
pub const NORMAL_ROWS: &str = "dpp.norm.ALL";
/// Filas descartadas por el ETL.
pub const ABNORMAL_ROWS: &str = "dpp.abnorm.ALL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullLoadTask {
    pub id: TaskId,
    pub job_id: JobId,

    pub file_map: FileMap,
    /// Contadores codificados como string, ej: {"dpp.norm.ALL": "100"}
    pub counters: BTreeMap<String, String>,
    pub tracking_url: Option<String>,
}

impl PullLoadTask {
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_id: job_id.into(),
            file_map: FileMap::new(),
            counters: BTreeMap::new(),
            tracking_url: None,
        }
    }

    pub fn from_report(job_id: impl Into<JobId>, report: TaskReportRequest) -> Self {
        Self {
            file_map: report.file_map,
            counters: report.counters,
            tracking_url: report.tracking_url,
            ..Self::new(job_id)
        }
    }

    pub fn counter(&self, name: &str) -> Option<&str> {
        self.counters.get(name).map(String::as_str)
    }
}

/// Resultado de una tarea tal como lo reporta quien la ejecutó.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskReportRequest {
    #[serde(default)]
    pub file_map: FileMap,
    #[serde(default)]
    pub counters: BTreeMap<String, String>,
    #[serde(default)]
    pub tracking_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporte_vacio_se_deserializa_con_defaults() {
        let report: TaskReportRequest = serde_json::from_str("{}").unwrap();
        assert!(report.file_map.is_empty());
        assert!(report.counters.is_empty());
        assert!(report.tracking_url.is_none());
    }

    #[test]
    fn file_map_conserva_orden_del_json() {
        let report: TaskReportRequest =
            serde_json::from_str(r#"{"file_map": {"z": 1, "a": 2, "m": 3}}"#).unwrap();
        let keys: Vec<_> = report.file_map.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);

        let task = PullLoadTask::from_report("job-1", report);
        assert_eq!(task.job_id, "job-1");
        assert_eq!(task.file_map.get("a"), Some(&2));
    }
}
