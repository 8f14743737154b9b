use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::task::PullLoadTask;

pub type JobId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadJobRequest {
    /// Etiqueta de la carga; es el prefijo de los archivos que produce el ETL
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetJobStateRequest {
    pub state: PullLoadJobState,
}

/// Ciclo de vida interno de un job de pull load (lo maneja el job manager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullLoadJobState {
    Pending,
    Running,
    Finished,
    Failed,
    Canceled,
    Unknown,
}

impl PullLoadJobState {
    pub const ALL: [PullLoadJobState; 6] = [
        PullLoadJobState::Pending,
        PullLoadJobState::Running,
        PullLoadJobState::Finished,
        PullLoadJobState::Failed,
        PullLoadJobState::Canceled,
        PullLoadJobState::Unknown,
    ];

    /// FINISHED, FAILED y CANCELED ya no cambian su secuencia de tareas.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PullLoadJobState::Finished | PullLoadJobState::Failed | PullLoadJobState::Canceled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PullLoadJobState::Pending => "PENDING",
            PullLoadJobState::Running => "RUNNING",
            PullLoadJobState::Finished => "FINISHED",
            PullLoadJobState::Failed => "FAILED",
            PullLoadJobState::Canceled => "CANCELED",
            PullLoadJobState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for PullLoadJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PullLoadJobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        PullLoadJobState::ALL
            .into_iter()
            .find(|state| state.as_str() == upper)
            .ok_or_else(|| format!("estado de job desconocido: {s}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullLoadJob {
    pub id: JobId,
    pub label: String,
    pub state: PullLoadJobState,

    /// Tareas en orden de llegada; el orden importa al consolidar resultados
    pub tasks: Vec<PullLoadTask>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PullLoadJob {
    pub fn new(label: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: label.into(),
            state: PullLoadJobState::Pending,
            tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estado_se_parsea_sin_importar_mayusculas() {
        assert_eq!(
            "finished".parse::<PullLoadJobState>().unwrap(),
            PullLoadJobState::Finished
        );
        assert_eq!(
            " Canceled ".parse::<PullLoadJobState>().unwrap(),
            PullLoadJobState::Canceled
        );
        assert!("CANCELLED".parse::<PullLoadJobState>().is_err());
    }

    #[test]
    fn estado_se_serializa_en_mayusculas() {
        let json = serde_json::to_string(&PullLoadJobState::Running).unwrap();
        assert_eq!(json, "\"RUNNING\"");

        for state in PullLoadJobState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state));
        }
    }

    #[test]
    fn solo_finished_failed_y_canceled_son_terminales() {
        let terminal: Vec<_> = PullLoadJobState::ALL
            .into_iter()
            .filter(PullLoadJobState::is_terminal)
            .collect();
        assert_eq!(
            terminal,
            vec![
                PullLoadJobState::Finished,
                PullLoadJobState::Failed,
                PullLoadJobState::Canceled,
            ]
        );
    }

    #[test]
    fn job_nuevo_arranca_pendiente_y_sin_tareas() {
        let job = PullLoadJob::new("label_1");
        assert_eq!(job.state, PullLoadJobState::Pending);
        assert!(job.tasks.is_empty());
        assert!(!job.id.is_empty());
    }
}
