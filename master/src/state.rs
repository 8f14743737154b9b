// master/src/state.rs

use chrono::{DateTime, Utc};
use common::{
    DownloadEntry, InMemoryJobRegistry, JobId, JobRegistry, LoadEtlTask, LoadPhase, LoadSummary,
    PullLoadEtlTask,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::config::MasterConfig;

/// Estilo de carga; decide qué ETL supervisa el job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadEtlTaskKind {
    #[default]
    PullLoad,
}

impl LoadEtlTaskKind {
    pub fn build(self, job_id: &str, registry: Arc<dyn JobRegistry>) -> Arc<dyn LoadEtlTask> {
        match self {
            LoadEtlTaskKind::PullLoad => Arc::new(PullLoadEtlTask::new(job_id, registry)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    // job manager de los ETL (jobs y tareas internas)
    pub registry: Arc<InMemoryJobRegistry>,
    // cargas supervisadas, una por job
    pub loads: Arc<Mutex<HashMap<JobId, LoadEntry>>>,
    pub config: Arc<MasterConfig>,
}

impl AppState {
    pub fn new(config: MasterConfig) -> Self {
        Self {
            registry: Arc::new(InMemoryJobRegistry::new()),
            loads: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    pub fn loads(&self) -> MutexGuard<'_, HashMap<JobId, LoadEntry>> {
        self.loads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra el job interno y la carga que lo supervisa.
    pub fn create_load(&self, label: &str) -> LoadSummary {
        self.create_load_with(label, LoadEtlTaskKind::default())
    }

    pub fn create_load_with(&self, label: &str, kind: LoadEtlTaskKind) -> LoadSummary {
        let job = self.registry.register(label);
        let etl_task = kind.build(&job.id, self.registry.clone());

        let entry = LoadEntry {
            label: job.label.clone(),
            etl_task,
            phase: LoadPhase::Etl,
            cancel_reason: None,
            download_plan: None,
            created_at: job.created_at,
        };
        let summary = entry.summary(&job.id);
        self.loads().insert(job.id.clone(), entry);
        summary
    }
}

#[derive(Clone)]
pub struct LoadEntry {
    pub label: String,
    pub etl_task: Arc<dyn LoadEtlTask>,
    pub phase: LoadPhase,
    pub cancel_reason: Option<String>,
    // se llena cuando el ETL termina y pasa el control de calidad
    pub download_plan: Option<Vec<DownloadEntry>>,
    pub created_at: DateTime<Utc>,
}

impl LoadEntry {
    pub fn summary(&self, id: &str) -> LoadSummary {
        LoadSummary {
            id: id.to_string(),
            label: self.label.clone(),
            phase: self.phase,
            etl_state: self.etl_task.status().state,
            cancel_reason: self.cancel_reason.clone(),
            created_at: self.created_at,
        }
    }
}
