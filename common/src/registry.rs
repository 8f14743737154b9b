use chrono::Utc;
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::info;

use crate::error::{EtlError, Result};
use crate::job::{JobId, PullLoadJob, PullLoadJobState};
use crate::task::{PullLoadTask, TaskReportRequest};

/// Acceso de sólo lectura a los jobs del job manager.
pub trait JobRegistry: Send + Sync {
    fn lookup(&self, job_id: &str) -> Result<Arc<PullLoadJob>>;
}

/// Job manager en memoria.
///
/// Cada cambio arma una copia nueva del job y reemplaza el `Arc`, así quien
/// hizo `lookup` sigue leyendo un snapshot consistente.
#[derive(Debug, Default)]
pub struct InMemoryJobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<PullLoadJob>>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, label: impl Into<String>) -> Arc<PullLoadJob> {
        let job = Arc::new(PullLoadJob::new(label));
        self.write().insert(job.id.clone(), job.clone());
        info!(job_id = %job.id, label = %job.label, "job de pull load registrado");
        job
    }

    /// Agrega una tarea al final de la secuencia del job. Un job PENDING
    /// pasa a RUNNING con su primera tarea; un job terminado la rechaza.
    pub fn add_task(&self, job_id: &str, report: TaskReportRequest) -> Result<PullLoadTask> {
        let task = PullLoadTask::from_report(job_id, report);
        let added = task.clone();
        self.update(job_id, move |job| {
            if job.state.is_terminal() {
                return Err(EtlError::JobClosed {
                    job_id: job.id.clone(),
                    state: job.state,
                });
            }
            if job.state == PullLoadJobState::Pending {
                job.state = PullLoadJobState::Running;
            }
            job.tasks.push(task);
            Ok(())
        })?;
        Ok(added)
    }

    pub fn set_state(&self, job_id: &str, state: PullLoadJobState) -> Result<Arc<PullLoadJob>> {
        let job = self.update(job_id, |job| {
            job.state = state;
            Ok(())
        })?;
        info!(job_id, %state, "estado interno del job actualizado");
        Ok(job)
    }

    fn update<F>(&self, job_id: &str, f: F) -> Result<Arc<PullLoadJob>>
    where
        F: FnOnce(&mut PullLoadJob) -> Result<()>,
    {
        let mut jobs = self.write();
        let current = jobs
            .get(job_id)
            .ok_or_else(|| EtlError::JobNotFound(job_id.to_string()))?;

        let mut next = PullLoadJob::clone(current);
        f(&mut next)?;
        next.updated_at = Utc::now();

        let next = Arc::new(next);
        jobs.insert(job_id.to_string(), next.clone());
        Ok(next)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<JobId, Arc<PullLoadJob>>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JobRegistry for InMemoryJobRegistry {
    fn lookup(&self, job_id: &str) -> Result<Arc<PullLoadJob>> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(job_id)
            .cloned()
            .ok_or_else(|| EtlError::JobNotFound(job_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FileMap;

    #[test]
    fn lookup_de_job_inexistente_falla() {
        let registry = InMemoryJobRegistry::new();
        assert_eq!(
            registry.lookup("nope").unwrap_err(),
            EtlError::JobNotFound("nope".to_string())
        );
    }

    #[test]
    fn primera_tarea_pasa_el_job_a_running() {
        let registry = InMemoryJobRegistry::new();
        let job = registry.register("lbl");
        assert_eq!(registry.lookup(&job.id).unwrap().state, PullLoadJobState::Pending);

        registry.add_task(&job.id, TaskReportRequest::default()).unwrap();
        assert_eq!(registry.lookup(&job.id).unwrap().state, PullLoadJobState::Running);
    }

    #[test]
    fn tareas_quedan_en_orden_de_llegada() {
        let registry = InMemoryJobRegistry::new();
        let job = registry.register("lbl");

        let mut ids = Vec::new();
        for i in 0..3u64 {
            let mut file_map = FileMap::new();
            file_map.insert(format!("lbl.1.1.{i}"), i);
            let task = registry
                .add_task(
                    &job.id,
                    TaskReportRequest {
                        file_map,
                        ..TaskReportRequest::default()
                    },
                )
                .unwrap();
            ids.push(task.id);
        }

        let stored: Vec<_> = registry
            .lookup(&job.id)
            .unwrap()
            .tasks
            .iter()
            .map(|t| t.id.clone())
            .collect();
        assert_eq!(stored, ids);
    }

    #[test]
    fn snapshot_previo_no_ve_cambios_posteriores() {
        let registry = InMemoryJobRegistry::new();
        let job = registry.register("lbl");
        let before = registry.lookup(&job.id).unwrap();

        registry.set_state(&job.id, PullLoadJobState::Finished).unwrap();

        assert_eq!(before.state, PullLoadJobState::Pending);
        assert_eq!(
            registry.lookup(&job.id).unwrap().state,
            PullLoadJobState::Finished
        );
    }

    #[test]
    fn job_terminado_rechaza_tareas_nuevas() {
        let registry = InMemoryJobRegistry::new();

        for state in [
            PullLoadJobState::Finished,
            PullLoadJobState::Failed,
            PullLoadJobState::Canceled,
        ] {
            let job = registry.register("lbl");
            registry.add_task(&job.id, TaskReportRequest::default()).unwrap();
            registry.set_state(&job.id, state).unwrap();

            assert_eq!(
                registry
                    .add_task(&job.id, TaskReportRequest::default())
                    .unwrap_err(),
                EtlError::JobClosed {
                    job_id: job.id.clone(),
                    state,
                }
            );
            // la secuencia de tareas queda como estaba
            assert_eq!(registry.lookup(&job.id).unwrap().tasks.len(), 1);
        }
    }

    #[test]
    fn cambios_sobre_job_inexistente_fallan() {
        let registry = InMemoryJobRegistry::new();
        assert!(registry.set_state("x", PullLoadJobState::Running).is_err());
        assert!(registry.add_task("x", TaskReportRequest::default()).is_err());
    }
}
