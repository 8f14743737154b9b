use std::sync::Arc;

use tracing::debug;

use crate::aggregate;
use crate::error::Result;
use crate::file_key::{self, ResolvedFileMap};
use crate::job::{JobId, PullLoadJobState};
use crate::registry::JobRegistry;
use crate::status::{EtlState, EtlStatus, StatusSlot};

/// Lo que el supervisor de cargas necesita de un ETL, sea cual sea el tipo
/// de carga que lo ejecuta.
pub trait LoadEtlTask: Send + Sync {
    fn job_id(&self) -> &str;

    /// Último estado publicado.
    fn status(&self) -> Arc<EtlStatus>;

    /// Recalcula el estado desde el job interno y lo publica. Si falla no se
    /// publica nada.
    fn update_etl_status(&self) -> Result<Arc<EtlStatus>>;

    /// Trabajo extra mientras el ETL sigue corriendo.
    fn process_running(&self) -> Result<()>;

    /// Archivos producidos, indexados por partición/índice/bucket.
    fn file_path_map(&self) -> Result<ResolvedFileMap>;
}

pub fn translate_state(state: PullLoadJobState) -> EtlState {
    match state {
        PullLoadJobState::Canceled | PullLoadJobState::Failed => EtlState::Cancelled,
        PullLoadJobState::Finished => EtlState::Finished,
        PullLoadJobState::Running => EtlState::Running,
        PullLoadJobState::Pending | PullLoadJobState::Unknown => EtlState::Unknown,
    }
}

/// ETL de una carga de tipo pull load.
pub struct PullLoadEtlTask {
    job_id: JobId,
    registry: Arc<dyn JobRegistry>,
    status: StatusSlot,
}

impl PullLoadEtlTask {
    pub fn new(job_id: impl Into<JobId>, registry: Arc<dyn JobRegistry>) -> Self {
        Self {
            job_id: job_id.into(),
            registry,
            status: StatusSlot::new(),
        }
    }

    /// Calcula el estado siguiente a partir de `prior` sin publicarlo.
    ///
    /// Sólo FINISHED recalcula archivos y contadores; en el resto de los
    /// estados se arrastran los de `prior`.
    pub fn reconcile(&self, prior: &EtlStatus) -> Result<EtlStatus> {
        let job = self.registry.lookup(&self.job_id)?;
        let state = translate_state(job.state);

        let mut next = prior.clone();
        if state == EtlState::Finished {
            let result = aggregate::finalize(&job.tasks)?;
            next.file_map = Some(result.file_map);
            next.counters = result.counters;
            if result.tracking_url.is_some() {
                next.tracking_url = result.tracking_url;
            }
        }
        next.state = state;

        debug!(
            job_id = %self.job_id,
            internal = %job.state,
            etl = ?next.state,
            tasks = job.tasks.len(),
            "estado del ETL reconciliado"
        );
        Ok(next)
    }
}

impl LoadEtlTask for PullLoadEtlTask {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    fn status(&self) -> Arc<EtlStatus> {
        self.status.load()
    }

    fn update_etl_status(&self) -> Result<Arc<EtlStatus>> {
        let prior = self.status.load();
        let next = self.reconcile(&prior)?;
        Ok(self.status.publish(next))
    }

    fn process_running(&self) -> Result<()> {
        // pull load no tiene nada que hacer mientras corre
        Ok(())
    }

    fn file_path_map(&self) -> Result<ResolvedFileMap> {
        let status = self.status.load();
        file_key::resolve(status.file_map.as_ref())
    }
}
