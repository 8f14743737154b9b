use std::sync::Arc;

use common::{
    download_plan, quality, DownloadEntry, EtlError, EtlState, JobId, LoadEtlTask, LoadPhase,
};
use tracing::{debug, info, warn};

use crate::config::MasterConfig;
use crate::state::AppState;

/// Qué hacer con una carga después de consultar su ETL.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Stay,
    Loading(Vec<DownloadEntry>),
    Cancelled(String),
}

/// Loop del supervisor: consulta el ETL de todas las cargas en fase ETL.
/// Una sola pasada a la vez, así nunca hay dos reconcile del mismo job.
pub async fn run_etl_poll_loop(state: AppState) {
    let mut ticker = tokio::time::interval(state.config.poll_interval);
    loop {
        ticker.tick().await;
        let moved = poll_once(&state);
        if moved > 0 {
            debug!("{} cargas cambiaron de fase en esta pasada", moved);
        }
    }
}

/// Una pasada:
/// 1. snapshot de las cargas en fase ETL (sin retener el lock)
/// 2. reconcile de cada una
/// 3. aplicar las transiciones
///
/// Devuelve cuántas cargas cambiaron de fase.
pub fn poll_once(state: &AppState) -> usize {
    let pending: Vec<(JobId, Arc<dyn LoadEtlTask>)> = {
        let loads = state.loads();
        loads
            .iter()
            .filter(|(_, entry)| entry.phase == LoadPhase::Etl)
            .map(|(id, entry)| (id.clone(), entry.etl_task.clone()))
            .collect()
    };

    let mut moved = 0;
    for (job_id, etl_task) in pending {
        let transition = match poll_load(etl_task.as_ref(), &state.config) {
            Ok(t) => t,
            Err(e) => {
                // se reintenta en la próxima pasada
                warn!(job_id = %job_id, error = %e, "error consultando el ETL");
                continue;
            }
        };

        let mut loads = state.loads();
        let Some(entry) = loads.get_mut(&job_id) else {
            continue;
        };

        match transition {
            Transition::Stay => {}
            Transition::Loading(plan) => {
                info!(
                    job_id = %job_id,
                    files = plan.len(),
                    "ETL terminado, carga pasa a LOADING"
                );
                entry.download_plan = Some(plan);
                entry.phase = LoadPhase::Loading;
                moved += 1;
            }
            Transition::Cancelled(reason) => {
                warn!(job_id = %job_id, reason = %reason, "carga cancelada");
                entry.cancel_reason = Some(reason);
                entry.phase = LoadPhase::Cancelled;
                moved += 1;
            }
        }
    }
    moved
}

pub fn poll_load(etl_task: &dyn LoadEtlTask, config: &MasterConfig) -> Result<Transition, EtlError> {
    let status = etl_task.update_etl_status()?;

    match status.state {
        EtlState::Running => {
            etl_task.process_running()?;
            Ok(Transition::Stay)
        }
        EtlState::Finished => {
            match quality::check_quality(&status, config.max_filter_ratio) {
                Ok(()) => {}
                Err(e @ EtlError::QualityUnsatisfied { .. }) => {
                    return Ok(Transition::Cancelled(e.to_string()))
                }
                Err(e) => return Err(e),
            }

            match etl_task.file_path_map() {
                Ok(resolved) => Ok(Transition::Loading(download_plan(
                    &resolved,
                    &config.file_server_base,
                ))),
                // un nombre mal formado no se arregla reintentando
                Err(e @ EtlError::MalformedFileKey { .. }) => Ok(Transition::Cancelled(e.to_string())),
                Err(e) => Err(e),
            }
        }
        EtlState::Cancelled => Ok(Transition::Cancelled("etl job cancelado".to_string())),
        EtlState::Unknown => {
            // un job recién creado queda PENDING hasta su primera tarea
            debug!(job_id = %etl_task.job_id(), "estado del ETL desconocido");
            Ok(Transition::Stay)
        }
    }
}
