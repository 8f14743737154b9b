use thiserror::Error;

use crate::job::{JobId, PullLoadJobState};

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EtlError {
    #[error("job de pull load no encontrado: {0}")]
    JobNotFound(JobId),

    #[error("el job {job_id} ya terminó ({state}), no acepta más tareas")]
    JobClosed {
        job_id: JobId,
        state: PullLoadJobState,
    },

    #[error("contador {counter} inválido en {source_id}: {value:?}")]
    CounterParse {
        source_id: String,
        counter: String,
        value: String,
    },

    #[error("overflow al sumar el contador {counter}")]
    CounterOverflow { counter: String },

    #[error("el ETL todavía no tiene mapa de archivos")]
    MissingFileMap,

    #[error("nombre de archivo ETL mal formado {key:?}: {reason}")]
    MalformedFileKey { key: String, reason: String },

    #[error("calidad del ETL insatisfecha: {abnormal}/{total} filas anormales (máximo {max_ratio})")]
    QualityUnsatisfied {
        abnormal: u64,
        total: u64,
        max_ratio: f64,
    },
}
