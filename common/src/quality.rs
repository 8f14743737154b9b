use crate::error::{EtlError, Result};
use crate::status::EtlStatus;
use crate::task::{ABNORMAL_ROWS, NORMAL_ROWS};

/// Control de calidad de un ETL terminado: la proporción de filas anormales
/// no puede superar `max_filter_ratio`.
pub fn check_quality(status: &EtlStatus, max_filter_ratio: f64) -> Result<()> {
    let normal = status.rows(NORMAL_ROWS)?;
    let abnormal = status.rows(ABNORMAL_ROWS)?;
    let total = normal.saturating_add(abnormal);

    if abnormal as f64 > total as f64 * max_filter_ratio {
        return Err(EtlError::QualityUnsatisfied {
            abnormal,
            total,
            max_ratio: max_filter_ratio,
        });
    }
    Ok(())
}
