//! Resolución de los archivos que produce el ETL a su destino
//! (partición, índice, bucket).
//!
//! Convención de nombres compartida con quien genera los archivos: sólo se
//! mira el último segmento después de `/` (la clave puede ser un nombre, una
//! ruta o una URL) y ese segmento tiene la forma
//!
//! ```text
//! <label>.<partition_id>.<index_id>.<bucket>
//! ```
//!
//! Se parte desde la derecha, así que el label puede contener puntos.
//! `partition_id` e `index_id` son enteros con signo de 64 bits y `bucket`
//! un entero sin signo de 32 bits.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EtlError, Result};
use crate::task::FileMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionIndexBucket {
    pub partition_id: i64,
    pub index_id: i64,
    pub bucket: u32,
}

impl fmt::Display for PartitionIndexBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.partition_id, self.index_id, self.bucket)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFile {
    /// Clave original tal como vino en el file map
    pub file_key: String,
    pub size: u64,
}

pub type ResolvedFileMap = IndexMap<PartitionIndexBucket, ResolvedFile>;

pub fn parse_file_key(raw: &str) -> Result<PartitionIndexBucket> {
    let file_name = raw.rsplit('/').next().unwrap_or(raw);

    let mut parts = file_name.rsplitn(4, '.');
    let (bucket, index_id, partition_id, label) =
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(b), Some(i), Some(p), Some(l)) => (b, i, p, l),
            _ => {
                return Err(malformed(
                    raw,
                    "se esperaba <label>.<partition>.<index>.<bucket>",
                ))
            }
        };

    if label.is_empty() {
        return Err(malformed(raw, "label vacío"));
    }

    Ok(PartitionIndexBucket {
        partition_id: partition_id
            .parse()
            .map_err(|_| malformed(raw, "partition_id no es un entero"))?,
        index_id: index_id
            .parse()
            .map_err(|_| malformed(raw, "index_id no es un entero"))?,
        bucket: bucket
            .parse()
            .map_err(|_| malformed(raw, "bucket no es un entero sin signo"))?,
    })
}

/// Arma el mapa partición/índice/bucket -> (archivo original, tamaño).
///
/// Sin file map (el ETL no terminó) es un error; vacío es válido. Si dos
/// archivos caen en la misma clave gana el que viene después.
pub fn resolve(file_map: Option<&FileMap>) -> Result<ResolvedFileMap> {
    let file_map = file_map.ok_or(EtlError::MissingFileMap)?;

    let mut resolved = ResolvedFileMap::with_capacity(file_map.len());
    for (file_key, size) in file_map {
        let key = parse_file_key(file_key)?;
        resolved.insert(
            key,
            ResolvedFile {
                file_key: file_key.clone(),
                size: *size,
            },
        );
    }
    Ok(resolved)
}

fn malformed(raw: &str, reason: &str) -> EtlError {
    EtlError::MalformedFileKey {
        key: raw.to_string(),
        reason: reason.to_string(),
    }
}
