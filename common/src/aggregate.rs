use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{EtlError, Result};
use crate::task::{FileMap, PullLoadTask, ABNORMAL_ROWS, NORMAL_ROWS};

/// Resultado consolidado de todas las tareas de un job terminado.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EtlResult {
    pub file_map: FileMap,
    pub counters: BTreeMap<String, String>,
    pub tracking_url: Option<String>,
}

/// Consolida las tareas en orden de secuencia:
/// - file_map: la última tarea gana si una clave se repite
/// - contadores: suma de NORMAL_ROWS y ABNORMAL_ROWS (ausente = 0)
/// - tracking_url: la primera no vacía
///
/// Un contador presente que no es un entero aborta todo el cálculo.
pub fn finalize<'a, I>(tasks: I) -> Result<EtlResult>
where
    I: IntoIterator<Item = &'a PullLoadTask>,
{
    let mut file_map = FileMap::new();
    let mut normal_rows: u64 = 0;
    let mut abnormal_rows: u64 = 0;
    let mut tracking_url: Option<String> = None;
    let mut num_tasks = 0usize;

    for task in tasks {
        num_tasks += 1;

        // IndexMap::insert conserva la posición original y pisa el valor
        for (file, size) in &task.file_map {
            file_map.insert(file.clone(), *size);
        }

        normal_rows = add_counter(normal_rows, task, NORMAL_ROWS)?;
        abnormal_rows = add_counter(abnormal_rows, task, ABNORMAL_ROWS)?;

        if tracking_url.is_none() {
            tracking_url = task
                .tracking_url
                .as_deref()
                .filter(|url| !url.is_empty())
                .map(str::to_string);
        }
    }

    debug!(
        tasks = num_tasks,
        files = file_map.len(),
        normal_rows,
        abnormal_rows,
        "resultado del ETL consolidado"
    );

    let mut counters = BTreeMap::new();
    counters.insert(NORMAL_ROWS.to_string(), normal_rows.to_string());
    counters.insert(ABNORMAL_ROWS.to_string(), abnormal_rows.to_string());

    Ok(EtlResult {
        file_map,
        counters,
        tracking_url,
    })
}

fn add_counter(acc: u64, task: &PullLoadTask, name: &str) -> Result<u64> {
    let Some(raw) = task.counter(name) else {
        return Ok(acc);
    };

    let value = raw.parse::<u64>().map_err(|_| EtlError::CounterParse {
        source_id: format!("task {}", task.id),
        counter: name.to_string(),
        value: raw.to_string(),
    })?;

    acc.checked_add(value).ok_or_else(|| EtlError::CounterOverflow {
        counter: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(files: &[(&str, u64)], counters: &[(&str, &str)], url: Option<&str>) -> PullLoadTask {
        let mut t = PullLoadTask::new("job-1");
        for (k, v) in files {
            t.file_map.insert(k.to_string(), *v);
        }
        for (k, v) in counters {
            t.counters.insert(k.to_string(), v.to_string());
        }
        t.tracking_url = url.map(str::to_string);
        t
    }

    #[test]
    fn consolida_dos_tareas() {
        let tasks = vec![
            task(&[("f1", 10)], &[(NORMAL_ROWS, "5"), (ABNORMAL_ROWS, "1")], None),
            task(&[("f2", 20)], &[(NORMAL_ROWS, "3")], Some("http://x")),
        ];

        let result = finalize(&tasks).unwrap();

        let files: Vec<_> = result.file_map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(files, vec![("f1", 10), ("f2", 20)]);
        assert_eq!(result.counters.get(NORMAL_ROWS).map(String::as_str), Some("8"));
        assert_eq!(result.counters.get(ABNORMAL_ROWS).map(String::as_str), Some("1"));
        assert_eq!(result.tracking_url.as_deref(), Some("http://x"));
    }

    #[test]
    fn sin_tareas_da_contadores_en_cero() {
        let tasks: Vec<PullLoadTask> = Vec::new();
        let result = finalize(&tasks).unwrap();
        assert!(result.file_map.is_empty());
        assert_eq!(result.counters.get(NORMAL_ROWS).map(String::as_str), Some("0"));
        assert_eq!(result.counters.get(ABNORMAL_ROWS).map(String::as_str), Some("0"));
        assert!(result.tracking_url.is_none());
    }

    #[test]
    fn clave_repetida_gana_la_ultima_tarea() {
        let tasks = vec![
            task(&[("dup", 1), ("a", 5)], &[], None),
            task(&[("dup", 2)], &[], None),
        ];
        let result = finalize(&tasks).unwrap();
        assert_eq!(result.file_map.get("dup"), Some(&2));
        assert_eq!(result.file_map.len(), 2);

        let reversed: Vec<_> = tasks.iter().rev().collect();
        let result = finalize(reversed).unwrap();
        assert_eq!(result.file_map.get("dup"), Some(&1));
    }

    #[test]
    fn suma_de_contadores_no_depende_del_orden() {
        let tasks = vec![
            task(&[], &[(NORMAL_ROWS, "7"), (ABNORMAL_ROWS, "2")], None),
            task(&[], &[(NORMAL_ROWS, "11")], None),
            task(&[], &[(ABNORMAL_ROWS, "4")], None),
        ];

        let forward = finalize(&tasks).unwrap();
        let reversed: Vec<_> = tasks.iter().rev().collect();
        let backward = finalize(reversed).unwrap();
        let rotated = finalize([&tasks[1], &tasks[2], &tasks[0]]).unwrap();

        assert_eq!(forward.counters, backward.counters);
        assert_eq!(forward.counters, rotated.counters);
        assert_eq!(forward.counters.get(NORMAL_ROWS).map(String::as_str), Some("18"));
        assert_eq!(forward.counters.get(ABNORMAL_ROWS).map(String::as_str), Some("6"));
    }

    #[test]
    fn tracking_url_es_la_primera_no_vacia() {
        let tasks = vec![
            task(&[], &[], None),
            task(&[], &[], Some("")),
            task(&[], &[], Some("http://a")),
            task(&[], &[], Some("http://b")),
        ];
        let result = finalize(&tasks).unwrap();
        assert_eq!(result.tracking_url.as_deref(), Some("http://a"));

        let none = vec![task(&[], &[], None), task(&[], &[], None)];
        assert!(finalize(&none).unwrap().tracking_url.is_none());
    }

    #[test]
    fn contador_mal_formado_falla() {
        let tasks = vec![
            task(&[("f1", 1)], &[(NORMAL_ROWS, "3")], None),
            task(&[], &[(NORMAL_ROWS, "abc")], None),
        ];

        match finalize(&tasks) {
            Err(EtlError::CounterParse { counter, value, .. }) => {
                assert_eq!(counter, NORMAL_ROWS);
                assert_eq!(value, "abc");
            }
            other => panic!("se esperaba CounterParse, llegó {other:?}"),
        }
    }

    #[test]
    fn contador_negativo_falla() {
        let tasks = vec![task(&[], &[(ABNORMAL_ROWS, "-1")], None)];
        assert!(matches!(
            finalize(&tasks),
            Err(EtlError::CounterParse { .. })
        ));
    }

    #[test]
    fn overflow_de_contador_falla() {
        let max = u64::MAX.to_string();
        let tasks = vec![
            task(&[], &[(NORMAL_ROWS, max.as_str())], None),
            task(&[], &[(NORMAL_ROWS, "1")], None),
        ];
        assert_eq!(
            finalize(&tasks),
            Err(EtlError::CounterOverflow {
                counter: NORMAL_ROWS.to_string()
            })
        );
    }
}
