use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use common::{
    DownloadEntry, EtlStatus, FileMap, LoadJobRequest, LoadSummary, PullLoadJob, PullLoadJobState,
    PullLoadTask, SetJobStateRequest, TaskReportRequest, ABNORMAL_ROWS, NORMAL_ROWS,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::env;

/// - En Docker: MASTER_URL=http://master:8080
/// - Local: default http://localhost:8080
fn master_base_url() -> String {
    env::var("MASTER_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "CLI para seguir cargas de pull load contra el master")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crea una carga nueva
    Submit {
        #[arg(value_name = "LABEL")]
        label: String,
    },
    /// Reporta el resultado de una tarea del ETL
    Report {
        #[arg(value_name = "JOB_ID")]
        id: String,

        /// Archivo producido, como <clave>=<bytes>; se puede repetir
        #[arg(long = "file", value_parser = parse_file_entry)]
        files: Vec<(String, u64)>,

        /// Filas normales
        #[arg(long)]
        normal: Option<String>,

        /// Filas anormales
        #[arg(long)]
        abnormal: Option<String>,

        #[arg(long)]
        url: Option<String>,
    },
    /// Cambia el estado interno del job (PENDING, RUNNING, FINISHED, FAILED, CANCELED, UNKNOWN)
    State {
        #[arg(value_name = "JOB_ID")]
        id: String,
        #[arg(value_name = "STATE")]
        state: PullLoadJobState,
    },
    /// Estado del ETL de una carga
    Status {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },
    /// Plan de descarga de una carga terminada
    Files {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },
    /// Lista las cargas
    List,
}

fn parse_file_entry(s: &str) -> Result<(String, u64), String> {
    let (key, size) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("se esperaba <clave>=<bytes>, llegó {s}"))?;
    if key.is_empty() {
        return Err(format!("clave vacía en {s}"));
    }
    let size = size
        .parse::<u64>()
        .map_err(|_| format!("tamaño inválido en {s}"))?;
    Ok((key.to_string(), size))
}

fn build_report(
    files: Vec<(String, u64)>,
    normal: Option<String>,
    abnormal: Option<String>,
    url: Option<String>,
) -> TaskReportRequest {
    let mut report = TaskReportRequest {
        file_map: files.into_iter().collect::<FileMap>(),
        tracking_url: url,
        ..TaskReportRequest::default()
    };
    if let Some(n) = normal {
        report.counters.insert(NORMAL_ROWS.to_string(), n);
    }
    if let Some(a) = abnormal {
        report.counters.insert(ABNORMAL_ROWS.to_string(), a);
    }
    report
}

async fn read_json<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        bail!("{what}: el master respondió {status}");
    }
    resp.json::<T>()
        .await
        .with_context(|| format!("{what}: respuesta inválida"))
}

fn print_summary(load: &LoadSummary) {
    println!("Carga {}", load.id);
    println!("  label     : {}", load.label);
    println!("  fase      : {:?}", load.phase);
    println!("  etl       : {:?}", load.etl_state);
    if let Some(ref reason) = load.cancel_reason {
        println!("  cancelada : {}", reason);
    }
    println!("  creada    : {}", load.created_at);
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = master_base_url();

    match cli.command {
        Commands::Submit { label } => {
            let url = format!("{}/api/v1/loads", base_url);
            let resp = client.post(&url).json(&LoadJobRequest { label }).send().await?;
            let load: LoadSummary = read_json(resp, "submit").await?;
            print_summary(&load);
        }

        Commands::Report {
            id,
            files,
            normal,
            abnormal,
            url,
        } => {
            let report = build_report(files, normal, abnormal, url);
            let endpoint = format!("{}/api/v1/loads/{id}/tasks", base_url);
            let resp = client.post(&endpoint).json(&report).send().await?;
            let task: PullLoadTask = read_json(resp, "report").await?;
            println!(
                "Tarea {} reportada ({} archivos) para job {}",
                task.id,
                task.file_map.len(),
                task.job_id
            );
        }

        Commands::State { id, state } => {
            let url = format!("{}/api/v1/loads/{id}/state", base_url);
            let resp = client
                .post(&url)
                .json(&SetJobStateRequest { state })
                .send()
                .await?;
            let job: PullLoadJob = read_json(resp, "state").await?;
            println!(
                "Job {}: estado interno {} ({} tareas)",
                job.id,
                job.state,
                job.tasks.len()
            );
        }

        Commands::Status { id } => {
            let url = format!("{}/api/v1/loads/{id}/etl_status", base_url);
            let resp = client.get(&url).send().await?;
            let status: EtlStatus = read_json(resp, "status").await?;

            println!("ETL de {}:", id);
            println!("  estado : {:?}", status.state);
            match status.file_map {
                Some(ref files) => println!("  archivos: {}", files.len()),
                None => println!("  archivos: (sin consolidar)"),
            }
            for (name, value) in &status.counters {
                println!("  {:<15}: {}", name, value);
            }
            if let Some(ref tracking) = status.tracking_url {
                println!("  tracking: {}", tracking);
            }
        }

        Commands::Files { id } => {
            let url = format!("{}/api/v1/loads/{id}/files", base_url);
            let resp = client.get(&url).send().await?;
            let plan: Vec<DownloadEntry> = read_json(resp, "files").await?;

            if plan.is_empty() {
                println!("(sin archivos)");
            }
            for entry in plan {
                println!(
                    "{}_{}_{}  {:>10} bytes  {}",
                    entry.partition_id, entry.index_id, entry.bucket, entry.size, entry.url
                );
            }
        }

        Commands::List => {
            let url = format!("{}/api/v1/loads", base_url);
            let resp = client.get(&url).send().await?;
            let loads: Vec<LoadSummary> = read_json(resp, "list").await?;
            if loads.is_empty() {
                println!("No hay cargas.");
            }
            for load in &loads {
                print_summary(load);
                println!();
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_es_consistente() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_file_entry_acepta_urls_con_igual() {
        assert_eq!(
            parse_file_entry("http://h:8000/x?a=b/lbl.1.2.3=64").unwrap(),
            ("http://h:8000/x?a=b/lbl.1.2.3".to_string(), 64)
        );
        assert!(parse_file_entry("lbl.1.2.3").is_err());
        assert!(parse_file_entry("=10").is_err());
        assert!(parse_file_entry("lbl.1.2.3=-1").is_err());
    }

    #[test]
    fn report_arma_contadores_solo_si_vienen() {
        let report = build_report(
            vec![("a".to_string(), 1), ("b".to_string(), 2)],
            Some("5".to_string()),
            None,
            None,
        );
        assert_eq!(report.file_map.len(), 2);
        assert_eq!(report.counters.get(NORMAL_ROWS).map(String::as_str), Some("5"));
        assert!(!report.counters.contains_key(ABNORMAL_ROWS));
    }

    #[test]
    fn subcomando_state_parsea_estado() {
        let cli = Cli::try_parse_from(["client", "state", "job-1", "failed"]).unwrap();
        match cli.command {
            Commands::State { id, state } => {
                assert_eq!(id, "job-1");
                assert_eq!(state, PullLoadJobState::Failed);
            }
            _ => panic!("se esperaba el subcomando state"),
        }
        assert!(Cli::try_parse_from(["client", "state", "job-1", "done"]).is_err());
    }
}
