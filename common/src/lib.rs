//! Tipos y lógica compartida entre el master y el cliente para seguir
//! el ETL de los jobs de pull load.

pub mod aggregate;
pub mod error;
pub mod etl_task;
pub mod file_key;
pub mod job;
pub mod load;
pub mod quality;
pub mod registry;
pub mod status;
pub mod task;

pub use aggregate::{finalize, EtlResult};
pub use error::{EtlError, Result};
pub use etl_task::{translate_state, LoadEtlTask, PullLoadEtlTask};
pub use file_key::{parse_file_key, resolve, PartitionIndexBucket, ResolvedFile, ResolvedFileMap};
pub use job::{JobId, LoadJobRequest, PullLoadJob, PullLoadJobState, SetJobStateRequest};
pub use load::{download_plan, DownloadEntry, LoadPhase, LoadSummary};
pub use registry::{InMemoryJobRegistry, JobRegistry};
pub use status::{EtlState, EtlStatus, StatusSlot};
pub use task::{FileMap, PullLoadTask, TaskId, TaskReportRequest, ABNORMAL_ROWS, NORMAL_ROWS};
