use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::{DatasetHandle, Outcome, Task};
use crate::error::AuditError;
use crate::parser::{ConvertError, ExchangeConverter};
use crate::store::Store;

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Worker-thread count; `None` means one per host CPU.
    pub workers: Option<usize>,
    /// When set, a task whose artifact already exists is reported as a
    /// success without invoking the converter.
    pub skip_existing: bool,
}

/// Runs the converter over every task with bounded parallelism. One failing
/// file never aborts the batch: the declared `ParseError` becomes a failure
/// outcome. Any other worker error is fatal and surfaces unchanged.
pub struct AuditPipeline<'a, X: ExchangeConverter> {
    store: &'a Store,
    converter: &'a X,
    options: PipelineOptions,
}

impl<'a, X: ExchangeConverter> AuditPipeline<'a, X> {
    pub fn new(store: &'a Store, converter: &'a X, options: PipelineOptions) -> Self {
        Self {
            store,
            converter,
            options,
        }
    }

    /// Blocks until every task has an outcome. Outcomes come back in task
    /// submission order; the pool is scoped to this call and torn down on
    /// both the success and the fatal-error path.
    pub fn run(&self, tasks: &[Task]) -> Result<Vec<Outcome>, AuditError> {
        self.store.ensure_output_root()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers.unwrap_or(0))
            .build()
            .map_err(|err| AuditError::WorkerPool(err.to_string()))?;

        info!(tasks = tasks.len(), "processing files");
        pool.install(|| {
            tasks
                .par_iter()
                .map(|task| self.run_task(task))
                .collect::<Result<Vec<Outcome>, AuditError>>()
        })
    }

    fn run_task(&self, task: &Task) -> Result<Outcome, AuditError> {
        if self.options.skip_existing && self.store.artifact_exists(&task.artifact_name) {
            let path = self.store.artifact_path(&task.artifact_name);
            info!(file_id = task.file_id, %path, "artifact exists, skipping");
            return Ok(Outcome::Success {
                file_id: task.file_id,
                dataset: DatasetHandle {
                    artifact_path: path,
                    profile_count: None,
                },
            });
        }

        info!(file_id = task.file_id, "start processing");
        let temp = self.store.artifact_temp_file()?;
        match self.converter.convert(task, temp.path()) {
            Ok(dataset) => {
                let artifact_path = self.store.publish_artifact(temp, &task.artifact_name)?;
                info!(file_id = task.file_id, %artifact_path, "done");
                Ok(Outcome::Success {
                    file_id: task.file_id,
                    dataset: DatasetHandle {
                        artifact_path,
                        profile_count: dataset.profile_count,
                    },
                })
            }
            Err(ConvertError::Parse(error)) => {
                warn!(file_id = task.file_id, %error, "parse failure");
                Ok(Outcome::Failure {
                    file_id: task.file_id,
                    error,
                })
            }
            Err(ConvertError::Fatal(error)) => Err(error),
        }
    }
}
