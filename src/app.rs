use serde::Serialize;
use tracing::info;

use crate::catalog::{CatalogClient, cruises_by_id, files_by_id};
use crate::classify::eligible_tasks;
use crate::domain::ReportVariant;
use crate::error::AuditError;
use crate::parser::ExchangeConverter;
use crate::pipeline::{AuditPipeline, PipelineOptions};
use crate::report::{ReportContext, Versions, render_report};
use crate::store::Store;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub variant: ReportVariant,
    pub workers: Option<usize>,
    /// Enable the idempotency guard even for variants that re-convert by
    /// default.
    pub skip_existing: bool,
    /// Re-convert even when the artifact already exists; wins over the
    /// guard.
    pub force: bool,
    /// Classify only; no conversion and no report.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub variant: String,
    pub eligible: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub report_path: Option<String>,
}

/// Wires the audit stages together: catalog fetch, classification, the
/// parallel pipeline, and the report. Collaborators come in as traits so
/// tests can run the whole flow against fakes.
pub struct App<C: CatalogClient, X: ExchangeConverter> {
    store: Store,
    catalog: C,
    converter: X,
    base_url: String,
}

impl<C: CatalogClient, X: ExchangeConverter> App<C, X> {
    pub fn new(store: Store, catalog: C, converter: X, base_url: String) -> Self {
        Self {
            store,
            catalog,
            converter,
            base_url,
        }
    }

    pub fn run(&self, options: RunOptions) -> Result<RunSummary, AuditError> {
        info!("loading catalog metadata");
        let cruises = cruises_by_id(self.catalog.fetch_cruises()?);
        let files = files_by_id(self.catalog.fetch_files()?);

        let tasks = eligible_tasks(&files, options.variant, &self.base_url);
        info!(
            variant = %options.variant,
            eligible = tasks.len(),
            total = files.len(),
            "classified files"
        );

        if options.dry_run {
            return Ok(RunSummary {
                variant: options.variant.to_string(),
                eligible: tasks.len(),
                succeeded: 0,
                failed: 0,
                report_path: None,
            });
        }

        let pipeline_options = PipelineOptions {
            workers: options.workers,
            skip_existing: (options.skip_existing
                || options.variant.skip_existing_default())
                && !options.force,
        };
        let pipeline = AuditPipeline::new(&self.store, &self.converter, pipeline_options);
        let outcomes = pipeline.run(&tasks)?;

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - succeeded;

        let ctx = ReportContext {
            cruises: &cruises,
            files: &files,
            variant: options.variant,
            base_url: &self.base_url,
        };
        let versions = Versions {
            tool: format!("hydro-audit {}", env!("CARGO_PKG_VERSION")),
            converter: self.converter.version(),
        };
        let html = render_report(&outcomes, &ctx, &versions);
        let report_path = self
            .store
            .write_report(options.variant.report_file_name(), &html)?;
        info!(%report_path, succeeded, failed, "report written");

        Ok(RunSummary {
            variant: options.variant.to_string(),
            eligible: tasks.len(),
            succeeded,
            failed,
            report_path: Some(report_path.to_string()),
        })
    }
}
