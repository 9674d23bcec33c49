use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::AuditError;

/// Filesystem layout for a run: the artifact directory holding converted
/// netCDF files and the directory the report document is written into.
/// Artifact presence is the pipeline's idempotency signal.
#[derive(Debug, Clone)]
pub struct Store {
    output_root: Utf8PathBuf,
    report_root: Utf8PathBuf,
}

impl Store {
    pub fn new(output_root: Utf8PathBuf, report_root: Utf8PathBuf) -> Self {
        Self {
            output_root,
            report_root,
        }
    }

    pub fn output_root(&self) -> &Utf8Path {
        &self.output_root
    }

    pub fn artifact_path(&self, artifact_name: &str) -> Utf8PathBuf {
        self.output_root.join(artifact_name)
    }

    pub fn report_path(&self, file_name: &str) -> Utf8PathBuf {
        self.report_root.join(file_name)
    }

    pub fn artifact_exists(&self, artifact_name: &str) -> bool {
        self.artifact_path(artifact_name).as_std_path().exists()
    }

    pub fn ensure_output_root(&self) -> Result<(), AuditError> {
        fs::create_dir_all(self.output_root.as_std_path())
            .map_err(|err| AuditError::Filesystem(err.to_string()))
    }

    /// Moves a finished artifact into its canonical location. Conversion
    /// happens into a temp file in the same directory, so this is a rename.
    pub fn publish_artifact(
        &self,
        temp: tempfile::NamedTempFile,
        artifact_name: &str,
    ) -> Result<Utf8PathBuf, AuditError> {
        let dest = self.artifact_path(artifact_name);
        if dest.as_std_path().exists() {
            fs::remove_file(dest.as_std_path())
                .map_err(|err| AuditError::Filesystem(err.to_string()))?;
        }
        temp.persist(dest.as_std_path())
            .map_err(|err| AuditError::Filesystem(err.to_string()))?;
        Ok(dest)
    }

    pub fn artifact_temp_file(&self) -> Result<tempfile::NamedTempFile, AuditError> {
        tempfile::Builder::new()
            .prefix("hydro-audit")
            .suffix(".nc.part")
            .tempfile_in(self.output_root.as_std_path())
            .map_err(|err| AuditError::Filesystem(err.to_string()))
    }

    pub fn write_report(&self, file_name: &str, content: &str) -> Result<Utf8PathBuf, AuditError> {
        let path = self.report_path(file_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| AuditError::ReportWrite(err.to_string()))?;
        }
        let tmp_path = path.with_extension("html.tmp");
        fs::write(tmp_path.as_std_path(), content.as_bytes())
            .map_err(|err| AuditError::ReportWrite(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| AuditError::ReportWrite(err.to_string()))?;
        Ok(path)
    }
}
