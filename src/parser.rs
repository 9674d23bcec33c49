use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::domain::{DatasetHandle, Task};
use crate::error::{AuditError, ParseError};

/// How a single conversion failed. `Parse` is the declared per-file failure
/// mode and becomes a report row; `Fatal` aborts the whole batch.
#[derive(Debug)]
pub enum ConvertError {
    Parse(ParseError),
    Fatal(AuditError),
}

/// Parses one exchange file and writes the converted netCDF artifact to
/// `destination`. The path in the returned handle is set by the pipeline
/// once the artifact is moved into place.
pub trait ExchangeConverter: Send + Sync {
    fn convert(&self, task: &Task, destination: &Path) -> Result<DatasetHandle, ConvertError>;
    fn version(&self) -> Option<String>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub converter: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ToolStatus {
    Ready,
    Missing { message: String },
}

/// Production converter: shells out to the hydro conversion tool found on
/// PATH. A non-zero exit is the converter declaring the file malformed and
/// maps to `ParseError`; anything preventing the tool from running at all
/// is fatal.
#[derive(Clone)]
pub struct HydroCliConverter {
    command: String,
    resolved: Option<PathBuf>,
}

impl HydroCliConverter {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            resolved: find_in_path(command),
        }
    }

    pub fn tool_status(&self) -> ToolStatus {
        match &self.resolved {
            Some(_) => ToolStatus::Ready,
            None => ToolStatus::Missing {
                message: format!("missing {} (hydro conversion tool)", self.command),
            },
        }
    }

    pub fn tool_info(&self) -> ToolInfo {
        ToolInfo {
            converter: self
                .resolved
                .as_ref()
                .and_then(|path| tool_version(path, &["--version"])),
        }
    }

    fn require_tool(&self) -> Result<&PathBuf, AuditError> {
        self.resolved
            .as_ref()
            .ok_or_else(|| AuditError::MissingTool(self.command.clone()))
    }
}

impl ExchangeConverter for HydroCliConverter {
    fn convert(&self, task: &Task, destination: &Path) -> Result<DatasetHandle, ConvertError> {
        let tool = self.require_tool().map_err(ConvertError::Fatal)?;
        let output = Command::new(tool)
            .arg("convert")
            .arg(&task.source_url)
            .arg(destination)
            .output()
            .map_err(|err| ConvertError::Fatal(AuditError::Conversion(err.to_string())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("converter exited with {}", output.status)
            } else {
                stderr
            };
            return Err(ConvertError::Parse(ParseError::new(task.file_id, message)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(DatasetHandle {
            artifact_path: camino::Utf8PathBuf::new(),
            profile_count: parse_profile_count(&stdout),
        })
    }

    fn version(&self) -> Option<String> {
        self.tool_info().converter
    }
}

/// Looks for a `profiles=N` token in the converter's stdout. Absent or
/// unparseable output just means no count in the report.
fn parse_profile_count(stdout: &str) -> Option<u64> {
    stdout
        .split_whitespace()
        .find_map(|token| token.strip_prefix("profiles="))
        .and_then(|value| value.parse().ok())
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

fn tool_version(path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(path).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() { None } else { Some(stdout) }
}
