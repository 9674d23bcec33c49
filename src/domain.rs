use std::fmt;

use camino::Utf8PathBuf;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bottle,
    Ctd,
    #[serde(other)]
    Other,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bottle => write!(f, "bottle"),
            DataType::Ctd => write!(f, "ctd"),
            DataType::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Exchange,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Dataset,
    #[serde(other)]
    Other,
}

/// Cruise reference data, immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cruise {
    pub id: u64,
    pub expocode: String,
    #[serde(rename = "startDate", default)]
    pub start_date: String,
}

/// File reference data as served by the catalog. Unknown type/format/role
/// values land in the `Other` catch-alls so the full catalog always loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: u64,
    pub data_type: DataType,
    pub data_format: DataFormat,
    pub role: FileRole,
    pub file_name: String,
    #[serde(default)]
    pub cruises: Vec<u64>,
}

/// The classifier predicate: a record is eligible iff all three fields
/// match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSelector {
    pub data_type: DataType,
    pub data_format: DataFormat,
    pub role: FileRole,
}

impl FileSelector {
    pub fn bottle_exchange_dataset() -> Self {
        Self {
            data_type: DataType::Bottle,
            data_format: DataFormat::Exchange,
            role: FileRole::Dataset,
        }
    }

    pub fn ctd_exchange_dataset() -> Self {
        Self {
            data_type: DataType::Ctd,
            data_format: DataFormat::Exchange,
            role: FileRole::Dataset,
        }
    }

    pub fn matches(&self, record: &FileRecord) -> bool {
        record.data_type == self.data_type
            && record.data_format == self.data_format
            && record.role == self.role
    }
}

/// One unit of pipeline work, created by the classifier and consumed
/// exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub file_id: u64,
    pub source_url: String,
    pub artifact_name: String,
}

/// In-memory result of a successful parse and conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetHandle {
    pub artifact_path: Utf8PathBuf,
    pub profile_count: Option<u64>,
}

/// Exactly one outcome per task, tagged with the task's file id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { file_id: u64, dataset: DatasetHandle },
    Failure { file_id: u64, error: ParseError },
}

impl Outcome {
    pub fn file_id(&self) -> u64 {
        match self {
            Outcome::Success { file_id, .. } => *file_id,
            Outcome::Failure { file_id, .. } => *file_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// The two audit flavours. A variant bundles the selector triple, the
/// idempotency-guard default, the artifact naming scheme, and the report
/// column set, so both runs share one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportVariant {
    Bottle,
    Ctd,
}

impl ReportVariant {
    pub fn selector(&self) -> FileSelector {
        match self {
            ReportVariant::Bottle => FileSelector::bottle_exchange_dataset(),
            ReportVariant::Ctd => FileSelector::ctd_exchange_dataset(),
        }
    }

    /// The ctd run skips files whose artifact already exists; the bottle
    /// run re-converts everything by default.
    pub fn skip_existing_default(&self) -> bool {
        matches!(self, ReportVariant::Ctd)
    }

    pub fn report_file_name(&self) -> &'static str {
        match self {
            ReportVariant::Bottle => "index.html",
            ReportVariant::Ctd => "index_ctd.html",
        }
    }

    pub fn artifact_name(&self, record: &FileRecord) -> String {
        match self {
            ReportVariant::Bottle => format!("{}.nc", record.file_name),
            ReportVariant::Ctd => format!("{}_ctd.nc", record.id),
        }
    }

    /// Column asymmetry between the variants is kept as configured report
    /// shape rather than unified into one schema.
    pub fn show_start_dates(&self) -> bool {
        matches!(self, ReportVariant::Bottle)
    }

    pub fn show_profile_count(&self) -> bool {
        matches!(self, ReportVariant::Bottle)
    }
}

impl fmt::Display for ReportVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportVariant::Bottle => write!(f, "bottle"),
            ReportVariant::Ctd => write!(f, "ctd"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(data_type: DataType, data_format: DataFormat, role: FileRole) -> FileRecord {
        FileRecord {
            id: 1,
            data_type,
            data_format,
            role,
            file_name: "test_hy1.csv".to_string(),
            cruises: vec![10],
        }
    }

    #[test]
    fn selector_requires_exact_triple() {
        let selector = FileSelector::bottle_exchange_dataset();
        assert!(selector.matches(&record(
            DataType::Bottle,
            DataFormat::Exchange,
            FileRole::Dataset
        )));
        assert!(!selector.matches(&record(
            DataType::Ctd,
            DataFormat::Exchange,
            FileRole::Dataset
        )));
        assert!(!selector.matches(&record(
            DataType::Bottle,
            DataFormat::Other,
            FileRole::Dataset
        )));
        assert!(!selector.matches(&record(
            DataType::Bottle,
            DataFormat::Exchange,
            FileRole::Other
        )));
    }

    #[test]
    fn unknown_catalog_values_deserialize_as_other() {
        let json = r#"{
            "id": 7,
            "data_type": "documentation",
            "data_format": "pdf",
            "role": "merged",
            "file_name": "notes.pdf"
        }"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.data_type, DataType::Other);
        assert_eq!(record.data_format, DataFormat::Other);
        assert_eq!(record.role, FileRole::Other);
        assert!(record.cruises.is_empty());
    }

    #[test]
    fn cruise_start_date_field_rename() {
        let json = r#"{"id": 10, "expocode": "33RR20160208", "startDate": "2016-02-08"}"#;
        let cruise: Cruise = serde_json::from_str(json).unwrap();
        assert_eq!(cruise.start_date, "2016-02-08");
    }

    #[test]
    fn variant_artifact_names() {
        let record = FileRecord {
            id: 42,
            data_type: DataType::Ctd,
            data_format: DataFormat::Exchange,
            role: FileRole::Dataset,
            file_name: "i08s_ct1.zip".to_string(),
            cruises: vec![],
        };
        assert_eq!(ReportVariant::Ctd.artifact_name(&record), "42_ctd.nc");
        assert_eq!(
            ReportVariant::Bottle.artifact_name(&record),
            "i08s_ct1.zip.nc"
        );
    }
}
