use std::path::Path;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use hydro_audit::app::{App, RunOptions};
use hydro_audit::catalog::CatalogClient;
use hydro_audit::domain::{
    Cruise, DataFormat, DataType, DatasetHandle, FileRecord, FileRole, ReportVariant, Task,
};
use hydro_audit::error::{AuditError, ParseError};
use hydro_audit::parser::{ConvertError, ExchangeConverter};
use hydro_audit::store::Store;

struct MockCatalog {
    cruises: Vec<Cruise>,
    files: Vec<FileRecord>,
}

impl MockCatalog {
    fn sample() -> Self {
        let cruises = vec![Cruise {
            id: 10,
            expocode: "33RR20160208".to_string(),
            start_date: "2016-02-08".to_string(),
        }];
        let files = vec![
            FileRecord {
                id: 1,
                data_type: DataType::Bottle,
                data_format: DataFormat::Exchange,
                role: FileRole::Dataset,
                file_name: "a_hy1.csv".to_string(),
                cruises: vec![10],
            },
            FileRecord {
                id: 2,
                data_type: DataType::Ctd,
                data_format: DataFormat::Exchange,
                role: FileRole::Dataset,
                file_name: "a_ct1.zip".to_string(),
                cruises: vec![10],
            },
        ];
        Self { cruises, files }
    }
}

impl CatalogClient for MockCatalog {
    fn fetch_cruises(&self) -> Result<Vec<Cruise>, AuditError> {
        Ok(self.cruises.clone())
    }

    fn fetch_files(&self) -> Result<Vec<FileRecord>, AuditError> {
        Ok(self.files.clone())
    }
}

struct FailingCatalog;

impl CatalogClient for FailingCatalog {
    fn fetch_cruises(&self) -> Result<Vec<Cruise>, AuditError> {
        Err(AuditError::CatalogStatus {
            status: 503,
            message: "maintenance".to_string(),
        })
    }

    fn fetch_files(&self) -> Result<Vec<FileRecord>, AuditError> {
        Err(AuditError::CatalogStatus {
            status: 503,
            message: "maintenance".to_string(),
        })
    }
}

#[derive(Default)]
struct MockConverter {
    calls: Mutex<usize>,
    fail_parse: Vec<u64>,
    fatal: bool,
}

impl ExchangeConverter for MockConverter {
    fn convert(&self, task: &Task, destination: &Path) -> Result<DatasetHandle, ConvertError> {
        *self.calls.lock().unwrap() += 1;
        if self.fatal {
            return Err(ConvertError::Fatal(AuditError::Conversion(
                "worker blew up".to_string(),
            )));
        }
        if self.fail_parse.contains(&task.file_id) {
            return Err(ConvertError::Parse(ParseError::new(
                task.file_id,
                "bad exchange header",
            )));
        }
        std::fs::write(destination, b"netcdf").unwrap();
        Ok(DatasetHandle {
            artifact_path: Utf8PathBuf::new(),
            profile_count: Some(7),
        })
    }

    fn version(&self) -> Option<String> {
        Some("cchdo.hydro 1.0.2".to_string())
    }
}

fn store_in(temp: &tempfile::TempDir) -> Store {
    Store::new(
        Utf8PathBuf::from_path_buf(temp.path().join("nc")).unwrap(),
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap(),
    )
}

fn options(variant: ReportVariant) -> RunOptions {
    RunOptions {
        variant,
        workers: Some(2),
        skip_existing: false,
        force: false,
        dry_run: false,
    }
}

#[test]
fn bottle_run_converts_only_bottle_files_and_writes_report() {
    let temp = tempfile::tempdir().unwrap();
    let app = App::new(
        store_in(&temp),
        MockCatalog::sample(),
        MockConverter::default(),
        "https://cchdo.ucsd.edu".to_string(),
    );

    let summary = app.run(options(ReportVariant::Bottle)).unwrap();

    assert_eq!(summary.eligible, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    let report_path = temp.path().join("index.html");
    assert!(report_path.exists());
    let html = std::fs::read_to_string(report_path).unwrap();
    assert!(html.contains("a_hy1.csv"));
    assert!(!html.contains("a_ct1.zip"));
    assert!(temp.path().join("nc/a_hy1.csv.nc").exists());
}

#[test]
fn parse_failure_is_reported_and_run_still_succeeds() {
    let temp = tempfile::tempdir().unwrap();
    let converter = MockConverter {
        fail_parse: vec![2],
        ..Default::default()
    };
    let app = App::new(
        store_in(&temp),
        MockCatalog::sample(),
        converter,
        "https://cchdo.ucsd.edu".to_string(),
    );

    let summary = app.run(options(ReportVariant::Ctd)).unwrap();

    assert_eq!(summary.eligible, 1);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 1);
    let html = std::fs::read_to_string(temp.path().join("index_ctd.html")).unwrap();
    assert!(html.contains("table-warning"));
    assert!(html.contains("bad exchange header"));
}

#[test]
fn fatal_worker_error_aborts_without_a_report() {
    let temp = tempfile::tempdir().unwrap();
    let converter = MockConverter {
        fatal: true,
        ..Default::default()
    };
    let app = App::new(
        store_in(&temp),
        MockCatalog::sample(),
        converter,
        "https://cchdo.ucsd.edu".to_string(),
    );

    let err = app.run(options(ReportVariant::Ctd)).unwrap_err();
    assert_matches!(err, AuditError::Conversion(_));
    assert!(!temp.path().join("index_ctd.html").exists());
}

#[test]
fn metadata_fetch_failure_is_fatal_before_any_task_runs() {
    let temp = tempfile::tempdir().unwrap();
    let converter = MockConverter::default();
    let app = App::new(
        store_in(&temp),
        FailingCatalog,
        converter,
        "https://cchdo.ucsd.edu".to_string(),
    );

    let err = app.run(options(ReportVariant::Bottle)).unwrap_err();
    assert_matches!(err, AuditError::CatalogStatus { status: 503, .. });
    assert!(!temp.path().join("index.html").exists());
    assert!(!temp.path().join("nc").exists());
}

#[test]
fn ctd_guard_skips_existing_artifacts_unless_forced() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    store.ensure_output_root().unwrap();
    std::fs::write(store.artifact_path("2_ctd.nc").as_std_path(), b"old").unwrap();

    let converter = MockConverter::default();
    let app = App::new(
        store,
        MockCatalog::sample(),
        converter,
        "https://cchdo.ucsd.edu".to_string(),
    );

    let summary = app.run(options(ReportVariant::Ctd)).unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(
        std::fs::read(temp.path().join("nc/2_ctd.nc")).unwrap(),
        b"old"
    );

    let mut forced = options(ReportVariant::Ctd);
    forced.force = true;
    app.run(forced).unwrap();
    assert_eq!(
        std::fs::read(temp.path().join("nc/2_ctd.nc")).unwrap(),
        b"netcdf"
    );
}

#[test]
fn skip_existing_flag_enables_the_guard_for_bottle_runs() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    store.ensure_output_root().unwrap();
    std::fs::write(store.artifact_path("a_hy1.csv.nc").as_std_path(), b"old").unwrap();

    let app = App::new(
        store,
        MockCatalog::sample(),
        MockConverter::default(),
        "https://cchdo.ucsd.edu".to_string(),
    );

    // Bottle re-converts by default.
    app.run(options(ReportVariant::Bottle)).unwrap();
    assert_eq!(
        std::fs::read(temp.path().join("nc/a_hy1.csv.nc")).unwrap(),
        b"netcdf"
    );

    std::fs::write(temp.path().join("nc/a_hy1.csv.nc"), b"old").unwrap();
    let mut guarded = options(ReportVariant::Bottle);
    guarded.skip_existing = true;
    let summary = app.run(guarded).unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(
        std::fs::read(temp.path().join("nc/a_hy1.csv.nc")).unwrap(),
        b"old"
    );
}

#[test]
fn dry_run_classifies_without_converting() {
    let temp = tempfile::tempdir().unwrap();
    let app = App::new(
        store_in(&temp),
        MockCatalog::sample(),
        MockConverter::default(),
        "https://cchdo.ucsd.edu".to_string(),
    );

    let mut opts = options(ReportVariant::Bottle);
    opts.dry_run = true;
    let summary = app.run(opts).unwrap();

    assert_eq!(summary.eligible, 1);
    assert!(summary.report_path.is_none());
    assert!(!temp.path().join("index.html").exists());
    assert!(!temp.path().join("nc").exists());
}
