use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::domain::{Cruise, FileRecord, Outcome, ReportVariant};

const BOOTSTRAP_CSS: &str = "https://maxcdn.bootstrapcdn.com/bootstrap/4.0.0/css/bootstrap.min.css";
const BOOTSTRAP_INTEGRITY: &str =
    "sha384-Gn5384xqQ1aoWXA+058RXPxPg6fy4IWvTNh0E263XmFcJlSAwiGgFAW/dAiS6JXm";

#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub cruises: &'a BTreeMap<u64, Cruise>,
    pub files: &'a BTreeMap<u64, FileRecord>,
    pub variant: ReportVariant,
    pub base_url: &'a str,
}

#[derive(Debug, Clone)]
pub struct Versions {
    pub tool: String,
    pub converter: Option<String>,
}

/// Renders the status table, one row per outcome in file-id order. A row
/// whose file or cruise cross-references are missing from the catalog maps
/// is skipped; everything else about the run is unaffected.
pub fn render_report(outcomes: &[Outcome], ctx: &ReportContext<'_>, versions: &Versions) -> String {
    let base_url = ctx.base_url.trim_end_matches('/');
    let mut ordered: Vec<&Outcome> = outcomes.iter().collect();
    ordered.sort_by_key(|outcome| outcome.file_id());

    let mut html = String::new();
    let _ = write!(
        html,
        "<html>\n<head>\n<link rel=\"stylesheet\" href=\"{BOOTSTRAP_CSS}\" \
         integrity=\"{BOOTSTRAP_INTEGRITY}\" crossorigin=\"anonymous\">\n</head>\n<body>"
    );
    let _ = write!(html, "<h2>Versions</h2>\n{}</br>\n", escape_html(&versions.tool));
    if let Some(converter) = &versions.converter {
        let _ = write!(html, "{}</br>\n", escape_html(converter));
    }
    let _ = write!(
        html,
        "generated {}</br>\n",
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    );

    html.push_str("<h2>Files</h2>\n<table class=\"table\"><thead>\n<tr>\n<th>Cruise(s)</th>\n");
    if ctx.variant.show_start_dates() {
        html.push_str("<th>Start Date</th>\n");
    }
    html.push_str("<th>File ID</th>\n<th>File Download</th>\n<th>NetCDF File</th>\n</tr></thead><tbody>\n");

    for outcome in ordered {
        let file_id = outcome.file_id();
        let Some(record) = ctx.files.get(&file_id) else {
            debug!(file_id, "no file record for outcome, skipping row");
            continue;
        };
        let Some(cruises) = join_cruises(record, ctx.cruises) else {
            debug!(file_id, "missing cruise reference, skipping row");
            continue;
        };

        let cruise_links = cruises
            .iter()
            .map(|cruise| {
                let expocode = escape_html(&cruise.expocode);
                format!("<a href='{base_url}/cruise/{expocode}'>{expocode}</a>")
            })
            .collect::<Vec<_>>()
            .join(", ");
        let file_name = escape_html(&record.file_name);
        let download =
            format!("<a href=\"{base_url}/data/{file_id}/{file_name}\">{file_name}</a>");

        let (row_class, status_cell) = match outcome {
            Outcome::Success { dataset, .. } => {
                let artifact = escape_html(dataset.artifact_path.as_str());
                let mut cell = format!("<a href=\"{artifact}\">{artifact}</a>");
                if ctx.variant.show_profile_count() {
                    if let Some(count) = dataset.profile_count {
                        let _ = write!(cell, " ({count} profiles)");
                    }
                }
                ("table-success", cell)
            }
            Outcome::Failure { error, .. } => {
                ("table-warning", format!("Error: {}", escape_html(&error.message)))
            }
        };

        let _ = write!(html, "<tr class='{row_class}'>\n<td>{cruise_links}</td>\n");
        if ctx.variant.show_start_dates() {
            let dates = cruises
                .iter()
                .map(|cruise| escape_html(&cruise.start_date))
                .collect::<Vec<_>>()
                .join(",");
            let _ = write!(html, "<td>{dates}</td>\n");
        }
        let _ = write!(
            html,
            "<td>{file_id}</td>\n<td>{download}</td>\n<td>{status_cell}</td>\n</tr>\n"
        );
    }

    html.push_str("</tbody></table></body></html>\n");
    html
}

/// Resolves every cruise id on the record, or `None` if any is absent.
fn join_cruises<'a>(
    record: &FileRecord,
    cruises: &'a BTreeMap<u64, Cruise>,
) -> Option<Vec<&'a Cruise>> {
    record
        .cruises
        .iter()
        .map(|id| cruises.get(id))
        .collect()
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
