use std::collections::BTreeMap;

use crate::domain::{FileRecord, ReportVariant, Task};

/// Derives the ordered task set from the full file mapping. Pure and total:
/// non-matching records are excluded, never rejected. Tasks come out in
/// ascending file-id order because the input map is ordered. The variant
/// supplies both the selector triple and the artifact naming, so the two
/// always agree.
pub fn eligible_tasks(
    files: &BTreeMap<u64, FileRecord>,
    variant: ReportVariant,
    base_url: &str,
) -> Vec<Task> {
    let base_url = base_url.trim_end_matches('/');
    let selector = variant.selector();
    files
        .values()
        .filter(|record| selector.matches(record))
        .map(|record| Task {
            file_id: record.id,
            source_url: format!("{base_url}/data/{}/dummy", record.id),
            artifact_name: variant.artifact_name(record),
        })
        .collect()
}
