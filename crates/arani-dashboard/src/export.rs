//! Writing CSV reports to disk.

use arani_core::{render_csv, DetectionEvent, ExportFilter, Report};
use std::path::{Path, PathBuf};

/// Render `events` for `filter` and save to `dir/report_<filter>.csv`,
/// replacing any earlier report with the same filter.
pub async fn save_report(
    dir: &Path,
    events: &[DetectionEvent],
    filter: ExportFilter,
    include_id: bool,
) -> std::io::Result<(PathBuf, Report)> {
    let report = render_csv(events, filter, include_id);
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&report.file_name);
    tokio::fs::write(&path, report.body.as_bytes()).await?;
    tracing::info!(path = %path.display(), rows = report.rows, %filter, "report exported");
    Ok((path, report))
}
