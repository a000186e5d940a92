//! Report artifacts: completed reports rendered to CSV files on local disk.
//!
//! One file per report, `<dir>/<report_id>.csv`. A file is written under a unique
//! temporary name and renamed into place, so a concurrent reader sees either no
//! artifact or the complete one. Once present, an artifact is never rewritten.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use storewatch_core::{REPORT_COLUMNS, ReportId, ReportRow};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ArtifactError {
    fn io(path: &Path, source: io::Error) -> Self {
        ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A materialized report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub report_id: ReportId,
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl Artifact {
    /// Download name offered to clients.
    pub fn file_name(&self) -> String {
        format!("report_{}.csv", self.report_id)
    }
}

/// Writes and reads report artifacts in a directory.
#[derive(Debug, Clone)]
pub struct ReportMaterializer {
    dir: PathBuf,
}

impl ReportMaterializer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, report_id: ReportId) -> PathBuf {
        self.dir.join(format!("{report_id}.csv"))
    }

    /// Previously materialized artifact, if any.
    pub async fn existing(&self, report_id: ReportId) -> Result<Option<Artifact>, ArtifactError> {
        let path = self.path_for(report_id);
        match fs::read(&path).await {
            Ok(contents) => Ok(Some(Artifact {
                report_id,
                path,
                contents,
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ArtifactError::io(&path, e)),
        }
    }

    /// Return the artifact for `report_id`, rendering `rows` only when none exists yet.
    pub async fn materialize(&self, report_id: ReportId, rows: &[ReportRow]) -> Result<Artifact, ArtifactError> {
        if let Some(artifact) = self.existing(report_id).await? {
            debug!(report_id = %report_id, "reusing materialized report");
            return Ok(artifact);
        }

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ArtifactError::io(&self.dir, e))?;

        let path = self.path_for(report_id);
        let tmp = self.dir.join(format!(".{report_id}.{}.tmp", Uuid::now_v7()));
        let contents = render_csv(rows).into_bytes();

        fs::write(&tmp, &contents)
            .await
            .map_err(|e| ArtifactError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(ArtifactError::io(&path, e));
        }

        info!(report_id = %report_id, rows = rows.len(), path = %path.display(), "materialized report");

        Ok(Artifact {
            report_id,
            path,
            contents,
        })
    }
}

/// Render rows as CSV: fixed header, one line per row, in the order given.
pub fn render_csv(rows: &[ReportRow]) -> String {
    let mut out = REPORT_COLUMNS.join(",");
    out.push('\n');

    for row in rows {
        out.push_str(&csv_field(row.store_id.as_str()));
        for value in row.values() {
            out.push(',');
            out.push_str(&value.to_string());
        }
        out.push('\n');
    }

    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storewatch_core::StoreId;

    fn row(store: &str, hour_up: f64) -> ReportRow {
        ReportRow {
            store_id: StoreId::new(store),
            uptime_last_hour: hour_up,
            uptime_last_day: 23.5,
            uptime_last_week: 160.25,
            downtime_last_hour: 60.0 - hour_up,
            downtime_last_day: 0.5,
            downtime_last_week: 7.75,
        }
    }

    #[test]
    fn renders_header_and_rows_in_order() {
        let csv = render_csv(&[row("b", 45.0), row("a", 60.0)]);
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "store_id,uptime_last_hour,uptime_last_day,uptime_last_week,downtime_last_hour,downtime_last_day,downtime_last_week"
        );
        assert_eq!(lines[1], "b,45,23.5,160.25,15,0.5,7.75");
        assert_eq!(lines[2], "a,60,23.5,160.25,0,0.5,7.75");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn store_ids_with_separators_are_quoted() {
        let csv = render_csv(&[row("north, \"main\"", 60.0)]);
        assert!(csv.lines().nth(1).unwrap().starts_with("\"north, \"\"main\"\"\","));
    }

    #[test]
    fn empty_report_is_just_the_header() {
        assert_eq!(render_csv(&[]).lines().count(), 1);
    }

    #[tokio::test]
    async fn materialize_writes_once_and_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = ReportMaterializer::new(dir.path().join("reports"));
        let id = ReportId::new();

        assert!(materializer.existing(id).await.unwrap().is_none());

        let first = materializer.materialize(id, &[row("a", 60.0)]).await.unwrap();
        // Different rows on the second call: the stored artifact wins.
        let second = materializer.materialize(id, &[row("z", 1.0)]).await.unwrap();

        assert_eq!(first.contents, second.contents);
        assert_eq!(first.path, materializer.path_for(id));
        assert_eq!(first.file_name(), format!("report_{id}.csv"));

        let on_disk = std::fs::read(materializer.path_for(id)).unwrap();
        assert_eq!(on_disk, first.contents);
    }

    #[tokio::test]
    async fn no_temporary_files_are_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = ReportMaterializer::new(dir.path());
        let id = ReportId::new();

        materializer.materialize(id, &[row("a", 60.0)]).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![format!("{id}.csv")]);
    }

    #[tokio::test]
    async fn concurrent_materialization_is_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = ReportMaterializer::new(dir.path());
        let id = ReportId::new();
        let rows = vec![row("a", 60.0), row("b", 30.0)];

        let (a, b) = tokio::join!(materializer.materialize(id, &rows), materializer.materialize(id, &rows));

        assert_eq!(a.unwrap().contents, b.unwrap().contents);
    }
}
