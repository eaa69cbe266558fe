//! CSV files for harvested reviews.
//!
//! Files are UTF-8 with a byte-order mark (so spreadsheet tools pick the
//! right encoding), one header row, no index column. Every write replaces the
//! whole file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::domain::ReviewRecord;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Header names for the four output columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub author: String,
    pub body: String,
    pub rating: String,
    pub date: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            author: "작성자".to_string(),
            body: "내용".to_string(),
            rating: "별점".to_string(),
            date: "작성일".to_string(),
        }
    }
}

impl ColumnNames {
    pub fn header(&self) -> [&str; 4] {
        [&self.author, &self.body, &self.rating, &self.date]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for result files when no explicit path is given (default: ".")
    pub directory: PathBuf,
    pub columns: ColumnNames,
    /// Prefix files with a UTF-8 byte-order mark (default: true)
    pub write_bom: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            columns: ColumnNames::default(),
            write_bom: true,
        }
    }
}

impl OutputConfig {
    /// `<directory>/<stem>_<count>_reviews.csv`
    pub fn result_path(&self, stem: &str, count: usize) -> PathBuf {
        self.directory.join(format!("{stem}_{count}_reviews.csv"))
    }

    /// `<directory>/<stem>_checkpoint.csv`
    pub fn checkpoint_path(&self, stem: &str) -> PathBuf {
        self.directory.join(format!("{stem}_checkpoint.csv"))
    }
}

/// Write `records` to `path`, replacing any previous content.
///
/// The rows go to a sibling temporary file first and are renamed into place,
/// so an interrupted write never leaves a half-written file at `path`.
pub fn write_records(path: &Path, records: &[ReviewRecord], output: &OutputConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp)?;
        if output.write_bom {
            file.write_all(BOM)?;
        }
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(output.columns.header())?;
        for record in records {
            writer.write_record(record.to_csv_record())?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a file written by [`write_records`]: header row first, BOM removed.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let bytes = fs::read(path)?;
    let content = bytes.strip_prefix(BOM).unwrap_or(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(content);
    let mut rows = Vec::new();
    for row in reader.records() {
        rows.push(row?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<ReviewRecord> {
        (0..n)
            .map(|i| {
                ReviewRecord::new(
                    Some(&format!("r{i}")),
                    format!("user{i}"),
                    format!("리뷰, \"본문\" {i}"),
                    "별표 5개",
                    "3일 전",
                    120,
                )
            })
            .collect()
    }

    #[test]
    fn test_write_starts_with_bom_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_records(&path, &records(1), &OutputConfig::default()).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(BOM));
        let text = String::from_utf8(bytes[BOM.len()..].to_vec()).unwrap();
        assert!(text.starts_with("작성자,내용,별점,작성일\n"));
    }

    #[test]
    fn test_rows_survive_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_records(&path, &records(2), &OutputConfig::default()).unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["user0", "리뷰, \"본문\" 0", "별표 5개", "3일 전"]);
    }

    #[test]
    fn test_rewrite_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let output = OutputConfig::default();

        write_records(&path, &records(3), &output).unwrap();
        write_records(&path, &records(5), &output).unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 6);
        assert!(!dir.path().join("out.csv.tmp").exists());
    }

    #[test]
    fn test_write_without_bom_and_custom_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/en.csv");
        let output = OutputConfig {
            write_bom: false,
            columns: ColumnNames {
                author: "author".into(),
                body: "body".into(),
                rating: "rating".into(),
                date: "date".into(),
            },
            ..Default::default()
        };
        write_records(&path, &[], &output).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "author,body,rating,date\n");
    }

    #[test]
    fn test_default_paths() {
        let output = OutputConfig {
            directory: PathBuf::from("out"),
            ..Default::default()
        };
        assert_eq!(
            output.result_path("반포한강공원", 50),
            PathBuf::from("out/반포한강공원_50_reviews.csv")
        );
        assert_eq!(
            output.checkpoint_path("반포한강공원"),
            PathBuf::from("out/반포한강공원_checkpoint.csv")
        );
    }
}
