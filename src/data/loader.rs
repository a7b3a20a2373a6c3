// ============================================================
// Layer 4 — Sample Sources
// ============================================================
// Two providers behind the SampleSource trait:
//
//   CsvSource      — reads a CSV with `text` and `label` columns
//   BuiltinSource  — a fixed table of 10 Vietnamese examples so
//                    the pipeline runs without external data
//
// SourceConfig picks one from the `--data` argument. A missing
// path is not an error: it selects the builtin table.
//
// Label strings are mapped to `Label` while loading. An unknown
// label aborts the load with the offending row and value.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::{label::Label, sample::Sample, traits::SampleSource};

/// Fixed fallback rows, in order.
const BUILTIN_ROWS: [(&str, Label); 10] = [
    ("Vietcombank - Ngân hàng TMCP Ngoại thương Việt Nam", Label::Safe),
    ("Đăng nhập Vietcombank - Xác minh tài khoản ngay",    Label::Phishing),
    ("Shopee Việt Nam - Mua sắm trực tuyến",                Label::Safe),
    ("Chúc mừng bạn đã trúng iPhone 15 Pro Max",            Label::Scam),
    ("Đầu tư Forex lãi suất 100%/tháng",                    Label::Scam),
    ("Tài khoản của bạn sẽ bị khóa trong 24h",              Label::Phishing),
    ("Nhập OTP để xác minh danh tính",                      Label::Phishing),
    ("Google - Tìm kiếm thông tin",                         Label::Safe),
    ("Facebook - Kết nối bạn bè",                           Label::Safe),
    ("Nhận ngay 10 triệu đồng miễn phí",                    Label::Scam),
];

// ─── Source Selection ─────────────────────────────────────────────────────────
/// Which provider to load samples from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    Csv(PathBuf),
    Builtin,
}

impl SourceConfig {
    /// CSV when a path is given and exists on disk, builtin otherwise.
    pub fn from_data_arg(path: Option<&Path>) -> Self {
        match path {
            Some(p) if p.exists() => SourceConfig::Csv(p.to_path_buf()),
            Some(p) => {
                tracing::warn!(
                    "Data file '{}' does not exist; using the builtin sample table",
                    p.display()
                );
                SourceConfig::Builtin
            }
            None => SourceConfig::Builtin,
        }
    }

    pub fn into_source(self) -> Box<dyn SampleSource> {
        match self {
            SourceConfig::Csv(path) => Box::new(CsvSource::new(path)),
            SourceConfig::Builtin   => Box::new(BuiltinSource),
        }
    }
}

// ─── CsvSource ────────────────────────────────────────────────────────────────
/// Reads `text,label` rows. Extra columns are ignored.
pub struct CsvSource {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    text:  String,
    label: String,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SampleSource for CsvSource {
    fn describe(&self) -> String {
        format!("csv file '{}'", self.path.display())
    }

    fn load(&self) -> Result<Vec<Sample>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open '{}'", self.path.display()))?;

        let mut samples = Vec::new();

        for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
            // Header is line 1, so data row `index` sits on line index + 2
            let line = index + 2;
            let row  = row.with_context(|| {
                format!(
                    "Malformed row at line {} of '{}' (columns `text` and `label` are required)",
                    line,
                    self.path.display()
                )
            })?;

            let label = row.label.parse::<Label>().with_context(|| {
                format!("Cannot map label at line {} of '{}'", line, self.path.display())
            })?;

            samples.push(Sample::new(row.text, label));
        }

        tracing::debug!("Read {} rows from '{}'", samples.len(), self.path.display());
        Ok(samples)
    }
}

// ─── BuiltinSource ────────────────────────────────────────────────────────────
/// The deterministic fallback table.
pub struct BuiltinSource;

impl SampleSource for BuiltinSource {
    fn describe(&self) -> String {
        "builtin sample table".to_string()
    }

    fn load(&self) -> Result<Vec<Sample>> {
        Ok(BUILTIN_ROWS
            .iter()
            .map(|&(text, label)| Sample::new(text, label))
            .collect())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("data.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_no_path_and_missing_path_give_same_table() {
        let a = SourceConfig::from_data_arg(None).into_source().load().unwrap();
        let b = SourceConfig::from_data_arg(Some(Path::new("/definitely/not/here.csv")))
            .into_source()
            .load()
            .unwrap();
        assert_eq!(a.len(), 10);
        assert_eq!(a, b);
    }

    #[test]
    fn test_builtin_label_counts() {
        let rows = BuiltinSource.load().unwrap();
        let count = |l: Label| rows.iter().filter(|s| s.label == l).count();
        assert_eq!(count(Label::Safe), 4);
        assert_eq!(count(Label::Phishing), 3);
        assert_eq!(count(Label::Scam), 3);
    }

    #[test]
    fn test_existing_path_selects_csv() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "text,label\nhello,SAFE\n");
        assert_eq!(
            SourceConfig::from_data_arg(Some(&path)),
            SourceConfig::Csv(path.clone())
        );
    }

    #[test]
    fn test_csv_reads_rows_and_ignores_extra_columns() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "id,text,label\n1,\"Win a prize, now\",SCAM\n2,Bank login,PHISHING\n3,Free pills,SPAM\n",
        );
        let rows = CsvSource::new(&path).load().unwrap();
        assert_eq!(
            rows,
            vec![
                Sample::new("Win a prize, now", Label::Scam),
                Sample::new("Bank login", Label::Phishing),
                Sample::new("Free pills", Label::Spam),
            ]
        );
    }

    #[test]
    fn test_unknown_label_is_fatal() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "text,label\nok,SAFE\nhmm,CAUTION\n");
        let err  = CsvSource::new(&path).load().unwrap_err();
        let msg  = format!("{err:#}");
        assert!(msg.contains("line 3"), "{msg}");
        assert!(msg.contains("CAUTION"), "{msg}");
    }

    #[test]
    fn test_missing_label_column_is_fatal() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "text\nonly text\n");
        assert!(CsvSource::new(&path).load().is_err());
    }
}
