//! Append-only CSV record stream.
//!
//! One row per record. The header is written once, when the file is first
//! created; later runs append below existing rows. `ERROR` rows leave the
//! metric columns empty.

use crate::models::RunRecord;
use crate::sink::{format_seconds, ResultSink, SinkError};
use std::fs::{File, OpenOptions};
use std::path::Path;
use tracing::info;

const HEADER: [&str; 9] = [
    "site",
    "kind",
    "performance",
    "first_contentful_paint",
    "first_meaningful_paint",
    "speed_index",
    "first_cpu_idle",
    "time_to_interactive",
    "total_byte_weight",
];

/// Appends run records to a CSV file.
pub struct CsvSink {
    writer: csv::Writer<File>,
}

impl CsvSink {
    /// Opens `path` for appending, writing the header if the file is new.
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let exists = path.exists();
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if !exists {
            writer.write_record(HEADER)?;
            writer.flush()?;
            info!("Created record stream at {}", path.display());
        }

        Ok(Self { writer })
    }

    fn row(record: &RunRecord) -> Vec<String> {
        let mut row = vec![record.url.clone(), record.kind.marker().to_string()];

        match record.sample {
            Some(ref sample) => {
                row.push(format!("{:.2}", sample.performance_score));
                row.push(format_seconds(sample.first_contentful_paint.millis));
                row.push(format_seconds(sample.first_meaningful_paint.millis));
                row.push(format_seconds(sample.speed_index.millis));
                row.push(format_seconds(sample.first_cpu_idle.millis));
                row.push(format_seconds(sample.time_to_interactive.millis));
                row.push(format!("{}", sample.total_byte_weight as u64));
            }
            None => row.extend(std::iter::repeat(String::new()).take(7)),
        }

        row
    }
}

impl ResultSink for CsvSink {
    fn record(&mut self, record: &RunRecord) -> Result<(), SinkError> {
        self.writer.write_record(Self::row(record))?;
        // Flush per record: rows must survive a crash mid-schedule.
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::sample_with_score;

    #[test]
    fn test_rows_appended_with_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");

        {
            let mut sink = CsvSink::create(&path).unwrap();
            sink.record(&RunRecord::partial("https://a.example", sample_with_score(0.9)))
                .unwrap();
            sink.record(&RunRecord::error("https://b.example")).unwrap();
        }

        // Reopening appends instead of rewriting the header.
        {
            let mut sink = CsvSink::create(&path).unwrap();
            sink.record(&RunRecord::aggregate(
                "https://a.example",
                sample_with_score(0.85),
            ))
            .unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], HEADER.join(","));
        assert!(lines[1].starts_with("https://a.example,PARTIAL,0.90,1.20"));
        assert_eq!(lines[2], "https://b.example,ERROR,,,,,,,");
        assert!(lines[3].starts_with("https://a.example,GMEAN,0.85"));
    }

    #[test]
    fn test_error_row_has_empty_metric_columns() {
        let row = CsvSink::row(&RunRecord::error("https://b.example"));
        assert_eq!(row.len(), HEADER.len());
        assert!(row[2..].iter().all(|cell| cell.is_empty()));
    }

    #[test]
    fn test_sample_row_column_order() {
        let row = CsvSink::row(&RunRecord::partial(
            "https://a.example",
            sample_with_score(0.9),
        ));

        assert_eq!(row[2], "0.90"); // performance
        assert_eq!(row[3], "1.20"); // fcp
        assert_eq!(row[4], "1.50"); // fmp
        assert_eq!(row[5], "2.30"); // speed index
        assert_eq!(row[6], "2.90"); // first cpu idle
        assert_eq!(row[7], "3.10"); // tti
        assert_eq!(row[8], "1400000"); // byte weight
    }
}
