//! Sweep table loading and the whitespace-delimited statistics cache.
//!
//! Two tabular files live in a results directory: `sweeps.csv`, written by the
//! sweep generator (three columns `g eta output_file`, no header, `#` comments
//! allowed, columns separated by runs of whitespace), and `statistics.csv`,
//! written by this crate (same columns joined with the computed statistics,
//! single-space delimited, with a header row).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SweepError;
use crate::stats::SpikeStatistics;

/// One run of the parameter sweep: the swept parameters and the recording location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    /// The relative strength of the inhibitory coupling.
    pub g: f64,
    /// The external drive, relative to the threshold rate.
    pub eta: f64,
    /// The spike-train recording written by the run.
    pub output_file: PathBuf,
}

/// A sweep row joined with its computed statistics; one line of the cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRow {
    pub g: f64,
    pub eta: f64,
    pub output_file: PathBuf,
    pub spike_counts: usize,
    pub firing_rate: f64,
    pub cv_isi: f64,
    #[serde(default)]
    pub cc_mean: Option<f64>,
}

/// The statistic names that can be reshaped onto the parameter grid.
pub const STATISTIC_NAMES: [&str; 4] = ["spike_counts", "firing_rate", "cv_isi", "cc_mean"];

impl StatisticsRow {
    /// Join a sweep row with its statistics record.
    pub fn new(row: SweepRow, statistics: SpikeStatistics) -> Self {
        StatisticsRow {
            g: row.g,
            eta: row.eta,
            output_file: row.output_file,
            spike_counts: statistics.spike_counts,
            firing_rate: statistics.firing_rate,
            cv_isi: statistics.cv_isi,
            cc_mean: statistics.cc_mean,
        }
    }

    /// Returns the value of a statistic by name, or `None` if it was not computed.
    pub fn statistic(&self, name: &str) -> Option<f64> {
        match name {
            "spike_counts" => Some(self.spike_counts as f64),
            "firing_rate" => Some(self.firing_rate),
            "cv_isi" => Some(self.cv_isi),
            "cc_mean" => self.cc_mean,
            _ => None,
        }
    }
}

/// Parse the raw sweep description file.
///
/// Columns are separated by runs of whitespace, `#`-prefixed lines and blank
/// lines are ignored, and there is no header row. Any malformed line is a
/// fatal error naming the line number.
pub fn load_sweep_file<P: AsRef<Path>>(path: P) -> Result<Vec<SweepRow>, SweepError> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| SweepError::IOError(format!("{}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);

    let mut rows = Vec::new();
    for (num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SweepError::IOError(e.to_string()))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(SweepError::ParseError(format!(
                "{}, line {}: expected `g eta output_file`, got {:?}",
                path.display(),
                num + 1,
                line
            )));
        }

        let g = fields[0].parse::<f64>().map_err(|e| {
            SweepError::ParseError(format!("{}, line {}: invalid g: {}", path.display(), num + 1, e))
        })?;
        let eta = fields[1].parse::<f64>().map_err(|e| {
            SweepError::ParseError(format!(
                "{}, line {}: invalid eta: {}",
                path.display(),
                num + 1,
                e
            ))
        })?;

        rows.push(SweepRow {
            g,
            eta,
            output_file: PathBuf::from(fields[2]),
        });
    }

    Ok(rows)
}

/// Read a previously written statistics cache file. The content is trusted
/// verbatim and never recomputed.
pub fn read_statistics_file<P: AsRef<Path>>(path: P) -> Result<Vec<StatisticsRow>, SweepError> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(true)
        .from_path(path)
        .map_err(|e| SweepError::IOError(format!("{}: {}", path.display(), e)))?;

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: StatisticsRow = record
            .map_err(|e| SweepError::ParseError(format!("{}: {}", path.display(), e)))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write the statistics table, overwriting any prior content. The `cc_mean`
/// column is only emitted when at least one row carries the statistic.
pub fn write_statistics_file<P: AsRef<Path>>(
    path: P,
    rows: &[StatisticsRow],
) -> Result<(), SweepError> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b' ')
        .from_path(path)
        .map_err(|e| SweepError::IOError(format!("{}: {}", path.display(), e)))?;

    let with_cc = rows.iter().any(|row| row.cc_mean.is_some());

    let mut header = vec!["g", "eta", "output_file", "spike_counts", "firing_rate", "cv_isi"];
    if with_cc {
        header.push("cc_mean");
    }
    writer
        .write_record(&header)
        .map_err(|e| SweepError::IOError(e.to_string()))?;

    for row in rows {
        let mut fields = vec![
            row.g.to_string(),
            row.eta.to_string(),
            row.output_file.display().to_string(),
            row.spike_counts.to_string(),
            row.firing_rate.to_string(),
            row.cv_isi.to_string(),
        ];
        if with_cc {
            fields.push(row.cc_mean.map(|v| v.to_string()).unwrap_or_default());
        }
        writer
            .write_record(&fields)
            .map_err(|e| SweepError::IOError(e.to_string()))?;
    }

    writer.flush().map_err(|e| SweepError::IOError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_sweep_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweeps.csv");

        let mut file = File::create(&path).unwrap();
        writeln!(file, "# g eta output_file").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "3.0  1.0   run_0.json").unwrap();
        writeln!(file, "4.5 2.0 run_1.json").unwrap();
        drop(file);

        let rows = load_sweep_file(&path).unwrap();
        assert_eq!(
            rows,
            vec![
                SweepRow {
                    g: 3.0,
                    eta: 1.0,
                    output_file: PathBuf::from("run_0.json"),
                },
                SweepRow {
                    g: 4.5,
                    eta: 2.0,
                    output_file: PathBuf::from("run_1.json"),
                },
            ]
        );
    }

    #[test]
    fn test_load_sweep_file_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweeps.csv");

        let mut file = File::create(&path).unwrap();
        writeln!(file, "3.0 1.0").unwrap();
        drop(file);
        assert!(matches!(
            load_sweep_file(&path),
            Err(SweepError::ParseError(_))
        ));

        let mut file = File::create(&path).unwrap();
        writeln!(file, "3.0 spam run_0.json").unwrap();
        drop(file);
        assert!(matches!(
            load_sweep_file(&path),
            Err(SweepError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_sweep_file_missing() {
        assert!(matches!(
            load_sweep_file("no/such/sweeps.csv"),
            Err(SweepError::IOError(_))
        ));
    }

    #[test]
    fn test_statistics_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statistics.csv");

        let rows = vec![
            StatisticsRow {
                g: 3.0,
                eta: 1.0,
                output_file: PathBuf::from("run_0.json"),
                spike_counts: 30,
                firing_rate: 15.0,
                cv_isi: 0.25,
                cc_mean: None,
            },
            StatisticsRow {
                g: 4.5,
                eta: 2.0,
                output_file: PathBuf::from("run_1.json"),
                spike_counts: 12,
                firing_rate: 6.5,
                cv_isi: 0.0,
                cc_mean: None,
            },
        ];

        write_statistics_file(&path, &rows).unwrap();
        let reread = read_statistics_file(&path).unwrap();
        assert_eq!(reread, rows);
    }

    #[test]
    fn test_statistics_file_round_trip_with_correlation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statistics.csv");

        let rows = vec![StatisticsRow {
            g: 3.0,
            eta: 1.0,
            output_file: PathBuf::from("run_0.json"),
            spike_counts: 30,
            firing_rate: 15.0,
            cv_isi: 0.25,
            cc_mean: Some(0.125),
        }];

        write_statistics_file(&path, &rows).unwrap();
        let reread = read_statistics_file(&path).unwrap();
        assert_eq!(reread, rows);
    }

    #[test]
    fn test_write_statistics_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statistics.csv");

        let row = StatisticsRow {
            g: 3.0,
            eta: 1.0,
            output_file: PathBuf::from("run_0.json"),
            spike_counts: 30,
            firing_rate: 15.0,
            cv_isi: 0.25,
            cc_mean: None,
        };

        write_statistics_file(&path, &[row.clone(), row.clone()]).unwrap();
        write_statistics_file(&path, &[row]).unwrap();
        assert_eq!(read_statistics_file(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_statistic_by_name() {
        let row = StatisticsRow {
            g: 3.0,
            eta: 1.0,
            output_file: PathBuf::from("run_0.json"),
            spike_counts: 30,
            firing_rate: 15.0,
            cv_isi: 0.25,
            cc_mean: None,
        };
        assert_eq!(row.statistic("spike_counts"), Some(30.0));
        assert_eq!(row.statistic("firing_rate"), Some(15.0));
        assert_eq!(row.statistic("cv_isi"), Some(0.25));
        assert_eq!(row.statistic("cc_mean"), None);
        assert_eq!(row.statistic("spam"), None);
    }
}
