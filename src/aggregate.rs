//! Parallel statistics aggregation over the sweep table.
//!
//! The cache-miss path fans statistics extraction out across a fixed-size
//! worker pool and joins the results back in the original row order before
//! persisting the merged table.

use rayon::prelude::*;

use crate::config::Config;
use crate::error::SweepError;
use crate::recording::Recording;
use crate::stats::{spike_statistics, SpikeStatistics};
use crate::sweep::{self, StatisticsRow, SweepRow};

/// The working table, tagged by whether it was loaded from the cache or computed.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    /// The statistics cache file existed and was trusted verbatim.
    Cached(Vec<StatisticsRow>),
    /// The statistics were computed from the raw sweep description and persisted.
    Computed(Vec<StatisticsRow>),
}

impl TableSource {
    /// Returns the rows of the working table.
    pub fn rows(&self) -> &[StatisticsRow] {
        match self {
            TableSource::Cached(rows) | TableSource::Computed(rows) => rows,
        }
    }

    /// Consume the source and return the rows of the working table.
    pub fn into_rows(self) -> Vec<StatisticsRow> {
        match self {
            TableSource::Cached(rows) | TableSource::Computed(rows) => rows,
        }
    }

    /// Returns true if the table was loaded from the cache file.
    pub fn is_cached(&self) -> bool {
        matches!(self, TableSource::Cached(_))
    }
}

/// Load the statistics table from the cache file if it exists; otherwise parse
/// the sweep description, compute the statistics of every referenced recording
/// on a pool of [`Config::num_workers`] workers, persist the merged table to
/// the cache file, and return it.
///
/// Any worker failure aborts the whole aggregation; nothing is persisted in
/// that case.
pub fn load_or_compute(config: &Config) -> Result<TableSource, SweepError> {
    let cache = config.statistics_file();
    if cache.exists() {
        log::info!(
            "Reading previously calculated spike train statistics from {}",
            cache.display()
        );
        return Ok(TableSource::Cached(sweep::read_statistics_file(&cache)?));
    }

    let rows = sweep::load_sweep_file(config.sweep_file())?;
    let options = config.statistics_options();

    let merged = aggregate_with(&rows, config.num_workers(), |idx, row| {
        log::info!("{}", idx);
        let recording = Recording::open(config.resolve(&row.output_file))?;
        spike_statistics(&recording, &options)
    })?;

    sweep::write_statistics_file(&cache, &merged)?;
    log::info!("Statistics saved to {}", cache.display());

    Ok(TableSource::Computed(merged))
}

/// Fan statistics extraction out across `num_workers` concurrent workers and
/// join the results back by original row index, so the merged table preserves
/// the input row order regardless of completion order.
pub fn aggregate_with<F>(
    rows: &[SweepRow],
    num_workers: usize,
    extractor: F,
) -> Result<Vec<StatisticsRow>, SweepError>
where
    F: Fn(usize, &SweepRow) -> Result<SpikeStatistics, SweepError> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers)
        .build()
        .map_err(|e| {
            SweepError::InvalidParameter(format!("Failed to build the worker pool: {}", e))
        })?;

    let results: Vec<SpikeStatistics> = pool.install(|| {
        rows.par_iter()
            .enumerate()
            .map(|(idx, row)| extractor(idx, row))
            .collect::<Result<Vec<_>, SweepError>>()
    })?;

    Ok(rows
        .iter()
        .cloned()
        .zip(results)
        .map(|(row, statistics)| StatisticsRow::new(row, statistics))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    const SEED: u64 = 42;

    fn rows(n: usize) -> Vec<SweepRow> {
        (0..n)
            .map(|k| SweepRow {
                g: k as f64,
                eta: 2.0 * k as f64,
                output_file: PathBuf::from(format!("run_{}.json", k)),
            })
            .collect()
    }

    #[test]
    fn test_aggregate_preserves_row_order() {
        let rows = rows(16);
        let mut rng = StdRng::seed_from_u64(SEED);
        let delays: Vec<u64> = (0..rows.len()).map(|_| rng.gen_range(0..30)).collect();

        let merged = aggregate_with(&rows, 4, |idx, row| {
            // Finish in an order unrelated to submission order
            std::thread::sleep(Duration::from_millis(delays[idx]));
            Ok(SpikeStatistics {
                spike_counts: idx,
                firing_rate: row.g,
                cv_isi: 0.0,
                cc_mean: None,
            })
        })
        .unwrap();

        assert_eq!(merged.len(), rows.len());
        for (idx, (merged_row, row)) in merged.iter().zip(rows.iter()).enumerate() {
            assert_eq!(merged_row.spike_counts, idx);
            assert_eq!(merged_row.g, row.g);
            assert_eq!(merged_row.eta, row.eta);
            assert_eq!(merged_row.output_file, row.output_file);
        }
    }

    #[test]
    fn test_aggregate_aborts_on_worker_failure() {
        let rows = rows(8);
        let result = aggregate_with(&rows, 4, |idx, _| {
            if idx == 5 {
                Err(SweepError::EmptyRecording("run_5.json".to_string()))
            } else {
                Ok(SpikeStatistics {
                    spike_counts: 0,
                    firing_rate: 0.0,
                    cv_isi: 0.0,
                    cc_mean: None,
                })
            }
        });
        assert!(matches!(result, Err(SweepError::EmptyRecording(_))));
    }

    #[test]
    fn test_aggregate_with_single_worker() {
        let merged = aggregate_with(&rows(2), 1, |_, _| {
            Ok(SpikeStatistics {
                spike_counts: 1,
                firing_rate: 1.0,
                cv_isi: 0.0,
                cc_mean: None,
            })
        })
        .unwrap();
        assert_eq!(merged.len(), 2);
    }
}
