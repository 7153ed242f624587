//! Run configuration for the analysis pipeline.
//!
//! All components take an explicit [`Config`] instead of relying on process-wide
//! state; the binary parses its arguments into one and passes it down.

use std::path::{Path, PathBuf};

use crate::error::SweepError;
use crate::stats::StatisticsOptions;
use crate::{DEFAULT_BIN_WIDTH_MS, DEFAULT_NUM_WORKERS, FIGURE_FILE, STATISTICS_FILE, SWEEP_FILE};

/// Configuration of one analysis run over a results directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// The directory containing the sweep description and the per-run recordings.
    results_dir: PathBuf,
    /// The number of concurrent statistics workers.
    num_workers: usize,
    /// Whether to compute the pairwise spike-train correlation statistic.
    with_correlation: bool,
    /// The bin width for the correlation statistic, in milliseconds.
    bin_width_ms: f64,
}

impl Config {
    /// Create a new configuration for the provided results directory.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use brunel_phase::config::Config;
    ///
    /// let config = Config::new("results").unwrap();
    /// assert_eq!(config.num_workers(), 4);
    /// ```
    pub fn new<P: AsRef<Path>>(results_dir: P) -> Result<Self, SweepError> {
        let results_dir = results_dir.as_ref().to_path_buf();
        if !results_dir.is_dir() {
            return Err(SweepError::InvalidParameter(format!(
                "The results directory {} does not exist.",
                results_dir.display()
            )));
        }
        Ok(Config {
            results_dir,
            num_workers: DEFAULT_NUM_WORKERS,
            with_correlation: false,
            bin_width_ms: DEFAULT_BIN_WIDTH_MS,
        })
    }

    /// Set the number of concurrent statistics workers.
    pub fn with_num_workers(mut self, num_workers: usize) -> Result<Self, SweepError> {
        if num_workers == 0 {
            return Err(SweepError::InvalidParameter(
                "The number of workers must be at least one.".to_string(),
            ));
        }
        self.num_workers = num_workers;
        Ok(self)
    }

    /// Enable the pairwise correlation statistic with the provided bin width (in milliseconds).
    pub fn with_correlation(mut self, bin_width_ms: f64) -> Result<Self, SweepError> {
        if bin_width_ms <= 0.0 {
            return Err(SweepError::InvalidParameter(
                "The correlation bin width must be a positive number.".to_string(),
            ));
        }
        self.with_correlation = true;
        self.bin_width_ms = bin_width_ms;
        Ok(self)
    }

    /// Returns the results directory.
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Returns the number of concurrent statistics workers.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Returns the per-recording statistics options.
    pub fn statistics_options(&self) -> StatisticsOptions {
        StatisticsOptions {
            with_correlation: self.with_correlation,
            bin_width_ms: self.bin_width_ms,
        }
    }

    /// Returns the names of the statistics to reshape and plot.
    pub fn plotted_statistics(&self) -> Vec<&'static str> {
        if self.with_correlation {
            vec!["firing_rate", "cv_isi", "cc_mean"]
        } else {
            vec!["firing_rate", "cv_isi"]
        }
    }

    /// Returns the path of the sweep description file.
    pub fn sweep_file(&self) -> PathBuf {
        self.results_dir.join(SWEEP_FILE)
    }

    /// Returns the path of the statistics cache file.
    pub fn statistics_file(&self) -> PathBuf {
        self.results_dir.join(STATISTICS_FILE)
    }

    /// Returns the path of the rendered figure.
    pub fn figure_file(&self) -> PathBuf {
        self.results_dir.join(FIGURE_FILE)
    }

    /// Resolve a recording path from the sweep table against the results directory.
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.results_dir.join(path)
        }
    }
}
