//! Spike-train summary statistics: firing rate, CV of the inter-spike
//! intervals, and the optional pairwise correlation of binned spike trains.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::SweepError;
use crate::recording::{Recording, SpikeTrain};
use crate::DEFAULT_BIN_WIDTH_MS;

/// Options controlling the per-recording statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsOptions {
    /// Whether to compute the pairwise spike-train correlation.
    pub with_correlation: bool,
    /// The bin width used when binning spike trains for the correlation, in milliseconds.
    pub bin_width_ms: f64,
}

impl Default for StatisticsOptions {
    fn default() -> Self {
        StatisticsOptions {
            with_correlation: false,
            bin_width_ms: DEFAULT_BIN_WIDTH_MS,
        }
    }
}

/// Summary statistics of the spike trains of one recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeStatistics {
    /// The total number of spikes across all trains.
    pub spike_counts: usize,
    /// The mean of the per-train firing rates, in spikes/second.
    pub firing_rate: f64,
    /// The mean CV of the inter-spike intervals over trains with more than one spike.
    pub cv_isi: f64,
    /// The mean pairwise correlation coefficient of the binned spike trains, if enabled.
    pub cc_mean: Option<f64>,
}

/// Returns the inter-spike intervals of a sequence of spike times.
pub fn isi(times: &[f64]) -> Vec<f64> {
    times.iter().tuple_windows().map(|(t1, t2)| t2 - t1).collect()
}

/// Returns the coefficient of variation (standard deviation over mean) of a
/// sequence of intervals, or 0 for an empty sequence or a zero mean.
///
/// # Examples
///
/// ```rust
/// use brunel_phase::stats::cv;
///
/// // Perfectly regular intervals have no dispersion
/// assert_eq!(cv(&[2.0, 2.0, 2.0]), 0.0);
/// ```
pub fn cv(intervals: &[f64]) -> f64 {
    if intervals.is_empty() {
        return 0.0;
    }
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = intervals
        .iter()
        .map(|interval| (interval - mean).powi(2))
        .sum::<f64>()
        / intervals.len() as f64;
    variance.sqrt() / mean
}

/// Compute the summary statistics of the first segment of a recording.
///
/// The firing rate is the unweighted arithmetic mean of the per-train mean
/// rates, in spikes/second. The CV of the inter-spike intervals is averaged
/// over trains with more than one spike and falls back to 0 when no train
/// qualifies.
pub fn spike_statistics(
    recording: &Recording,
    options: &StatisticsOptions,
) -> Result<SpikeStatistics, SweepError> {
    let spiketrains = recording.spiketrains()?;

    let spike_counts = spiketrains.iter().map(|st| st.len()).sum();

    let firing_rate = spiketrains.iter().map(|st| st.mean_rate()).sum::<f64>()
        / spiketrains.len() as f64;

    let cvs: Vec<f64> = spiketrains
        .iter()
        .filter(|st| st.len() > 1)
        .map(|st| cv(&isi(st.times())))
        .collect();
    let cv_isi = if cvs.is_empty() {
        0.0
    } else {
        cvs.iter().sum::<f64>() / cvs.len() as f64
    };

    let cc_mean = if options.with_correlation {
        Some(correlation_mean(spiketrains, options.bin_width_ms)?)
    } else {
        None
    };

    Ok(SpikeStatistics {
        spike_counts,
        firing_rate,
        cv_isi,
        cc_mean,
    })
}

/// Returns the mean of the pairwise Pearson correlation matrix of the binned
/// spike trains, including the unit diagonal. Trains are binned on a common
/// time axis spanning all observation windows; a pair involving a train with
/// zero count variance contributes 0.
pub fn correlation_mean(spiketrains: &[SpikeTrain], bin_width_ms: f64) -> Result<f64, SweepError> {
    if bin_width_ms <= 0.0 {
        return Err(SweepError::InvalidParameter(
            "The correlation bin width must be a positive number.".to_string(),
        ));
    }
    if spiketrains.is_empty() {
        return Err(SweepError::EmptyRecording(
            "Cannot correlate an empty collection of spike trains.".to_string(),
        ));
    }

    let counts = binned_counts(spiketrains, bin_width_ms);
    let num_trains = counts.len();

    let mut sum = 0.0;
    for i in 0..num_trains {
        for j in 0..num_trains {
            sum += if i == j {
                1.0
            } else {
                pearson(&counts[i], &counts[j])
            };
        }
    }

    Ok(sum / (num_trains * num_trains) as f64)
}

/// Bin each spike train into per-bin spike counts over the common time axis
/// `[min t_start, max t_stop)` with the provided bin width (in milliseconds).
fn binned_counts(spiketrains: &[SpikeTrain], bin_width_ms: f64) -> Vec<Vec<f64>> {
    let t_start = spiketrains
        .iter()
        .map(|st| st.t_start_ms())
        .fold(f64::INFINITY, f64::min);
    let t_stop = spiketrains
        .iter()
        .map(|st| st.t_stop_ms())
        .fold(f64::NEG_INFINITY, f64::max);
    let num_bins = ((t_stop - t_start) / bin_width_ms).ceil().max(1.0) as usize;

    spiketrains
        .iter()
        .map(|st| {
            let mut counts = vec![0.0; num_bins];
            for t in st.times_ms() {
                let bin = ((t - t_start) / bin_width_ms) as usize;
                counts[bin.min(num_bins - 1)] += 1.0;
            }
            counts
        })
        .collect()
}

/// Pearson correlation coefficient of two equally long count vectors, or 0
/// when either has zero variance.
fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        cov += (a - mean_x) * (b - mean_y);
        var_x += (a - mean_x).powi(2);
        var_y += (b - mean_y).powi(2);
    }

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    cov / (var_x * var_y).sqrt()
}
