//! This crate provides tools for analyzing parameter sweeps of the Brunel (2000)
//! spiking network model: per-run spike-train statistics, a whitespace-delimited
//! statistics cache, and pseudocolor phase plots over the swept parameters
//! (the coupling strength `g` and the external drive `eta`).
//!
//! # Analyzing a Sweep
//!
//! ```no_run
//! use brunel_phase::aggregate;
//! use brunel_phase::config::Config;
//! use brunel_phase::grid::PhaseGrid;
//! use brunel_phase::plot;
//!
//! // Point the pipeline at a directory produced by a sweep run
//! let config = Config::new("results").unwrap();
//!
//! // Load the cached statistics table, or compute and persist it
//! let table = aggregate::load_or_compute(&config).unwrap();
//!
//! // Reshape onto the (eta, g) grid and render the figure
//! let grid = PhaseGrid::from_rows(table.rows(), &["firing_rate", "cv_isi"]).unwrap();
//! plot::render_phase_plots(&config, &grid).unwrap();
//! ```
//!
//! # Computing Statistics for a Single Recording
//!
//! ```rust
//! use brunel_phase::recording::{Recording, SpikeTrain, TimeUnits};
//! use brunel_phase::stats::{spike_statistics, StatisticsOptions};
//!
//! // Two spike trains observed over one second
//! let recording = Recording::from_spiketrains(vec![
//!     SpikeTrain::new(vec![100.0, 300.0, 500.0], 0.0, 1000.0, TimeUnits::Ms).unwrap(),
//!     SpikeTrain::new(vec![250.0], 0.0, 1000.0, TimeUnits::Ms).unwrap(),
//! ]);
//!
//! let stats = spike_statistics(&recording, &StatisticsOptions::default()).unwrap();
//! assert_eq!(stats.spike_counts, 4);
//! assert_eq!(stats.firing_rate, 2.0);
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod grid;
pub mod model;
pub mod plot;
pub mod recording;
pub mod sim;
pub mod stats;
pub mod sweep;

/// Name of the raw sweep description file inside a results directory.
pub const SWEEP_FILE: &str = "sweeps.csv";
/// Name of the statistics cache file inside a results directory.
pub const STATISTICS_FILE: &str = "statistics.csv";
/// Name of the rendered figure inside a results directory.
pub const FIGURE_FILE: &str = "brunel_network_phase_plots.svg";
/// The default number of concurrent statistics workers.
pub const DEFAULT_NUM_WORKERS: usize = 4;
/// The default bin width for the pairwise correlation statistic, in milliseconds.
pub const DEFAULT_BIN_WIDTH_MS: f64 = 5.0;
