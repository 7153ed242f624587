//! Plot colour maps of spike train statistics as a function of the parameters
//! `g` and `eta` for the Brunel (2000) model.

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;

use brunel_phase::aggregate;
use brunel_phase::config::Config;
use brunel_phase::error::SweepError;
use brunel_phase::grid::PhaseGrid;
use brunel_phase::plot;

#[derive(Parser, Debug)]
struct Args {
    /// Directory containing data generated by running the sweep
    directory: PathBuf,
    /// The number of concurrent statistics workers
    #[arg(long, default_value = "4")]
    jobs: usize,
    /// Also compute and plot the pairwise spike-train correlation
    #[arg(long)]
    with_correlation: bool,
    /// The bin width for the correlation statistic, in milliseconds
    #[arg(long, default_value = "5.0")]
    bin_width: f64,
}

fn main() -> Result<(), SweepError> {
    let args = Args::parse();

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{l} - {m}\n")))
        .build();
    let log_config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
        .map_err(|e| SweepError::IOError(e.to_string()))?;
    log4rs::init_config(log_config).map_err(|e| SweepError::IOError(e.to_string()))?;

    log::info!("{:?}", args);

    let mut config = Config::new(&args.directory)?.with_num_workers(args.jobs)?;
    if args.with_correlation {
        config = config.with_correlation(args.bin_width)?;
    }

    let table = aggregate::load_or_compute(&config)?;

    let statistics = config.plotted_statistics();
    let grid = PhaseGrid::from_rows(table.rows(), &statistics)?;
    let figure = plot::render_phase_plots(&config, &grid)?;
    log::info!("Figure saved to {}", figure.display());

    Ok(())
}
