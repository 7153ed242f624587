//! Export a Brunel (2000) network description and run it through the external
//! network compiler and the generated simulator.

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;

use brunel_phase::error::SweepError;
use brunel_phase::model::BrunelModel;
use brunel_phase::sim::{Experiment, SimulationRunner};

#[derive(Parser, Debug)]
struct Args {
    /// Base filename for the exported model and the simulator outputs
    base_filename: PathBuf,
    /// The network order: 4*order excitatory and order inhibitory cells
    #[arg(long, default_value = "2500")]
    order: usize,
    /// The relative strength of the inhibitory coupling
    #[arg(short, long, default_value = "5.0")]
    g: f64,
    /// The external drive, relative to the threshold rate
    #[arg(long, default_value = "2.0")]
    eta: f64,
    /// The simulated duration, in ms
    #[arg(short, long, default_value = "1000.0")]
    duration: f64,
    /// The integration timestep, in ms
    #[arg(long, default_value = "0.1")]
    timestep: f64,
    /// The network compiler executable
    #[arg(long, default_value = "9ML-network")]
    compiler: PathBuf,
    /// Read the recorded spike trains back after the run
    #[arg(long)]
    read_output: bool,
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

    let model = BrunelModel::new("brunel_network", args.order, args.g, args.eta)?;
    let experiment = Experiment {
        base_filename: args.base_filename,
        duration: args.duration,
        timestep: args.timestep,
    };

    let runner = SimulationRunner::new(&args.compiler);
    if let Some(recording) = runner.run(&model, &experiment, args.read_output)? {
        let spiketrains = recording.spiketrains()?;
        let spikes: usize = spiketrains.iter().map(|st| st.len()).sum();
        log::info!(
            "Read back {} spike trains with {} spikes in total",
            spiketrains.len(),
            spikes
        );
    }

    Ok(())
}
