//! Orchestration of the external network compiler and simulator binaries.
//!
//! The toolchain is driven in two steps: the network compiler turns an
//! exported model description into a standalone simulator executable
//! (`Sim_<model>`), which is then invoked with the experiment parameters and
//! writes the spike recordings next to the model file. Both binaries live
//! outside this crate; this module only shapes their inputs and outputs.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::SweepError;
use crate::model::BrunelModel;
use crate::recording::Recording;

/// Experiment-level parameters of one simulator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Base path for the exported model and the simulator outputs.
    pub base_filename: PathBuf,
    /// Simulated duration, in ms.
    pub duration: f64,
    /// Integration timestep, in ms.
    pub timestep: f64,
}

/// Runner invoking the network compiler and the generated simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRunner {
    /// The network compiler executable.
    compiler: PathBuf,
    /// The integration method passed to the compiler.
    method: String,
}

impl SimulationRunner {
    /// Create a runner for the provided network compiler executable.
    pub fn new<P: AsRef<Path>>(compiler: P) -> Self {
        SimulationRunner {
            compiler: compiler.as_ref().to_path_buf(),
            method: "crk3".to_string(),
        }
    }

    /// Set the integration method passed to the compiler.
    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    /// Export the model, compile it, run the generated simulator, and
    /// optionally read the recorded spike trains back.
    ///
    /// The model is written as `<base_filename>.json`; the simulator records
    /// the excitatory population into `<base_filename>.dat`, which is parsed
    /// with the format-sniffing reader when `read_output` is set.
    pub fn run(
        &self,
        model: &BrunelModel,
        experiment: &Experiment,
        read_output: bool,
    ) -> Result<Option<Recording>, SweepError> {
        if experiment.duration <= 0.0 {
            return Err(SweepError::InvalidParameter(
                "The simulated duration must be a positive number.".to_string(),
            ));
        }
        if experiment.timestep <= 0.0 {
            return Err(SweepError::InvalidParameter(
                "The integration timestep must be a positive number.".to_string(),
            ));
        }

        let model_file = experiment.base_filename.with_extension("json");
        model.save_to(&model_file)?;
        log::info!("Exported model to file {}", model_file.display());

        let working_dir = match model_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let model_name = model_file
            .file_name()
            .ok_or_else(|| {
                SweepError::InvalidParameter(format!(
                    "The base filename {} has no file name component.",
                    experiment.base_filename.display()
                ))
            })?
            .to_owned();
        let stem = model_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut compile = Command::new(&self.compiler);
        compile
            .arg("-m")
            .arg(&self.method)
            .arg(&model_name)
            .current_dir(&working_dir);
        invoke(&mut compile)?;

        let mut simulate = Command::new(format!("./Sim_{}", stem));
        simulate
            .arg("-d")
            .arg(experiment.duration.to_string())
            .arg(format!("--timestep={}", experiment.timestep))
            .arg("--spikerecord=Exc")
            .arg("--statesample=1")
            .current_dir(&working_dir);
        invoke(&mut simulate)?;

        if read_output {
            let output = experiment.base_filename.with_extension("dat");
            return Ok(Some(Recording::open(output)?));
        }
        Ok(None)
    }
}

/// Run a command to completion and fail on a spawn error or a non-zero exit
/// status, carrying the captured stderr.
fn invoke(command: &mut Command) -> Result<(), SweepError> {
    log::info!("{:?}", command);
    let output = command.output().map_err(|e| {
        SweepError::CommandFailed(format!("failed to run {:?}: {}", command.get_program(), e))
    })?;
    if !output.status.success() {
        return Err(SweepError::CommandFailed(format!(
            "{:?} exited with {}: {}",
            command.get_program(),
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}
