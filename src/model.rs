//! Description of the Brunel (2000) sparsely connected network model.
//!
//! The model is a pair of integrate-and-fire populations, one excitatory and
//! one inhibitory, randomly connected with probability `epsilon` and driven by
//! an external Poisson input. The two swept parameters enter here: `g` scales
//! the inhibitory synaptic weight and `eta` scales the external drive relative
//! to the rate needed to reach threshold.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SweepError;

/// Membrane time constant, in ms.
const TAU_M: f64 = 20.0;
/// Firing threshold, in mV.
const THETA: f64 = 20.0;
/// Reset potential, in mV.
const V_RESET: f64 = 10.0;
/// Absolute refractory period, in ms.
const T_REF: f64 = 2.0;
/// Excitatory synaptic efficacy, in mV.
const J: f64 = 0.1;
/// Synaptic transmission delay, in ms.
const DELAY: f64 = 1.5;
/// Connection probability.
const EPSILON: f64 = 0.1;

/// Membrane parameters shared by all cells of a population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellParameters {
    /// Membrane time constant, in ms.
    pub tau_m: f64,
    /// Firing threshold, in mV.
    pub theta: f64,
    /// Reset potential, in mV.
    pub v_reset: f64,
    /// Absolute refractory period, in ms.
    pub t_ref: f64,
}

impl Default for CellParameters {
    fn default() -> Self {
        CellParameters {
            tau_m: TAU_M,
            theta: THETA,
            v_reset: V_RESET,
            t_ref: T_REF,
        }
    }
}

/// A homogeneous population of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    pub name: String,
    pub size: usize,
    pub cell: CellParameters,
}

/// A random projection between two populations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub source: String,
    pub target: String,
    /// Synaptic weight, in mV.
    pub weight: f64,
    /// Transmission delay, in ms.
    pub delay: f64,
    /// Connection probability.
    pub connection_probability: f64,
}

/// An external Poisson drive into one population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalInput {
    pub target: String,
    /// Total input rate per cell, in spikes/second.
    pub rate: f64,
    /// Synaptic weight, in mV.
    pub weight: f64,
}

/// The full network description exported for the simulation toolchain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrunelModel {
    pub name: String,
    pub populations: Vec<Population>,
    pub projections: Vec<Projection>,
    pub inputs: Vec<ExternalInput>,
}

impl BrunelModel {
    /// Build the network description for the given scale and sweep parameters.
    ///
    /// The excitatory population holds `4 * order` cells and the inhibitory
    /// population `order` cells. The external drive per cell is
    /// `eta * theta / (j * c_e * tau_m)` spikes/ms delivered over `c_e`
    /// independent inputs, where `c_e = epsilon * 4 * order` is the expected
    /// number of recurrent excitatory inputs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use brunel_phase::model::BrunelModel;
    ///
    /// let model = BrunelModel::new("brunel_network", 2500, 5.0, 2.0).unwrap();
    /// assert_eq!(model.populations[0].size, 10000);
    /// assert_eq!(model.populations[1].size, 2500);
    /// ```
    pub fn new(name: &str, order: usize, g: f64, eta: f64) -> Result<Self, SweepError> {
        if order == 0 {
            return Err(SweepError::InvalidParameter(
                "The network order must be at least one.".to_string(),
            ));
        }
        if g < 0.0 {
            return Err(SweepError::InvalidParameter(
                "The relative inhibitory strength g must be non-negative.".to_string(),
            ));
        }
        if eta < 0.0 {
            return Err(SweepError::InvalidParameter(
                "The relative external drive eta must be non-negative.".to_string(),
            ));
        }

        let num_exc = 4 * order;
        let num_inh = order;
        let c_e = (EPSILON * num_exc as f64).round().max(1.0);

        // threshold rate in spikes/ms, rescaled to spikes/s for the export
        let nu_thresh = THETA / (J * c_e * TAU_M);
        let external_rate = eta * nu_thresh * c_e * 1e3;

        let cell = CellParameters::default();
        let populations = vec![
            Population {
                name: "Exc".to_string(),
                size: num_exc,
                cell,
            },
            Population {
                name: "Inh".to_string(),
                size: num_inh,
                cell,
            },
        ];

        let mut projections = Vec::new();
        for source in ["Exc", "Inh"] {
            let weight = if source == "Exc" { J } else { -g * J };
            for target in ["Exc", "Inh"] {
                projections.push(Projection {
                    source: source.to_string(),
                    target: target.to_string(),
                    weight,
                    delay: DELAY,
                    connection_probability: EPSILON,
                });
            }
        }

        let inputs = ["Exc", "Inh"]
            .into_iter()
            .map(|target| ExternalInput {
                target: target.to_string(),
                rate: external_rate,
                weight: J,
            })
            .collect();

        Ok(BrunelModel {
            name: name.to_string(),
            populations,
            projections,
            inputs,
        })
    }

    /// Save the model description as pretty-printed JSON.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SweepError> {
        let file = File::create(path).map_err(|e| SweepError::IOError(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| SweepError::IOError(e.to_string()))
    }

    /// Load a model description from a JSON file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, SweepError> {
        let file = File::open(path).map_err(|e| SweepError::IOError(e.to_string()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| SweepError::IOError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_model_structure() {
        let model = BrunelModel::new("brunel_network", 2500, 5.0, 2.0).unwrap();

        assert_eq!(model.populations.len(), 2);
        assert_eq!(model.populations[0].size, 4 * model.populations[1].size);

        // four recurrent projections, inhibitory ones scaled by -g
        assert_eq!(model.projections.len(), 4);
        for projection in &model.projections {
            let expected = if projection.source == "Exc" { 0.1 } else { -0.5 };
            assert_relative_eq!(projection.weight, expected, epsilon = 1e-12);
            assert_eq!(projection.connection_probability, 0.1);
        }

        // eta = 2 doubles the threshold drive: nu_thresh = 20/(0.1*1000*20) = 0.01/ms,
        // total rate = 2 * 0.01 * 1000 * 1000 = 20000/s per cell
        for input in &model.inputs {
            assert_relative_eq!(input.rate, 20_000.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_model_validation() {
        assert!(BrunelModel::new("m", 0, 5.0, 2.0).is_err());
        assert!(BrunelModel::new("m", 100, -1.0, 2.0).is_err());
        assert!(BrunelModel::new("m", 100, 5.0, -0.5).is_err());
    }

    #[test]
    fn test_model_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brunel_network.json");

        let model = BrunelModel::new("brunel_network", 100, 4.5, 1.0).unwrap();
        model.save_to(&path).unwrap();
        let reread = BrunelModel::load_from(&path).unwrap();
        assert_eq!(reread, model);
    }
}
