//! Reshaping the statistics table onto a dense (eta, g) parameter grid.
//!
//! The sweep samples an irregular set of `(g, eta)` pairs; for plotting, each
//! statistic is laid out as a dense matrix indexed by the sorted unique values
//! of the two parameters. Parameter values are compared with a relative
//! tolerance and each row is assigned to its nearest bin, so representation
//! drift in the tabular files cannot split one swept value into two bins.

use nalgebra::DMatrix;

use crate::error::SweepError;
use crate::sweep::{StatisticsRow, STATISTIC_NAMES};

/// Relative tolerance for two parameter values to fall into the same bin.
const BIN_REL_TOL: f64 = 1e-9;

/// Dense per-statistic matrices over the swept parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseGrid {
    /// The sorted unique values of `g` (the column axis).
    gvec: Vec<f64>,
    /// The sorted unique values of `eta` (the row axis).
    etavec: Vec<f64>,
    /// One matrix of shape `(etavec.len(), gvec.len())` per statistic.
    matrices: Vec<(String, DMatrix<f64>)>,
}

impl PhaseGrid {
    /// Reshape the named statistics of a table onto the parameter grid.
    ///
    /// Every matrix is zero-initialized; cells never touched by a row keep the
    /// zero default, indistinguishable from a true zero measurement. Rows whose
    /// requested statistic is absent (e.g. a cache without the correlation
    /// column) leave their cell at zero as well.
    pub fn from_rows(rows: &[StatisticsRow], statistics: &[&str]) -> Result<Self, SweepError> {
        if rows.is_empty() {
            return Err(SweepError::InvalidParameter(
                "Cannot build a parameter grid from an empty table.".to_string(),
            ));
        }
        for name in statistics {
            if !STATISTIC_NAMES.contains(name) {
                return Err(SweepError::InvalidParameter(format!(
                    "Unknown statistic {:?}; expected one of {:?}.",
                    name, STATISTIC_NAMES
                )));
            }
        }

        let gvec = unique_sorted(rows.iter().map(|row| row.g));
        let etavec = unique_sorted(rows.iter().map(|row| row.eta));

        let mut matrices: Vec<(String, DMatrix<f64>)> = statistics
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    DMatrix::zeros(etavec.len(), gvec.len()),
                )
            })
            .collect();

        for row in rows {
            let j = nearest_index(&gvec, row.g);
            let i = nearest_index(&etavec, row.eta);
            for (name, matrix) in matrices.iter_mut() {
                if let Some(value) = row.statistic(name) {
                    matrix[(i, j)] = value;
                }
            }
        }

        Ok(PhaseGrid {
            gvec,
            etavec,
            matrices,
        })
    }

    /// Returns the sorted unique values of `g`.
    pub fn gvec(&self) -> &[f64] {
        &self.gvec
    }

    /// Returns the sorted unique values of `eta`.
    pub fn etavec(&self) -> &[f64] {
        &self.etavec
    }

    /// Returns the matrix of a statistic by name.
    pub fn matrix(&self, name: &str) -> Option<&DMatrix<f64>> {
        self.matrices
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, matrix)| matrix)
    }

    /// Iterate over the statistics and their matrices, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DMatrix<f64>)> {
        self.matrices
            .iter()
            .map(|(name, matrix)| (name.as_str(), matrix))
    }

    /// Returns the number of statistics held by the grid.
    pub fn num_statistics(&self) -> usize {
        self.matrices.len()
    }
}

/// Sort and deduplicate a sequence of parameter values, merging values closer
/// than the binning tolerance.
fn unique_sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(|a, b| {
        a.partial_cmp(b)
            .expect("Comparison failed: parameter values must not be NaN")
    });
    values.dedup_by(|a, b| same_bin(*a, *b));
    values
}

/// Returns true if two parameter values belong to the same bin.
fn same_bin(a: f64, b: f64) -> bool {
    (a - b).abs() <= BIN_REL_TOL * a.abs().max(b.abs()).max(1.0)
}

/// Returns the index of the bin value nearest to `value`.
fn nearest_index(bins: &[f64], value: f64) -> usize {
    bins.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (*a - value)
                .abs()
                .partial_cmp(&(*b - value).abs())
                .expect("Comparison failed: parameter values must not be NaN")
        })
        .map(|(idx, _)| idx)
        .expect("The bin vector is never empty")
}
