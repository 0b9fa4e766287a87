//! # Feature Matrix Assembly
//!
//! Turns the extraction records of a training series into the dense `X`/`Y`
//! pair consumed by the PLS-DA engine.
//!
//! Only compounds in a modelled chemical state (neutral or positive) become
//! rows. Descriptor vectors differ in length between compounds, so every row
//! is zero-padded to the longest admitted vector. For probe-grid descriptors
//! the vector is made of one block per probe whose length depends on the
//! molecule; those blocks are scattered to fixed offsets so that block `k`
//! spans the same columns in every row.
//!
//! Assembly runs in two passes: the first sizes the matrix and checks every
//! row against the block layout, the second allocates once and scatters.

use crate::records::{ExtractionRecord, Payload};
use crate::settings::DescriptorSettings;
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, s};
use thiserror::Error;

/// Validated matrices ready for model fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingMatrices {
    /// Shape: `[admitted_rows, max_columns]`.
    pub x: Array2<f64>,
    /// One label per row of `x`.
    pub y: Array1<f64>,
}

impl TrainingMatrices {
    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.x.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum AssemblyError {
    #[error("Probe-grid descriptors require at least one probe to be configured.")]
    NoProbes,
    #[error(
        "Descriptor vector of compound '{block_id}' (record {record}) has {length} values, which cannot be split into {probes} equal probe blocks."
    )]
    RaggedProbeBlocks {
        record: usize,
        block_id: String,
        length: usize,
        probes: usize,
    },
    #[error(
        "Non-finite descriptor value at position {position} of compound '{block_id}' (record {record})."
    )]
    NonFiniteDescriptor {
        record: usize,
        block_id: String,
        position: usize,
    },
    #[error("Non-finite label for compound '{block_id}' (record {record}).")]
    NonFiniteLabel { record: usize, block_id: String },
}

/// Where the values of one source row land in the padded destination row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowLayout {
    /// Copy to the start of the row, pad the tail.
    LeftAligned,
    /// Split into `probes` equal blocks; block `k` starts at `k * block_width`.
    ProbeBlocks { probes: usize, block_width: usize },
}

impl RowLayout {
    /// Copies `source` into `row`, which must already be zero-filled.
    fn scatter(self, source: &[f64], mut row: ArrayViewMut1<f64>) {
        if source.is_empty() {
            return;
        }
        match self {
            RowLayout::LeftAligned => {
                row.slice_mut(s![..source.len()])
                    .assign(&ArrayView1::from(source));
            }
            RowLayout::ProbeBlocks {
                probes,
                block_width,
            } => {
                let native = source.len() / probes;
                for (k, block) in source.chunks_exact(native).enumerate() {
                    let start = k * block_width;
                    row.slice_mut(s![start..start + block.len()])
                        .assign(&ArrayView1::from(block));
                }
            }
        }
    }
}

/// Builds `X` and `Y` from the records of a training series.
///
/// Records outside the modelled chemical states are skipped. An empty
/// admitted set yields a `0×0` matrix; rejecting it is left to the engine.
pub fn assemble_matrices(
    records: &[ExtractionRecord],
    descriptors: &DescriptorSettings,
) -> Result<TrainingMatrices, AssemblyError> {
    // First pass: admit rows, size the matrix, validate the block layout.
    let admitted: Vec<(usize, &Payload)> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.is_modelled())
        .map(|(index, record)| (index, &record.payload))
        .collect();

    for &(index, payload) in &admitted {
        check_finite(index, payload)?;
    }

    let max_columns = admitted
        .iter()
        .map(|(_, payload)| payload.descriptors.len())
        .max()
        .unwrap_or(0);

    let layout = if descriptors.family.is_probe_grid() {
        let probes = descriptors.probe_count();
        if probes == 0 {
            return Err(AssemblyError::NoProbes);
        }
        for &(index, payload) in &admitted {
            let length = payload.descriptors.len();
            if length % probes != 0 {
                return Err(AssemblyError::RaggedProbeBlocks {
                    record: index,
                    block_id: payload.block_id.clone(),
                    length,
                    probes,
                });
            }
        }
        RowLayout::ProbeBlocks {
            probes,
            block_width: max_columns / probes,
        }
    } else {
        RowLayout::LeftAligned
    };

    log::debug!(
        "Admitted {} of {} records into a {}x{} feature matrix ({:?})",
        admitted.len(),
        records.len(),
        admitted.len(),
        max_columns,
        layout
    );

    // Second pass: allocate once and scatter every row into place.
    let mut x = Array2::<f64>::zeros((admitted.len(), max_columns));
    let mut y = Array1::<f64>::zeros(admitted.len());
    for (row_index, (_, payload)) in admitted.iter().enumerate() {
        layout.scatter(&payload.descriptors, x.row_mut(row_index));
        y[row_index] = payload.label;
    }

    Ok(TrainingMatrices { x, y })
}

fn check_finite(record: usize, payload: &Payload) -> Result<(), AssemblyError> {
    if let Some(position) = payload.descriptors.iter().position(|v| !v.is_finite()) {
        return Err(AssemblyError::NonFiniteDescriptor {
            record,
            block_id: payload.block_id.clone(),
            position,
        });
    }
    if !payload.label.is_finite() {
        return Err(AssemblyError::NonFiniteLabel {
            record,
            block_id: payload.block_id.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DescriptorFamily, Probe};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn padel() -> DescriptorSettings {
        DescriptorSettings {
            family: DescriptorFamily::Padel,
            ..DescriptorSettings::default()
        }
    }

    fn pentacle(probes: Vec<Probe>) -> DescriptorSettings {
        DescriptorSettings {
            family: DescriptorFamily::Pentacle,
            pentacle_probes: probes,
            ..DescriptorSettings::default()
        }
    }

    fn record(descriptors: Vec<f64>, state: i32, label: f64) -> ExtractionRecord {
        ExtractionRecord::new(true, "cmpd", descriptors, state, label)
    }

    #[test]
    fn test_left_aligned_rows_are_zero_padded() {
        let records = vec![
            record(vec![1.0, 2.0], 1, 0.2),
            record(vec![1.0], 1, 0.9),
            record(vec![5.0], -1, 0.1),
        ];
        let matrices = assemble_matrices(&records, &padel()).unwrap();
        assert_eq!(matrices.x, array![[1.0, 2.0], [1.0, 0.0]]);
        assert_eq!(matrices.y, array![0.2, 0.9]);
    }

    #[test]
    fn test_single_probe_grid_matches_left_aligned_copy() {
        let records = vec![
            record(vec![1.0, 2.0], 1, 0.2),
            record(vec![1.0], 1, 0.9),
            record(vec![5.0], -1, 0.1),
        ];
        let grid = assemble_matrices(&records, &pentacle(vec![Probe::Dry])).unwrap();
        let flat = assemble_matrices(&records, &padel()).unwrap();
        assert_eq!(grid, flat);
    }

    #[test]
    fn test_probe_blocks_are_realigned() {
        // Two probes: the short row has block length 1, the long one 3.
        let records = vec![
            record(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 1, 1.0),
            record(vec![7.0, 8.0], 2, 0.0),
        ];
        let matrices =
            assemble_matrices(&records, &pentacle(vec![Probe::Dry, Probe::Oxygen])).unwrap();
        assert_eq!(
            matrices.x,
            array![
                [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
                [7.0, 0.0, 0.0, 8.0, 0.0, 0.0]
            ]
        );
    }

    #[test]
    fn test_second_probe_block_starts_at_the_same_column() {
        let probes = vec![Probe::Dry, Probe::Oxygen, Probe::Nitrogen];
        let records = vec![
            record(vec![1.0; 12], 1, 1.0),
            record(vec![2.0; 6], 1, 0.0),
            record(vec![3.0; 3], 1, 0.0),
        ];
        let matrices = assemble_matrices(&records, &pentacle(probes)).unwrap();
        assert_eq!(matrices.ncols(), 12);
        // Block 1 always starts at column 4.
        assert_abs_diff_eq!(matrices.x[[1, 4]], 2.0);
        assert_abs_diff_eq!(matrices.x[[2, 4]], 3.0);
        assert_abs_diff_eq!(matrices.x[[2, 5]], 0.0);
        assert_abs_diff_eq!(matrices.x[[2, 8]], 3.0);
    }

    #[test]
    fn test_ragged_probe_vector_is_rejected() {
        let records = vec![record(vec![1.0, 2.0, 3.0], 1, 1.0)];
        let err =
            assemble_matrices(&records, &pentacle(vec![Probe::Dry, Probe::Oxygen])).unwrap_err();
        assert_eq!(
            err,
            AssemblyError::RaggedProbeBlocks {
                record: 0,
                block_id: "cmpd".to_string(),
                length: 3,
                probes: 2,
            }
        );
    }

    #[test]
    fn test_excluded_records_are_not_validated() {
        // A malformed vector on a skipped compound never reaches the matrix.
        let records = vec![
            record(vec![1.0, 2.0], 1, 1.0),
            record(vec![f64::NAN, 2.0, 3.0], 0, 0.0),
        ];
        let matrices =
            assemble_matrices(&records, &pentacle(vec![Probe::Dry, Probe::Oxygen])).unwrap();
        assert_eq!(matrices.nrows(), 1);
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let records = vec![record(vec![1.0, f64::INFINITY], 1, 1.0)];
        assert!(matches!(
            assemble_matrices(&records, &padel()),
            Err(AssemblyError::NonFiniteDescriptor { position: 1, .. })
        ));

        let records = vec![record(vec![1.0], 1, f64::NAN)];
        assert!(matches!(
            assemble_matrices(&records, &padel()),
            Err(AssemblyError::NonFiniteLabel { record: 0, .. })
        ));
    }

    #[test]
    fn test_empty_admitted_set_yields_empty_matrix() {
        let records = vec![record(vec![1.0, 2.0], 0, 0.0), record(vec![3.0], -1, 1.0)];
        let matrices = assemble_matrices(&records, &pentacle(vec![Probe::Dry])).unwrap();
        assert!(matrices.is_empty());
        assert_eq!(matrices.x.dim(), (0, 0));
        assert_eq!(matrices.y.len(), 0);

        let matrices = assemble_matrices(&[], &padel()).unwrap();
        assert!(matrices.is_empty());
    }

    #[test]
    fn test_missing_probe_list_is_an_error() {
        let records = vec![record(vec![1.0], 1, 1.0)];
        assert_eq!(
            assemble_matrices(&records, &pentacle(Vec::new())),
            Err(AssemblyError::NoProbes)
        );
    }
}
