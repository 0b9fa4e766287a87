use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Chemical states at or above this value (neutral or positively charged)
/// are modelled; anything below is handled outside the statistical model.
pub const MODELLED_STATE_THRESHOLD: i32 = 1;

/// Descriptor payload of one compound, as produced by the extraction layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Identifier of the descriptor block the vector came from.
    pub block_id: String,
    pub descriptors: Vec<f64>,
    /// Ionization/charge state after neutralization.
    pub chemical_state: i32,
    /// Activity value; values below 0.5 read as inactive.
    pub label: f64,
}

/// The outcome of extracting descriptors for one compound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub success: bool,
    pub payload: Payload,
}

impl ExtractionRecord {
    pub fn new(
        success: bool,
        block_id: impl Into<String>,
        descriptors: Vec<f64>,
        chemical_state: i32,
        label: f64,
    ) -> Self {
        Self {
            success,
            payload: Payload {
                block_id: block_id.into(),
                descriptors,
                chemical_state,
                label,
            },
        }
    }

    /// Whether the compound takes part in matrix assembly and model fitting.
    pub fn is_modelled(&self) -> bool {
        is_modelled_state(self.payload.chemical_state)
    }
}

pub fn is_modelled_state(chemical_state: i32) -> bool {
    chemical_state >= MODELLED_STATE_THRESHOLD
}

/// A normalized molecule ready for descriptor extraction or prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedMolecule {
    /// Temporary structure file written by the normalization step.
    pub artifact: PathBuf,
    pub chemical_state: i32,
}

impl PreparedMolecule {
    pub fn new(artifact: impl Into<PathBuf>, chemical_state: i32) -> Self {
        Self {
            artifact: artifact.into(),
            chemical_state,
        }
    }

    pub fn is_modelled(&self) -> bool {
        is_modelled_state(self.chemical_state)
    }
}
