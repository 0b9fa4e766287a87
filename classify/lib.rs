#![deny(dead_code)]
#![deny(unused_imports)]

//! Matrix assembly, charge-corrected PLS-DA diagnostics and prediction rules
//! for binary classifiers of ionizable compounds.

pub mod diagnostics;
pub mod matrix;
pub mod metrics;
pub mod model;
pub mod records;
pub mod settings;

#[path = "../shared/files.rs"]
pub mod files;

pub use diagnostics::{DiagnosticsReport, DiscriminantModel, ResultSummary, diagnose};
pub use matrix::{TrainingMatrices, assemble_matrices};
pub use model::{BaseTemplate, ClassificationModel, IonizableClassifier, Prediction};
pub use records::{ExtractionRecord, PreparedMolecule};
pub use settings::{CutoffPolicy, ModelSettings};
