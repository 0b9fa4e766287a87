//! # Ionizable-Compound Classifier
//!
//! A qualitative model built on top of a generic modelling template. The
//! template owns descriptor extraction and statistical prediction; this
//! classifier adds the chemical-state rules on both paths:
//!
//! - extraction records carry the molecule's chemical state, so that matrix
//!   assembly and diagnostics can tell modelled compounds from excluded ones;
//! - at prediction time, compounds in a non-modelled state are classified as
//!   negative with full confidence, without consulting the model.

use crate::diagnostics::{self, DiscriminantModel, DiagnosticsError, DiagnosticsReport};
use crate::files::remove_artifact;
use crate::matrix::{self, AssemblyError, TrainingMatrices};
use crate::records::{ExtractionRecord, PreparedMolecule};
use crate::settings::{ModelSettings, SettingsError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use thiserror::Error;

/// Confidence reported for compounds handled by the chemical-state rule.
pub const SHORTCUT_CONFIDENCE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLabel {
    Positive,
    Negative,
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Positive => f.write_str("positive"),
            ClassLabel::Negative => f.write_str("negative"),
        }
    }
}

/// A predicted value together with the flag telling whether it was computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate<T> {
    pub success: bool,
    pub value: T,
}

impl<T> Estimate<T> {
    pub fn ok(value: T) -> Self {
        Self {
            success: true,
            value,
        }
    }

    pub fn failed(value: T) -> Self {
        Self {
            success: false,
            value,
        }
    }
}

/// Result of predicting one molecule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub classification: Estimate<ClassLabel>,
    pub applicability_domain: Estimate<f64>,
    pub reliability_index: Estimate<f64>,
}

impl Prediction {
    /// Negative with maximal applicability and reliability.
    pub fn certain_negative() -> Self {
        Self {
            classification: Estimate::ok(ClassLabel::Negative),
            applicability_domain: Estimate::ok(SHORTCUT_CONFIDENCE),
            reliability_index: Estimate::ok(SHORTCUT_CONFIDENCE),
        }
    }
}

/// How much information the template attaches to a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    #[default]
    Summary,
    Detailed,
}

/// Extraction output of the generic template: no chemical state yet.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseExtraction {
    pub success: bool,
    pub block_id: String,
    pub descriptors: Vec<f64>,
    pub label: f64,
}

/// The generic modelling template the classifier delegates to.
pub trait BaseTemplate {
    type Error: std::error::Error + Send + Sync + 'static;

    fn extract(
        &self,
        molecule: &PreparedMolecule,
        clean: bool,
    ) -> Result<BaseExtraction, Self::Error>;

    fn predict(
        &self,
        molecule: &PreparedMolecule,
        detail: DetailLevel,
        clean: bool,
    ) -> Result<Prediction, Self::Error>;
}

/// The extraction and prediction contract of a concrete model.
pub trait ClassificationModel {
    type Error: std::error::Error;

    fn extract(
        &self,
        molecule: &PreparedMolecule,
        clean: bool,
    ) -> Result<ExtractionRecord, Self::Error>;

    fn predict(
        &self,
        molecule: &PreparedMolecule,
        detail: DetailLevel,
        clean: bool,
    ) -> Result<Prediction, Self::Error>;
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Invalid model settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("The ionizable-compound classifier is qualitative, but the settings declare a quantitative model.")]
    QuantitativeSettings,
    #[error("The base modelling template failed: {0}")]
    Base(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Binary classifier for ionizable compounds, composed over a base template.
#[derive(Debug, Clone)]
pub struct IonizableClassifier<B> {
    base: B,
    settings: ModelSettings,
}

impl<B: BaseTemplate> IonizableClassifier<B> {
    pub fn new(base: B, settings: ModelSettings) -> Result<Self, ClassifierError> {
        settings.validate()?;
        if settings.general.quantitative {
            return Err(ClassifierError::QuantitativeSettings);
        }
        Ok(Self { base, settings })
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn base(&self) -> &B {
        &self.base
    }

    pub fn buildable(&self) -> bool {
        self.settings.general.buildable
    }

    pub fn quantitative(&self) -> bool {
        self.settings.general.quantitative
    }

    /// Builds the training matrices with this classifier's descriptor layout.
    pub fn matrices(&self, records: &[ExtractionRecord]) -> Result<TrainingMatrices, AssemblyError> {
        matrix::assemble_matrices(records, &self.settings.descriptors)
    }

    /// Runs the charge-corrected diagnostics with this classifier's cutoff
    /// policy and latent-variable count.
    pub fn diagnose<M, W>(
        &self,
        model: &mut M,
        records: &[ExtractionRecord],
        sink: &mut W,
    ) -> Result<DiagnosticsReport, DiagnosticsError>
    where
        M: DiscriminantModel,
        W: Write,
    {
        diagnostics::diagnose(model, records, &self.settings.modeling, sink)
    }
}

impl<B: BaseTemplate> ClassificationModel for IonizableClassifier<B> {
    type Error = ClassifierError;

    /// Extracts descriptors through the template and inserts the molecule's
    /// chemical state ahead of the label.
    fn extract(
        &self,
        molecule: &PreparedMolecule,
        clean: bool,
    ) -> Result<ExtractionRecord, ClassifierError> {
        let base = self
            .base
            .extract(molecule, clean)
            .map_err(|err| ClassifierError::Base(Box::new(err)))?;
        Ok(ExtractionRecord::new(
            base.success,
            base.block_id,
            base.descriptors,
            molecule.chemical_state,
            base.label,
        ))
    }

    fn predict(
        &self,
        molecule: &PreparedMolecule,
        detail: DetailLevel,
        clean: bool,
    ) -> Result<Prediction, ClassifierError> {
        if !molecule.is_modelled() {
            if clean {
                if let Err(err) = remove_artifact(&molecule.artifact) {
                    log::warn!(
                        "Could not remove temporary artifact {}: {err}",
                        molecule.artifact.display()
                    );
                }
            }
            log::debug!(
                "Chemical state {} is not modelled; predicting negative",
                molecule.chemical_state
            );
            return Ok(Prediction::certain_negative());
        }

        self.base
            .predict(molecule, detail, clean)
            .map_err(|err| ClassifierError::Base(Box::new(err)))
    }
}
