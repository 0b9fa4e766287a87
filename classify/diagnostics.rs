//! # PLS-DA Classification Diagnostics
//!
//! Reports classification quality for every latent-variable count of a fitted
//! discriminant model.
//!
//! Compounds in a non-modelled chemical state never reach the training matrix,
//! yet they belong to the series being evaluated. Their contribution is folded
//! back into the confusion counts before any metric is derived: a compound
//! whose label is below 0.5 adds one to `TP`, any other adds one to `FN`.
//! This accounting is deliberate and must be kept as is; it changes the
//! reported sensitivity of every model built with this classifier.

use crate::metrics::{ConfusionCounts, ConfusionStats};
use crate::records::ExtractionRecord;
use crate::settings::{CutoffPolicy, ModelingSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use thiserror::Error;

/// Label threshold used when folding excluded compounds back into the counts.
pub const EXCLUDED_LABEL_THRESHOLD: f64 = 0.5;

/// The surface of a fitted latent-variable discriminant model needed here.
///
/// Component indices are zero-based: index `a` holds the results of the model
/// with `a + 1` latent variables.
pub trait DiscriminantModel {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Searches the best cutoff for every component and fills the confusion
    /// counts at that cutoff.
    fn optimize_cutoff(&mut self) -> Result<(), Self::Error>;

    /// Fills the confusion counts of every component at a fixed cutoff.
    fn compute_confusion(&mut self, cutoff: f64) -> Result<(), Self::Error>;

    /// Number of components the model was fitted with.
    fn latent_variables(&self) -> usize;

    fn confusion(&self, component: usize) -> ConfusionCounts;

    fn cutoff(&self, component: usize) -> f64;

    /// Number of objects (compounds) the model was fitted on.
    fn object_count(&self) -> usize;
}

#[derive(Error, Debug)]
pub enum DiagnosticsError {
    #[error("Diagnostics require at least one latent variable.")]
    NoLatentVariables,
    #[error(
        "Diagnostics were requested for {requested} latent variables, but the model only provides {available}."
    )]
    InsufficientComponents { requested: usize, available: usize },
    #[error("The classification engine failed while computing confusion counts: {0}")]
    Engine(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Failed to write diagnostic output: {0}")]
    IoError(#[from] std::io::Error),
}

/// Diagnostics of one latent-variable count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentDiagnostics {
    /// Number of latent variables (one-based).
    pub latent_variables: usize,
    pub cutoff: f64,
    pub stats: ConfusionStats,
}

impl fmt::Display for ComponentDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = &self.stats.counts;
        write!(
            f,
            "LV:{:<2} cutoff:{:4.2} TP:{:3} TN:{:3} FP:{:3} FN:{:3} spec:{:5.3} sens:{:5.3} MCC:{:5.3}",
            self.latent_variables,
            self.cutoff,
            counts.tp,
            counts.tn,
            counts.fp,
            counts.fn_count,
            self.stats.specificity,
            self.stats.sensitivity,
            self.stats.mcc
        )
    }
}

/// The metrics reported for the final latent-variable count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub nobj: usize,
    pub cutoff: CutoffPolicy,
    pub sens: f64,
    pub spec: f64,
    pub mcc: f64,
}

impl ResultSummary {
    /// The summary as ordered `(name, value)` pairs, metrics to three decimals.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("nobj", self.nobj.to_string()),
            ("cutoff", self.cutoff.to_string()),
            ("sens", format!("{:5.3}", self.sens)),
            ("spec", format!("{:5.3}", self.spec)),
            ("MCC", format!("{:5.3}", self.mcc)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub components: Vec<ComponentDiagnostics>,
    pub summary: ResultSummary,
}

/// Counts contributed by the compounds excluded from the model.
pub fn excluded_correction(records: &[ExtractionRecord]) -> ConfusionCounts {
    let mut correction = ConfusionCounts::default();
    for record in records.iter().filter(|record| !record.is_modelled()) {
        if record.payload.label < EXCLUDED_LABEL_THRESHOLD {
            correction.tp += 1;
        } else {
            correction.fn_count += 1;
        }
    }
    correction
}

/// Computes, writes and returns the diagnostics of a fitted model.
///
/// `records` is the full series, including the compounds skipped during
/// matrix assembly. One line per latent-variable count is written to `sink`.
/// Engine failures are returned unchanged inside [`DiagnosticsError::Engine`].
pub fn diagnose<M, W>(
    model: &mut M,
    records: &[ExtractionRecord],
    modeling: &ModelingSettings,
    sink: &mut W,
) -> Result<DiagnosticsReport, DiagnosticsError>
where
    M: DiscriminantModel,
    W: Write,
{
    let requested = modeling.latent_variables;
    if requested == 0 {
        return Err(DiagnosticsError::NoLatentVariables);
    }

    let selection = match modeling.cutoff {
        CutoffPolicy::Auto => model.optimize_cutoff(),
        CutoffPolicy::Fixed(cutoff) => model.compute_confusion(cutoff),
    };
    selection.map_err(|err| DiagnosticsError::Engine(Box::new(err)))?;

    let available = model.latent_variables();
    if available < requested {
        return Err(DiagnosticsError::InsufficientComponents {
            requested,
            available,
        });
    }

    let correction = excluded_correction(records);
    log::debug!(
        "Folding {} excluded compounds into the confusion counts (+{} TP, +{} FN)",
        correction.tp + correction.fn_count,
        correction.tp,
        correction.fn_count
    );

    let mut components = Vec::with_capacity(requested);
    for component in 0..requested {
        let mut counts = model.confusion(component);
        counts.tp += correction.tp;
        counts.fn_count += correction.fn_count;

        let line = ComponentDiagnostics {
            latent_variables: component + 1,
            cutoff: model.cutoff(component),
            stats: counts.stats(),
        };
        log::info!("{line}");
        writeln!(sink, "{line}")?;
        components.push(line);
    }
    sink.flush()?;

    // `requested` is non-zero, so the loop produced at least one entry.
    let last = components[components.len() - 1].stats;
    let summary = ResultSummary {
        nobj: model.object_count(),
        cutoff: modeling.cutoff,
        sens: last.sensitivity,
        spec: last.specificity,
        mcc: last.mcc,
    };

    Ok(DiagnosticsReport {
        components,
        summary,
    })
}
