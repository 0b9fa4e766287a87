//! # Model Settings
//!
//! The immutable configuration value shared by the matrix assembler, the
//! diagnostics engine and the prediction shortcut. Every routine receives it
//! explicitly; nothing is read from process-wide state.
//!
//! Settings are stored as TOML. A missing table or key falls back to the stock
//! settings of the ionizable-compound classifier (Pentacle GRIND descriptors
//! with the `DRY`, `O` and `N1` probes, a 4-component PLS-DA model and an
//! automatically optimised cutoff).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading, saving or validating settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read or write settings file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML settings: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize settings to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("The model must retain at least one latent variable.")]
    NoLatentVariables,
    #[error("The Pentacle descriptor family requires at least one probe.")]
    NoProbes,
    #[error("Probe '{0}' is listed more than once.")]
    DuplicateProbe(Probe),
    #[error("A fixed cutoff must be a finite number, got {0}.")]
    NonFiniteCutoff(f64),
    #[error("Neutralization pH must lie within [0, 14], got {0}.")]
    PhOutOfRange(f64),
    #[error("Cutoff must be \"auto\" or a number, got \"{0}\".")]
    UnknownCutoffKeyword(String),
}

/// The complete settings of one classifier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub general: GeneralSettings,
    pub normalization: NormalizationSettings,
    pub descriptors: DescriptorSettings,
    pub modeling: ModelingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Whether the model can be rebuilt from a training series.
    pub buildable: bool,
    /// `false` for qualitative (classification) models.
    pub quantitative: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            buildable: true,
            quantitative: false,
        }
    }
}

/// Molecule preparation applied upstream before descriptors are computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationSettings {
    pub enabled: bool,
    pub standardize: bool,
    pub neutralize: bool,
    pub neutralize_method: NeutralizationMethod,
    pub neutralize_ph: f64,
    pub three_d: bool,
}

impl Default for NormalizationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            standardize: false,
            neutralize: true,
            neutralize_method: NeutralizationMethod::Moka,
            neutralize_ph: 4.8,
            three_d: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeutralizationMethod {
    Moka,
}

/// The descriptor backend whose output fills the feature matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorFamily {
    /// 2D/3D descriptors with a fixed layout per run.
    Padel,
    /// GRIND probe-grid descriptors; one block per probe with a
    /// molecule-dependent block length.
    Pentacle,
}

impl DescriptorFamily {
    /// Families whose vectors are partitioned into per-probe blocks.
    pub fn is_probe_grid(self) -> bool {
        matches!(self, DescriptorFamily::Pentacle)
    }
}

/// Chemical probes available to the Pentacle backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Probe {
    #[serde(rename = "DRY")]
    Dry,
    #[serde(rename = "O")]
    Oxygen,
    #[serde(rename = "N1")]
    Nitrogen,
    #[serde(rename = "TIP")]
    Tip,
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Probe::Dry => "DRY",
            Probe::Oxygen => "O",
            Probe::Nitrogen => "N1",
            Probe::Tip => "TIP",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorSettings {
    pub family: DescriptorFamily,
    pub padel_flags: Vec<String>,
    /// Seconds before a PaDEL run is abandoned; `None` disables the limit.
    pub padel_max_runtime: Option<u64>,
    pub padel_descriptor: Option<String>,
    pub pentacle_probes: Vec<Probe>,
    pub pentacle_others: Vec<String>,
}

impl Default for DescriptorSettings {
    fn default() -> Self {
        Self {
            family: DescriptorFamily::Pentacle,
            padel_flags: vec!["-3d".to_string()],
            padel_max_runtime: None,
            padel_descriptor: None,
            pentacle_probes: vec![Probe::Dry, Probe::Oxygen, Probe::Nitrogen],
            pentacle_others: vec!["macc2_window 1.6".to_string(), "step 1.3".to_string()],
        }
    }
}

impl DescriptorSettings {
    /// Number of contiguous blocks each descriptor vector is split into.
    pub fn probe_count(&self) -> usize {
        self.pentacle_probes.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelingMethod {
    Pls,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelingSettings {
    pub method: ModelingMethod,
    pub latent_variables: usize,
    pub autoscaling: bool,
    pub cutoff: CutoffPolicy,
}

impl Default for ModelingSettings {
    fn default() -> Self {
        Self {
            method: ModelingMethod::Pls,
            latent_variables: 4,
            autoscaling: false,
            cutoff: CutoffPolicy::Auto,
        }
    }
}

/// How the decision threshold on the discriminant score is chosen.
///
/// In TOML this is either the string `"auto"` or a number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCutoff", into = "RawCutoff")]
pub enum CutoffPolicy {
    /// Let the engine search for the best cutoff per latent variable.
    Auto,
    /// Use the same threshold for every latent variable.
    Fixed(f64),
}

impl fmt::Display for CutoffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutoffPolicy::Auto => f.write_str("auto"),
            CutoffPolicy::Fixed(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawCutoff {
    Value(f64),
    Keyword(String),
}

impl TryFrom<RawCutoff> for CutoffPolicy {
    type Error = SettingsError;

    fn try_from(raw: RawCutoff) -> Result<Self, Self::Error> {
        match raw {
            RawCutoff::Value(value) => Ok(CutoffPolicy::Fixed(value)),
            RawCutoff::Keyword(word) if word.eq_ignore_ascii_case("auto") => {
                Ok(CutoffPolicy::Auto)
            }
            RawCutoff::Keyword(word) => Err(SettingsError::UnknownCutoffKeyword(word)),
        }
    }
}

impl From<CutoffPolicy> for RawCutoff {
    fn from(policy: CutoffPolicy) -> Self {
        match policy {
            CutoffPolicy::Auto => RawCutoff::Keyword("auto".to_string()),
            CutoffPolicy::Fixed(value) => RawCutoff::Value(value),
        }
    }
}

impl ModelSettings {
    /// Parses and validates settings from a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let settings: ModelSettings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Saves the settings to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.modeling.latent_variables == 0 {
            return Err(SettingsError::NoLatentVariables);
        }
        if let CutoffPolicy::Fixed(value) = self.modeling.cutoff {
            if !value.is_finite() {
                return Err(SettingsError::NonFiniteCutoff(value));
            }
        }
        let ph = self.normalization.neutralize_ph;
        if !(0.0..=14.0).contains(&ph) {
            return Err(SettingsError::PhOutOfRange(ph));
        }
        if self.descriptors.family.is_probe_grid() {
            if self.descriptors.pentacle_probes.is_empty() {
                return Err(SettingsError::NoProbes);
            }
            let mut seen = HashSet::new();
            for probe in &self.descriptors.pentacle_probes {
                if !seen.insert(*probe) {
                    return Err(SettingsError::DuplicateProbe(*probe));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_stock_classifier() {
        let settings = ModelSettings::default();
        assert!(settings.general.buildable);
        assert!(!settings.general.quantitative);
        assert_eq!(settings.descriptors.family, DescriptorFamily::Pentacle);
        assert_eq!(settings.descriptors.probe_count(), 3);
        assert_eq!(settings.modeling.latent_variables, 4);
        assert_eq!(settings.modeling.cutoff, CutoffPolicy::Auto);
        assert_eq!(settings.normalization.neutralize_ph, 4.8);
        settings.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let text = r#"
            [descriptors]
            family = "padel"

            [modeling]
            latent_variables = 2
            cutoff = 0.35
        "#;
        let settings = ModelSettings::from_toml_str(text).unwrap();
        assert_eq!(settings.descriptors.family, DescriptorFamily::Padel);
        assert_eq!(settings.modeling.latent_variables, 2);
        assert_eq!(settings.modeling.cutoff, CutoffPolicy::Fixed(0.35));
        assert_eq!(settings.descriptors.pentacle_probes.len(), 3);
        assert!(settings.normalization.neutralize);
    }

    #[test]
    fn cutoff_accepts_auto_keyword_and_rejects_others() {
        let auto = ModelSettings::from_toml_str("[modeling]\ncutoff = \"auto\"\n").unwrap();
        assert_eq!(auto.modeling.cutoff, CutoffPolicy::Auto);

        let err = ModelSettings::from_toml_str("[modeling]\ncutoff = \"best\"\n").unwrap_err();
        assert!(matches!(err, SettingsError::TomlParseError(_)));
    }

    #[test]
    fn probes_use_pentacle_names() {
        let text = "[descriptors]\npentacle_probes = [\"DRY\", \"TIP\"]\n";
        let settings = ModelSettings::from_toml_str(text).unwrap();
        assert_eq!(
            settings.descriptors.pentacle_probes,
            vec![Probe::Dry, Probe::Tip]
        );
    }

    #[test]
    fn validation_rejects_degenerate_settings() {
        let mut settings = ModelSettings::default();
        settings.modeling.latent_variables = 0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::NoLatentVariables)
        ));

        let mut settings = ModelSettings::default();
        settings.descriptors.pentacle_probes.clear();
        assert!(matches!(settings.validate(), Err(SettingsError::NoProbes)));

        let mut settings = ModelSettings::default();
        settings.descriptors.pentacle_probes = vec![Probe::Oxygen, Probe::Oxygen];
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::DuplicateProbe(Probe::Oxygen))
        ));

        let mut settings = ModelSettings::default();
        settings.modeling.cutoff = CutoffPolicy::Fixed(f64::NAN);
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::NonFiniteCutoff(_))
        ));

        let mut settings = ModelSettings::default();
        settings.normalization.neutralize_ph = 15.0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::PhOutOfRange(_))
        ));
    }

    #[test]
    fn padel_family_does_not_require_probes() {
        let mut settings = ModelSettings::default();
        settings.descriptors.family = DescriptorFamily::Padel;
        settings.descriptors.pentacle_probes.clear();
        settings.validate().unwrap();
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let mut settings = ModelSettings::default();
        settings.modeling.cutoff = CutoffPolicy::Fixed(0.5);
        settings.descriptors.padel_max_runtime = Some(120);

        let file = NamedTempFile::new().unwrap();
        settings.save(file.path()).unwrap();
        let loaded = ModelSettings::load(file.path()).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn cutoff_display_matches_summary_text() {
        assert_eq!(CutoffPolicy::Auto.to_string(), "auto");
        assert_eq!(CutoffPolicy::Fixed(0.45).to_string(), "0.45");
    }
}
